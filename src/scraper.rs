use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use std::sync::LazyLock;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::listing::Listing;
use crate::parser;
use crate::record::{DetailOutcome, DetailRecord};
use crate::throttle::Throttle;

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").unwrap());
static BLANKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Where detail pages come from.
#[async_trait]
pub trait DetailSource: Send + Sync {
    fn detail_url(&self, identifier: &str) -> String;

    /// Render one detail page as markdown. Each call is independent of every other.
    async fn fetch_markdown(&self, url: &str) -> Result<String, SourceError>;
}

/// Detail pages rendered through spider.cloud.
pub struct SpiderSource {
    spider: Spider,
    base_url: String,
}

impl SpiderSource {
    pub fn new(api_key: Option<String>, base_url: &str) -> Result<Self, SourceError> {
        let api_key = api_key.ok_or(SourceError::MissingApiKey)?;
        let spider = Spider::new(Some(api_key)).map_err(|e| SourceError::Spider(e.to_string()))?;
        Ok(SpiderSource {
            spider,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl DetailSource for SpiderSource {
    fn detail_url(&self, identifier: &str) -> String {
        format!("{}{}", self.base_url, identifier)
    }

    async fn fetch_markdown(&self, url: &str) -> Result<String, SourceError> {
        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Markdown)),
            ..Default::default()
        };

        let start = Instant::now();
        let response = self
            .spider
            .scrape_url(url, Some(params), "application/json")
            .await
            .map_err(|e| SourceError::Spider(e.to_string()))?;
        debug!(url, latency_ms = start.elapsed().as_millis() as u64, "detail page scraped");

        let parsed: serde_json::Value = match response.as_str() {
            Some(s) => serde_json::from_str(s).unwrap_or(response.clone()),
            None => response,
        };
        let first = parsed.as_array().and_then(|arr| arr.first());

        if let Some(status) = first.and_then(|obj| obj.get("status")).and_then(|s| s.as_u64()) {
            if status >= 400 {
                return Err(SourceError::Status {
                    url: url.to_string(),
                    status: status as u16,
                });
            }
        }

        first
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .map(strip_images)
            .filter(|md| !md.trim().is_empty())
            .ok_or_else(|| SourceError::Empty(url.to_string()))
    }
}

/// Remove markdown image syntax: ![alt](url) and [![alt](url)](link)
pub fn strip_images(md: &str) -> String {
    let cleaned = IMAGE_RE.replace_all(md, "");
    BLANKS_RE.replace_all(&cleaned, "\n\n").to_string()
}

/// Fetch and parse one detail page. Never returns an error: a failed fetch
/// becomes `DetailOutcome::Failed` carrying the (empty) partial record.
pub async fn fetch_detail<S: DetailSource + ?Sized>(source: &S, identifier: &str) -> DetailOutcome {
    let url = source.detail_url(identifier);
    match source.fetch_markdown(&url).await {
        Ok(markdown) => DetailOutcome::Parsed(parser::parse_detail(identifier, &markdown)),
        Err(e) => {
            warn!("Error scraping detail page for {}: {}", identifier, e);
            DetailOutcome::Failed {
                partial: DetailRecord::empty(identifier),
                reason: e.to_string(),
            }
        }
    }
}

/// Detail phase results, keyed by identifier.
pub struct FetchStats {
    pub outcomes: HashMap<String, DetailOutcome>,
    pub ok: usize,
    pub failed: usize,
}

/// Fetch every listed identifier exactly once.
///
/// `concurrency <= 1` fetches one at a time in listing order; otherwise a
/// semaphore bounds the number of in-flight fetches.
pub async fn fetch_all<S>(
    source: Arc<S>,
    listing: &Listing,
    throttle: Arc<dyn Throttle>,
    concurrency: usize,
) -> FetchStats
where
    S: DetailSource + ?Sized + 'static,
{
    let total = listing.len();
    let pb = progress_bar(total);
    let mut stats = FetchStats {
        outcomes: HashMap::with_capacity(total),
        ok: 0,
        failed: 0,
    };

    if concurrency <= 1 {
        for entry in listing.iter() {
            throttle.pause().await;
            let outcome = fetch_detail(source.as_ref(), &entry.identifier).await;
            stats.record(outcome);
            pb.inc(1);
        }
    } else {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let (tx, mut rx) = tokio::sync::mpsc::channel::<DetailOutcome>(concurrency * 2);

        for entry in listing.iter() {
            let source = Arc::clone(&source);
            let throttle = Arc::clone(&throttle);
            let sem = Arc::clone(&semaphore);
            let tx = tx.clone();
            let identifier = entry.identifier.clone();

            tokio::spawn(async move {
                let outcome = match sem.acquire().await {
                    Ok(_permit) => {
                        throttle.pause().await;
                        fetch_detail(source.as_ref(), &identifier).await
                    }
                    Err(e) => DetailOutcome::Failed {
                        partial: DetailRecord::empty(&identifier),
                        reason: e.to_string(),
                    },
                };
                let _ = tx.send(outcome).await;
            });
        }

        // rx closes once every spawned task has sent and dropped its sender
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            stats.record(outcome);
            pb.inc(1);
        }
    }

    pb.finish_and_clear();
    info!("Fetched {} detail pages ({} ok, {} failed)", total, stats.ok, stats.failed);
    stats
}

impl FetchStats {
    fn record(&mut self, outcome: DetailOutcome) {
        if outcome.is_failed() {
            self.failed += 1;
        } else {
            self.ok += 1;
        }
        let identifier = outcome.record().identifier.clone();
        self.outcomes.insert(identifier, outcome);
    }

    pub fn into_records(self) -> HashMap<String, DetailRecord> {
        self.outcomes
            .into_iter()
            .map(|(id, outcome)| (id, outcome.into_record()))
            .collect()
    }
}

fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}
