use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::{ListingCard, ListingView};
use crate::error::SourceError;

#[derive(Debug, Deserialize)]
struct ApiCompany {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// The API has answered both as a bare array and as a paged object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiPage {
    List(Vec<ApiCompany>),
    Paged { companies: Vec<ApiCompany> },
}

impl ApiPage {
    fn into_companies(self) -> Vec<ApiCompany> {
        match self {
            ApiPage::List(c) | ApiPage::Paged { companies: c } => c,
        }
    }
}

/// Directory JSON API paged by `limit` / `offset`.
///
/// "Load more" requests the next offset; a short page means the control is gone.
pub struct ApiListing {
    client: reqwest::Client,
    endpoint: Url,
    page_size: usize,
    rendered: Vec<ListingCard>,
    next_offset: usize,
    loaded: bool,
    exhausted: bool,
}

impl ApiListing {
    pub fn new(client: reqwest::Client, endpoint: &str, page_size: usize) -> Result<Self, SourceError> {
        let endpoint = Url::parse(endpoint).map_err(|source| SourceError::Url {
            url: endpoint.to_string(),
            source,
        })?;
        Ok(ApiListing {
            client,
            endpoint,
            page_size: page_size.max(1),
            rendered: Vec::new(),
            next_offset: 0,
            loaded: false,
            exhausted: false,
        })
    }

    /// Endpoint with its own filter query kept and `limit`/`offset` appended.
    pub fn page_url(&self, offset: usize) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string())
            .append_pair("offset", &offset.to_string());
        url
    }

    async fn fetch_next(&mut self) -> Result<(), SourceError> {
        let url = self.page_url(self.next_offset);
        info!("Fetching listing page: {}", url);

        let http = |source| SourceError::Http {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url.clone()).send().await.map_err(http)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await.map_err(http)?;
        let cards = parse_page(&body).map_err(|reason| SourceError::Malformed {
            url: url.to_string(),
            reason,
        })?;

        if cards.len() < self.page_size {
            self.exhausted = true;
        }
        self.next_offset += self.page_size;
        self.rendered.extend(cards);
        self.loaded = true;
        Ok(())
    }
}

/// Parse one API page into cards, skipping entries without a slug.
pub fn parse_page(body: &str) -> Result<Vec<ListingCard>, String> {
    let page: ApiPage = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let companies = page.into_companies();
    let total = companies.len();
    let cards: Vec<ListingCard> = companies
        .into_iter()
        .filter_map(|c| {
            let identifier = c.slug?.trim().to_string();
            if identifier.is_empty() {
                return None;
            }
            Some(ListingCard {
                identifier,
                label: c.name.unwrap_or_default(),
            })
        })
        .collect();
    if cards.len() < total {
        warn!("Skipped {} listing entries without a slug", total - cards.len());
    }
    Ok(cards)
}

#[async_trait]
impl ListingView for ApiListing {
    async fn cards(&mut self) -> Result<Vec<ListingCard>, SourceError> {
        if !self.loaded {
            self.fetch_next().await?;
        }
        Ok(self.rendered.clone())
    }

    async fn has_load_more(&mut self) -> Result<bool, SourceError> {
        Ok(self.loaded && !self.exhausted)
    }

    async fn load_more(&mut self) -> Result<(), SourceError> {
        if self.exhausted {
            return Ok(());
        }
        self.fetch_next().await
    }

    // The API has no scroll-triggered loading.
    async fn scroll(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}
