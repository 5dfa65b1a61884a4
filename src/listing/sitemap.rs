use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use super::{ListingCard, ListingView};
use crate::error::SourceError;

static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://www\.ycombinator\.com/companies/([a-zA-Z0-9][a-zA-Z0-9_-]*)/?$").unwrap()
});

/// Directory index pages that share the `/companies/<segment>` shape.
const RESERVED_SEGMENTS: &[&str] = &["industry", "location", "batch", "tags", "founders", "sitemap"];

/// Every company URL in the directory sitemap, as one unpaginated page.
///
/// Cards carry no label; the detail page supplies the name.
pub struct SitemapListing {
    client: reqwest::Client,
    url: String,
    rendered: Option<Vec<ListingCard>>,
}

impl SitemapListing {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        SitemapListing {
            client,
            url: url.to_string(),
            rendered: None,
        }
    }

    async fn fetch(&self) -> Result<Vec<ListingCard>, SourceError> {
        info!("Fetching companies sitemap: {}", self.url);
        let http = |source| SourceError::Http {
            url: self.url.clone(),
            source,
        };
        let response = self.client.get(&self.url).send().await.map_err(http)?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                url: self.url.clone(),
                status: response.status().as_u16(),
            });
        }
        let xml = response.text().await.map_err(http)?;
        let all_urls = parse_urlset(&xml).map_err(|reason| SourceError::Malformed {
            url: self.url.clone(),
            reason,
        })?;
        info!("Total URLs in sitemap: {}", all_urls.len());

        let cards = company_cards(&all_urls);
        info!("Company pages after filtering: {}", cards.len());
        Ok(cards)
    }
}

/// Keep company pages only (drops /industry/, /location/, /batch/ and friends).
pub fn company_cards(urls: &[String]) -> Vec<ListingCard> {
    urls.iter()
        .filter_map(|url| {
            let slug = COMPANY_RE.captures(url)?.get(1)?.as_str().to_string();
            if RESERVED_SEGMENTS.contains(&slug.as_str()) {
                return None;
            }
            Some(ListingCard {
                identifier: slug,
                label: String::new(),
            })
        })
        .collect()
}

/// Parse a urlset XML and return all <loc> URLs.
pub fn parse_urlset(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut urls = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(e)) if in_loc => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                urls.push(text.trim().to_string());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.name().as_ref() {
                b"loc" => in_loc = false,
                b"url" => in_url = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(e.to_string()),
            _ => {}
        }
        buf.clear();
    }
    Ok(urls)
}

#[async_trait]
impl ListingView for SitemapListing {
    async fn cards(&mut self) -> Result<Vec<ListingCard>, SourceError> {
        if self.rendered.is_none() {
            self.rendered = Some(self.fetch().await?);
        }
        Ok(self.rendered.clone().unwrap_or_default())
    }

    async fn has_load_more(&mut self) -> Result<bool, SourceError> {
        Ok(false)
    }

    async fn load_more(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn scroll(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}
