pub mod api;
pub mod sitemap;

use std::collections::HashSet;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::throttle::Throttle;

pub use api::ApiListing;
pub use sitemap::SitemapListing;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub identifier: String,
    pub label: String,
}

/// Identifier → label map, deduplicated by identifier. First-seen label wins.
#[derive(Debug, Default, Clone)]
pub struct Listing {
    entries: Vec<ListingEntry>,
    seen: HashSet<String>,
}

impl Listing {
    /// Returns `false` when the identifier was already present.
    pub fn insert(&mut self, identifier: &str, label: &str) -> bool {
        if !self.seen.insert(identifier.to_string()) {
            return false;
        }
        self.entries.push(ListingEntry {
            identifier: identifier.to_string(),
            label: label.trim().to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn label(&self, identifier: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.identifier == identifier)
            .map(|e| e.label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ListingEntry> {
        self.entries.iter()
    }
}

/// One entity card as rendered in the listing view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingCard {
    pub identifier: String,
    pub label: String,
}

/// A paginated listing the walker can read and advance.
#[async_trait]
pub trait ListingView: Send {
    /// All cards rendered so far, earlier pages included.
    async fn cards(&mut self) -> Result<Vec<ListingCard>, SourceError>;

    /// Whether an explicit "load more" control is present.
    async fn has_load_more(&mut self) -> Result<bool, SourceError>;

    async fn load_more(&mut self) -> Result<(), SourceError>;

    /// Induce further loading without an explicit control.
    async fn scroll(&mut self) -> Result<(), SourceError>;
}

/// Walk the listing until it stops growing or `max_pages` pages were scanned.
///
/// Errors raised by the view are returned to the caller untouched.
pub async fn walk<V: ListingView + ?Sized>(
    view: &mut V,
    max_pages: usize,
    throttle: &dyn Throttle,
) -> Result<Listing, SourceError> {
    let mut listing = Listing::default();
    let mut page = 0;

    loop {
        page += 1;
        throttle.pause().await;

        let cards = view.cards().await?;
        let rendered = cards.len();
        let mut added = 0;
        for card in &cards {
            if listing.insert(&card.identifier, &card.label) {
                added += 1;
            }
        }
        debug!(page, rendered, added, "listing page scanned");
        info!("Unique companies collected so far: {}", listing.len());

        if page >= max_pages {
            info!("Reached page cap ({}), stopping", max_pages);
            break;
        }

        if view.has_load_more().await? {
            view.load_more().await?;
        } else {
            view.scroll().await?;
        }

        let after = view.cards().await?.len();
        if after <= rendered {
            info!("No more companies to load");
            break;
        }
    }

    info!("Total unique companies collected: {}", listing.len());
    Ok(listing)
}
