use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::SourceError;
use crate::listing::{self, ListingView};
use crate::record::{assemble, CompanyRecord};
use crate::scraper::{self, DetailSource};
use crate::throttle::Throttle;

#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    pub max_pages: usize,
    pub concurrency: usize,
}

pub struct CrawlReport {
    pub records: Vec<CompanyRecord>,
    pub listed: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// Listing walk, then one detail fetch per listed identifier, then assembly.
///
/// Only a listing failure aborts the crawl; detail failures end up as empty
/// fields in the affected rows.
pub async fn crawl<V, S>(
    view: &mut V,
    source: Arc<S>,
    throttle: Arc<dyn Throttle>,
    opts: CrawlOptions,
) -> Result<CrawlReport, SourceError>
where
    V: ListingView + ?Sized,
    S: DetailSource + ?Sized + 'static,
{
    let listing = listing::walk(view, opts.max_pages, throttle.as_ref()).await?;
    info!("Phase 1 complete: {} companies listed", listing.len());
    if listing.is_empty() {
        warn!("Listing returned no companies; nothing to fetch");
        return Ok(CrawlReport {
            records: Vec::new(),
            listed: 0,
            fetched: 0,
            failed: 0,
        });
    }

    let stats = scraper::fetch_all(source, &listing, throttle, opts.concurrency).await;
    let (fetched, failed) = (stats.ok, stats.failed);
    info!("Phase 2 complete: {} detail pages parsed, {} failed", fetched, failed);

    let records = assemble(&listing, &stats.into_records(), Utc::now());
    Ok(CrawlReport {
        listed: listing.len(),
        records,
        fetched,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::tests::FakeView;
    use crate::scraper::tests::FakeSource;
    use crate::throttle::Unthrottled;

    const ACME_PAGE: &str = "Acme Inc\n\n[acme.com](https://acme.com)\n\nTeam Size:12\n\nFounded:2021\n\nStatus:Active";

    #[tokio::test]
    async fn listing_and_failed_detail_still_yield_rows() {
        let mut view = FakeView::new(vec![vec![("acme", "Acme Inc"), ("beta", "Beta Co")]]);
        let source = Arc::new(FakeSource::default().with("acme", Ok(ACME_PAGE)).with("beta", Err(500)));

        let report = crawl(
            &mut view,
            Arc::clone(&source),
            Arc::new(Unthrottled),
            CrawlOptions { max_pages: 35, concurrency: 1 },
        )
        .await
        .unwrap();

        assert_eq!(report.listed, 2);
        assert_eq!((report.fetched, report.failed), (1, 1));
        assert_eq!(report.records.len(), 2);

        let acme = &report.records[0];
        assert_eq!(acme.slug, "acme");
        assert_eq!(acme.team_size, "12");
        assert_eq!(acme.website, "https://acme.com");

        let beta = &report.records[1];
        assert_eq!(beta.name, "Beta Co");
        assert_eq!(beta.team_size, "");
        assert_eq!(beta.website, "");
        assert!(beta.industry_tags.is_empty());
    }

    #[tokio::test]
    async fn duplicate_listing_entries_fetched_once() {
        let mut view = FakeView::new(vec![
            vec![("acme", "Acme Inc")],
            vec![("acme", "Acme Inc"), ("beta", "Beta Co")],
        ]);
        let source = Arc::new(FakeSource::default().with("acme", Ok(ACME_PAGE)));

        let report = crawl(
            &mut view,
            Arc::clone(&source),
            Arc::new(Unthrottled),
            CrawlOptions { max_pages: 35, concurrency: 3 },
        )
        .await
        .unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(source.calls_for("acme"), 1);
        assert_eq!(source.calls_for("beta"), 1);
    }

    #[tokio::test]
    async fn empty_listing_fetches_nothing() {
        let mut view = FakeView::new(vec![vec![]]);
        let source = Arc::new(FakeSource::default());
        let report = crawl(
            &mut view,
            Arc::clone(&source),
            Arc::new(Unthrottled),
            CrawlOptions { max_pages: 35, concurrency: 4 },
        )
        .await
        .unwrap();
        assert_eq!(report.listed, 0);
        assert!(report.records.is_empty());
        assert_eq!((report.fetched, report.failed), (0, 0));
    }

    #[tokio::test]
    async fn listing_failure_aborts() {
        let mut view = FakeView::new(vec![vec![("acme", "Acme Inc")]]);
        view.fail_on_page = Some(1);
        let source = Arc::new(FakeSource::default());
        let result = crawl(
            &mut view,
            Arc::clone(&source),
            Arc::new(Unthrottled),
            CrawlOptions { max_pages: 35, concurrency: 1 },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(source.calls_for("acme"), 0);
    }
}
