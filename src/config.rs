use serde::Deserialize;

pub const COMPANIES_API_URL: &str = "https://api.ycombinator.com/v0/companies";
/// Recent batches, US-based companies.
pub const LISTING_FILTER: &str = "batch=Winter%202025&batch=Spring%202025&batch=Summer%202025\
&batch=Fall%202024&batch=Summer%202024&regions=United%20States%20of%20America";
pub const COMPANIES_SITEMAP_URL: &str = "https://www.ycombinator.com/companies/sitemap";
pub const DETAIL_BASE_URL: &str = "https://www.ycombinator.com/companies/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingMode {
    Api,
    Sitemap,
}

/// Run settings: in-source defaults, overridden by `YC_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub listing_mode: ListingMode,
    pub listing_url: String,
    pub sitemap_url: String,
    pub detail_base_url: String,
    pub page_size: usize,
    pub max_pages: usize,
    pub concurrency: usize,
    pub request_delay_ms: u64,
    pub output_csv: String,
    pub output_db: Option<String>,
    pub spider_api_key: Option<String>,
    pub probe_timeout_secs: u64,
    pub leads_input: String,
    pub leads_output: String,
    pub sample_size: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listing_mode: ListingMode::Api,
            listing_url: format!("{}?{}", COMPANIES_API_URL, LISTING_FILTER),
            sitemap_url: COMPANIES_SITEMAP_URL.to_string(),
            detail_base_url: DETAIL_BASE_URL.to_string(),
            page_size: 100,
            max_pages: 35,
            concurrency: 1,
            request_delay_ms: 1000,
            output_csv: "yc_companies_filtered.csv".to_string(),
            output_db: None,
            spider_api_key: None,
            probe_timeout_secs: 10,
            leads_input: "yc_companies_filtered.csv".to_string(),
            leads_output: "validated_yc_leads.csv".to_string(),
            sample_size: 50,
        }
    }
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("YC").try_parsing(true))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    pub fn spider_api_key(&self) -> Option<String> {
        self.spider_api_key
            .clone()
            .or_else(|| std::env::var("SPIDER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_filtered_listing() {
        let s = Settings::default();
        assert_eq!(s.listing_mode, ListingMode::Api);
        assert_eq!(s.max_pages, 35);
        assert_eq!(s.concurrency, 1);
        assert_eq!(s.output_csv, "yc_companies_filtered.csv");
        assert!(s.detail_base_url.ends_with('/'));

        let url = url::Url::parse(&s.listing_url).unwrap();
        assert!(s.listing_url.starts_with(COMPANIES_API_URL));
        let batches: Vec<_> = url.query_pairs().filter(|(k, _)| k == "batch").map(|(_, v)| v.into_owned()).collect();
        assert_eq!(
            batches,
            vec!["Winter 2025", "Spring 2025", "Summer 2025", "Fall 2024", "Summer 2024"]
        );
        assert!(url
            .query_pairs()
            .any(|(k, v)| k == "regions" && v == "United States of America"));
    }

    #[test]
    fn empty_sources_fall_back_to_defaults() {
        let s = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();
        assert_eq!(s.page_size, 100);
        assert_eq!(s.request_delay_ms, 1000);
        assert!(s.output_db.is_none());
    }

    #[test]
    fn listing_mode_parses_lowercase() {
        let mode: ListingMode = serde_json::from_str("\"sitemap\"").unwrap();
        assert_eq!(mode, ListingMode::Sitemap);
    }
}
