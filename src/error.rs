use thiserror::Error;

/// Failure talking to an external source (listing API, detail pages, probed sites).
///
/// Always recoverable at the granularity of one identifier or one probe.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("no content in response for {0}")]
    Empty(String),
    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
    #[error("invalid url {url}: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("spider: {0}")]
    Spider(String),
    #[error("SPIDER_API_KEY (or YC_SPIDER_API_KEY) must be set")]
    MissingApiKey,
}

/// Input table does not have the shape a consumer needs. Fatal.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("{path}: missing required column `{column}`")]
    MissingColumn { path: String, column: String },
}
