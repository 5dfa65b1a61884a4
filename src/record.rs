use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::listing::Listing;

/// Fields observed on one detail page. `None` means the layout element was not found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailRecord {
    pub identifier: String,
    pub name: Option<String>,
    pub founded_year: Option<String>,
    pub batch: Option<String>,
    pub team_size: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub primary_partner: Option<String>,
    pub website: Option<String>,
    pub tags: Vec<String>,
    pub description: Option<String>,
}

impl DetailRecord {
    pub fn empty(identifier: &str) -> Self {
        DetailRecord {
            identifier: identifier.to_string(),
            ..Default::default()
        }
    }
}

/// Result of the single fetch made for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// Page fetched; fields hold whatever the extractors located.
    Parsed(DetailRecord),
    /// Fetch failed; `partial` holds what was built before the failure.
    Failed { partial: DetailRecord, reason: String },
}

impl DetailOutcome {
    pub fn record(&self) -> &DetailRecord {
        match self {
            DetailOutcome::Parsed(r) => r,
            DetailOutcome::Failed { partial, .. } => partial,
        }
    }

    pub fn into_record(self) -> DetailRecord {
        match self {
            DetailOutcome::Parsed(r) => r,
            DetailOutcome::Failed { partial, .. } => partial,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DetailOutcome::Failed { .. })
    }
}

/// One row of the output table. Every field is materialized; never mutated after assembly.
///
/// Serializes as one flat row under the external column names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRecord {
    #[serde(rename = "company_name")]
    pub name: String,
    pub slug: String,
    #[serde(rename = "year_founded")]
    pub founded_year: String,
    pub batch: String,
    pub team_size: String,
    pub status: String,
    pub location: String,
    pub primary_partner: String,
    pub website: String,
    #[serde(rename = "tags", serialize_with = "json_list")]
    pub industry_tags: Vec<String>,
    #[serde(rename = "short_description")]
    pub description: String,
    #[serde(rename = "scraped_at", serialize_with = "rfc3339")]
    pub captured_at: DateTime<Utc>,
}

// csv rows cannot hold sequences, so the list goes out as one JSON cell
fn json_list<S: Serializer>(tags: &[String], s: S) -> Result<S::Ok, S::Error> {
    let cell = serde_json::to_string(tags).map_err(serde::ser::Error::custom)?;
    s.serialize_str(&cell)
}

fn rfc3339<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&at.to_rfc3339())
}

/// Merge listing entries with their detail records.
///
/// The listing is the authoritative identifier set: an identifier with no
/// detail record still yields a row with empty detail fields. Rows with no
/// label from either side are dropped. Output follows listing order.
pub fn assemble(
    listing: &Listing,
    details: &HashMap<String, DetailRecord>,
    captured_at: DateTime<Utc>,
) -> Vec<CompanyRecord> {
    listing
        .iter()
        .filter_map(|entry| {
            let detail = details.get(&entry.identifier);
            let name = Some(entry.label.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    detail
                        .and_then(|d| d.name.as_deref())
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                })?;

            let field = |f: fn(&DetailRecord) -> &Option<String>| -> String {
                detail.and_then(|d| f(d).clone()).unwrap_or_default()
            };

            Some(CompanyRecord {
                name,
                slug: entry.identifier.clone(),
                founded_year: field(|d| &d.founded_year),
                batch: field(|d| &d.batch),
                team_size: field(|d| &d.team_size),
                status: field(|d| &d.status),
                location: field(|d| &d.location),
                primary_partner: field(|d| &d.primary_partner),
                website: field(|d| &d.website),
                industry_tags: detail.map(|d| d.tags.clone()).unwrap_or_default(),
                description: field(|d| &d.description),
                captured_at,
            })
        })
        .collect()
}
