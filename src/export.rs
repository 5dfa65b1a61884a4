use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::record::CompanyRecord;

/// External column order, matching the serde names on `CompanyRecord`.
pub const COLUMNS: [&str; 12] = [
    "company_name",
    "slug",
    "year_founded",
    "batch",
    "team_size",
    "status",
    "location",
    "primary_partner",
    "website",
    "tags",
    "short_description",
    "scraped_at",
];

/// Tags as a JSON list, so each cell holds one value.
pub fn tags_cell(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

/// Header first, then one serialized row per record. The header is written
/// explicitly so an empty record set still yields it.
pub fn write_csv<W: Write>(writer: W, records: &[CompanyRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for r in records {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the whole record set, replacing any previous file.
pub fn export_csv(path: &Path, records: &[CompanyRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(file, records).with_context(|| format!("writing {}", path.display()))
}
