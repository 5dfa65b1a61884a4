use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

use crate::export::tags_cell;
use crate::record::CompanyRecord;

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// One table per run: dropped and recreated, then filled in a single transaction.
pub fn export_sqlite(conn: &Connection, records: &[CompanyRecord]) -> Result<usize> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS companies;
        CREATE TABLE companies (
            company_name      TEXT NOT NULL,
            slug              TEXT PRIMARY KEY,
            year_founded      TEXT NOT NULL,
            batch             TEXT NOT NULL,
            team_size         TEXT NOT NULL,
            status            TEXT NOT NULL,
            location          TEXT NOT NULL,
            primary_partner   TEXT NOT NULL,
            website           TEXT NOT NULL,
            tags              TEXT NOT NULL,
            short_description TEXT NOT NULL,
            scraped_at        TEXT NOT NULL
        );
        CREATE INDEX idx_companies_status ON companies(status);
        CREATE INDEX idx_companies_batch ON companies(batch);
        ",
    )?;

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO companies
             (company_name, slug, year_founded, batch, team_size, status, location,
              primary_partner, website, tags, short_description, scraped_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
        )?;
        for r in records {
            count += stmt.execute(rusqlite::params![
                r.name,
                r.slug,
                r.founded_year,
                r.batch,
                r.team_size,
                r.status,
                r.location,
                r.primary_partner,
                r.website,
                tags_cell(&r.industry_tags),
                r.description,
                r.captured_at.to_rfc3339(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Overview ──

pub struct OverviewRow {
    pub slug: String,
    pub name: String,
    pub batch: String,
    pub status: String,
    pub team_size: Option<i64>,
    pub location: String,
    pub primary_partner: String,
    pub tags: String,
}

pub fn fetch_overview(
    conn: &Connection,
    status: Option<&str>,
    batch: Option<&str>,
    limit: usize,
) -> Result<Vec<OverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(s) = status {
        conditions.push(format!("status = ?{}", params.len() + 1));
        params.push(Box::new(s.to_string()));
    }
    if let Some(b) = batch {
        conditions.push(format!("batch = ?{}", params.len() + 1));
        params.push(Box::new(b.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    // team_size is free text on the page; only plain integers become a number
    let sql = format!(
        "SELECT slug, company_name, batch, status,
                CASE WHEN team_size GLOB '[0-9]*' AND team_size NOT GLOB '*[^0-9]*'
                     THEN CAST(team_size AS INTEGER) END,
                location, primary_partner, tags
         FROM companies{}
         ORDER BY batch DESC, slug
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(OverviewRow {
                slug: row.get(0)?,
                name: row.get(1)?,
                batch: row.get(2)?,
                status: row.get(3)?,
                team_size: row.get(4)?,
                location: row.get(5)?,
                primary_partner: row.get(6)?,
                tags: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(slug: &str, status: &str, batch: &str, team: &str) -> CompanyRecord {
        CompanyRecord {
            name: slug.to_uppercase(),
            slug: slug.to_string(),
            founded_year: String::new(),
            batch: batch.to_string(),
            team_size: team.to_string(),
            status: status.to_string(),
            location: String::new(),
            primary_partner: String::new(),
            website: String::new(),
            industry_tags: vec!["B2B".into()],
            description: String::new(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn rerun_replaces_table() {
        let dir = tempfile::tempdir().unwrap();
        let conn = connect(&dir.path().join("yc.sqlite")).unwrap();

        let first = vec![record("a", "Active", "Winter 2024", "5"), record("b", "Inactive", "Summer 2021", "")];
        assert_eq!(export_sqlite(&conn, &first).unwrap(), 2);
        assert_eq!(export_sqlite(&conn, &first[..1]).unwrap(), 1);

        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM companies", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn overview_filters_and_parses_team_size() {
        let conn = Connection::open_in_memory().unwrap();
        export_sqlite(
            &conn,
            &[
                record("a", "Active", "Winter 2024", "12"),
                record("b", "Active", "Summer 2021", "about 10"),
                record("c", "Inactive", "Winter 2024", "3"),
            ],
        )
        .unwrap();

        let active = fetch_overview(&conn, Some("Active"), None, 50).unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].slug, "a");
        assert_eq!(active[0].team_size, Some(12));
        assert_eq!(active[1].team_size, None);
        assert_eq!(active[0].tags, r#"["B2B"]"#);

        let w24 = fetch_overview(&conn, Some("Active"), Some("Winter 2024"), 50).unwrap();
        assert_eq!(w24.len(), 1);

        assert_eq!(fetch_overview(&conn, None, None, 1).unwrap().len(), 1);
    }
}
