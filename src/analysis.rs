//! Dataset summary over an exported company table.

use std::fmt;

use itertools::Itertools;

use crate::leads::CompanyRow;

const TOP_BATCHES: usize = 10;
const TOP_LOCATIONS: usize = 10;
const TOP_TAGS: usize = 15;
const LARGEST_TEAMS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct TeamStats {
    pub mean: f64,
    pub median: f64,
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub total: usize,
    /// Every status with its count, most common first.
    pub statuses: Vec<(String, usize)>,
    pub top_batches: Vec<(String, usize)>,
    pub top_locations: Vec<(String, usize)>,
    pub top_tags: Vec<(String, usize)>,
    /// `None` when no row has a numeric team size.
    pub team: Option<TeamStats>,
    pub largest_teams: Vec<(String, u32)>,
}

impl DatasetSummary {
    pub fn status_count(&self, status: &str) -> usize {
        self.statuses
            .iter()
            .find(|(s, _)| s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

/// Counts per distinct non-empty value, most common first, ties by name.
pub fn ranked<I>(values: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    values
        .into_iter()
        .filter(|v| !v.is_empty())
        .counts()
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(limit)
        .collect()
}

fn team_stats(rows: &[CompanyRow]) -> Option<TeamStats> {
    let sizes: Vec<u32> = rows.iter().filter_map(|r| r.team_size).sorted().collect();
    let (min, max) = sizes.iter().copied().minmax().into_option()?;
    let mid = sizes.len() / 2;
    let median = if sizes.len() % 2 == 0 {
        (sizes[mid - 1] as f64 + sizes[mid] as f64) / 2.0
    } else {
        sizes[mid] as f64
    };
    Some(TeamStats {
        mean: sizes.iter().map(|&n| n as f64).sum::<f64>() / sizes.len() as f64,
        median,
        min,
        max,
    })
}

pub fn summarize(rows: &[CompanyRow]) -> DatasetSummary {
    let largest_teams = rows
        .iter()
        .filter_map(|r| r.team_size.map(|n| (r.company_name.clone(), n)))
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .take(LARGEST_TEAMS)
        .collect();

    DatasetSummary {
        total: rows.len(),
        statuses: ranked(rows.iter().map(|r| r.status.clone()), usize::MAX),
        top_batches: ranked(rows.iter().map(|r| r.batch.clone()), TOP_BATCHES),
        top_locations: ranked(rows.iter().map(|r| r.location.clone()), TOP_LOCATIONS),
        top_tags: ranked(rows.iter().flat_map(|r| r.tags.iter().cloned()), TOP_TAGS),
        team: team_stats(rows),
        largest_teams,
    }
}

fn pct(n: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        n as f64 * 100.0 / total as f64
    }
}

fn counts_block(f: &mut fmt::Formatter<'_>, title: &str, counts: &[(String, usize)]) -> fmt::Result {
    writeln!(f, "\n{}:", title)?;
    for (value, n) in counts {
        writeln!(f, "  {:<32} {:>5}", value, n)?;
    }
    Ok(())
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total companies: {}", self.total)?;
        for status in ["Active", "Public", "Acquired"] {
            writeln!(f, "{:<9} {}", format!("{}:", status), self.status_count(status))?;
        }

        writeln!(f, "\nStatus distribution:")?;
        for (status, n) in &self.statuses {
            writeln!(f, "  {:<12} {:>5} ({:.1}%)", status, n, pct(*n, self.total))?;
        }

        counts_block(f, "Top batches", &self.top_batches)?;
        counts_block(f, "Top locations", &self.top_locations)?;
        counts_block(f, "Top tags", &self.top_tags)?;

        match &self.team {
            Some(t) => {
                writeln!(f, "\nTeam size:")?;
                writeln!(f, "  mean {:.1} | median {:.1} | min {} | max {}", t.mean, t.median, t.min, t.max)?;
                for (name, n) in &self.largest_teams {
                    writeln!(f, "  {:<32} {:>5}", name, n)?;
                }
            }
            None => writeln!(f, "\nTeam size: no numeric values")?,
        }
        Ok(())
    }
}
