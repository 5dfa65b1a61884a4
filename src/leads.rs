//! Lead selection over an exported company table.
//!
//! Reads the CSV written by `export`, keeps recent, active, staffed companies
//! whose tags hit the target industries, then ranks them after probing their
//! websites.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use rayon::prelude::*;
use tracing::info;

use crate::analysis;
use crate::error::SchemaError;
use crate::probe::{self, PageClient, SiteProbe};
use crate::throttle::Throttle;

pub const TARGET_TAGS: &[&str] = &[
    "developer-tools",
    "dev-tools",
    "developer-tool",
    "api",
    "sdk",
    "artificial-intelligence",
    "ai",
    "machine-learning",
    "ml",
    "generative-ai",
    "llm",
    "nlp",
    "computer-vision",
    "saas",
    "b2b",
    "enterprise",
    "productivity",
];

const MIN_TEAM_SIZE: u32 = 5;
const MIN_BATCH_YEAR: u32 = 21;
const SWEET_SPOT_TEAM: std::ops::RangeInclusive<u32> = 10..=100;
const SWEET_SPOT_LIMIT: usize = 50;

/// One row of the exported table, as far as lead selection needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRow {
    pub company_name: String,
    pub website: String,
    pub batch: String,
    pub team_size: Option<u32>,
    pub status: String,
    pub location: String,
    pub tags: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lead {
    pub company: CompanyRow,
    pub fit_score: usize,
    pub batch_year: u32,
}

/// Outreach tier; `First` is the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    /// Webflow or Framer site with a blog.
    First,
    /// Strong tag fit with a blog.
    Second,
    /// Strong tag fit only.
    Third,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::First, Tier::Second, Tier::Third];

    pub fn label(self) -> &'static str {
        match self {
            Tier::First => "Priority 1",
            Tier::Second => "Priority 2",
            Tier::Third => "Priority 3",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedLead {
    pub lead: Lead,
    pub probe: SiteProbe,
    pub priority_score: u32,
    pub tier: Option<Tier>,
}

/// Column positions; each entry lists accepted header names, preferred first.
struct Columns {
    name: usize,
    tags: usize,
    website: usize,
    batch: usize,
    team_size: usize,
    status: usize,
    location: usize,
    description: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord, source: &str) -> Result<Self, SchemaError> {
        let find = |names: &[&str]| names.iter().find_map(|n| headers.iter().position(|h| h == *n));
        let require = |names: &[&str]| {
            find(names).ok_or_else(|| SchemaError::MissingColumn {
                path: source.to_string(),
                column: names[0].to_string(),
            })
        };
        Ok(Columns {
            name: require(&["company_name", "name"])?,
            tags: require(&["tags", "industry_tags"])?,
            website: require(&["website"])?,
            batch: require(&["batch"])?,
            team_size: require(&["team_size"])?,
            status: require(&["status"])?,
            location: require(&["location"])?,
            description: find(&["short_description", "description"]),
        })
    }
}

pub fn read_companies<R: Read>(reader: R, source: &str) -> Result<Vec<CompanyRow>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let cols = Columns::locate(rdr.headers()?, source)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        rows.push(CompanyRow {
            company_name: cell(cols.name),
            website: cell(cols.website),
            batch: cell(cols.batch),
            team_size: parse_team_size(&cell(cols.team_size)),
            status: cell(cols.status),
            location: cell(cols.location),
            tags: parse_tags(&cell(cols.tags)),
            description: cols.description.map(cell).unwrap_or_default(),
        });
    }
    Ok(rows)
}

/// Load an exported table. A missing required column is fatal.
pub fn load_companies(path: &Path) -> Result<Vec<CompanyRow>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let rows = read_companies(file, &path.display().to_string())?;
    info!("Loaded {} companies from {}", rows.len(), path.display());
    Ok(rows)
}

// "12", "12.0" and "1,200" all occur in exported tables
fn parse_team_size(s: &str) -> Option<u32> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    cleaned
        .parse::<u32>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u32))
}

/// Tags cell as a list. Accepts JSON and single-quoted lists; anything else is empty.
pub fn parse_tags(s: &str) -> Vec<String> {
    let s = s.trim();
    if s.is_empty() || s == "[]" {
        return Vec::new();
    }
    serde_json::from_str::<Vec<String>>(s)
        .or_else(|_| serde_json::from_str::<Vec<String>>(&s.replace('\'', "\"")))
        .unwrap_or_default()
}

/// Two-digit year at the end of a batch name ("W21" → 21, "Winter 2024" → 24); 0 if none.
pub fn batch_year(batch: &str) -> u32 {
    let batch = batch.trim();
    let tail: String = batch.chars().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
    tail.parse().unwrap_or(0)
}

/// Number of tags matching any target keyword.
pub fn fit_score(tags: &[String]) -> usize {
    tags.iter()
        .filter(|tag| {
            let tag = tag.to_lowercase();
            TARGET_TAGS.iter().any(|t| tag.contains(t))
        })
        .count()
}

/// Active, staffed, recent companies with a website and at least one target tag,
/// best fit first, larger teams first among equals.
pub fn select_leads(companies: &[CompanyRow]) -> Vec<Lead> {
    let mut leads: Vec<Lead> = companies
        .par_iter()
        .filter(|c| {
            c.team_size.is_some_and(|n| n > MIN_TEAM_SIZE) && c.status == "Active" && !c.website.is_empty()
        })
        .filter_map(|c| {
            let fit_score = fit_score(&c.tags);
            let batch_year = batch_year(&c.batch);
            (fit_score > 0 && batch_year >= MIN_BATCH_YEAR).then(|| Lead {
                company: c.clone(),
                fit_score,
                batch_year,
            })
        })
        .collect();

    leads.sort_by(|a, b| {
        b.fit_score
            .cmp(&a.fit_score)
            .then(b.company.team_size.cmp(&a.company.team_size))
    });
    leads
}

pub fn priority_score(team_size: Option<u32>, probe: &SiteProbe) -> u32 {
    let has = |label: &str| probe.tech_stack.iter().any(|t| t == label);
    let mut score = 0;
    if has("Webflow") || has("Framer") {
        score += 3;
    }
    if has("Next.js") || has("React") {
        score += 2;
    }
    if probe.blog_url.is_some() {
        score += 2;
    }
    if team_size.is_some_and(|n| (10..=50).contains(&n)) {
        score += 1;
    }
    score
}

/// Highest tier the lead qualifies for, if any.
pub fn tier(fit_score: usize, probe: &SiteProbe) -> Option<Tier> {
    let has_blog = probe.blog_url.is_some();
    let no_code = probe.tech_stack.iter().any(|t| t == "Webflow" || t == "Framer");
    if no_code && has_blog {
        Some(Tier::First)
    } else if fit_score >= 2 && has_blog {
        Some(Tier::Second)
    } else if fit_score >= 2 {
        Some(Tier::Third)
    } else {
        None
    }
}

/// Mid-sized teams from the selected leads, in selection order.
pub fn sweet_spot(leads: &[Lead]) -> Vec<&Lead> {
    leads
        .iter()
        .filter(|l| l.company.team_size.is_some_and(|n| SWEET_SPOT_TEAM.contains(&n)))
        .take(SWEET_SPOT_LIMIT)
        .collect()
}

/// Earliest and latest batch year among the leads.
pub fn batch_span(leads: &[Lead]) -> Option<(u32, u32)> {
    leads.iter().map(|l| l.batch_year).minmax().into_option()
}

/// Detected platforms across validated sites, most common first.
pub fn tech_distribution(validated: &[ValidatedLead]) -> Vec<(String, usize)> {
    analysis::ranked(
        validated.iter().flat_map(|v| v.probe.tech_stack.iter().cloned()),
        usize::MAX,
    )
}

/// Probe each lead's website in turn, pausing between sites, then rank by priority.
pub async fn validate_leads<C: PageClient + ?Sized>(
    client: &C,
    leads: Vec<Lead>,
    throttle: &dyn Throttle,
) -> Vec<ValidatedLead> {
    let pb = ProgressBar::new(leads.len() as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}") {
        pb.set_style(style);
    }

    let mut validated = Vec::with_capacity(leads.len());
    for lead in leads {
        throttle.pause().await;
        pb.set_message(lead.company.company_name.clone());
        let probe = probe::probe_site(client, &lead.company.website).await;
        let priority_score = priority_score(lead.company.team_size, &probe);
        let tier = tier(lead.fit_score, &probe);
        validated.push(ValidatedLead {
            lead,
            probe,
            priority_score,
            tier,
        });
        pb.inc(1);
    }
    pb.finish_and_clear();

    // stable: equal scores keep fit order
    validated.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    validated
}

const LEAD_COLUMNS: [&str; 11] = [
    "company_name",
    "website",
    "batch",
    "team_size",
    "fit_score",
    "tech_stack",
    "blog_url",
    "customers_or_partners",
    "location",
    "priority_score",
    "priority",
];

pub fn write_leads<W: Write>(writer: W, leads: &[ValidatedLead]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(LEAD_COLUMNS)?;
    for v in leads {
        let c = &v.lead.company;
        wtr.write_record([
            c.company_name.clone(),
            c.website.clone(),
            c.batch.clone(),
            c.team_size.map(|n| n.to_string()).unwrap_or_default(),
            v.lead.fit_score.to_string(),
            serde_json::to_string(&v.probe.tech_stack)?,
            v.probe.blog_url.clone().unwrap_or_default(),
            serde_json::to_string(&v.probe.customers)?,
            c.location.clone(),
            v.priority_score.to_string(),
            v.tier.map(Tier::label).unwrap_or_default().to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_leads(path: &Path, leads: &[ValidatedLead]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_leads(file, leads).with_context(|| format!("writing {}", path.display()))
}
