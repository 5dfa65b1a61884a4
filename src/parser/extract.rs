//! Field extractors over clustered sections.
//!
//! Each extractor is independent and reports `None` (or an empty list) when the
//! layout element it looks for is missing, so a layout change in one part of
//! the page only costs the fields that live there.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::blocks::{Block, STATUS_KEYWORDS};
use super::sections::{find_section, Section, SectionKind};

static BATCH_QUERY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&]batch=([^&)#]+)").unwrap());

/// Label/value rows recognized in the detail block.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MetaFields {
    pub founded: Option<String>,
    pub batch: Option<String>,
    pub team_size: Option<String>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub primary_partner: Option<String>,
}

pub fn meta_fields(sections: &[Section]) -> MetaFields {
    MetaFields {
        founded: get_meta(sections, "Founded"),
        batch: get_meta(sections, "Batch"),
        team_size: get_meta(sections, "Team Size"),
        status: get_meta(sections, "Status"),
        location: get_meta(sections, "Location"),
        primary_partner: get_meta(sections, "Primary Partner"),
    }
}

/// Company name: first plain header line that is not the page title or breadcrumb.
pub fn name(sections: &[Section]) -> Option<String> {
    header_blocks(sections).find_map(|b| match b {
        Block::Text(t) if !t.contains("| Y Combinator") && !t.contains('›') => Some(t.clone()),
        _ => None,
    })
}

/// Batch from the header's `?batch=` link, falling back to the `Batch:` row.
pub fn batch(sections: &[Section], meta: &MetaFields) -> Option<String> {
    header_blocks(sections)
        .find_map(|b| match b {
            Block::Link { url, .. } => BATCH_QUERY_RE
                .captures(url)
                .map(|c| c[1].replace("%20", " ").replace('+', " ")),
            _ => None,
        })
        .or_else(|| meta.batch.clone())
}

/// Status from the `Status:` row, falling back to a bare status pill anywhere.
pub fn status(sections: &[Section], meta: &MetaFields) -> Option<String> {
    meta.status.clone().or_else(|| {
        sections
            .iter()
            .flat_map(|s| &s.blocks)
            .find_map(|b| match b {
                Block::StatusLine(s) => Some(s.clone()),
                _ => None,
            })
    })
}

/// First external link in the header.
pub fn website(sections: &[Section]) -> Option<String> {
    header_blocks(sections).find_map(|b| match b {
        Block::Link { url, .. } if url.starts_with("http") && !url.contains("ycombinator.com") => {
            Some(url.clone())
        }
        _ => None,
    })
}

/// Industry tags in page order. Batch links, status pills and location links are not tags.
pub fn tags(sections: &[Section]) -> Vec<String> {
    let mut seen = HashSet::new();
    sections
        .iter()
        .flat_map(|s| &s.blocks)
        .filter_map(|b| match b {
            Block::TagLink { tag, url } if url.contains("/companies/industry/") => Some(tag.trim()),
            _ => None,
        })
        .filter(|tag| !tag.is_empty() && !STATUS_KEYWORDS.contains(tag))
        .filter(|tag| seen.insert(tag.to_string()))
        .map(str::to_string)
        .collect()
}

/// Text of the description block.
pub fn description(sections: &[Section]) -> Option<String> {
    let section = find_section(sections, SectionKind::Description)?;
    let text = section
        .blocks
        .iter()
        .filter_map(|b| match b {
            Block::Heading { text, .. } => Some(text.as_str()),
            Block::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn header_blocks(sections: &[Section]) -> impl Iterator<Item = &Block> {
    sections
        .iter()
        .filter(|s| s.kind == SectionKind::Header)
        .flat_map(|s| &s.blocks)
}

/// Footer rows win over stray rows elsewhere on the page.
fn get_meta(sections: &[Section], key: &str) -> Option<String> {
    let footer = sections.iter().filter(|s| s.kind == SectionKind::FooterMeta);
    let rest = sections.iter().filter(|s| s.kind != SectionKind::FooterMeta);
    footer.chain(rest).find_map(|s| meta_in(&s.blocks, key))
}

fn meta_in(blocks: &[Block], key: &str) -> Option<String> {
    blocks.iter().enumerate().find_map(|(i, b)| match b {
        Block::MetaField { key: k, value } if k == key => {
            if value.is_empty() {
                value_on_next_line(&blocks[i + 1..])
            } else {
                Some(value.clone())
            }
        }
        _ => None,
    })
}

fn value_on_next_line(rest: &[Block]) -> Option<String> {
    match rest.iter().find(|b| !matches!(b, Block::Empty))? {
        Block::StatusLine(s) => Some(s.clone()),
        Block::Link { text, .. } if !text.is_empty() => Some(text.clone()),
        Block::Text(t) => Some(t.clone()),
        _ => None,
    }
}
