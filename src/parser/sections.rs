use std::sync::LazyLock;

use regex::Regex;

use super::blocks::Block;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-z]{2} \d{2}, \d{4}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Header,
    Description,
    FooterMeta,
    Founders,
    News,
    Jobs,
    Launches,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub kind: SectionKind,
    pub blocks: Vec<Block>,
}

/// Cluster a flat block list into named sections by structural transitions.
pub fn cluster_sections(blocks: &[Block]) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut current_blocks: Vec<Block> = Vec::new();
    let mut current_kind = SectionKind::Header;

    for (i, block) in blocks.iter().enumerate() {
        if let Some(new_kind) = detect_transition(block, blocks, i, current_kind) {
            if !current_blocks.is_empty() {
                sections.push(Section {
                    kind: current_kind,
                    blocks: std::mem::take(&mut current_blocks),
                });
            }
            current_kind = new_kind;
        }
        current_blocks.push(block.clone());
    }

    if !current_blocks.is_empty() {
        sections.push(Section {
            kind: current_kind,
            blocks: current_blocks,
        });
    }

    sections
}

pub fn find_section(sections: &[Section], kind: SectionKind) -> Option<&Section> {
    sections.iter().find(|s| s.kind == kind)
}

fn detect_transition(
    block: &Block,
    all: &[Block],
    idx: usize,
    current: SectionKind,
) -> Option<SectionKind> {
    use SectionKind::*;

    match block {
        // ### heading opens the long-form description
        Block::Heading { level: 3, .. } if current == Header => Some(Description),

        // 3+ meta rows close together (gaps of Empty/StatusLine/bare Link allowed)
        Block::MetaField { .. } if current != FooterMeta => {
            if count_meta_cluster(all, idx) >= 3 {
                Some(FooterMeta)
            } else {
                None
            }
        }

        Block::Text(t)
            if matches!(
                t.as_str(),
                "Founders" | "Active Founders" | "Former Founders" | "Inactive Founders"
            ) && current != Founders =>
        {
            Some(Founders)
        }

        // External link followed by a date → news item
        Block::Link { url, text }
            if !text.is_empty()
                && !url.contains("ycombinator.com")
                && current != News
                && current != Jobs =>
        {
            let has_date = all[idx + 1..]
                .iter()
                .find(|b| !matches!(b, Block::Empty))
                .map(|b| matches!(b, Block::Text(t) if DATE_RE.is_match(t.trim())))
                .unwrap_or(false);
            if has_date {
                Some(News)
            } else {
                None
            }
        }

        Block::Link { url, text } if url.contains("/jobs/") && !text.is_empty() && current != Jobs => {
            Some(Jobs)
        }

        Block::Text(t) if t.contains("Latest News") && current != News => Some(News),
        Block::Text(t) if t.starts_with("Jobs at ") && current != Jobs => Some(Jobs),
        Block::Text(t) if t.contains("Company Launches") && current != Launches => Some(Launches),

        _ => None,
    }
}

/// Count meta rows from `start`, allowing Empty, StatusLine, and bare Link gaps.
fn count_meta_cluster(blocks: &[Block], start: usize) -> usize {
    let mut meta_count = 0;
    for b in &blocks[start..] {
        match b {
            Block::MetaField { .. } => meta_count += 1,
            Block::StatusLine(_) | Block::Empty => {}
            Block::Link { text, .. } if text.is_empty() => {}
            _ => break,
        }
    }
    meta_count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::blocks::classify_lines;

    fn section_kinds(md: &str) -> Vec<SectionKind> {
        let blocks = classify_lines(md);
        cluster_sections(&blocks).iter().map(|s| s.kind).collect()
    }

    #[test]
    fn fixture_sections() {
        let md = std::fs::read_to_string("tests/fixtures/acme.md").unwrap();
        let kinds = section_kinds(&md);
        assert_eq!(kinds.first(), Some(&SectionKind::Header));
        assert!(kinds.contains(&SectionKind::Description));
        assert!(kinds.contains(&SectionKind::FooterMeta));
        assert!(kinds.contains(&SectionKind::Founders));
        assert!(kinds.contains(&SectionKind::News));
    }

    #[test]
    fn two_meta_rows_are_not_a_footer() {
        let kinds = section_kinds("Acme\nFounded:2020\nLocation:Berlin\nSomething else");
        assert_eq!(kinds, vec![SectionKind::Header]);
    }

    #[test]
    fn meta_cluster_tolerates_status_and_social_gaps() {
        let md = "Founded:2020\nStatus:\nActive\n[](https://x.com/acme)\nTeam Size:4";
        let kinds = section_kinds(md);
        assert_eq!(kinds, vec![SectionKind::FooterMeta]);
    }

    #[test]
    fn unknown_content_not_lost() {
        let blocks = classify_lines("Random paragraph\nthat matches nothing");
        let sections = cluster_sections(&blocks);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].blocks.len(), 2);
    }
}
