pub mod blocks;
pub mod extract;
pub mod sections;

use crate::record::DetailRecord;

/// Three-pass pipeline: markdown → blocks → sections → detail fields.
pub fn parse_detail(identifier: &str, markdown: &str) -> DetailRecord {
    let blocks = blocks::classify_lines(markdown);
    let sections = sections::cluster_sections(&blocks);
    let meta = extract::meta_fields(&sections);

    DetailRecord {
        identifier: identifier.to_string(),
        name: extract::name(&sections),
        batch: extract::batch(&sections, &meta),
        status: extract::status(&sections, &meta),
        website: extract::website(&sections),
        tags: extract::tags(&sections),
        description: extract::description(&sections),
        founded_year: meta.founded,
        team_size: meta.team_size,
        location: meta.location,
        primary_partner: meta.primary_partner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.md", name)).unwrap()
    }

    #[test]
    fn full_page() {
        let r = parse_detail("acme", &fixture("acme"));
        assert_eq!(r.identifier, "acme");
        assert_eq!(r.name.as_deref(), Some("Acme"));
        assert_eq!(r.founded_year.as_deref(), Some("2023"));
        assert_eq!(r.batch.as_deref(), Some("Winter 2024"));
        assert_eq!(r.team_size.as_deref(), Some("12"));
        assert_eq!(r.status.as_deref(), Some("Active"));
        assert_eq!(r.location.as_deref(), Some("San Francisco"));
        assert_eq!(r.primary_partner.as_deref(), Some("Jane Partner"));
        assert_eq!(r.website.as_deref(), Some("https://acme.com"));
        assert_eq!(r.tags, vec!["B2B", "Developer Tools"]);
        let desc = r.description.unwrap();
        assert!(desc.starts_with("Acme builds launch tooling"));
        assert!(!desc.contains("Latest News"));
    }

    #[test]
    fn sparse_page_leaves_fields_absent() {
        let r = parse_detail("quiet", &fixture("sparse"));
        assert_eq!(r.name.as_deref(), Some("Quiet Labs"));
        assert_eq!(r.team_size, None);
        assert_eq!(r.primary_partner, None);
        assert_eq!(r.website, None);
        assert_eq!(r.description, None);
        assert!(r.tags.is_empty());
        assert_eq!(r.status.as_deref(), Some("Inactive"));
    }

    #[test]
    fn empty_markdown_is_all_absent() {
        assert_eq!(parse_detail("x", ""), DetailRecord::empty("x"));
    }
}
