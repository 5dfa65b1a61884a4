use std::sync::LazyLock;

use regex::Regex;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());
static SINGLE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[([^\]]*)\]\(([^)]+)\)$").unwrap());
static INLINE_LINKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]+)\)").unwrap());
static CLOSE_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\]\(([^)]+)\)(.*)$").unwrap());
static META_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Z][A-Za-z ]{1,22}):(.*)$").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/companies/(industry|location)/").unwrap());

/// One classified line (or multi-line link) of a detail page rendered as markdown.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, text: String },
    Link { text: String, url: String },
    TagLink { tag: String, url: String },
    MetaField { key: String, value: String },
    StatusLine(String),
    Text(String),
    Empty,
}

pub const STATUS_KEYWORDS: &[&str] = &["Active", "Public", "Acquired", "Inactive"];

pub fn classify_lines(markdown: &str) -> Vec<Block> {
    if markdown.trim().is_empty() {
        return vec![Block::Empty];
    }

    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();

        if line.is_empty() {
            blocks.push(Block::Empty);
            i += 1;
            continue;
        }

        // ── Multi-line link: "[" then text lines then "](url)" ──
        if line == "[" {
            i = consume_multiline_link(&lines, i, &mut blocks);
            continue;
        }

        // ── Continuation link: ](url) possibly with trailing [ ──
        if line.starts_with("](") {
            if let Some(caps) = CLOSE_LINK_RE.captures(line) {
                emit_link("", &caps[1], &mut blocks);
                let rest = caps[2].trim();
                if rest == "[" {
                    i = consume_multiline_link(&lines, i + 1, &mut blocks);
                    continue;
                }
            }
            i += 1;
            continue;
        }

        // ── Heading: ### text ──
        if let Some(caps) = HEADING_RE.captures(line) {
            blocks.push(Block::Heading {
                level: caps[1].len() as u8,
                text: caps[2].to_string(),
            });
            i += 1;
            continue;
        }

        // ── Meta field: Key:Value, Key: (value on next line), Key:[Text](url) ──
        if let Some(caps) = META_RE.captures(line) {
            blocks.push(Block::MetaField {
                key: caps[1].trim().to_string(),
                value: link_text(caps[2].trim()),
            });
            i += 1;
            continue;
        }

        // ── Single link on the line: [text](url) ──
        if let Some(caps) = SINGLE_LINK_RE.captures(line) {
            emit_link(&caps[1], &caps[2], &mut blocks);
            i += 1;
            continue;
        }

        // ── Line with multiple inline links: [](url1)[](url2) or ending with [ ──
        if line.contains("](") && line.contains('[') {
            for caps in INLINE_LINKS_RE.captures_iter(line) {
                emit_link(&caps[1], &caps[2], &mut blocks);
            }
            if line.ends_with('[') {
                i = consume_multiline_link(&lines, i + 1, &mut blocks);
                continue;
            }
            i += 1;
            continue;
        }

        if STATUS_KEYWORDS.contains(&line) {
            blocks.push(Block::StatusLine(line.to_string()));
            i += 1;
            continue;
        }

        blocks.push(Block::Text(line.to_string()));
        i += 1;
    }

    blocks
}

/// Replace every `[text](url)` in `s` with `text`.
pub fn link_text(s: &str) -> String {
    INLINE_LINKS_RE.replace_all(s, "$1").trim().to_string()
}

/// Consume a multi-line link starting at `start` (a "[" line or the line after
/// a trailing "["). Returns the next line index to process.
fn consume_multiline_link(lines: &[&str], start: usize, blocks: &mut Vec<Block>) -> usize {
    let mut text_parts = Vec::new();
    let mut j = start;

    if j < lines.len() && lines[j].trim() == "[" {
        j += 1;
    }

    while j < lines.len() {
        let l = lines[j].trim();
        if let Some(url_part) = l.strip_prefix("](") {
            let (url, has_trailing_open) = if let Some(end) = url_part.find(')') {
                let u = &url_part[..end];
                let rest = url_part[end + 1..].trim();
                (u, rest == "[" || rest.ends_with('['))
            } else {
                (url_part.trim_end_matches(')'), false)
            };

            let text = text_parts.join(" ");
            emit_link(&text, url, blocks);

            if has_trailing_open {
                return consume_multiline_link(lines, j + 1, blocks);
            }
            return j + 1;
        }
        if !l.is_empty() && l != "*" {
            text_parts.push(l);
        }
        j += 1;
    }

    // Never closed: keep the lines as text
    for part in text_parts {
        blocks.push(Block::Text(part.to_string()));
    }
    j
}

fn emit_link(text: &str, url: &str, blocks: &mut Vec<Block>) {
    if TAG_RE.is_match(url) {
        let tag = url
            .rsplit('/')
            .next()
            .unwrap_or("")
            .replace("%20", " ")
            .replace("%2F", "/");
        let tag = if text.trim().is_empty() { tag } else { text.trim().to_string() };
        blocks.push(Block::TagLink {
            tag,
            url: url.to_string(),
        });
    } else {
        blocks.push(Block::Link {
            text: text.to_string(),
            url: url.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading() {
        let blocks = classify_lines("### Some heading text");
        assert!(matches!(&blocks[0], Block::Heading { level: 3, text } if text == "Some heading text"));
    }

    #[test]
    fn link() {
        let blocks = classify_lines("[Acme](https://acme.com)");
        assert!(matches!(&blocks[0], Block::Link { text, url } if text == "Acme" && url == "https://acme.com"));
    }

    #[test]
    fn tag_link_prefers_link_text() {
        let blocks = classify_lines("[Developer Tools](https://www.ycombinator.com/companies/industry/developer-tools)");
        assert!(matches!(&blocks[0], Block::TagLink { tag, .. } if tag == "Developer Tools"));
    }

    #[test]
    fn tag_link_without_text_uses_url_segment() {
        let blocks = classify_lines("[](https://www.ycombinator.com/companies/industry/Fintech)");
        assert!(matches!(&blocks[0], Block::TagLink { tag, .. } if tag == "Fintech"));
    }

    #[test]
    fn meta_field() {
        let blocks = classify_lines("Founded:2009");
        assert!(matches!(&blocks[0], Block::MetaField { key, value } if key == "Founded" && value == "2009"));
    }

    #[test]
    fn meta_field_empty_value() {
        let blocks = classify_lines("Status:");
        assert!(matches!(&blocks[0], Block::MetaField { key, value } if key == "Status" && value.is_empty()));
    }

    #[test]
    fn meta_field_with_link_value() {
        let blocks = classify_lines("Primary Partner:[Jane Doe](https://www.ycombinator.com/people/jane-doe)");
        assert_eq!(
            blocks[0],
            Block::MetaField {
                key: "Primary Partner".into(),
                value: "Jane Doe".into()
            }
        );
    }

    #[test]
    fn status_line() {
        for kw in STATUS_KEYWORDS {
            let blocks = classify_lines(kw);
            assert!(matches!(&blocks[0], Block::StatusLine(s) if s == kw));
        }
    }

    #[test]
    fn empty_string() {
        let blocks = classify_lines("");
        assert_eq!(blocks, vec![Block::Empty]);
    }

    #[test]
    fn empty_line() {
        let blocks = classify_lines("text\n\nmore");
        assert!(matches!(&blocks[1], Block::Empty));
    }

    #[test]
    fn multiline_link() {
        let md = "[\nSummer 2009\n](https://example.com?batch=Summer%202009)";
        let blocks = classify_lines(md);
        let links: Vec<_> = blocks.iter().filter(|b| matches!(b, Block::Link { .. })).collect();
        assert_eq!(links.len(), 1);
        if let Block::Link { text, .. } = &links[0] {
            assert_eq!(text, "Summer 2009");
        }
    }

    #[test]
    fn chained_multiline_links() {
        let md = "[\nOne\n](https://one.example)[\nTwo\n](https://two.example)";
        let blocks = classify_lines(md);
        let texts: Vec<_> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Link { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["One", "Two"]);
    }

    #[test]
    fn unclosed_multiline_link_is_text() {
        let blocks = classify_lines("[\ndangling");
        assert!(matches!(blocks.last(), Some(Block::Text(t)) if t == "dangling"));
    }

    #[test]
    fn inline_social_links() {
        let blocks = classify_lines("[](https://twitter.com/acme)[](https://github.com/acme)");
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| matches!(b, Block::Link { text, .. } if text.is_empty())));
    }
}
