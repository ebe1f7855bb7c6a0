//! "On this page" outline: level-2 sections with their level-3 children.

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Document, Element};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: u8,
    pub title: String,
    pub slug: String,
    /// Start position of the heading
    pub pos: usize,
    pub children: Vec<OutlineEntry>,
}

fn strip_regex() -> &'static Regex {
    static STRIP_REGEX: OnceLock<Regex> = OnceLock::new();
    STRIP_REGEX.get_or_init(|| Regex::new(r"[^\w\s-]").expect("Invalid slug regex"))
}

fn whitespace_regex() -> &'static Regex {
    static WHITESPACE_REGEX: OnceLock<Regex> = OnceLock::new();
    WHITESPACE_REGEX.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"))
}

/// Anchor id for a heading title.
pub fn slugify(title: &str) -> String {
    let lower = title.trim().to_lowercase();
    let stripped = strip_regex().replace_all(&lower, "");
    whitespace_regex().replace_all(&stripped, "-").into_owned()
}

fn heading_level(el: &Element) -> Option<u8> {
    if !el.is("heading") {
        return None;
    }
    el.attr("level")
        .as_int()
        .and_then(|level| u8::try_from(level).ok())
        .filter(|level| matches!(level, 2 | 3))
}

/// Level-2 and level-3 headings, grouped. An h3 with no h2 before it
/// becomes a section of its own.
pub fn outline(doc: &Document) -> Vec<OutlineEntry> {
    let mut sections: Vec<OutlineEntry> = Vec::new();
    for (pos, el) in doc.textblocks() {
        let Some(level) = heading_level(el) else {
            continue;
        };
        let title = el.text_content();
        let entry = OutlineEntry {
            level,
            slug: slugify(&title),
            title,
            pos,
            children: Vec::new(),
        };
        match sections.last_mut() {
            Some(section) if level == 3 && section.level == 2 => section.children.push(entry),
            _ => sections.push(entry),
        }
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interchange::from_html;
    use crate::schema::blog::blog_schema;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("Getting Started", "getting-started")]
    #[case("  What's new in v2?  ", "whats-new-in-v2")]
    #[case("pnpm  vs\tyarn", "pnpm-vs-yarn")]
    #[case("already-slugged", "already-slugged")]
    fn slugs(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slugify(title), expected);
    }

    fn titles(entries: &[OutlineEntry]) -> Vec<(u8, String, Vec<String>)> {
        entries
            .iter()
            .map(|e| {
                let children = e.children.iter().map(|c| c.title.clone()).collect();
                (e.level, e.title.clone(), children)
            })
            .collect()
    }

    #[test]
    fn groups_h3_under_preceding_h2() {
        let doc = from_html(
            &blog_schema(),
            "<h1>Post</h1><h3>Preface</h3><h2>Install</h2><h3>npm</h3><h3>yarn</h3><p>text</p><h2>Usage</h2><h4>Deep</h4>",
        )
        .unwrap();
        assert_eq!(
            titles(&outline(&doc)),
            vec![
                (3, "Preface".into(), vec![]),
                (2, "Install".into(), vec!["npm".into(), "yarn".into()]),
                (2, "Usage".into(), vec![]),
            ]
        );
    }

    #[test]
    fn entries_point_at_their_headings() {
        let doc = from_html(&blog_schema(), "<p>ab</p><h2>Setup</h2>").unwrap();
        let entries = outline(&doc);
        assert_eq!(entries[0].pos, 4);
        assert_eq!(entries[0].slug, "setup");
    }
}
