//! Element tree built from the token stream.
//!
//! The builder is forgiving in the way browsers are: unknown end tags are
//! ignored, an end tag closes any elements left open inside it, and whatever is
//! still open at the end of input is closed implicitly. Entity references in
//! text and attribute values are decoded here so consumers only ever see plain
//! strings.

use std::sync::OnceLock;

use regex::Regex;

use crate::lexer::{TokenKind, lex};

/// Elements that never have children or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A node of the parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNode {
    Element(HtmlElement),
    /// Decoded character data
    Text(String),
}

/// An element with its attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlElement {
    /// Lowercased tag name
    pub tag: String,
    /// Lowercased attribute names with decoded values
    pub attrs: Vec<(String, String)>,
    pub children: Vec<HtmlNode>,
}

impl HtmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(key, _)| key == name)
    }

    /// Whitespace-separated entries of the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Concatenated text of all descendants, whitespace untouched.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

impl HtmlNode {
    pub fn as_element(&self) -> Option<&HtmlElement> {
        match self {
            HtmlNode::Element(el) => Some(el),
            HtmlNode::Text(_) => None,
        }
    }
}

fn collect_text(nodes: &[HtmlNode], out: &mut String) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => out.push_str(text),
            HtmlNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

fn attribute_regex() -> &'static Regex {
    static ATTR_REGEX: OnceLock<Regex> = OnceLock::new();
    ATTR_REGEX.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("Invalid attribute regex")
    })
}

/// Split a start tag token into its lowercased name, attributes and
/// self-closing flag.
fn parse_start_tag(raw: &str) -> (String, Vec<(String, String)>, bool) {
    let self_closing = raw.ends_with("/>");
    let inner = raw
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');

    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let attrs = attribute_regex()
        .captures_iter(&inner[name_end..])
        .map(|caps| {
            let key = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| html_escape::decode_html_entities(m.as_str()).into_owned())
                .unwrap_or_default();
            (key, value)
        })
        .collect();

    (name, attrs, self_closing)
}

fn end_tag_name(raw: &str) -> String {
    raw.trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

fn push_text(children: &mut Vec<HtmlNode>, text: &str) {
    let decoded = html_escape::decode_html_entities(text);
    if let Some(HtmlNode::Text(existing)) = children.last_mut() {
        existing.push_str(&decoded);
    } else {
        children.push(HtmlNode::Text(decoded.into_owned()));
    }
}

/// Parse an HTML fragment into a list of top-level nodes.
pub fn parse_fragment(input: &str) -> Vec<HtmlNode> {
    let mut roots: Vec<HtmlNode> = Vec::new();
    let mut open: Vec<HtmlElement> = Vec::new();

    for token in lex(input) {
        match token.kind {
            TokenKind::Text => push_text(current_children(&mut open, &mut roots), token.text),
            TokenKind::Declaration => {}
            TokenKind::StartTag => {
                let (tag, attrs, self_closing) = parse_start_tag(token.text);
                let element = HtmlElement {
                    tag,
                    attrs,
                    children: Vec::new(),
                };
                if self_closing || VOID_ELEMENTS.contains(&element.tag.as_str()) {
                    current_children(&mut open, &mut roots).push(HtmlNode::Element(element));
                } else {
                    open.push(element);
                }
            }
            TokenKind::EndTag => {
                let name = end_tag_name(token.text);
                let Some(open_index) = open.iter().rposition(|el| el.tag == name) else {
                    continue;
                };
                while open.len() > open_index {
                    close_innermost(&mut open, &mut roots);
                }
            }
        }
    }

    while !open.is_empty() {
        close_innermost(&mut open, &mut roots);
    }

    roots
}

fn current_children<'a>(
    open: &'a mut [HtmlElement],
    roots: &'a mut Vec<HtmlNode>,
) -> &'a mut Vec<HtmlNode> {
    match open.last_mut() {
        Some(el) => &mut el.children,
        None => roots,
    }
}

fn close_innermost(open: &mut Vec<HtmlElement>, roots: &mut Vec<HtmlNode>) {
    if let Some(done) = open.pop() {
        current_children(open, roots).push(HtmlNode::Element(done));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn el(tag: &str, attrs: &[(&str, &str)], children: Vec<HtmlNode>) -> HtmlNode {
        HtmlNode::Element(HtmlElement {
            tag: tag.to_string(),
            attrs: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        })
    }

    fn text(t: &str) -> HtmlNode {
        HtmlNode::Text(t.to_string())
    }

    #[test]
    fn parses_nested_elements() {
        assert_eq!(
            parse_fragment("<h1>Hello</h1><p>A <strong>bold</strong> move</p>"),
            vec![
                el("h1", &[], vec![text("Hello")]),
                el(
                    "p",
                    &[],
                    vec![
                        text("A "),
                        el("strong", &[], vec![text("bold")]),
                        text(" move")
                    ]
                ),
            ]
        );
    }

    #[test]
    fn decodes_entities_in_text_and_attributes() {
        let nodes = parse_fragment(r#"<a href="/q?a=1&amp;b=2">x &lt; y</a>"#);
        let link = nodes[0].as_element().unwrap();
        assert_eq!(link.attr("href"), Some("/q?a=1&b=2"));
        assert_eq!(link.text_content(), "x < y");
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        assert_eq!(
            parse_fragment("<p>a<br>b</p><hr/>"),
            vec![
                el("p", &[], vec![text("a"), el("br", &[], vec![]), text("b")]),
                el("hr", &[], vec![]),
            ]
        );
    }

    #[test]
    fn valueless_attribute_is_empty_string() {
        let nodes = parse_fragment(r#"<span data-badge>v1</span>"#);
        let span = nodes[0].as_element().unwrap();
        assert!(span.has_attr("data-badge"));
        assert_eq!(span.attr("data-badge"), Some(""));
    }

    #[test]
    fn end_tag_closes_unclosed_children() {
        assert_eq!(
            parse_fragment("<ul><li>one</ul>"),
            vec![el("ul", &[], vec![el("li", &[], vec![text("one")])])]
        );
    }

    #[test]
    fn stray_end_tag_is_ignored() {
        assert_eq!(parse_fragment("a</p>b"), vec![text("ab")]);
    }

    #[test]
    fn preserves_newlines_in_code() {
        let nodes = parse_fragment("<pre><code>line 1\n  line 2\n</code></pre>");
        let pre = nodes[0].as_element().unwrap();
        assert_eq!(pre.text_content(), "line 1\n  line 2\n");
    }

    #[test]
    fn tag_and_attribute_names_are_lowercased() {
        let nodes = parse_fragment(r#"<DIV Data-Type="terminal-block"></DIV>"#);
        let div = nodes[0].as_element().unwrap();
        assert_eq!(div.tag, "div");
        assert_eq!(div.attr("data-type"), Some("terminal-block"));
    }

    #[test]
    fn classes_are_split() {
        let nodes = parse_fragment(r#"<span class="tok  tok-keyword">const</span>"#);
        let span = nodes[0].as_element().unwrap();
        assert_eq!(span.classes().collect::<Vec<_>>(), vec!["tok", "tok-keyword"]);
    }
}
