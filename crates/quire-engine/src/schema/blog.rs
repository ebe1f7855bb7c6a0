//! The built-in blog post schema.

use std::sync::OnceLock;

use quire_syntax::HtmlElement;
use regex::Regex;

use super::{
    AttrDefault, AttrSpec, DomSpec, Excludes, MarkAllowance, MarkTypeDef, NodeTypeDef, ParseRule,
    Schema, SchemaBuilder,
};
use crate::model::{AttrValue, Attrs, attrs};

pub const TEXT_ALIGNMENTS: &[&str] = &["left", "center", "right", "justify"];
pub const PACKAGE_MANAGERS: &[&str] = &["npm", "pnpm", "yarn"];
pub const DEFAULT_FILENAME: &str = "app/example.tsx";
pub const DEFAULT_LANGUAGE: &str = "tsx";
pub const LINK_REL: &str = "noopener noreferrer nofollow";

fn any(_: &HtmlElement) -> bool {
    true
}

fn no_attrs(_: &HtmlElement) -> Attrs {
    Attrs::new()
}

fn any_values(_: &Attrs) -> bool {
    true
}

fn nothing(_: &Attrs) -> DomSpec {
    DomSpec::Hole
}

const fn rule(tag: &'static str) -> ParseRule {
    ParseRule {
        tag,
        matches: any,
        attrs: no_attrs,
    }
}

fn text_align_regex() -> &'static Regex {
    static TEXT_ALIGN_REGEX: OnceLock<Regex> = OnceLock::new();
    TEXT_ALIGN_REGEX.get_or_init(|| {
        Regex::new(r"text-align:\s*(left|center|right|justify)").expect("Invalid text-align regex")
    })
}

fn text_align_attrs(el: &HtmlElement) -> Attrs {
    el.attr("style")
        .and_then(|style| text_align_regex().captures(style))
        .map(|caps| attrs([("textAlign", caps[1].into())]))
        .unwrap_or_default()
}

fn with_text_align(spec: DomSpec, attrs: &Attrs) -> DomSpec {
    match attrs.get("textAlign").and_then(AttrValue::as_str) {
        Some(align) if align != "left" => spec.attr("style", format!("text-align: {align}")),
        _ => spec,
    }
}

const TEXT_ALIGN: AttrSpec = AttrSpec {
    name: "textAlign",
    default: AttrDefault::Str("left"),
};

/// Base for blocks; derive other types from it with struct update syntax.
pub const BLOCK: NodeTypeDef = NodeTypeDef {
    name: "block",
    groups: &["block"],
    content: "inline*",
    marks: MarkAllowance::All,
    attrs: &[],
    inline: false,
    code: false,
    valid_attrs: any_values,
    parse: &[],
    render: nothing,
};

pub const DOC: NodeTypeDef = NodeTypeDef {
    name: "doc",
    groups: &[],
    content: "block+",
    ..BLOCK
};

pub const PARAGRAPH: NodeTypeDef = NodeTypeDef {
    name: "paragraph",
    attrs: &[TEXT_ALIGN],
    parse: &[ParseRule {
        attrs: text_align_attrs,
        ..rule("p")
    }],
    render: |attrs| with_text_align(DomSpec::wrap("p"), attrs),
    ..BLOCK
};

fn heading_attrs(el: &HtmlElement) -> Attrs {
    let level: i64 = el.tag[1..].parse().unwrap_or(1);
    let mut out = text_align_attrs(el);
    out.insert("level".into(), AttrValue::Int(level));
    out
}

pub const HEADING: NodeTypeDef = NodeTypeDef {
    name: "heading",
    attrs: &[
        AttrSpec {
            name: "level",
            default: AttrDefault::Int(1),
        },
        TEXT_ALIGN,
    ],
    parse: &[
        ParseRule {
            attrs: heading_attrs,
            ..rule("h1")
        },
        ParseRule {
            attrs: heading_attrs,
            ..rule("h2")
        },
        ParseRule {
            attrs: heading_attrs,
            ..rule("h3")
        },
    ],
    valid_attrs: |attrs| matches!(attrs.get("level"), Some(AttrValue::Int(1..=3))),
    render: |attrs| {
        let level = attrs.get("level").and_then(AttrValue::as_int).unwrap_or(1);
        with_text_align(DomSpec::wrap(&format!("h{level}")), attrs)
    },
    ..BLOCK
};

pub const CAPTION: NodeTypeDef = NodeTypeDef {
    name: "caption",
    attrs: &[TEXT_ALIGN],
    parse: &[ParseRule {
        attrs: text_align_attrs,
        ..rule("figcaption")
    }],
    render: |attrs| with_text_align(DomSpec::wrap("figcaption"), attrs),
    ..BLOCK
};

pub const BLOCKQUOTE: NodeTypeDef = NodeTypeDef {
    name: "blockquote",
    content: "block+",
    parse: &[rule("blockquote")],
    render: |_| DomSpec::wrap("blockquote"),
    ..BLOCK
};

pub const BULLET_LIST: NodeTypeDef = NodeTypeDef {
    name: "bulletList",
    content: "listItem+",
    parse: &[rule("ul")],
    render: |_| DomSpec::wrap("ul"),
    ..BLOCK
};

fn ordered_list_attrs(el: &HtmlElement) -> Attrs {
    el.attr("start")
        .and_then(|s| s.trim().parse::<i64>().ok())
        .map(|start| attrs([("start", start.into())]))
        .unwrap_or_default()
}

pub const ORDERED_LIST: NodeTypeDef = NodeTypeDef {
    name: "orderedList",
    content: "listItem+",
    attrs: &[AttrSpec {
        name: "start",
        default: AttrDefault::Int(1),
    }],
    parse: &[ParseRule {
        attrs: ordered_list_attrs,
        ..rule("ol")
    }],
    render: |attrs| match attrs.get("start").and_then(AttrValue::as_int) {
        Some(start) if start != 1 => DomSpec::wrap("ol").attr("start", start.to_string()),
        _ => DomSpec::wrap("ol"),
    },
    ..BLOCK
};

pub const LIST_ITEM: NodeTypeDef = NodeTypeDef {
    name: "listItem",
    groups: &[],
    content: "paragraph block*",
    parse: &[rule("li")],
    render: |_| DomSpec::wrap("li"),
    ..BLOCK
};

pub const HORIZONTAL_RULE: NodeTypeDef = NodeTypeDef {
    name: "horizontalRule",
    content: "",
    parse: &[rule("hr")],
    render: |_| DomSpec::element("hr"),
    ..BLOCK
};

pub const HARD_BREAK: NodeTypeDef = NodeTypeDef {
    name: "hardBreak",
    groups: &["inline"],
    content: "",
    inline: true,
    parse: &[rule("br")],
    render: |_| DomSpec::element("br"),
    ..BLOCK
};

pub const TEXT: NodeTypeDef = NodeTypeDef {
    name: "text",
    groups: &["inline"],
    content: "",
    inline: true,
    ..BLOCK
};

pub const TABLE: NodeTypeDef = NodeTypeDef {
    name: "table",
    content: "tableRow+",
    parse: &[rule("table")],
    render: |_| DomSpec::element("table").child(DomSpec::wrap("tbody")),
    ..BLOCK
};

pub const TABLE_ROW: NodeTypeDef = NodeTypeDef {
    name: "tableRow",
    groups: &[],
    content: "(tableCell | tableHeader)*",
    parse: &[rule("tr")],
    render: |_| DomSpec::wrap("tr"),
    ..BLOCK
};

const CELL_ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "colspan",
        default: AttrDefault::Int(1),
    },
    AttrSpec {
        name: "rowspan",
        default: AttrDefault::Int(1),
    },
];

fn cell_attrs(el: &HtmlElement) -> Attrs {
    ["colspan", "rowspan"]
        .into_iter()
        .filter_map(|name| {
            let span = el.attr(name)?.trim().parse::<i64>().ok()?;
            Some((name.to_string(), AttrValue::Int(span)))
        })
        .collect()
}

fn render_cell(tag: &str, attrs: &Attrs) -> DomSpec {
    let mut spec = DomSpec::wrap(tag);
    for name in ["colspan", "rowspan"] {
        if let Some(span) = attrs.get(name).and_then(AttrValue::as_int)
            && span != 1
        {
            spec = spec.attr(name, span.to_string());
        }
    }
    spec
}

pub const TABLE_CELL: NodeTypeDef = NodeTypeDef {
    name: "tableCell",
    groups: &[],
    content: "block+",
    attrs: CELL_ATTRS,
    parse: &[ParseRule {
        attrs: cell_attrs,
        ..rule("td")
    }],
    render: |attrs| render_cell("td", attrs),
    ..BLOCK
};

pub const TABLE_HEADER: NodeTypeDef = NodeTypeDef {
    name: "tableHeader",
    parse: &[ParseRule {
        attrs: cell_attrs,
        ..rule("th")
    }],
    render: |attrs| render_cell("th", attrs),
    ..TABLE_CELL
};

fn is_file_code_block(el: &HtmlElement) -> bool {
    el.attr("data-type") == Some("file-code-block")
}

fn is_plain_pre(el: &HtmlElement) -> bool {
    !el.has_attr("data-type")
}

fn code_language(el: &HtmlElement) -> Option<String> {
    let code = el
        .children
        .iter()
        .filter_map(|c| c.as_element())
        .find(|c| c.tag == "code")?;
    code.classes()
        .find_map(|class| class.strip_prefix("language-"))
        .map(str::to_string)
}

fn file_code_block_attrs(el: &HtmlElement) -> Attrs {
    let mut out = Attrs::new();
    if let Some(filename) = el.attr("data-filename") {
        out.insert("filename".into(), filename.into());
    }
    if let Some(language) = el.attr("data-language").map(str::to_string).or_else(|| code_language(el)) {
        out.insert("language".into(), language.into());
    }
    if let Some(line) = el
        .attr("data-highlighted-line")
        .and_then(|l| l.trim().parse::<i64>().ok())
    {
        out.insert("highlightedLine".into(), line.into());
    }
    out
}

fn render_file_code_block(attrs: &Attrs) -> DomSpec {
    let text = |name: &str| {
        attrs
            .get(name)
            .and_then(AttrValue::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let language = text("language");
    let mut pre = DomSpec::element("pre")
        .attr("data-type", "file-code-block")
        .attr("data-filename", text("filename"))
        .attr("data-language", language.clone());
    if let Some(line) = attrs.get("highlightedLine").and_then(AttrValue::as_int) {
        pre = pre.attr("data-highlighted-line", line.to_string());
    }
    pre.child(DomSpec::wrap("code").attr("class", format!("language-{language}")))
}

pub const FILE_CODE_BLOCK: NodeTypeDef = NodeTypeDef {
    name: "fileCodeBlock",
    content: "text*",
    marks: MarkAllowance::None,
    code: true,
    attrs: &[
        AttrSpec {
            name: "filename",
            default: AttrDefault::Str(DEFAULT_FILENAME),
        },
        AttrSpec {
            name: "language",
            default: AttrDefault::Str(DEFAULT_LANGUAGE),
        },
        AttrSpec {
            name: "highlightedLine",
            default: AttrDefault::Null,
        },
    ],
    parse: &[
        ParseRule {
            matches: is_file_code_block,
            attrs: file_code_block_attrs,
            ..rule("pre")
        },
        ParseRule {
            matches: is_plain_pre,
            attrs: file_code_block_attrs,
            ..rule("pre")
        },
    ],
    render: render_file_code_block,
    ..BLOCK
};

/// Attribute holding the cached text of a package manager's variant.
pub fn content_slot(manager: &str) -> String {
    format!("{manager}Content")
}

fn is_terminal_block(el: &HtmlElement) -> bool {
    el.attr("data-type") == Some("terminal-block")
}

fn terminal_block_attrs(el: &HtmlElement) -> Attrs {
    let mut out = Attrs::new();
    if let Some(manager) = el.attr("data-package-manager") {
        out.insert("packageManager".into(), manager.into());
    }
    for manager in PACKAGE_MANAGERS {
        if let Some(cached) = el.attr(&format!("data-{manager}-content")) {
            out.insert(content_slot(manager), cached.into());
        }
    }
    out
}

fn render_terminal_block(attrs: &Attrs) -> DomSpec {
    let manager = attrs
        .get("packageManager")
        .and_then(AttrValue::as_str)
        .unwrap_or("npm");
    let mut div = DomSpec::element("div")
        .attr("data-type", "terminal-block")
        .attr("data-package-manager", manager);
    for manager in PACKAGE_MANAGERS {
        if let Some(cached) = attrs.get(&content_slot(manager)).and_then(AttrValue::as_str)
            && !cached.is_empty()
        {
            div = div.attr(&format!("data-{manager}-content"), cached);
        }
    }
    div.child(DomSpec::Hole)
}

pub const TERMINAL_BLOCK: NodeTypeDef = NodeTypeDef {
    name: "terminalBlock",
    content: "text*",
    marks: MarkAllowance::None,
    code: true,
    attrs: &[
        AttrSpec {
            name: "packageManager",
            default: AttrDefault::Str("npm"),
        },
        AttrSpec {
            name: "npmContent",
            default: AttrDefault::Str(""),
        },
        AttrSpec {
            name: "pnpmContent",
            default: AttrDefault::Str(""),
        },
        AttrSpec {
            name: "yarnContent",
            default: AttrDefault::Str(""),
        },
    ],
    parse: &[ParseRule {
        matches: is_terminal_block,
        attrs: terminal_block_attrs,
        ..rule("div")
    }],
    render: render_terminal_block,
    ..BLOCK
};

/// A missing `target` is the `_blank` default, an empty one is no target.
fn link_attrs(el: &HtmlElement) -> Attrs {
    let mut out = Attrs::new();
    if let Some(href) = el.attr("href") {
        out.insert("href".into(), href.into());
    }
    match el.attr("target") {
        Some("") => {
            out.insert("target".into(), AttrValue::Null);
        }
        Some(target) => {
            out.insert("target".into(), target.into());
        }
        None => {}
    }
    out
}

/// Links carry `rel`; anchors without it are plain text.
fn is_link(el: &HtmlElement) -> bool {
    el.has_attr("href") || el.has_attr("rel")
}

pub const LINK: MarkTypeDef = MarkTypeDef {
    name: "link",
    attrs: &[
        AttrSpec {
            name: "href",
            default: AttrDefault::Null,
        },
        AttrSpec {
            name: "target",
            default: AttrDefault::Str("_blank"),
        },
    ],
    excludes: Excludes::Nothing,
    inclusive: false,
    parse: &[ParseRule {
        matches: is_link,
        attrs: link_attrs,
        ..rule("a")
    }],
    render: |attrs| {
        let mut a = DomSpec::wrap("a");
        if let Some(href) = attrs.get("href").and_then(AttrValue::as_str) {
            a = a.attr("href", href);
        }
        let target = attrs.get("target").and_then(AttrValue::as_str).unwrap_or("");
        a = a.attr("target", target);
        a.attr("rel", LINK_REL)
    },
};

pub const BOLD: MarkTypeDef = MarkTypeDef {
    name: "bold",
    attrs: &[],
    excludes: Excludes::Nothing,
    inclusive: true,
    parse: &[rule("strong"), rule("b")],
    render: |_| DomSpec::wrap("strong"),
};

pub const ITALIC: MarkTypeDef = MarkTypeDef {
    name: "italic",
    parse: &[rule("em"), rule("i")],
    render: |_| DomSpec::wrap("em"),
    ..BOLD
};

fn is_badge(el: &HtmlElement) -> bool {
    el.has_attr("data-badge")
}

pub const BADGE: MarkTypeDef = MarkTypeDef {
    name: "badge",
    excludes: Excludes::Only(&["code"]),
    parse: &[ParseRule {
        matches: is_badge,
        ..rule("span")
    }],
    render: |_| DomSpec::wrap("span").attr("data-badge", ""),
    ..BOLD
};

pub const CODE: MarkTypeDef = MarkTypeDef {
    name: "code",
    excludes: Excludes::All,
    parse: &[rule("code")],
    render: |_| DomSpec::wrap("code"),
    ..BOLD
};

/// Build the blog schema. Node order matters: `doc` is the root and
/// `paragraph` is the default block used to fill empty containers.
pub fn blog_schema() -> Schema {
    SchemaBuilder::new()
        .node(DOC)
        .node(PARAGRAPH)
        .node(HEADING)
        .node(BLOCKQUOTE)
        .node(BULLET_LIST)
        .node(ORDERED_LIST)
        .node(LIST_ITEM)
        .node(HORIZONTAL_RULE)
        .node(CAPTION)
        .node(TABLE)
        .node(TABLE_ROW)
        .node(TABLE_CELL)
        .node(TABLE_HEADER)
        .node(FILE_CODE_BLOCK)
        .node(TERMINAL_BLOCK)
        .node(HARD_BREAK)
        .node(TEXT)
        .mark(LINK)
        .mark(BOLD)
        .mark(ITALIC)
        .mark(BADGE)
        .mark(CODE)
        .build()
        .expect("Invalid built-in schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_syntax::parse_fragment;
    use rstest::rstest;

    fn element(html: &str) -> HtmlElement {
        parse_fragment(html)[0].as_element().cloned().unwrap()
    }

    #[test]
    fn blog_schema_builds() {
        let schema = blog_schema();
        assert_eq!(schema.top_node(), "doc");
        assert!(schema.node_type("fileCodeBlock").unwrap().is_code());
        assert!(schema.node_type("hardBreak").unwrap().is_leaf());
        assert!(!schema.node_type("blockquote").unwrap().is_textblock());
    }

    #[rstest]
    #[case(r#"<p style="text-align: center">x</p>"#, "center")]
    #[case(r#"<p style="color: red; text-align:right">x</p>"#, "right")]
    fn parses_text_align(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(text_align_attrs(&element(html))["textAlign"], AttrValue::from(expected));
    }

    #[test]
    fn file_code_block_language_falls_back_to_code_class() {
        let attrs = file_code_block_attrs(&element(r#"<pre><code class="language-js">x</code></pre>"#));
        assert_eq!(attrs["language"], AttrValue::from("js"));
    }

    #[test]
    fn invalid_highlighted_line_is_ignored() {
        let attrs = file_code_block_attrs(&element(
            r#"<pre data-type="file-code-block" data-highlighted-line="soon"></pre>"#,
        ));
        assert!(!attrs.contains_key("highlightedLine"));
    }

    #[test]
    fn terminal_block_renders_only_filled_slots() {
        let attrs = attrs([
            ("packageManager", "pnpm".into()),
            ("npmContent", "npm i".into()),
            ("pnpmContent", "".into()),
            ("yarnContent", "".into()),
        ]);
        let DomSpec::Element { attrs: html_attrs, .. } = render_terminal_block(&attrs) else {
            panic!("expected element");
        };
        let names: Vec<_> = html_attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["data-type", "data-package-manager", "data-npm-content"]);
    }
}
