//! # Interchange
//!
//! The stored form of a document is an HTML string. Both directions are
//! driven by the schema: [`to_html`] calls each type's render rule and
//! [`from_html`] tries each type's parse rules in registration order. For
//! every node and mark type the two are inverse, so `from_html(to_html(doc))`
//! reproduces `doc` attributes included.
//!
//! ```
//! use quire_engine::interchange::{from_html, to_html};
//! use quire_engine::schema::blog::blog_schema;
//!
//! let schema = blog_schema();
//! let doc = from_html(&schema, "<h1>Hello</h1>\n<p>World</p>").unwrap();
//! assert_eq!(to_html(&schema, &doc), "<h1>Hello</h1><p>World</p>");
//! ```

mod parse;
mod serialize;

pub use parse::from_html;
pub use serialize::to_html;

use crate::model::Document;

/// Plain text: blocks separated by a blank line, hard breaks as newlines.
pub fn to_plain_text(doc: &Document) -> String {
    doc.text_between(0, doc.size(), "\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttrValue, Attrs, Node, attrs};
    use crate::schema::blog::blog_schema;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn round_trip(html: &str) -> Document {
        let schema = blog_schema();
        let doc = from_html(&schema, html).unwrap();
        let again = from_html(&schema, &to_html(&schema, &doc)).unwrap();
        assert_eq!(again, doc);
        doc
    }

    #[rstest]
    #[case::paragraph(r#"<p style="text-align: center">centred</p>"#)]
    #[case::heading("<h2>Section</h2>")]
    #[case::blockquote("<blockquote><p>quoted</p></blockquote>")]
    #[case::bullet_list("<ul><li><p>a</p></li><li><p>b</p><ul><li><p>c</p></li></ul></li></ul>")]
    #[case::ordered_list(r#"<ol start="3"><li><p>third</p></li></ol>"#)]
    #[case::horizontal_rule("<p>a</p><hr><p>b</p>")]
    #[case::hard_break("<p>line<br>next</p>")]
    #[case::caption(r#"<figcaption style="text-align: right">A <em>photo</em></figcaption>"#)]
    #[case::table(r#"<table><tbody><tr><th colspan="2"><p>H</p></th></tr><tr><td><p>1</p></td><td rowspan="2"><p>2</p></td></tr></tbody></table>"#)]
    #[case::file_code_block(r#"<pre data-type="file-code-block" data-filename="src/main.ts" data-language="ts" data-highlighted-line="1"><code class="language-ts">let a = 1;
let b = a &lt; 2;</code></pre>"#)]
    #[case::terminal_block(r#"<div data-type="terminal-block" data-package-manager="yarn" data-npm-content="npm install" data-pnpm-content="pnpm add">yarn add</div>"#)]
    #[case::marks(r#"<p><strong>b</strong> <em>i</em> <code>c</code> <span data-badge="">New</span> <a href="https://x.dev" target="_self">l</a></p>"#)]
    #[case::link_without_target(r#"<p><a href="https://x.dev" target="">l</a></p>"#)]
    #[case::link_without_href(r#"<p><a rel="noopener noreferrer nofollow">l</a></p>"#)]
    fn every_type_round_trips(#[case] html: &str) {
        round_trip(html);
    }

    #[rstest]
    #[case::no_target("https://x.dev", AttrValue::Null)]
    #[case::other_target("https://x.dev", AttrValue::from("_top"))]
    #[case::no_href("", AttrValue::Null)]
    fn link_attributes_survive(#[case] href: &str, #[case] target: AttrValue) {
        let schema = blog_schema();
        let href = if href.is_empty() { AttrValue::Null } else { AttrValue::from(href) };
        let link = schema
            .mark("link", attrs([("href", href), ("target", target)]))
            .unwrap();
        let text = schema.text("x", std::slice::from_ref(&link)).unwrap();
        let doc = Document::from_blocks(vec![schema.node("paragraph", Attrs::new(), vec![text]).unwrap()]);

        let back = from_html(&schema, &to_html(&schema, &doc)).unwrap();
        let run = back.blocks()[0].as_element().unwrap().content[0].as_text().unwrap();
        assert_eq!(run.marks, vec![link]);
    }

    #[test]
    fn terminal_block_attributes_survive() {
        let doc = round_trip(
            r#"<div data-type="terminal-block" data-package-manager="pnpm" data-npm-content="npm i">pnpm i</div>"#,
        );
        let block = doc.blocks()[0].as_element().unwrap();
        assert_eq!(block.attr("packageManager"), &AttrValue::from("pnpm"));
        assert_eq!(block.attr("npmContent"), &AttrValue::from("npm i"));
        assert_eq!(block.attr("yarnContent"), &AttrValue::from(""));
    }

    #[test]
    fn highlighted_line_survives() {
        let doc = round_trip(r#"<pre data-type="file-code-block" data-highlighted-line="0"><code>x</code></pre>"#);
        let block = doc.blocks()[0].as_element().unwrap();
        assert_eq!(block.attr("highlightedLine"), &AttrValue::Int(0));
        assert_eq!(block.content, vec![Node::text("x")]);
    }

    #[test]
    fn rendered_blog_post() {
        let schema = blog_schema();
        let doc = from_html(
            &schema,
            r#"<h1>Release notes</h1>
<p>Install with <code>npm</code>:</p>
<div data-type="terminal-block">npm i quire</div>
<pre data-type="file-code-block" data-filename="app/page.tsx" data-language="tsx"><code>export default Page;</code></pre>"#,
        )
        .unwrap();
        assert_snapshot!(to_html(&schema, &doc), @r#"<h1>Release notes</h1><p>Install with <code>npm</code>:</p><div data-type="terminal-block" data-package-manager="npm">npm i quire</div><pre data-type="file-code-block" data-filename="app/page.tsx" data-language="tsx"><code class="language-tsx">export default Page;</code></pre>"#);
    }

    #[test]
    fn plain_text_joins_blocks_with_blank_lines() {
        let doc = from_html(&blog_schema(), "<h1>Hello</h1><p>a<br>b</p><hr><ul><li><p>c</p></li></ul>").unwrap();
        assert_eq!(to_plain_text(&doc), "Hello\n\na\nb\n\nc");
    }
}
