//! # quire-syntax
//!
//! Tokenizer and element tree for the HTML interchange format that quire
//! documents are stored in.
//!
//! ## Architecture Overview
//!
//! ```text
//! Source HTML → Lexer → Tokens → Tree builder → Vec<HtmlNode>
//!               (Logos)          (stack of open elements)
//! ```
//!
//! The lexer ([`lexer`]) is lossless: concatenating token texts reproduces the
//! input byte for byte. The tree builder ([`tree`]) decodes entities and
//! tolerates the usual sloppiness of hand-edited markup.
//!
//! Mapping elements onto document nodes is not done here; that is the job of
//! the engine's schema-driven parser, which only needs a generic element tree.
//!
//! ## Quick Start
//!
//! ```
//! use quire_syntax::{parse_fragment, HtmlNode};
//!
//! let nodes = parse_fragment("<h1>Hello</h1><p>World</p>");
//! assert_eq!(nodes.len(), 2);
//!
//! let HtmlNode::Element(heading) = &nodes[0] else { panic!() };
//! assert_eq!(heading.tag, "h1");
//! assert_eq!(heading.text_content(), "Hello");
//! ```

pub mod lexer;
pub mod tree;

pub use lexer::{Token, TokenKind, lex};
pub use tree::{HtmlElement, HtmlNode, parse_fragment};

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;

    /// Render a fragment as an indented outline for snapshot tests.
    fn format_nodes(nodes: &[HtmlNode], indent: usize, out: &mut String) {
        for node in nodes {
            let pad = "  ".repeat(indent);
            match node {
                HtmlNode::Text(text) => out.push_str(&format!("{pad}{text:?}\n")),
                HtmlNode::Element(el) => {
                    let attrs: Vec<String> =
                        el.attrs.iter().map(|(k, v)| format!("{k}={v:?}")).collect();
                    out.push_str(&format!("{pad}{} [{}]\n", el.tag, attrs.join(", ")));
                    format_nodes(&el.children, indent + 1, out);
                }
            }
        }
    }

    fn outline(input: &str) -> String {
        let mut out = String::new();
        format_nodes(&parse_fragment(input), 0, &mut out);
        out.trim_end().to_string()
    }

    #[test]
    fn snapshot_table_markup() {
        assert_snapshot!(
            outline("<table><tbody><tr><th>A</th></tr><tr><td>1</td></tr></tbody></table>"),
            @r###"
        table []
          tbody []
            tr []
              th []
                "A"
            tr []
              td []
                "1"
        "###
        );
    }

    #[test]
    fn snapshot_terminal_block_markup() {
        assert_snapshot!(
            outline(r#"<div data-type="terminal-block" data-package-manager="pnpm">pnpm i</div>"#),
            @r###"
        div [data-type="terminal-block", data-package-manager="pnpm"]
          "pnpm i"
        "###
        );
    }
}
