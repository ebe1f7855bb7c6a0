//! Styled lines: the visual layer's content, and the conversion from
//! highlighter markup into them.

use quire_syntax::{HtmlNode, parse_fragment};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStyle {
    #[default]
    Plain,
    /// Class list and inline style carried over from highlighter markup
    Token {
        class: Option<String>,
        style: Option<String>,
    },
    /// Terminal command prefix
    Accent,
    /// Terminal arguments and output
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn plain(text: &str) -> Self {
        let mut line = Self::default();
        line.push(text, SpanStyle::Plain);
        line
    }

    pub fn push(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(StyledSpan {
                text: text.to_string(),
                style,
            }),
        }
    }

    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Split highlighter markup into lines of styled spans.
///
/// Only `span` elements contribute styles; wrappers such as `pre` and `code`
/// are walked through. The innermost styled span wins.
pub fn markup_to_lines(markup: &str) -> Vec<StyledLine> {
    let mut lines = vec![StyledLine::default()];
    walk(&parse_fragment(markup), &SpanStyle::Plain, &mut lines);
    lines
}

fn walk(nodes: &[HtmlNode], style: &SpanStyle, lines: &mut Vec<StyledLine>) {
    for node in nodes {
        match node {
            HtmlNode::Text(text) => {
                for (i, piece) in text.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(StyledLine::default());
                    }
                    if let Some(line) = lines.last_mut() {
                        line.push(piece, style.clone());
                    }
                }
            }
            HtmlNode::Element(el) => {
                let class = el.attr("class").filter(|c| *c != "line").map(str::to_string);
                let inline = el.attr("style").map(str::to_string);
                let inner = if el.tag == "span" && (class.is_some() || inline.is_some()) {
                    SpanStyle::Token {
                        class,
                        style: inline,
                    }
                } else {
                    style.clone()
                };
                walk(&el.children, &inner, lines);
            }
        }
    }
}

/// Make the visual layer line up with the editable text: one line per text
/// line, and a line keeps its styling only while its text still matches.
pub fn reconcile_lines(visual: &[StyledLine], text: &str) -> Vec<StyledLine> {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| match visual.get(i) {
            Some(styled) if styled.text() == line => styled.clone(),
            _ => StyledLine::plain(line),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(class: &str) -> SpanStyle {
        SpanStyle::Token {
            class: Some(class.to_string()),
            style: None,
        }
    }

    #[test]
    fn splits_highlighter_markup_into_lines() {
        let lines = markup_to_lines(
            "<pre class=\"shiki\"><code><span class=\"line\"><span class=\"kw\">let</span> a</span>\n<span class=\"line\">b &amp; c</span></code></pre>",
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0].spans,
            vec![
                StyledSpan {
                    text: "let".into(),
                    style: token("kw"),
                },
                StyledSpan {
                    text: " a".into(),
                    style: SpanStyle::Plain,
                },
            ]
        );
        assert_eq!(lines[1].text(), "b & c");
    }

    #[test]
    fn inline_styles_are_kept() {
        let lines = markup_to_lines(r#"<span style="--shiki-light:#D73A49">if</span>"#);
        assert_eq!(
            lines[0].spans[0].style,
            SpanStyle::Token {
                class: None,
                style: Some("--shiki-light:#D73A49".into()),
            }
        );
    }

    #[test]
    fn empty_markup_is_one_empty_line() {
        assert_eq!(markup_to_lines("<pre><code></code></pre>"), vec![StyledLine::default()]);
    }

    #[test]
    fn reconcile_falls_back_to_plain_for_changed_lines() {
        let visual = markup_to_lines(r#"<span class="kw">let</span> a"#);
        let lines = reconcile_lines(&visual, "let a\nnew line");
        assert_eq!(lines[0], visual[0]);
        assert_eq!(lines[1], StyledLine::plain("new line"));

        let shrunk = reconcile_lines(&visual, "let b");
        assert_eq!(shrunk, vec![StyledLine::plain("let b")]);
    }
}
