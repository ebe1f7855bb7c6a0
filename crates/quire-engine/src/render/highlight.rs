//! The highlighting service boundary.
//!
//! A [`Highlighter`] is a pure function `(text, language) -> markup`. The
//! compositor never calls one itself: it hands out [`HighlightRequest`]s and
//! accepts [`HighlightResponse`]s, so the host decides where and when the
//! work runs (inline, on a worker thread, over the network).

use std::sync::OnceLock;

use html_escape::encode_text;
use regex::Regex;

use crate::extensions::file_code::LANGUAGES;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HighlightError {
    #[error("Highlighting service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    #[error("No grammar for language '{0}'")]
    UnsupportedLanguage(String),
}

pub trait Highlighter {
    fn highlight(&self, text: &str, language: &str) -> Result<String, HighlightError>;
}

impl<F> Highlighter for F
where
    F: Fn(&str, &str) -> Result<String, HighlightError>,
{
    fn highlight(&self, text: &str, language: &str) -> Result<String, HighlightError> {
        self(text, language)
    }
}

/// Stable identity of a code block's derived state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

/// Work order for the highlighting service, tagged with the generation of
/// the block revision it was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightRequest {
    pub block: BlockId,
    pub generation: u64,
    pub text: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightResponse {
    pub block: BlockId,
    pub generation: u64,
    pub result: Result<String, HighlightError>,
}

impl HighlightRequest {
    pub fn run(&self, highlighter: &dyn Highlighter) -> HighlightResponse {
        self.respond(highlighter.highlight(&self.text, &self.language))
    }

    pub fn respond(&self, result: Result<String, HighlightError>) -> HighlightResponse {
        HighlightResponse {
            block: self.block,
            generation: self.generation,
            result,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Comment,
    String,
    Keyword,
    Number,
}

impl TokenKind {
    fn class(self) -> &'static str {
        match self {
            TokenKind::Comment => "tok-comment",
            TokenKind::String => "tok-string",
            TokenKind::Keyword => "tok-keyword",
            TokenKind::Number => "tok-number",
        }
    }
}

fn token_regex() -> &'static Regex {
    static TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();
    TOKEN_REGEX.get_or_init(|| {
        Regex::new(concat!(
            r"(?P<comment>//.*)",
            r#"|(?P<string>"(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'|`(?:\\.|[^`\\])*`)"#,
            r"|(?P<keyword>\b(?:as|async|await|break|case|class|const|continue|default|else|export|extends|false|for|from|function|if|import|interface|let|new|null|return|switch|this|throw|true|try|type|undefined|var|while)\b)",
            r"|(?P<number>\b\d+(?:\.\d+)?\b)",
        ))
        .expect("Invalid token regex")
    })
}

/// Line-oriented regex highlighter for the JavaScript family.
///
/// Output mirrors what hosted highlighters emit: a `pre > code` wrapper with
/// one `span.line` per source line, joined by newlines.
#[derive(Debug, Clone, Default)]
pub struct SimpleHighlighter;

impl SimpleHighlighter {
    pub fn new() -> Self {
        Self
    }

    fn highlight_line(line: &str, out: &mut String) {
        let mut last = 0;
        for caps in token_regex().captures_iter(line) {
            let Some((kind, m)) = [
                (TokenKind::Comment, "comment"),
                (TokenKind::String, "string"),
                (TokenKind::Keyword, "keyword"),
                (TokenKind::Number, "number"),
            ]
            .into_iter()
            .find_map(|(kind, name)| caps.name(name).map(|m| (kind, m))) else {
                continue;
            };
            out.push_str(&encode_text(&line[last..m.start()]));
            out.push_str(&format!(
                r#"<span class="{}">{}</span>"#,
                kind.class(),
                encode_text(m.as_str())
            ));
            last = m.end();
        }
        out.push_str(&encode_text(&line[last..]));
    }
}

impl Highlighter for SimpleHighlighter {
    fn highlight(&self, text: &str, language: &str) -> Result<String, HighlightError> {
        if !LANGUAGES.contains(&language) {
            return Err(HighlightError::UnsupportedLanguage(language.to_string()));
        }
        let mut out = format!(r#"<pre class="quire-highlight" data-language="{language}"><code>"#);
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(r#"<span class="line">"#);
            Self::highlight_line(line, &mut out);
            out.push_str("</span>");
        }
        out.push_str("</code></pre>");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    #[test]
    fn highlights_keywords_strings_and_comments() {
        let html = SimpleHighlighter::new()
            .highlight("const a = \"x<y\"; // done\nreturn 42", "ts")
            .unwrap();
        assert_snapshot!(html, @r#"
        <pre class="quire-highlight" data-language="ts"><code><span class="line"><span class="tok-keyword">const</span> a = <span class="tok-string">"x&lt;y"</span>; <span class="tok-comment">// done</span></span>
        <span class="line"><span class="tok-keyword">return</span> <span class="tok-number">42</span></span></code></pre>
        "#);
    }

    #[test]
    fn unknown_language_is_an_error() {
        assert_eq!(
            SimpleHighlighter::new().highlight("x", "cobol"),
            Err(HighlightError::UnsupportedLanguage("cobol".into()))
        );
    }

    #[test]
    fn request_tags_response_with_generation() {
        let request = HighlightRequest {
            block: BlockId(7),
            generation: 3,
            text: "let".into(),
            language: "js".into(),
        };
        let failing = |_: &str, _: &str| -> Result<String, HighlightError> {
            Err(HighlightError::ExternalServiceUnavailable("offline".into()))
        };
        let response = request.run(&failing);
        assert_eq!(response.block, BlockId(7));
        assert_eq!(response.generation, 3);
        assert!(response.result.is_err());
    }
}
