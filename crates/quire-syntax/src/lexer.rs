//! # Lexer - Tokenizing Interchange HTML
//!
//! This module breaks an HTML string into a flat sequence of tokens using the
//! [Logos] lexer generator. It only understands the small subset of HTML that
//! the document serializer emits (plus whatever a browser-side editor would
//! reasonably hand back): start tags with attributes, end tags, declarations
//! and comments, and text.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! Every byte of the input appears in exactly one token. Bytes Logos cannot
//! match (a lone `<` in hand-written markup, for example) are reported as
//! [`TokenKind::Text`] rather than dropped:
//!
//! ```
//! use quire_syntax::lexer::lex;
//!
//! let input = "<p class=\"lead\">1 < 2</p>";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Token Design
//!
//! Tags are lexed as whole tokens. Attribute splitting happens later in
//! [`crate::tree`], which keeps the token set tiny and lets the lexer stay
//! context-free.

use logos::Logos;

/// Token kinds produced by the Logos lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<tag attr="value" ...>` or `<tag ... />`
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*(\s+[^\s"'>/=]+(\s*=\s*("[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*\s*/?>"#)]
    StartTag,

    /// `</tag>`
    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*\s*>")]
    EndTag,

    /// `<!doctype html>`, `<!-- comment -->`
    #[regex(r"<![^>]*>")]
    Declaration,

    /// Character data between tags (entities still encoded)
    #[regex(r"[^<]+")]
    Text,
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let text = lexer.slice();
        let kind = match result {
            Ok(kind) => kind,
            // Unrecognized markup is kept as character data
            Err(()) => TokenKind::Text,
        };
        tokens.push(Token { kind, text });
    }

    tokens
}

/// Lex and return tokens along with their byte spans.
pub fn lex_with_spans(input: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let text = lexer.slice();
        let kind = result.unwrap_or(TokenKind::Text);
        tokens.push((Token { kind, text }, span));
    }

    tokens
}
