//! Content expressions: the tiny grammar node types use to say which children
//! they accept.
//!
//! ```text
//! expr   := term*
//! term   := (name | "(" name ("|" name)* ")") quant?
//! quant  := "*" | "+" | "?"
//! ```
//!
//! Names refer to node types or groups. Matching is a plain backtracking walk
//! over the terms; expressions in practice are two or three terms long.

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    choices: Vec<String>,
    min: usize,
    max: Option<usize>,
}

/// A parsed content expression.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentExpr {
    terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Tok {
    Name(String),
    Open,
    Close,
    Pipe,
    Quant(char),
}

fn tokenize(src: &str) -> EngineResult<Vec<Tok>> {
    let mut toks = Vec::new();
    let mut chars = src.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                toks.push(Tok::Open);
            }
            ')' => {
                chars.next();
                toks.push(Tok::Close);
            }
            '|' => {
                chars.next();
                toks.push(Tok::Pipe);
            }
            '*' | '+' | '?' => {
                chars.next();
                toks.push(Tok::Quant(c));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                toks.push(Tok::Name(name));
            }
            other => {
                return Err(EngineError::schema(format!(
                    "unexpected '{other}' in content expression '{src}'"
                )));
            }
        }
    }
    Ok(toks)
}

impl ContentExpr {
    pub fn parse(src: &str) -> EngineResult<Self> {
        let toks = tokenize(src)?;
        let bad = || EngineError::schema(format!("malformed content expression '{src}'"));
        let mut terms = Vec::new();
        let mut i = 0;

        while i < toks.len() {
            let choices = match &toks[i] {
                Tok::Name(name) => {
                    i += 1;
                    vec![name.clone()]
                }
                Tok::Open => {
                    i += 1;
                    let mut choices = Vec::new();
                    loop {
                        match toks.get(i) {
                            Some(Tok::Name(name)) => choices.push(name.clone()),
                            _ => return Err(bad()),
                        }
                        i += 1;
                        match toks.get(i) {
                            Some(Tok::Pipe) => i += 1,
                            Some(Tok::Close) => {
                                i += 1;
                                break;
                            }
                            _ => return Err(bad()),
                        }
                    }
                    choices
                }
                _ => return Err(bad()),
            };

            let (min, max) = match toks.get(i) {
                Some(Tok::Quant('*')) => (0, None),
                Some(Tok::Quant('+')) => (1, None),
                Some(Tok::Quant('?')) => (0, Some(1)),
                _ => (1, Some(1)),
            };
            if matches!(toks.get(i), Some(Tok::Quant(_))) {
                i += 1;
            }
            terms.push(Term { choices, min, max });
        }

        Ok(Self { terms })
    }

    /// An expression with no terms describes a node without content.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Every type or group name the expression mentions.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.terms
            .iter()
            .flat_map(|t| t.choices.iter().map(String::as_str))
    }

    /// The first name a child must match when content is required, used to
    /// fill empty containers.
    pub fn first_required(&self) -> Option<&str> {
        self.terms
            .iter()
            .find(|t| t.min > 0)
            .and_then(|t| t.choices.first())
            .map(String::as_str)
    }

    /// Check a sequence of child type names.
    ///
    /// `accepts(child, name)` decides whether a child type satisfies a name
    /// from the expression (equal, or a member of that group).
    pub fn matches(&self, children: &[&str], accepts: &dyn Fn(&str, &str) -> bool) -> bool {
        self.match_from(0, children, accepts)
    }

    fn match_from(&self, term: usize, children: &[&str], accepts: &dyn Fn(&str, &str) -> bool) -> bool {
        let Some(t) = self.terms.get(term) else {
            return children.is_empty();
        };

        let limit = t.max.unwrap_or(usize::MAX).min(children.len());
        let mut taken = 0;
        while taken < limit && t.choices.iter().any(|c| accepts(children[taken], c)) {
            taken += 1;
        }
        if taken < t.min {
            return false;
        }
        // Greedy first, then give children back to later terms
        (t.min..=taken)
            .rev()
            .any(|n| self.match_from(term + 1, &children[n..], accepts))
    }
}
