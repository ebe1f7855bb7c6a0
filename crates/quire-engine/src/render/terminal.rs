//! Visual layer of the terminal block. Synchronous, no highlighter involved.

use std::sync::OnceLock;

use regex::Regex;

use crate::render::markup::{SpanStyle, StyledLine};

fn command_regex() -> &'static Regex {
    static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r"^(npm|pnpm|yarn|npx|cd|git|rm|mv|touch|mkdir|ls|echo|cat)\b")
            .expect("Invalid command regex")
    })
}

/// One styled line per text line: a known command prefix is accented and
/// the rest of the line is output. Empty text still yields one (empty)
/// line so the block keeps its height.
pub fn tokenize(text: &str) -> Vec<StyledLine> {
    if text.is_empty() {
        return vec![StyledLine::default()];
    }
    text.split('\n')
        .map(|line| {
            let mut styled = StyledLine::default();
            let rest = match command_regex().find(line) {
                Some(prefix) => {
                    styled.push(prefix.as_str(), SpanStyle::Accent);
                    &line[prefix.end()..]
                }
                None => line,
            };
            styled.push(rest, SpanStyle::Output);
            styled
        })
        .collect()
}
