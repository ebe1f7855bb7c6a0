//! File code block: a named source file with one highlightable line and a
//! language picked from a fixed rotation.

use super::{Extension, shared};
use crate::commands::{Command, insert_block};
use crate::model::{AttrValue, Element, attrs};
use crate::schema::blog::{DEFAULT_FILENAME, DEFAULT_LANGUAGE};
use crate::state::EditorState;
use crate::transform::Transaction;

pub const NODE: &str = "fileCodeBlock";
pub const LANGUAGES: &[&str] = &["ts", "tsx", "js", "jsx"];

pub const EXTENSION: Extension = Extension {
    name: "file_code",
    priority: 100,
    bindings: |options| {
        vec![(
            "Mod-Alt-l",
            shared(cycle_language_at_caret(options.languages.clone())),
        )]
    },
};

fn block_at(state: &EditorState, pos: usize) -> Option<&Element> {
    state
        .doc()
        .element_at(pos, NODE)
        .inspect_err(|err| log::debug!("file code block command skipped: {err}"))
        .ok()
}

/// Number of lines the block's text spans; an empty block has one.
pub fn line_count(block: &Element) -> usize {
    block.text_content().split('\n').count()
}

/// The language after `current` in `languages`; an unknown language starts
/// the rotation over.
pub fn next_language<'a>(languages: &'a [String], current: &str) -> Option<&'a str> {
    if languages.is_empty() {
        return None;
    }
    let next = languages
        .iter()
        .position(|l| l == current)
        .map_or(0, |i| (i + 1) % languages.len());
    Some(languages[next].as_str())
}

pub fn cycle_language(pos: usize, languages: Vec<String>) -> impl Command {
    move |state: &EditorState| -> Option<Transaction> {
        let block = block_at(state, pos)?;
        let current = block.attr("language").as_str().unwrap_or(DEFAULT_LANGUAGE);
        let next = next_language(&languages, current)?;
        Some(Transaction::new().set_node_attrs(pos, attrs([("language", next.into())])))
    }
}

fn cycle_language_at_caret(languages: Vec<String>) -> impl Command {
    move |state: &EditorState| -> Option<Transaction> {
        let (pos, block) = state.head_textblock()?;
        if !block.is(NODE) {
            return None;
        }
        cycle_language(pos, languages.clone()).build(state)
    }
}

/// Highlight line `index`, or clear it when it is already the highlighted
/// one. Only one line is highlighted at a time.
pub fn toggle_highlighted_line(pos: usize, index: usize) -> impl Command {
    move |state: &EditorState| -> Option<Transaction> {
        let block = block_at(state, pos)?;
        let line = i64::try_from(index).ok()?;
        // a highlight left past the last line can still be cleared
        let value = match block.attr("highlightedLine") {
            AttrValue::Int(current) if *current == line => AttrValue::Null,
            _ if index >= line_count(block) => return None,
            _ => AttrValue::Int(line),
        };
        Some(Transaction::new().set_node_attrs(pos, attrs([("highlightedLine", value)])))
    }
}

pub fn set_filename(pos: usize, filename: impl Into<String>) -> impl Command {
    let filename = filename.into();
    move |state: &EditorState| -> Option<Transaction> {
        let block = block_at(state, pos)?;
        if block.attr("filename").as_str() == Some(filename.as_str()) {
            return None;
        }
        Some(Transaction::new().set_node_attrs(pos, attrs([("filename", filename.as_str().into())])))
    }
}

pub fn insert_file_code_block(filename: &str, language: &str) -> impl Command + use<> {
    let filename = if filename.trim().is_empty() {
        DEFAULT_FILENAME
    } else {
        filename
    };
    insert_block(
        NODE,
        attrs([("filename", filename.into()), ("language", language.into())]),
    )
}
