//! # Commands
//!
//! A command looks at an [`EditorState`] and either builds a [`Transaction`]
//! or returns `None` when it does not apply. Commands never mutate anything
//! themselves; the editor applies what they return.
//!
//! Commands compose with [`chain`] (run one after another against the
//! evolving state) and [`first`] (take the first one that applies).
//!
//! ```
//! use std::sync::Arc;
//! use quire_engine::commands::{self, ChainMode, Command};
//! use quire_engine::schema::blog::blog_schema;
//! use quire_engine::state::EditorState;
//!
//! let state = EditorState::empty(Arc::new(blog_schema()), 100).unwrap();
//! let heading = commands::chain(
//!     ChainMode::Strict,
//!     vec![
//!         Box::new(commands::insert_text("Hello")),
//!         Box::new(commands::toggle_heading(1)),
//!     ],
//! );
//! let tr = heading.build(&state).unwrap();
//! let commit = state.apply(&tr).unwrap();
//! assert_eq!(commit.state.doc().blocks()[0].type_name(), "heading");
//! ```

mod blocks;
mod lists;
mod marks;
pub(crate) mod query;
mod text;

pub use blocks::{
    delete_node, insert_block, insert_node, set_block_type, set_paragraph, set_text_align,
    toggle_heading,
};
pub use lists::{toggle_bullet_list, toggle_ordered_list};
pub use marks::{set_link, toggle_mark, toggle_mark_with, unset_link};
pub use query::{can, formatting_disabled, is_active, is_mark_active, mark_attrs};
pub use text::{delete_backward, delete_selection, insert_hard_break, insert_text, split_block};

use crate::model::{Document, Node, Selection};
use crate::state::EditorState;
use crate::transform::{HistoryAction, Transaction};

/// `(state) -> Option<Transaction>`. `None` means "not applicable here".
pub trait Command {
    fn build(&self, state: &EditorState) -> Option<Transaction>;
}

impl<F> Command for F
where
    F: Fn(&EditorState) -> Option<Transaction>,
{
    fn build(&self, state: &EditorState) -> Option<Transaction> {
        self(state)
    }
}

/// How a chain treats commands that do not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// Any inapplicable command aborts the whole chain (toolbar buttons)
    Strict,
    /// Inapplicable commands are skipped (keyboard shortcuts)
    Advisory,
}

pub struct Chain {
    mode: ChainMode,
    commands: Vec<Box<dyn Command>>,
}

/// Run `commands` in sequence, each against the state the previous ones
/// produced, and merge their steps into one transaction.
pub fn chain(mode: ChainMode, commands: Vec<Box<dyn Command>>) -> Chain {
    Chain { mode, commands }
}

impl Command for Chain {
    fn build(&self, state: &EditorState) -> Option<Transaction> {
        let mut current = state.clone();
        let mut combined = Transaction::new();
        for command in &self.commands {
            let tr = match command.build(&current) {
                Some(tr) => tr,
                None if self.mode == ChainMode::Advisory => continue,
                None => return None,
            };
            match current.apply(&tr) {
                Ok(commit) => {
                    current = commit.state;
                    combined.extend(tr);
                }
                Err(err) => {
                    log::debug!("chained command rejected: {err}");
                    if self.mode == ChainMode::Strict {
                        return None;
                    }
                }
            }
        }
        (!combined.is_empty()).then_some(combined)
    }
}

pub struct First {
    commands: Vec<Box<dyn Command>>,
}

/// The first command that applies wins.
pub fn first(commands: Vec<Box<dyn Command>>) -> First {
    First { commands }
}

impl Command for First {
    fn build(&self, state: &EditorState) -> Option<Transaction> {
        self.commands.iter().find_map(|c| c.build(state))
    }
}

pub fn undo() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let entry = state.history().next_undo()?;
        Some(replay(&entry.steps, entry.selection, HistoryAction::Undo))
    }
}

pub fn redo() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let entry = state.history().next_redo()?;
        Some(replay(&entry.steps, entry.selection, HistoryAction::Redo))
    }
}

fn replay(steps: &[crate::transform::Step], selection: Selection, action: HistoryAction) -> Transaction {
    let mut tr = Transaction::new().with_history(action);
    for step in steps {
        tr.push(step.clone());
    }
    tr.set_selection(selection.anchor, selection.head)
}

/// Start of the first textblock's content inside `node`, relative to the
/// node's own start.
pub(crate) fn first_text_offset(state: &EditorState, node: &Node) -> Option<usize> {
    let Node::Element(el) = node else {
        return None;
    };
    if state.schema().is_textblock(&el.node_type) {
        return Some(1);
    }
    let mut offset = 1;
    for child in &el.content {
        if let Some(inner) = first_text_offset(state, child) {
            return Some(offset + inner);
        }
        offset += child.size();
    }
    None
}

/// A caret position near `pos`: the start of the next textblock, else the
/// end of the last one.
pub(crate) fn caret_near(doc: &Document, pos: usize) -> usize {
    let blocks = doc.textblocks();
    match blocks.iter().find(|(start, _)| *start >= pos) {
        Some((start, _)) => start + 1,
        None => blocks
            .last()
            .map(|(start, el)| start + 1 + el.content_size())
            .unwrap_or(pos.min(doc.size())),
    }
}
