//! Captions under figures and tables: a textblock that converts to and from
//! the current block type, keeping inline content.

use super::{Extension, shared};
use crate::commands::query::selected_textblocks;
use crate::commands::{Command, set_block_type, set_paragraph};
use crate::model::Attrs;
use crate::state::EditorState;
use crate::transform::Transaction;

pub const NODE: &str = "caption";

pub const EXTENSION: Extension = Extension {
    name: "caption",
    priority: 0,
    bindings: |_| vec![("Mod-Alt-c", shared(toggle_caption()))],
};

/// Caption the selected blocks, or turn captions back into paragraphs.
pub fn toggle_caption() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let blocks = selected_textblocks(state);
        if blocks.is_empty() || blocks.iter().any(|(_, el)| state.schema().is_code(&el.node_type)) {
            return None;
        }
        if blocks.iter().all(|(_, el)| el.is(NODE)) {
            set_paragraph().build(state)
        } else {
            set_block_type(NODE, Attrs::new()).build(state)
        }
    }
}
