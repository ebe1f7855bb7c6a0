use std::sync::Arc;

use crate::error::EngineResult;
use crate::model::{Attrs, Document, Element, Selection};
use crate::schema::Schema;
use crate::transform::{History, HistoryAction, HistoryEntry, Mapping, Transaction};

/// One immutable snapshot of an editing session: document, selection and
/// undo history under a schema.
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Arc<Schema>,
    doc: Document,
    selection: Selection,
    history: History,
}

/// The outcome of committing a transaction.
#[derive(Debug, Clone)]
pub struct Commit {
    pub state: EditorState,
    pub mapping: Mapping,
    pub doc_changed: bool,
}

impl EditorState {
    /// Check `doc` against the schema and put the caret at the start of the
    /// first textblock.
    pub fn new(schema: Arc<Schema>, doc: Document, history_depth: usize) -> EngineResult<Self> {
        schema.check_document(&doc)?;
        let caret = first_text_position(&doc);
        Ok(Self {
            schema,
            doc,
            selection: Selection::cursor(caret),
            history: History::new(history_depth),
        })
    }

    /// A document holding one empty paragraph.
    pub fn empty(schema: Arc<Schema>, history_depth: usize) -> EngineResult<Self> {
        let paragraph = schema.node("paragraph", Attrs::new(), Vec::new())?;
        Self::new(schema, Document::from_blocks(vec![paragraph]), history_depth)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The textblock holding the selection head, with its start position.
    pub fn head_textblock(&self) -> Option<(usize, &Element)> {
        let rp = self.doc.resolve(self.selection.head).ok()?;
        let depth = rp.depth();
        if depth == 0 || !self.schema.is_textblock(&rp.parent().node_type) {
            return None;
        }
        Some((rp.before(depth), rp.parent()))
    }

    /// Apply a transaction, updating the history according to its
    /// [`HistoryAction`].
    pub fn apply(&self, tr: &Transaction) -> EngineResult<Commit> {
        let applied = tr.apply(&self.schema, &self.doc, self.selection)?;
        let doc_changed = applied.doc_changed(&self.doc);

        let mut history = self.history.clone();
        let reverse = HistoryEntry {
            steps: applied.inverse,
            selection: self.selection,
        };
        match tr.history_action() {
            HistoryAction::Record if doc_changed => history.record(reverse),
            HistoryAction::Record | HistoryAction::Skip => {}
            HistoryAction::Undo => history.undone(reverse),
            HistoryAction::Redo => history.redone(reverse),
        }

        Ok(Commit {
            state: EditorState {
                schema: Arc::clone(&self.schema),
                doc: applied.doc,
                selection: applied.selection,
                history,
            },
            mapping: applied.mapping,
            doc_changed,
        })
    }
}

fn first_text_position(doc: &Document) -> usize {
    doc.textblocks().first().map(|(pos, _)| pos + 1).unwrap_or(0)
}
