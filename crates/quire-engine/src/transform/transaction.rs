use crate::error::EngineResult;
use crate::model::{Attrs, Document, Mark, Node, Selection};
use crate::schema::Schema;
use crate::transform::mapping::Mapping;
use crate::transform::step::Step;

/// How a transaction interacts with the undo history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryAction {
    #[default]
    Record,
    /// Apply without an undo entry (selection moves, derived updates)
    Skip,
    Undo,
    Redo,
}

/// An ordered list of steps applied all-or-nothing.
///
/// Each step's positions refer to the document as left by the steps before
/// it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    steps: Vec<Step>,
    history: HistoryAction,
}

/// Result of applying a transaction.
#[derive(Debug, Clone)]
pub struct Applied {
    pub doc: Document,
    pub selection: Selection,
    pub mapping: Mapping,
    /// Steps that restore the original document, in application order
    pub inverse: Vec<Step>,
}

impl Applied {
    pub fn doc_changed(&self, before: &Document) -> bool {
        &self.doc != before
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn history_action(&self) -> HistoryAction {
        self.history
    }

    pub fn with_history(mut self, action: HistoryAction) -> Self {
        self.history = action;
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    /// Append another transaction's steps.
    pub fn extend(&mut self, other: Transaction) {
        self.steps.extend(other.steps);
    }

    pub fn insert_text(self, pos: usize, text: impl Into<String>, marks: Vec<Mark>) -> Self {
        self.step(Step::InsertText {
            pos,
            text: text.into(),
            marks,
        })
    }

    pub fn delete(self, from: usize, to: usize) -> Self {
        self.step(Step::DeleteRange { from, to })
    }

    pub fn replace(self, from: usize, to: usize, content: Vec<Node>) -> Self {
        self.step(Step::ReplaceRange { from, to, content })
    }

    pub fn set_node_attrs(self, pos: usize, attrs: Attrs) -> Self {
        self.step(Step::SetNodeAttrs { pos, attrs })
    }

    pub fn set_node_type(self, pos: usize, node_type: impl Into<String>, attrs: Attrs) -> Self {
        self.step(Step::SetNodeType {
            pos,
            node_type: node_type.into(),
            attrs,
        })
    }

    pub fn set_selection(self, anchor: usize, head: usize) -> Self {
        self.step(Step::SetSelection { anchor, head })
    }

    /// Apply every step to a working copy. Nothing is observable unless all
    /// of them succeed and the final selection resolves.
    pub fn apply(&self, schema: &Schema, doc: &Document, selection: Selection) -> EngineResult<Applied> {
        let mut current = doc.clone();
        let mut mapping = Mapping::new();
        let mut inverse_groups = Vec::with_capacity(self.steps.len());
        let mut explicit: Option<Selection> = None;

        for step in &self.steps {
            if let Step::SetSelection { anchor, head } = step {
                explicit = Some(Selection::new(*anchor, *head));
                continue;
            }
            let result = step.apply(schema, &current)?;
            if let Some(sel) = explicit.as_mut() {
                *sel = Selection::new(result.map.map(sel.anchor), result.map.map(sel.head));
            }
            mapping.push(result.map);
            inverse_groups.push(result.inverse);
            current = result.doc;
        }

        let selection = explicit.unwrap_or_else(|| selection.map(&mapping));
        current.resolve(selection.anchor)?;
        current.resolve(selection.head)?;

        Ok(Applied {
            doc: current,
            selection,
            mapping,
            inverse: inverse_groups.into_iter().rev().flatten().collect(),
        })
    }
}
