use crate::commands::Command;
use crate::commands::query::{mark_range, selected_textblocks, text_runs_between};
use crate::model::{Attrs, attrs};
use crate::state::EditorState;
use crate::transform::{Step, Transaction};

pub fn toggle_mark(mark_type: &str) -> impl Command + use<> {
    toggle_mark_with(mark_type, Attrs::new())
}

/// Remove the mark when every text run in the selection has it, add it
/// everywhere otherwise. Needs a non-empty selection over text that may
/// carry the mark.
pub fn toggle_mark_with(mark_type: &str, mark_attrs: Attrs) -> impl Command + use<> {
    let mark_type = mark_type.to_string();
    move |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        if sel.is_empty() {
            return None;
        }
        let schema = state.schema();
        let mark = schema.mark(&mark_type, mark_attrs.clone()).ok()?;
        let allowed = selected_textblocks(state)
            .iter()
            .any(|(_, el)| schema.node_type(&el.node_type).is_ok_and(|t| t.allows_mark(&mark_type)));
        if !allowed {
            return None;
        }

        let runs: Vec<_> = text_runs_between(state, sel.from(), sel.to())
            .into_iter()
            .filter(|(el, _)| schema.node_type(&el.node_type).is_ok_and(|t| t.allows_mark(&mark_type)))
            .collect();
        let all_marked = !runs.is_empty() && runs.iter().all(|(_, run)| run.marks.iter().any(|m| m.is(&mark_type)));

        let step = if all_marked {
            Step::RemoveMark {
                from: sel.from(),
                to: sel.to(),
                mark_type: mark_type.clone(),
            }
        } else {
            Step::AddMark {
                from: sel.from(),
                to: sel.to(),
                mark,
            }
        };
        Some(Transaction::new().step(step))
    }
}

/// Link the selection, or retarget the link under the caret.
pub fn set_link(href: impl Into<String>) -> impl Command {
    let href = href.into();
    move |state: &EditorState| -> Option<Transaction> {
        if href.trim().is_empty() {
            return unset_link().build(state);
        }
        let sel = state.selection();
        let (from, to) = if sel.is_empty() {
            mark_range(state, sel.head, "link")?
        } else {
            (sel.from(), sel.to())
        };
        let mark = state
            .schema()
            .mark("link", attrs([("href", href.as_str().into())]))
            .ok()?;
        Some(Transaction::new().step(Step::AddMark { from, to, mark }))
    }
}

/// Remove links from the selection, or the whole link under the caret.
pub fn unset_link() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        let (from, to) = if sel.is_empty() {
            mark_range(state, sel.head, "link")?
        } else {
            (sel.from(), sel.to())
        };
        Some(Transaction::new().step(Step::RemoveMark {
            from,
            to,
            mark_type: "link".into(),
        }))
    }
}
