//! Terminal block: a shell snippet with one text variant per package
//! manager.
//!
//! Switching managers caches the current text in the outgoing manager's
//! slot attribute (`npmContent`, `pnpmContent`, `yarnContent`) and loads the
//! incoming manager's slot as the new text, all in one transaction.

use super::{Extension, shared};
use crate::commands::{Command, insert_block};
use crate::model::{AttrValue, Attrs, Node, attrs};
use crate::schema::blog::{PACKAGE_MANAGERS, content_slot};
use crate::state::EditorState;
use crate::transform::Transaction;

pub const NODE: &str = "terminalBlock";
pub const DEFAULT_MANAGER: &str = "npm";

pub const EXTENSION: Extension = Extension {
    name: "terminal",
    priority: 100,
    bindings: |_| vec![("Mod-Alt-p", shared(cycle_package_manager()))],
};

fn active_manager(block: &crate::model::Element) -> &str {
    block.attr("packageManager").as_str().unwrap_or(DEFAULT_MANAGER)
}

/// Switch the terminal block starting at `pos` to `target`.
///
/// Not applicable when `target` is unknown or already active, or when `pos`
/// no longer holds a terminal block. The caret keeps its offset into the
/// block, clamped to the new text.
pub fn switch_package_manager(pos: usize, target: &str) -> impl Command + use<> {
    let target = target.to_string();
    move |state: &EditorState| -> Option<Transaction> {
        if !PACKAGE_MANAGERS.contains(&target.as_str()) {
            return None;
        }
        let block = match state.doc().element_at(pos, NODE) {
            Ok(block) => block,
            Err(err) => {
                log::debug!("package manager switch skipped: {err}");
                return None;
            }
        };
        let current = active_manager(block);
        if current == target {
            return None;
        }

        let text = block.text_content();
        let cached = block
            .attr(&content_slot(&target))
            .as_str()
            .unwrap_or_default()
            .to_string();
        let content_start = pos + 1;
        let content_end = content_start + block.content_size();
        let relative = state.selection().from().saturating_sub(content_start);

        let mut slots = Attrs::new();
        slots.insert(content_slot(current), AttrValue::Str(text));
        slots.insert("packageManager".into(), target.as_str().into());
        let tr = Transaction::new().set_node_attrs(pos, slots);
        let tr = if cached.is_empty() {
            tr.delete(content_start, content_end)
        } else {
            tr.replace(content_start, content_end, vec![Node::text(cached.as_str())])
        };
        let caret = content_start + relative.min(cached.chars().count());
        Some(tr.set_selection(caret, caret))
    }
}

/// Switch the terminal block holding the caret to the next manager.
pub fn cycle_package_manager() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let (pos, block) = state.head_textblock()?;
        if !block.is(NODE) {
            return None;
        }
        let index = PACKAGE_MANAGERS
            .iter()
            .position(|m| *m == active_manager(block))
            .map_or(0, |i| (i + 1) % PACKAGE_MANAGERS.len());
        switch_package_manager(pos, PACKAGE_MANAGERS[index]).build(state)
    }
}

pub fn insert_terminal_block(manager: &str) -> impl Command + use<> {
    let manager = if PACKAGE_MANAGERS.contains(&manager) {
        manager
    } else {
        DEFAULT_MANAGER
    };
    insert_block(NODE, attrs([("packageManager", manager.into())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::commands::undo;
    use crate::model::Selection;
    use pretty_assertions::assert_eq;

    fn block_attr(state: &EditorState, name: &str) -> AttrValue {
        state.doc().blocks()[0].as_element().unwrap().attr(name).clone()
    }

    fn text(state: &EditorState) -> String {
        state.doc().blocks()[0].text_content()
    }

    #[test]
    fn caret_is_clamped_to_cached_text() {
        let long = "x".repeat(80);
        let html = format!(
            r#"<div data-type="terminal-block" data-package-manager="npm" data-pnpm-content="pnpm i abc">{long}</div>"#
        );
        let state = caret(&html, 51);
        let after = run(&state, switch_package_manager(0, "pnpm"));
        assert_eq!(text(&after), "pnpm i abc");
        assert_eq!(selection(&after), Selection::cursor(11));
        assert_eq!(block_attr(&after, "npmContent"), AttrValue::Str(long));
        assert_eq!(block_attr(&after, "packageManager"), AttrValue::from("pnpm"));
    }

    #[test]
    fn slots_survive_a_round_trip() {
        let state = caret(r#"<div data-type="terminal-block">npm i quire</div>"#, 5);
        let pnpm = run(&state, switch_package_manager(0, "pnpm"));
        assert_eq!(text(&pnpm), "");
        assert_eq!(selection(&pnpm), Selection::cursor(1));

        let typed = run(&pnpm, crate::commands::insert_text("pnpm add quire"));
        let back = run(&typed, switch_package_manager(0, "npm"));
        assert_eq!(text(&back), "npm i quire");
        assert_eq!(block_attr(&back, "pnpmContent"), AttrValue::from("pnpm add quire"));
    }

    #[test]
    fn switch_is_undone_in_one_step() {
        let state = caret(r#"<div data-type="terminal-block" data-yarn-content="yarn add x">npm i x</div>"#, 3);
        let switched = run(&state, switch_package_manager(0, "yarn"));
        let undone = run(&switched, undo());
        assert_eq!(undone.doc(), state.doc());
        assert_eq!(selection(&undone), Selection::cursor(3));
    }

    #[test]
    fn not_applicable_cases() {
        let state = caret(r#"<p>x</p><div data-type="terminal-block">npm i</div>"#, 1);
        // same manager, unknown manager, stale position
        assert!(switch_package_manager(3, "npm").build(&state).is_none());
        assert!(switch_package_manager(3, "bun").build(&state).is_none());
        assert!(switch_package_manager(0, "pnpm").build(&state).is_none());
        assert!(switch_package_manager(99, "pnpm").build(&state).is_none());
    }

    #[test]
    fn cycles_from_caret() {
        let state = caret(r#"<div data-type="terminal-block" data-package-manager="yarn">yarn</div>"#, 2);
        let after = run(&state, cycle_package_manager());
        assert_eq!(block_attr(&after, "packageManager"), AttrValue::from("npm"));
    }
}
