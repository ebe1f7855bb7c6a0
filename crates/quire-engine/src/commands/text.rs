use crate::commands::Command;
use crate::model::{Attrs, Mark, Node, ResolvedPos};
use crate::state::EditorState;
use crate::transform::{Step, Transaction};

/// Marks typed text picks up: the inclusive marks of the text before the
/// caret, or after it at the start of a block.
fn typing_marks(state: &EditorState, rp: &ResolvedPos<'_>) -> Vec<Mark> {
    let schema = state.schema();
    let parent = rp.parent();
    if schema.is_code(&parent.node_type) {
        return Vec::new();
    }
    let probe = rp.parent_offset().saturating_sub(1);
    let mut pos = 0;
    for child in &parent.content {
        let size = child.size();
        if probe < pos + size {
            let Node::Text(run) = child else {
                return Vec::new();
            };
            return run
                .marks
                .iter()
                .filter(|m| schema.mark_type(&m.mark_type).is_ok_and(|t| t.def.inclusive))
                .cloned()
                .collect();
        }
        pos += size;
    }
    Vec::new()
}

/// Replace the selection with `text`.
pub fn insert_text(text: impl Into<String>) -> impl Command {
    let text = text.into();
    move |state: &EditorState| -> Option<Transaction> {
        if text.is_empty() {
            return None;
        }
        let sel = state.selection();
        let rp = state.doc().resolve(sel.from()).ok()?;
        if !state.schema().is_textblock(&rp.parent().node_type) {
            return None;
        }
        let marks = typing_marks(state, &rp);
        let mut tr = Transaction::new();
        if !sel.is_empty() {
            tr = tr.delete(sel.from(), sel.to());
        }
        Some(tr.insert_text(sel.from(), text.clone(), marks))
    }
}

pub fn delete_selection() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        (!sel.is_empty()).then(|| Transaction::new().delete(sel.from(), sel.to()))
    }
}

/// Backspace: delete the selection, the character before the caret, or join
/// with the previous textblock when the caret is at a block start.
pub fn delete_backward() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        if !sel.is_empty() {
            return Some(Transaction::new().delete(sel.from(), sel.to()));
        }
        let head = sel.head;
        let rp = state.doc().resolve(head).ok()?;
        let schema = state.schema();
        if !schema.is_textblock(&rp.parent().node_type) {
            return None;
        }
        if rp.parent_offset() > 0 {
            return Some(Transaction::new().delete(head - 1, head));
        }

        let depth = rp.depth();
        let index = rp.index(depth - 1);
        if index == 0 {
            return None;
        }
        let previous = rp.node(depth - 1).content[index - 1].as_element()?;
        if !schema.is_textblock(&previous.node_type) {
            return None;
        }
        Some(Transaction::new().delete(head - 2, head))
    }
}

/// Enter outside code: split the textblock (and its list item, when it is
/// the item's first paragraph).
pub fn split_block() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        let schema = state.schema();
        let rf = state.doc().resolve(sel.from()).ok()?;
        let rt = state.doc().resolve(sel.to()).ok()?;
        let parent = rf.parent();
        if !schema.is_textblock(&parent.node_type) || schema.is_code(&parent.node_type) {
            return None;
        }

        let depth = rf.depth();
        let in_list_item = depth >= 2
            && rf.node(depth - 1).is("listItem")
            && rf.index(depth - 1) == 0;
        let at_end = rt.parent_offset() == rt.parent().content_size();
        let node_type = (at_end && !parent.is("paragraph")).then(|| "paragraph".to_string());

        let mut tr = Transaction::new();
        if !sel.is_empty() {
            tr = tr.delete(sel.from(), sel.to());
        }
        Some(tr.step(Step::Split {
            pos: sel.from(),
            depth: if in_list_item { 2 } else { 1 },
            node_type,
        }))
    }
}

/// Shift-Enter: a line break inside the block.
pub fn insert_hard_break() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        let schema = state.schema();
        let rp = state.doc().resolve(sel.from()).ok()?;
        let parent = rp.parent();
        if !schema.is_textblock(&parent.node_type) || schema.is_code(&parent.node_type) {
            return None;
        }
        let node = schema.node("hardBreak", Attrs::new(), Vec::new()).ok()?;
        let mut tr = Transaction::new();
        if !sel.is_empty() {
            tr = tr.delete(sel.from(), sel.to());
        }
        Some(tr.replace(sel.from(), sel.from(), vec![node]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::model::Selection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn typing_replaces_selection() {
        let state = state("<p>Hello world</p>", 7, 12);
        let after = run(&state, insert_text("there"));
        assert_eq!(html(&after), "<p>Hello there</p>");
        assert_eq!(selection(&after), Selection::cursor(12));
    }

    #[test]
    fn typing_continues_bold_but_not_link() {
        let state = caret("<p><strong>bold</strong></p>", 5);
        assert_eq!(html(&run(&state, insert_text("er"))), "<p><strong>bolder</strong></p>");

        let state = caret(r#"<p><a href="/x">link</a></p>"#, 5);
        assert_eq!(
            html(&run(&state, insert_text("!"))),
            r#"<p><a href="/x" target="_blank" rel="noopener noreferrer nofollow">link</a>!</p>"#
        );
    }

    #[rstest]
    #[case("<p>abc</p>", 4, "<p>ab</p>")]
    #[case("<p>ab</p><p>cd</p>", 5, "<p>abcd</p>")]
    #[case("<p>a<br>b</p>", 3, "<p>ab</p>")]
    fn backspace(#[case] input: &str, #[case] pos: usize, #[case] expected: &str) {
        assert_eq!(html(&run(&caret(input, pos), delete_backward())), expected);
    }

    #[test]
    fn backspace_at_document_start_does_nothing() {
        assert!(delete_backward().build(&caret("<p>ab</p>", 1)).is_none());
    }

    #[test]
    fn enter_splits_paragraph_and_moves_caret() {
        let after = run(&caret("<p>HelloWorld</p>", 6), split_block());
        assert_eq!(html(&after), "<p>Hello</p><p>World</p>");
        assert_eq!(selection(&after), Selection::cursor(8));
    }

    #[test]
    fn enter_at_end_of_heading_starts_a_paragraph() {
        let after = run(&caret("<h2>Title</h2>", 6), split_block());
        assert_eq!(html(&after), "<h2>Title</h2><p></p>");
    }

    #[test]
    fn enter_in_list_item_creates_new_item() {
        let after = run(&caret("<ul><li><p>onetwo</p></li></ul>", 6), split_block());
        assert_eq!(html(&after), "<ul><li><p>one</p></li><li><p>two</p></li></ul>");
        assert_eq!(selection(&after), Selection::cursor(10));
    }

    #[test]
    fn shift_enter_inserts_hard_break() {
        let after = run(&caret("<p>ab</p>", 2), insert_hard_break());
        assert_eq!(html(&after), "<p>a<br>b</p>");
        assert_eq!(selection(&after), Selection::cursor(3));
    }

    #[test]
    fn enter_does_not_split_code_blocks() {
        let state = caret(r#"<div data-type="terminal-block" data-package-manager="npm">npm i</div>"#, 2);
        assert!(split_block().build(&state).is_none());
    }
}
