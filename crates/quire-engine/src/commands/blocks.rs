use crate::commands::query::{is_active, selected_textblocks};
use crate::commands::{Command, caret_near, first_text_offset};
use crate::model::{AttrValue, Attrs, Node, attrs};
use crate::schema::blog::TEXT_ALIGNMENTS;
use crate::state::EditorState;
use crate::transform::Transaction;

/// Retype every selected textblock. Code blocks keep their type.
pub fn set_block_type(node_type: &str, block_attrs: Attrs) -> impl Command + use<> {
    let node_type = node_type.to_string();
    move |state: &EditorState| -> Option<Transaction> {
        let schema = state.schema();
        schema.node_type(&node_type).ok()?;
        let blocks: Vec<_> = selected_textblocks(state)
            .into_iter()
            .filter(|(_, el)| !schema.is_code(&el.node_type))
            .collect();
        if blocks.is_empty() {
            return None;
        }
        // retyping keeps sizes, so positions stay valid between steps
        let tr = blocks.iter().fold(Transaction::new(), |tr, (pos, _)| {
            tr.set_node_type(*pos, node_type.clone(), block_attrs.clone())
        });
        Some(tr)
    }
}

pub fn set_paragraph() -> impl Command {
    set_block_type("paragraph", Attrs::new())
}

/// Heading at `level`, or back to a paragraph when already one.
pub fn toggle_heading(level: i64) -> impl Command {
    move |state: &EditorState| -> Option<Transaction> {
        if !(1..=3).contains(&level) {
            return None;
        }
        let level_attrs = attrs([("level", level.into())]);
        let all_headings = selected_textblocks(state)
            .iter()
            .all(|(_, el)| el.is("heading") && el.attr("level") == &AttrValue::Int(level));
        if all_headings && is_active(state, "heading", &level_attrs) {
            set_paragraph().build(state)
        } else {
            set_block_type("heading", level_attrs).build(state)
        }
    }
}

/// Align every selected block that has an alignment.
pub fn set_text_align(align: &str) -> impl Command + use<> {
    let align = align.to_string();
    move |state: &EditorState| -> Option<Transaction> {
        if !TEXT_ALIGNMENTS.contains(&align.as_str()) {
            return None;
        }
        let schema = state.schema();
        let tr = selected_textblocks(state)
            .iter()
            .filter(|(_, el)| schema.node_type(&el.node_type).is_ok_and(|t| t.has_attr("textAlign")))
            .fold(Transaction::new(), |tr, (pos, _)| {
                tr.set_node_attrs(*pos, attrs([("textAlign", align.as_str().into())]))
            });
        (!tr.is_empty()).then_some(tr)
    }
}

/// Insert a block node after the top-level block holding the caret, or in
/// place of it when that block is an empty paragraph.
pub fn insert_node(node: Node) -> impl Command {
    move |state: &EditorState| -> Option<Transaction> {
        let rp = state.doc().resolve(state.selection().head).ok()?;
        let (from, to) = if rp.depth() == 0 {
            (rp.pos, rp.pos)
        } else {
            let top = rp.node(1);
            if top.is("paragraph") && top.content.is_empty() {
                (rp.before(1), rp.after(1))
            } else {
                (rp.after(1), rp.after(1))
            }
        };
        let tr = Transaction::new().replace(from, to, vec![node.clone()]);
        let caret = match first_text_offset(state, &node) {
            Some(offset) => from + offset,
            None => {
                let scratch = state.apply(&tr).ok()?;
                caret_near(scratch.state.doc(), from + node.size())
            }
        };
        Some(tr.set_selection(caret, caret))
    }
}

/// Insert an empty, filled instance of `node_type`.
pub fn insert_block(node_type: &str, block_attrs: Attrs) -> impl Command + use<> {
    let node_type = node_type.to_string();
    move |state: &EditorState| -> Option<Transaction> {
        let node = state.schema().create_filled(&node_type, block_attrs.clone()).ok()?;
        insert_node(node).build(state)
    }
}

/// Delete the node starting at `pos`. A container left empty against its
/// content model gets a fresh paragraph.
pub fn delete_node(pos: usize) -> impl Command {
    move |state: &EditorState| -> Option<Transaction> {
        let schema = state.schema();
        let doc = state.doc();
        let rp = doc.resolve(pos).ok()?;
        let node = rp.node_after()?;
        let end = pos + node.size();

        let parent = rp.parent();
        let parent_type = schema.node_type(&parent.node_type).ok()?;
        let mut remaining = parent.content.clone();
        remaining.remove(rp.index(rp.depth()));
        let replacement = if schema.check_content(parent_type, &remaining).is_ok() {
            Vec::new()
        } else {
            vec![schema.node("paragraph", Attrs::new(), Vec::new()).ok()?]
        };

        let tr = Transaction::new().replace(pos, end, replacement);
        let scratch = state.apply(&tr).ok()?;
        let caret = caret_near(scratch.state.doc(), pos);
        Some(tr.set_selection(caret, caret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::model::Selection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("<p>Title</p>", 1, "<h1>Title</h1>")]
    #[case("<h1>Title</h1>", 1, "<p>Title</p>")]
    #[case("<h2>Title</h2>", 1, "<h1>Title</h1>")]
    fn heading_toggles(#[case] input: &str, #[case] level: i64, #[case] expected: &str) {
        assert_eq!(html(&run(&caret(input, 2), toggle_heading(level))), expected);
    }

    #[rstest]
    #[case::terminal(r#"<div data-type="terminal-block">npm i</div>"#)]
    #[case::file_code(r#"<pre data-type="file-code-block"><code>let a;</code></pre>"#)]
    fn code_blocks_are_not_retyped(#[case] input: &str) {
        let state = caret(input, 2);
        assert!(toggle_heading(1).build(&state).is_none());
        assert!(set_paragraph().build(&state).is_none());
    }

    #[test]
    fn retyping_a_mixed_selection_skips_code_blocks() {
        let state = state(r#"<p>a</p><div data-type="terminal-block">npm i</div>"#, 1, 6);
        assert_eq!(
            html(&run(&state, toggle_heading(1))),
            r#"<h1>a</h1><div data-type="terminal-block" data-package-manager="npm">npm i</div>"#
        );
    }

    #[test]
    fn heading_keeps_alignment() {
        let state = caret(r#"<p style="text-align: center">Hi</p>"#, 1);
        assert_eq!(
            html(&run(&state, toggle_heading(2))),
            r#"<h2 style="text-align: center">Hi</h2>"#
        );
    }

    #[test]
    fn align_over_multiple_blocks() {
        let state = state("<p>a</p><h1>b</h1>", 1, 5);
        assert_eq!(
            html(&run(&state, set_text_align("right"))),
            r#"<p style="text-align: right">a</p><h1 style="text-align: right">b</h1>"#
        );
    }

    #[test]
    fn unknown_alignment_is_refused() {
        assert!(set_text_align("middle").build(&caret("<p>a</p>", 1)).is_none());
    }

    #[test]
    fn insert_block_replaces_empty_paragraph() {
        let state = caret("<p></p>", 1);
        let after = run(&state, insert_block("terminalBlock", Attrs::new()));
        assert_eq!(
            html(&after),
            r#"<div data-type="terminal-block" data-package-manager="npm"></div>"#
        );
        assert_eq!(selection(&after), Selection::cursor(1));
    }

    #[test]
    fn insert_block_goes_after_current_block() {
        let state = caret("<p>intro</p>", 3);
        let after = run(&state, insert_block("fileCodeBlock", Attrs::new()));
        assert_eq!(after.doc().blocks()[1].type_name(), "fileCodeBlock");
        assert_eq!(selection(&after), Selection::cursor(8));
    }

    #[test]
    fn delete_last_block_leaves_a_paragraph() {
        let state = caret("<hr>", 0);
        let after = run(&state, delete_node(0));
        assert_eq!(html(&after), "<p></p>");
        assert_eq!(selection(&after), Selection::cursor(1));
    }

    #[test]
    fn delete_node_moves_caret_to_next_block() {
        let state = caret("<p>a</p><hr><p>b</p>", 1);
        let after = run(&state, delete_node(3));
        assert_eq!(html(&after), "<p>a</p><p>b</p>");
        assert_eq!(selection(&after), Selection::cursor(4));
    }
}
