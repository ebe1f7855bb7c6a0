use crate::commands::Command;
use crate::model::{Attrs, Element, Node};
use crate::state::EditorState;
use crate::transform::Transaction;

const LIST_TYPES: &[&str] = &["bulletList", "orderedList"];

pub fn toggle_bullet_list() -> impl Command {
    |state: &EditorState| toggle_list(state, "bulletList")
}

pub fn toggle_ordered_list() -> impl Command {
    |state: &EditorState| toggle_list(state, "orderedList")
}

/// Wrap the caret's block in a list, switch the enclosing list's kind, or
/// unwrap the enclosing list when it already has this kind.
fn toggle_list(state: &EditorState, list_type: &str) -> Option<Transaction> {
    let schema = state.schema();
    let sel = state.selection();
    let rp = state.doc().resolve(sel.head).ok()?;

    if let Some(depth) = rp.find_ancestor(|el| LIST_TYPES.contains(&el.node_type.as_str()))
        && depth > 0
    {
        let list = rp.node(depth);
        let before = rp.before(depth);
        if !list.is(list_type) {
            return Some(Transaction::new().set_node_type(before, list_type, Attrs::new()));
        }

        // Unwrapping drops the list's opening token plus an open and close
        // per item before the caret's, and the caret item's own open
        let item = rp.index(depth);
        let shift = 2 + 2 * item;
        let blocks: Vec<Node> = list
            .content
            .iter()
            .filter_map(Node::as_element)
            .flat_map(|item| item.content.iter().cloned())
            .collect();
        let tr = Transaction::new().replace(before, rp.after(depth), blocks);
        let anchor = sel.anchor.checked_sub(shift).unwrap_or(sel.head - shift);
        return Some(tr.set_selection(anchor, sel.head - shift));
    }

    let depth = rp.depth();
    if depth == 0 {
        return None;
    }
    let block = rp.parent();
    if !schema.is_textblock(&block.node_type) || schema.is_code(&block.node_type) {
        return None;
    }
    let paragraph = as_paragraph(state, block)?;
    let item = schema.node("listItem", Attrs::new(), vec![paragraph]).ok()?;
    let list = schema.node(list_type, Attrs::new(), vec![item]).ok()?;

    let (before, after) = (rp.before(depth), rp.after(depth));
    let tr = Transaction::new().replace(before, after, vec![list]);
    let anchor = if (before..=after).contains(&sel.anchor) {
        sel.anchor + 2
    } else {
        sel.head + 2
    };
    Some(tr.set_selection(anchor, sel.head + 2))
}

/// The block's content in a paragraph, keeping its alignment.
fn as_paragraph(state: &EditorState, block: &Element) -> Option<Node> {
    let schema = state.schema();
    let mut attrs = Attrs::new();
    if let Some(align) = block.attrs.get("textAlign") {
        attrs.insert("textAlign".into(), align.clone());
    }
    schema.node("paragraph", attrs, block.content.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::model::Selection;
    use pretty_assertions::assert_eq;

    #[test]
    fn wraps_paragraph_in_bullet_list() {
        let after = run(&caret("<p>item</p>", 3), toggle_bullet_list());
        assert_eq!(html(&after), "<ul><li><p>item</p></li></ul>");
        assert_eq!(selection(&after), Selection::cursor(5));
    }

    #[test]
    fn heading_becomes_list_paragraph() {
        let after = run(&caret("<h2>item</h2>", 1), toggle_ordered_list());
        assert_eq!(html(&after), "<ol><li><p>item</p></li></ol>");
    }

    #[test]
    fn switches_list_kind() {
        let after = run(&caret("<ul><li><p>a</p></li></ul>", 3), toggle_ordered_list());
        assert_eq!(html(&after), "<ol><li><p>a</p></li></ol>");
        assert_eq!(selection(&after), Selection::cursor(3));
    }

    #[test]
    fn unwraps_whole_list() {
        // list 0, items at 1 and 6, second paragraph text from 8
        let state = caret("<ul><li><p>a</p></li><li><p>b</p></li></ul>", 8);
        let after = run(&state, toggle_bullet_list());
        assert_eq!(html(&after), "<p>a</p><p>b</p>");
        assert_eq!(selection(&after), Selection::cursor(4));
    }

    #[test]
    fn code_blocks_are_not_listed() {
        let state = caret(r#"<div data-type="terminal-block">npm i</div>"#, 1);
        assert!(toggle_bullet_list().build(&state).is_none());
    }
}
