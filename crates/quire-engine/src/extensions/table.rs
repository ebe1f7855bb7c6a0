//! Tables: insertion with clamped dimensions and whole-table deletion.

use super::{Extension, shared};
use crate::commands::{Command, delete_node, insert_node};
use crate::model::Attrs;
use crate::state::EditorState;
use crate::transform::Transaction;

pub const MAX_ROWS: usize = 20;
pub const MAX_COLS: usize = 10;

const CELL_TYPES: &[&str] = &["tableCell", "tableHeader"];

pub const EXTENSION: Extension = Extension {
    name: "table",
    priority: 100,
    bindings: |_| vec![("Backspace", shared(delete_table_on_empty_backspace()))],
};

/// Insert a `rows` x `cols` table, clamped to `[1, 20]` x `[1, 10]`, with
/// the caret in the first cell.
pub fn insert_table(rows: usize, cols: usize, with_header_row: bool) -> impl Command {
    let rows = rows.clamp(1, MAX_ROWS);
    let cols = cols.clamp(1, MAX_COLS);
    move |state: &EditorState| -> Option<Transaction> {
        let schema = state.schema();
        let mut table_rows = Vec::with_capacity(rows);
        for r in 0..rows {
            let cell_type = if with_header_row && r == 0 {
                "tableHeader"
            } else {
                "tableCell"
            };
            let cells = (0..cols)
                .map(|_| schema.create_filled(cell_type, Attrs::new()))
                .collect::<Result<Vec<_>, _>>()
                .ok()?;
            table_rows.push(schema.node("tableRow", Attrs::new(), cells).ok()?);
        }
        let table = schema.node("table", Attrs::new(), table_rows).ok()?;
        insert_node(table).build(state)
    }
}

/// Start position of the table enclosing the caret.
fn enclosing_table(state: &EditorState) -> Option<usize> {
    let rp = state.doc().resolve(state.selection().head).ok()?;
    let depth = rp.find_ancestor(|el| el.is("table"))?;
    (depth > 0).then(|| rp.before(depth))
}

pub fn delete_table() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let pos = enclosing_table(state)?;
        delete_node(pos).build(state)
    }
}

/// Backspace at the start of a cell whose text is exactly empty deletes the
/// whole table. A cell holding only whitespace is not empty.
pub fn delete_table_on_empty_backspace() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let sel = state.selection();
        if !sel.is_empty() {
            return None;
        }
        let rp = state.doc().resolve(sel.head).ok()?;
        if rp.parent_offset() != 0 {
            return None;
        }
        let cell_depth = rp.find_ancestor(|el| CELL_TYPES.contains(&el.node_type.as_str()))?;
        if !rp.node(cell_depth).text_content().is_empty() {
            return None;
        }
        delete_table().build(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::model::{Node, Selection};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn dimensions(state: &EditorState) -> (usize, usize) {
        let table = state
            .doc()
            .blocks()
            .iter()
            .find_map(|b| b.as_element().filter(|el| el.is("table")))
            .unwrap();
        let cols = table.content[0].as_element().unwrap().content.len();
        (table.content.len(), cols)
    }

    #[rstest]
    #[case(3, 3, (3, 3))]
    #[case(0, 0, (1, 1))]
    #[case(50, 50, (20, 10))]
    fn dimensions_are_clamped(#[case] rows: usize, #[case] cols: usize, #[case] expected: (usize, usize)) {
        let after = run(&caret("<p></p>", 1), insert_table(rows, cols, false));
        assert_eq!(dimensions(&after), expected);
    }

    #[test]
    fn header_row_and_caret_in_first_cell() {
        let after = run(&caret("<p></p>", 1), insert_table(2, 2, true));
        assert_eq!(
            html(&after),
            "<table><tbody><tr><th><p></p></th><th><p></p></th></tr><tr><td><p></p></td><td><p></p></td></tr></tbody></table>"
        );
        // table 0, row 1, cell 2, paragraph 3
        assert_eq!(selection(&after), Selection::cursor(4));
    }

    #[test]
    fn backspace_in_empty_cell_deletes_table() {
        let state = caret("<p>before</p><table><tr><td><p></p></td></tr></table>", 12);
        let after = run(&state, delete_table_on_empty_backspace());
        assert_eq!(html(&after), "<p>before</p>");
        assert_eq!(selection(&after), Selection::cursor(7));
    }

    #[test]
    fn backspace_in_whitespace_cell_keeps_table() {
        let state = caret("<table><tr><td><p> </p></td></tr></table>", 4);
        assert!(delete_table_on_empty_backspace().build(&state).is_none());
        assert!(matches!(state.doc().blocks()[0], Node::Element(_)));
    }

    #[test]
    fn deleting_only_table_leaves_paragraph() {
        let state = caret("<table><tr><td><p>x</p></td></tr></table>", 4);
        assert_eq!(html(&run(&state, delete_table())), "<p></p>");
    }
}
