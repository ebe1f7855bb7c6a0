//! Read-only questions about a state: what is active, what can run.

use crate::commands::Command;
use crate::model::{Attrs, Element, Node, TextRun, split_content};
use crate::state::EditorState;

/// Node types inside which inline formatting is unavailable.
const NO_FORMATTING: &[&str] = &["fileCodeBlock", "terminalBlock", "table"];

/// Textblocks touched by the selection, with their start positions.
pub(crate) fn selected_textblocks(state: &EditorState) -> Vec<(usize, &Element)> {
    let sel = state.selection();
    state
        .doc()
        .textblocks()
        .into_iter()
        .filter(|(pos, el)| *pos < sel.to().max(sel.from() + 1) && pos + 1 + el.content_size() >= sel.from())
        .collect()
}

/// Text runs between `from` and `to`, clipped to the range, with the
/// textblock holding each.
pub(crate) fn text_runs_between(state: &EditorState, from: usize, to: usize) -> Vec<(&Element, TextRun)> {
    let mut out = Vec::new();
    for (pos, el) in state.doc().textblocks() {
        let start = pos + 1;
        let end = start + el.content_size();
        if end <= from || start >= to {
            continue;
        }
        let (_, tail) = split_content(&el.content, from.max(start) - start);
        let (middle, _) = split_content(&tail, to.min(end) - from.max(start));
        out.extend(middle.into_iter().filter_map(|node| match node {
            Node::Text(run) => Some((el, run)),
            _ => None,
        }));
    }
    out
}

/// The run the caret "stands on": the one before it, or after it at the
/// start of a block.
pub(crate) fn run_at(state: &EditorState, pos: usize) -> Option<TextRun> {
    let rp = state.doc().resolve(pos).ok()?;
    let parent = rp.parent();
    let probe = rp.parent_offset().saturating_sub(1);
    let mut offset = 0;
    for child in &parent.content {
        let size = child.size();
        if probe < offset + size {
            return child.as_text().cloned();
        }
        offset += size;
    }
    None
}

/// Extent of the contiguous runs around `pos` carrying an equal mark of
/// `mark_type`.
pub(crate) fn mark_range(state: &EditorState, pos: usize, mark_type: &str) -> Option<(usize, usize)> {
    let rp = state.doc().resolve(pos).ok()?;
    let parent = rp.parent();
    let start = rp.start(rp.depth());

    let mut ranges: Vec<(usize, usize, &crate::model::Mark)> = Vec::new();
    let mut offset = start;
    for child in &parent.content {
        let size = child.size();
        if let Node::Text(run) = child
            && let Some(mark) = run.marks.iter().find(|m| m.is(mark_type))
        {
            match ranges.last_mut() {
                Some((_, end, prev)) if *end == offset && *prev == mark => *end = offset + size,
                _ => ranges.push((offset, offset + size, mark)),
            }
        }
        offset += size;
    }
    ranges
        .iter()
        .find(|(from, to, _)| *from < pos && pos <= *to)
        .or_else(|| ranges.iter().find(|(from, to, _)| *from <= pos && pos < *to))
        .map(|(from, to, _)| (*from, *to))
}

fn attrs_match(actual: &Attrs, wanted: &Attrs) -> bool {
    wanted.iter().all(|(k, v)| actual.get(k) == Some(v))
}

/// Whether the selection sits in a node of `node_type` whose attributes
/// include `attrs`.
pub fn is_active(state: &EditorState, node_type: &str, attrs: &Attrs) -> bool {
    let blocks = selected_textblocks(state);
    if !blocks.is_empty() && blocks.iter().all(|(_, el)| el.is(node_type) && attrs_match(&el.attrs, attrs)) {
        return true;
    }
    let Ok(rp) = state.doc().resolve(state.selection().head) else {
        return false;
    };
    (1..=rp.depth()).any(|d| {
        let el = rp.node(d);
        el.is(node_type) && attrs_match(&el.attrs, attrs)
    })
}

/// True at a caret when typed text would carry the mark, and over a range
/// when every text run in it does.
pub fn is_mark_active(state: &EditorState, mark_type: &str) -> bool {
    let sel = state.selection();
    if sel.is_empty() {
        return run_at(state, sel.head).is_some_and(|run| run.marks.iter().any(|m| m.is(mark_type)));
    }
    let runs = text_runs_between(state, sel.from(), sel.to());
    !runs.is_empty() && runs.iter().all(|(_, run)| run.marks.iter().any(|m| m.is(mark_type)))
}

/// Attributes of the first `mark_type` mark at the caret or in the selection.
pub fn mark_attrs(state: &EditorState, mark_type: &str) -> Option<Attrs> {
    let sel = state.selection();
    let find = |run: &TextRun| run.marks.iter().find(|m| m.is(mark_type)).map(|m| m.attrs.clone());
    if sel.is_empty() {
        return run_at(state, sel.head).as_ref().and_then(find);
    }
    text_runs_between(state, sel.from(), sel.to())
        .iter()
        .find_map(|(_, run)| find(run))
}

/// Inline formatting is off inside code blocks and tables.
pub fn formatting_disabled(state: &EditorState) -> bool {
    let Ok(rp) = state.doc().resolve(state.selection().head) else {
        return true;
    };
    (1..=rp.depth()).any(|d| NO_FORMATTING.contains(&rp.node(d).node_type.as_str()))
}

/// Dry run: the command applies and its transaction commits cleanly.
pub fn can(state: &EditorState, command: &dyn Command) -> bool {
    command
        .build(state)
        .is_some_and(|tr| state.apply(&tr).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::*;
    use crate::commands::{insert_text, toggle_mark};
    use crate::model::{AttrValue, attrs};

    #[test]
    fn heading_level_is_part_of_activity() {
        let state = caret("<h2>Title</h2>", 2);
        assert!(is_active(&state, "heading", &attrs([("level", 2i64.into())])));
        assert!(!is_active(&state, "heading", &attrs([("level", 1i64.into())])));
        assert!(!is_active(&state, "paragraph", &Attrs::new()));
    }

    #[test]
    fn list_activity_comes_from_ancestors() {
        let state = caret("<ul><li><p>one</p></li></ul>", 4);
        assert!(is_active(&state, "bulletList", &Attrs::new()));
        assert!(!is_active(&state, "orderedList", &Attrs::new()));
    }

    #[test]
    fn mark_activity_over_range_needs_every_run() {
        let inside = state("<p><strong>ab</strong>cd</p>", 1, 3);
        assert!(is_mark_active(&inside, "bold"));
        let across = state("<p><strong>ab</strong>cd</p>", 1, 5);
        assert!(!is_mark_active(&across, "bold"));
    }

    #[test]
    fn link_attrs_at_caret() {
        let state = caret(r#"<p><a href="https://example.com">site</a></p>"#, 3);
        let attrs = mark_attrs(&state, "link").unwrap();
        assert_eq!(attrs["href"], AttrValue::from("https://example.com"));
        assert_eq!(mark_range(&state, 3, "link"), Some((1, 5)));
    }

    #[test]
    fn formatting_is_disabled_in_code_and_tables() {
        let code = caret(r#"<pre data-type="file-code-block"><code>let x</code></pre>"#, 2);
        assert!(formatting_disabled(&code));
        let table = caret("<table><tr><td><p>x</p></td></tr></table>", 4);
        assert!(formatting_disabled(&table));
        assert!(!formatting_disabled(&caret("<p>x</p>", 1)));
    }

    #[test]
    fn can_reports_without_changing_state() {
        let state = caret("<p>x</p>", 1);
        assert!(can(&state, &insert_text("y")));
        assert!(!can(&state, &toggle_mark("bold")));
        assert_eq!(html(&state), "<p>x</p>");
    }
}
