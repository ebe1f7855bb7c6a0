use std::collections::BTreeMap;

use serde::Serialize;

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// The value as it appears in an HTML attribute, `None` for null.
    pub fn to_html_value(&self) -> Option<String> {
        match self {
            AttrValue::Null => None,
            AttrValue::Bool(b) => Some(b.to_string()),
            AttrValue::Int(i) => Some(i.to_string()),
            AttrValue::Str(s) => Some(s.clone()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(AttrValue::Null)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

/// Build an attribute map from literal pairs.
pub fn attrs<const N: usize>(pairs: [(&str, AttrValue); N]) -> Attrs {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

/// An inline annotation on a text run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mark {
    pub mark_type: String,
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(mark_type: impl Into<String>) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(mark_type: impl Into<String>, attrs: Attrs) -> Self {
        Self {
            mark_type: mark_type.into(),
            attrs,
        }
    }

    pub fn is(&self, mark_type: &str) -> bool {
        self.mark_type == mark_type
    }
}

/// A node with children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Element {
    pub node_type: String,
    pub attrs: Attrs,
    pub content: Vec<Node>,
}

/// An atom: a node that occupies exactly one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaf {
    pub node_type: String,
    pub attrs: Attrs,
}

/// Text with a mark set in schema rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextRun {
    pub text: String,
    pub marks: Vec<Mark>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Element(Element),
    Leaf(Leaf),
    Text(TextRun),
}

impl Element {
    pub fn new(node_type: impl Into<String>, attrs: Attrs, content: Vec<Node>) -> Self {
        Self {
            node_type: node_type.into(),
            attrs,
            content,
        }
    }

    pub fn attr(&self, name: &str) -> &AttrValue {
        self.attrs.get(name).unwrap_or(&AttrValue::Null)
    }

    pub fn content_size(&self) -> usize {
        content_size(&self.content)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.content {
            child.collect_text(&mut out);
        }
        out
    }

    /// Offset of child `index` relative to this element's content start.
    pub fn child_offset(&self, index: usize) -> usize {
        content_size(&self.content[..index.min(self.content.len())])
    }

    pub fn is(&self, node_type: &str) -> bool {
        self.node_type == node_type
    }
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextRun {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(TextRun {
            text: text.into(),
            marks,
        })
    }

    /// Flat size: 2 + content for elements, 1 for leaves, chars for text.
    pub fn size(&self) -> usize {
        match self {
            Node::Element(el) => 2 + el.content_size(),
            Node::Leaf(_) => 1,
            Node::Text(run) => run.text.chars().count(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Node::Element(el) => &el.node_type,
            Node::Leaf(leaf) => &leaf.node_type,
            Node::Text(_) => "text",
        }
    }

    pub fn attrs(&self) -> Option<&Attrs> {
        match self {
            Node::Element(el) => Some(&el.attrs),
            Node::Leaf(leaf) => Some(&leaf.attrs),
            Node::Text(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Node::Text(run) => Some(run),
            _ => None,
        }
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => {
                for child in &el.content {
                    child.collect_text(out);
                }
            }
            Node::Leaf(_) => {}
            Node::Text(run) => out.push_str(&run.text),
        }
    }
}

pub fn content_size(content: &[Node]) -> usize {
    content.iter().map(Node::size).sum()
}

/// Byte index of the `n`th char, or the end of the string.
pub(crate) fn char_to_byte(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Merge adjacent text runs with equal marks and drop empty ones.
pub fn normalize_inline(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if let Node::Text(run) = &node {
            if run.text.is_empty() {
                continue;
            }
            if let Some(Node::Text(prev)) = out.last_mut()
                && prev.marks == run.marks
            {
                prev.text.push_str(&run.text);
                continue;
            }
        }
        out.push(node);
    }
    out
}

/// Split a content list at a flat offset.
///
/// The offset must fall on a child boundary or inside a text run; offsets
/// inside an element are clamped to the element's start.
pub fn split_content(content: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;
    for node in content {
        let size = node.size();
        if pos + size <= offset {
            before.push(node.clone());
        } else if pos >= offset {
            after.push(node.clone());
        } else if let Node::Text(run) = node {
            let cut = char_to_byte(&run.text, offset - pos);
            before.push(Node::marked_text(&run.text[..cut], run.marks.clone()));
            after.push(Node::marked_text(&run.text[cut..], run.marks.clone()));
        } else {
            after.push(node.clone());
        }
        pos += size;
    }
    (before, after)
}

/// Text between two offsets of a content list, leaves rendered with `leaf_text`.
pub fn text_between(content: &[Node], from: usize, to: usize, leaf_text: &str) -> String {
    let (_, tail) = split_content(content, from);
    let (middle, _) = split_content(&tail, to.saturating_sub(from));
    let mut out = String::new();
    for node in &middle {
        match node {
            Node::Leaf(_) => out.push_str(leaf_text),
            other => out.push_str(&other.text_content()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bold() -> Mark {
        Mark::new("bold")
    }

    #[test]
    fn sizes_follow_flat_offsets() {
        let para = Node::Element(Element::new(
            "paragraph",
            Attrs::new(),
            vec![Node::text("héllo")],
        ));
        assert_eq!(para.size(), 7);
        let leaf = Node::Leaf(Leaf {
            node_type: "hardBreak".into(),
            attrs: Attrs::new(),
        });
        assert_eq!(leaf.size(), 1);
    }

    #[test]
    fn normalize_merges_equal_marks_and_drops_empty() {
        let content = vec![
            Node::text("a"),
            Node::text(""),
            Node::text("b"),
            Node::marked_text("c", vec![bold()]),
            Node::marked_text("d", vec![bold()]),
        ];
        assert_eq!(
            normalize_inline(content),
            vec![Node::text("ab"), Node::marked_text("cd", vec![bold()])]
        );
    }

    #[test]
    fn split_inside_text_run() {
        let content = vec![Node::text("hello"), Node::marked_text("world", vec![bold()])];
        let (before, after) = split_content(&content, 7);
        assert_eq!(
            before,
            vec![Node::text("hello"), Node::marked_text("wo", vec![bold()])]
        );
        assert_eq!(after, vec![Node::marked_text("rld", vec![bold()])]);
    }

    #[test]
    fn text_between_spans_runs() {
        let content = vec![Node::text("hello"), Node::marked_text("world", vec![bold()])];
        assert_eq!(text_between(&content, 3, 8, ""), "lowor");
    }

    #[test]
    fn attr_values_from_options() {
        assert_eq!(AttrValue::from(Some(3i64)), AttrValue::Int(3));
        assert_eq!(AttrValue::from(None::<i64>), AttrValue::Null);
    }
}
