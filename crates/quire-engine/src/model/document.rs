use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::model::node::{Attrs, Element, Node, content_size};
use crate::model::position::ResolvedPos;

/// An immutable document tree. Edits produce new documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Wrap a root element without checking it; see `Schema::check_document`.
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn from_blocks(blocks: Vec<Node>) -> Self {
        Self::new(Element::new("doc", Attrs::new(), blocks))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn blocks(&self) -> &[Node] {
        &self.root.content
    }

    /// Total number of positions inside the root.
    pub fn size(&self) -> usize {
        content_size(&self.root.content)
    }

    pub fn resolve(&self, pos: usize) -> EngineResult<ResolvedPos<'_>> {
        ResolvedPos::resolve(&self.root, pos).ok_or(EngineError::StalePosition {
            pos,
            size: self.size(),
        })
    }

    /// The node that starts exactly at `pos`.
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        ResolvedPos::resolve(&self.root, pos)?.node_after()
    }

    /// The element starting at `pos` if it has the given type.
    pub fn element_at(&self, pos: usize, node_type: &str) -> EngineResult<&Element> {
        match self.node_at(pos) {
            Some(Node::Element(el)) if el.node_type == node_type => Ok(el),
            _ => Err(EngineError::UnexpectedNode {
                pos,
                expected: node_type.to_string(),
            }),
        }
    }

    /// Visit every node with its absolute start position. Returning `false`
    /// from the callback skips that node's children.
    pub fn descendants<'a>(&'a self, mut f: impl FnMut(&'a Node, usize) -> bool) {
        visit(&self.root.content, 0, &mut f);
    }

    /// Every textblock in document order with its start position.
    pub fn textblocks(&self) -> Vec<(usize, &Element)> {
        let mut out = Vec::new();
        self.descendants(|node, pos| match node {
            Node::Element(el) if is_textblock(el) => {
                out.push((pos, el));
                false
            }
            _ => true,
        });
        out
    }

    /// Plain text with textblocks joined by `block_separator`.
    pub fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut parts = Vec::new();
        for (pos, el) in self.textblocks() {
            let start = pos + 1;
            let end = start + el.content_size();
            if end < from || start > to {
                continue;
            }
            let lo = from.max(start) - start;
            let hi = to.min(end) - start;
            parts.push(crate::model::node::text_between(&el.content, lo, hi, "\n"));
        }
        parts.join(block_separator)
    }

    /// Rebuild the document with the element at `path` replaced.
    pub(crate) fn update_element(
        &self,
        path: &[usize],
        f: impl FnOnce(&Element) -> EngineResult<Element>,
    ) -> EngineResult<Document> {
        Ok(Document::new(update_element(&self.root, path, f)?))
    }

    /// Rebuild the document with the node at `path` (non-empty) replaced.
    pub(crate) fn update_node(
        &self,
        path: &[usize],
        f: impl FnOnce(&Node) -> EngineResult<Node>,
    ) -> EngineResult<Document> {
        let Some((&last, parent_path)) = path.split_last() else {
            return Err(EngineError::UnsupportedStep("cannot replace the root node".into()));
        };
        self.update_element(parent_path, |parent| {
            let child = parent
                .content
                .get(last)
                .ok_or_else(|| EngineError::UnsupportedStep(format!("no child {last}")))?;
            let replacement = f(child)?;
            let mut updated = parent.clone();
            updated.content[last] = replacement;
            Ok(updated)
        })
    }
}

/// A textblock holds inline content directly: text, leaves, or nothing yet.
pub(crate) fn is_textblock(el: &Element) -> bool {
    el.content.iter().all(|c| !matches!(c, Node::Element(_)))
        && !matches!(
            el.node_type.as_str(),
            "doc" | "blockquote" | "bulletList" | "orderedList" | "listItem" | "table" | "tableRow"
                | "tableCell" | "tableHeader"
        )
}

fn visit<'a>(content: &'a [Node], start: usize, f: &mut impl FnMut(&'a Node, usize) -> bool) {
    let mut pos = start;
    for node in content {
        if f(node, pos)
            && let Node::Element(el) = node
        {
            visit(&el.content, pos + 1, f);
        }
        pos += node.size();
    }
}

fn update_element(
    el: &Element,
    path: &[usize],
    f: impl FnOnce(&Element) -> EngineResult<Element>,
) -> EngineResult<Element> {
    let Some((&first, rest)) = path.split_first() else {
        return f(el);
    };
    let Some(Node::Element(child)) = el.content.get(first) else {
        return Err(EngineError::UnsupportedStep(format!(
            "no element at child {first} of {}",
            el.node_type
        )));
    };
    let updated_child = update_element(child, rest, f)?;
    let mut updated = el.clone();
    updated.content[first] = Node::Element(updated_child);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn para(text: &str) -> Node {
        Node::Element(Element::new("paragraph", Attrs::new(), vec![Node::text(text)]))
    }

    #[test]
    fn node_at_finds_block_starts() {
        let doc = Document::from_blocks(vec![para("ab"), para("cd")]);
        assert_eq!(doc.size(), 8);
        assert_eq!(doc.node_at(4).map(|n| n.text_content()), Some("cd".to_string()));
        assert!(doc.node_at(2).is_none());
        assert!(doc.element_at(0, "heading").is_err());
    }

    #[test]
    fn text_between_joins_blocks() {
        let doc = Document::from_blocks(vec![para("Hello"), para("World")]);
        assert_eq!(doc.text_between(0, doc.size(), "\n\n"), "Hello\n\nWorld");
        assert_eq!(doc.text_between(3, 10, "|"), "llo|Wo");
    }

    #[test]
    fn update_node_leaves_original_untouched() {
        let doc = Document::from_blocks(vec![para("a"), para("b")]);
        let updated = doc.update_node(&[1], |_| Ok(para("c"))).unwrap();
        assert_eq!(updated.blocks()[1].text_content(), "c");
        assert_eq!(doc.blocks()[1].text_content(), "b");
    }

    #[test]
    fn stale_positions_are_reported() {
        let doc = Document::from_blocks(vec![para("a")]);
        assert_eq!(
            doc.resolve(99).unwrap_err(),
            EngineError::StalePosition { pos: 99, size: 3 }
        );
    }
}
