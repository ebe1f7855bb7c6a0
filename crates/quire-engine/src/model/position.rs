//! Resolving flat offsets against the tree.
//!
//! Entering or leaving an element costs one position, every char of text one,
//! and a leaf one. Offset 0 is the start of the root's content.

use crate::model::node::{Element, Node};

#[derive(Debug, Clone, Copy)]
struct Frame<'a> {
    node: &'a Element,
    /// Absolute offset where this element's content starts
    start: usize,
    /// Child index the position sits before (or inside)
    index: usize,
}

/// A position with the path of elements that contain it.
///
/// Depth 0 is the root. `parent()` is the innermost element whose content
/// holds the position directly.
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    frames: Vec<Frame<'a>>,
    text_offset: usize,
}

impl<'a> ResolvedPos<'a> {
    pub(crate) fn resolve(root: &'a Element, pos: usize) -> Option<Self> {
        if pos > root.content_size() {
            return None;
        }

        let mut frames = Vec::new();
        let mut node = root;
        let mut start = 0;
        loop {
            let rel = pos - start;
            let mut offset = 0;
            let mut index = node.content.len();
            let mut descend = None;
            let mut text_offset = 0;

            for (i, child) in node.content.iter().enumerate() {
                if rel == offset {
                    index = i;
                    break;
                }
                let size = child.size();
                if rel < offset + size {
                    index = i;
                    match child {
                        Node::Element(el) => descend = Some((el, start + offset + 1)),
                        Node::Text(_) => text_offset = rel - offset,
                        Node::Leaf(_) => {}
                    }
                    break;
                }
                offset += size;
            }

            frames.push(Frame { node, start, index });
            match descend {
                Some((el, inner_start)) => {
                    node = el;
                    start = inner_start;
                }
                None => {
                    return Some(Self {
                        pos,
                        frames,
                        text_offset,
                    });
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// The innermost element containing the position.
    pub fn parent(&self) -> &'a Element {
        self.frames[self.depth()].node
    }

    pub fn node(&self, depth: usize) -> &'a Element {
        self.frames[depth].node
    }

    /// Absolute offset where the content of the element at `depth` starts.
    pub fn start(&self, depth: usize) -> usize {
        self.frames[depth].start
    }

    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Position directly before the element at `depth` (depth >= 1).
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth) - 1
    }

    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    /// Child index within the element at `depth`.
    pub fn index(&self, depth: usize) -> usize {
        self.frames[depth].index
    }

    pub fn parent_offset(&self) -> usize {
        self.pos - self.start(self.depth())
    }

    /// Offset into the text run the position splits, 0 on a boundary.
    pub fn text_offset(&self) -> usize {
        self.text_offset
    }

    /// Child indices from the root down to the element at `depth`.
    pub fn path(&self, depth: usize) -> Vec<usize> {
        self.frames[..depth].iter().map(|f| f.index).collect()
    }

    /// The child starting exactly at this position, if any.
    pub fn node_after(&self) -> Option<&'a Node> {
        if self.text_offset > 0 {
            return None;
        }
        self.parent().content.get(self.index(self.depth()))
    }

    /// True when both positions sit directly in the same element.
    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.depth() == other.depth()
            && (0..self.depth()).all(|d| self.index(d) == other.index(d))
    }

    /// Deepest depth whose element satisfies `pred`.
    pub fn find_ancestor(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        (0..=self.depth()).rev().find(|&d| pred(self.node(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::{Attrs, Element, Node};

    fn doc() -> Element {
        // <p>ab</p><table><tr><td><p>c</p></td></tr></table>
        let para = |t: &str| Node::Element(Element::new("paragraph", Attrs::new(), vec![Node::text(t)]));
        let cell = Node::Element(Element::new("tableCell", Attrs::new(), vec![para("c")]));
        let row = Node::Element(Element::new("tableRow", Attrs::new(), vec![cell]));
        let table = Node::Element(Element::new("table", Attrs::new(), vec![row]));
        Element::new("doc", Attrs::new(), vec![para("ab"), table])
    }

    #[test]
    fn resolves_inside_text() {
        let root = doc();
        let rp = ResolvedPos::resolve(&root, 2).unwrap();
        assert_eq!(rp.depth(), 1);
        assert_eq!(rp.parent().node_type, "paragraph");
        assert_eq!(rp.parent_offset(), 1);
        assert_eq!(rp.text_offset(), 1);
        assert_eq!(rp.before(1), 0);
        assert_eq!(rp.after(1), 4);
    }

    #[test]
    fn resolves_between_blocks_at_root() {
        let root = doc();
        let rp = ResolvedPos::resolve(&root, 4).unwrap();
        assert_eq!(rp.depth(), 0);
        assert_eq!(rp.index(0), 1);
        assert_eq!(rp.node_after().map(|n| n.type_name()), Some("table"));
    }

    #[test]
    fn resolves_deep_into_table_cell() {
        let root = doc();
        // table 4, row 5, cell 6, paragraph 7, text at 8
        let rp = ResolvedPos::resolve(&root, 8).unwrap();
        assert_eq!(rp.depth(), 4);
        assert_eq!(rp.parent().node_type, "paragraph");
        assert_eq!(rp.find_ancestor(|el| el.is("tableCell")), Some(3));
        assert_eq!(rp.path(4), vec![1, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_does_not_resolve() {
        let root = doc();
        assert!(ResolvedPos::resolve(&root, root.content_size() + 1).is_none());
        assert!(ResolvedPos::resolve(&root, root.content_size()).is_some());
    }
}
