//! Atomic document edits.
//!
//! Every step applies to a document and yields the new document, the
//! [`StepMap`] of the positions it moved, and the steps that undo it.

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::model::{
    Attrs, Document, Element, Leaf, Mark, Node, TextRun, content_size, normalize_inline, split_content,
};
use crate::schema::Schema;
use crate::transform::mapping::StepMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    InsertText {
        pos: usize,
        text: String,
        marks: Vec<Mark>,
    },
    /// Within one parent, or joining two sibling textblocks
    DeleteRange { from: usize, to: usize },
    /// Replace a range inside one parent with new content
    ReplaceRange {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },
    /// Merge attributes into the node starting at `pos`
    SetNodeAttrs { pos: usize, attrs: Attrs },
    /// Retype the element starting at `pos`, keeping its content
    SetNodeType {
        pos: usize,
        node_type: String,
        attrs: Attrs,
    },
    SetSelection { anchor: usize, head: usize },
    AddMark { from: usize, to: usize, mark: Mark },
    RemoveMark {
        from: usize,
        to: usize,
        mark_type: String,
    },
    /// Split the textblock around `pos` and `depth - 1` of its ancestors;
    /// the second textblock may change type
    Split {
        pos: usize,
        depth: usize,
        node_type: Option<String>,
    },
}

/// The outcome of applying one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub doc: Document,
    pub map: StepMap,
    /// Steps that restore the previous document, in application order
    pub inverse: Vec<Step>,
}

impl StepResult {
    fn unchanged(doc: &Document) -> Self {
        Self {
            doc: doc.clone(),
            map: StepMap::identity(),
            inverse: Vec::new(),
        }
    }
}

impl Step {
    pub fn apply(&self, schema: &Schema, doc: &Document) -> EngineResult<StepResult> {
        match self {
            Step::InsertText { pos, text, marks } => {
                if text.is_empty() {
                    return Ok(StepResult::unchanged(doc));
                }
                let run = schema.text(text, marks)?;
                replace(schema, doc, *pos, *pos, &[run])
            }
            Step::DeleteRange { from, to } => delete(schema, doc, *from, *to),
            Step::ReplaceRange { from, to, content } => replace(schema, doc, *from, *to, content),
            Step::SetNodeAttrs { pos, attrs } => set_node_attrs(schema, doc, *pos, attrs),
            Step::SetNodeType {
                pos,
                node_type,
                attrs,
            } => set_node_type(schema, doc, *pos, node_type, attrs),
            Step::SetSelection { .. } => Ok(StepResult::unchanged(doc)),
            Step::AddMark { from, to, mark } => {
                let mark = schema.mark(&mark.mark_type, mark.attrs.clone())?;
                change_marks(schema, doc, *from, *to, &mark.mark_type, &|set| {
                    schema.add_mark(set, mark.clone())
                })
            }
            Step::RemoveMark {
                from,
                to,
                mark_type,
            } => {
                schema.mark_type(mark_type)?;
                change_marks(schema, doc, *from, *to, mark_type, &|set| {
                    Ok(schema.remove_mark(set, mark_type))
                })
            }
            Step::Split {
                pos,
                depth,
                node_type,
            } => split(schema, doc, *pos, *depth, node_type.as_deref()),
        }
    }
}

fn replace(
    schema: &Schema,
    doc: &Document,
    from: usize,
    to: usize,
    content: &[Node],
) -> EngineResult<StepResult> {
    if from > to {
        return Err(EngineError::UnsupportedStep(format!("inverted range {from}..{to}")));
    }
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    if !rf.same_parent(&rt) {
        return Err(EngineError::UnsupportedStep(format!(
            "range {from}..{to} spans different parents"
        )));
    }

    let parent = rf.parent();
    let parent_type = schema.node_type(&parent.node_type)?;
    let (before, rest) = split_content(&parent.content, rf.parent_offset());
    let (removed, after) = split_content(&rest, to - from);

    for node in content {
        schema.check_node(node)?;
    }
    let new_content = normalize_inline(
        before
            .into_iter()
            .chain(content.iter().cloned())
            .chain(after)
            .collect(),
    );
    schema.check_content(parent_type, &new_content)?;

    let path = rf.path(rf.depth());
    let new_doc = doc.update_element(&path, |el| {
        Ok(Element {
            content: new_content,
            ..el.clone()
        })
    })?;

    let inserted = content_size(content);
    Ok(StepResult {
        doc: new_doc,
        map: StepMap::new(from, to - from, inserted),
        inverse: vec![Step::ReplaceRange {
            from,
            to: from + inserted,
            content: removed,
        }],
    })
}

fn delete(schema: &Schema, doc: &Document, from: usize, to: usize) -> EngineResult<StepResult> {
    if from == to {
        return Ok(StepResult::unchanged(doc));
    }
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;
    if rf.same_parent(&rt) {
        return replace(schema, doc, from, to, &[]);
    }

    // Joining two sibling textblocks
    let depth = rf.depth();
    let siblings = depth > 0
        && rt.depth() == depth
        && (0..depth - 1).all(|d| rf.index(d) == rt.index(d))
        && from < to;
    let (first, second) = (rf.parent(), rt.parent());
    if !siblings || !schema.is_textblock(&first.node_type) || !schema.is_textblock(&second.node_type) {
        return Err(EngineError::UnsupportedStep(format!(
            "cannot delete {from}..{to} across differently nested blocks"
        )));
    }

    let container_depth = depth - 1;
    let container = rf.node(container_depth);
    let (ia, ib) = (rf.index(container_depth), rt.index(container_depth));

    let (keep_first, _) = split_content(&first.content, rf.parent_offset());
    let (_, keep_second) = split_content(&second.content, rt.parent_offset());
    let joined = Element {
        content: normalize_inline(keep_first.into_iter().chain(keep_second).collect()),
        ..first.clone()
    };
    schema.check_content(schema.node_type(&joined.node_type)?, &joined.content)?;

    let original: Vec<Node> = container.content[ia..=ib].to_vec();
    let joined_size = 2 + joined.content_size();
    let mut children = container.content[..ia].to_vec();
    children.push(Node::Element(joined));
    children.extend_from_slice(&container.content[ib + 1..]);
    schema.check_content(schema.node_type(&container.node_type)?, &children)?;

    let before_first = rf.before(depth);
    let new_doc = doc.update_element(&rf.path(container_depth), |el| {
        Ok(Element {
            content: children,
            ..el.clone()
        })
    })?;

    Ok(StepResult {
        doc: new_doc,
        map: StepMap::new(from, to - from, 0),
        inverse: vec![Step::ReplaceRange {
            from: before_first,
            to: before_first + joined_size,
            content: original,
        }],
    })
}

fn node_path(doc: &Document, pos: usize) -> EngineResult<(Vec<usize>, &Node)> {
    let rp = doc.resolve(pos)?;
    let node = rp.node_after().ok_or_else(|| EngineError::UnexpectedNode {
        pos,
        expected: "node boundary".into(),
    })?;
    let depth = rp.depth();
    let mut path = rp.path(depth);
    path.push(rp.index(depth));
    Ok((path, node))
}

fn set_node_attrs(schema: &Schema, doc: &Document, pos: usize, attrs: &Attrs) -> EngineResult<StepResult> {
    let (path, node) = node_path(doc, pos)?;
    let Some(old) = node.attrs() else {
        return Err(EngineError::UnexpectedNode {
            pos,
            expected: "element or leaf".into(),
        });
    };
    let mut merged = old.clone();
    merged.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
    let merged = schema.node_attrs(node.type_name(), &merged)?;
    let inverse = Step::SetNodeAttrs {
        pos,
        attrs: old.clone(),
    };

    let new_doc = doc.update_node(&path, |node| {
        Ok(match node {
            Node::Element(el) => Node::Element(Element {
                attrs: merged,
                ..el.clone()
            }),
            Node::Leaf(leaf) => Node::Leaf(Leaf {
                attrs: merged,
                ..leaf.clone()
            }),
            Node::Text(_) => node.clone(),
        })
    })?;

    Ok(StepResult {
        doc: new_doc,
        map: StepMap::identity(),
        inverse: vec![inverse],
    })
}

fn set_node_type(
    schema: &Schema,
    doc: &Document,
    pos: usize,
    node_type: &str,
    attrs: &Attrs,
) -> EngineResult<StepResult> {
    let (path, node) = node_path(doc, pos)?;
    let Node::Element(old) = node else {
        return Err(EngineError::UnexpectedNode {
            pos,
            expected: "element".into(),
        });
    };
    let target = schema.node_type(node_type)?;
    if target.is_leaf() || target.is_text() {
        return Err(EngineError::schema(format!("cannot retype into '{node_type}'")));
    }

    // Attributes both types declare carry over
    let mut new_attrs: Attrs = old
        .attrs
        .iter()
        .filter(|(k, _)| target.has_attr(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    new_attrs.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
    let new_attrs = schema.node_attrs(node_type, &new_attrs)?;

    let content: Vec<Node> = old
        .content
        .iter()
        .map(|child| match child {
            Node::Text(run) => Node::Text(TextRun {
                text: run.text.clone(),
                marks: run
                    .marks
                    .iter()
                    .filter(|m| target.allows_mark(&m.mark_type))
                    .cloned()
                    .collect(),
            }),
            other => other.clone(),
        })
        .collect();
    let retyped = Node::Element(Element::new(node_type, new_attrs, normalize_inline(content)));
    schema.check_node(&retyped)?;

    let rp = doc.resolve(pos)?;
    let parent = rp.parent();
    let mut siblings = parent.content.clone();
    siblings[rp.index(rp.depth())] = retyped.clone();
    schema.check_content(schema.node_type(&parent.node_type)?, &siblings)?;

    let size = retyped.size();
    let inverse = Step::ReplaceRange {
        from: pos,
        to: pos + size,
        content: vec![node.clone()],
    };
    let new_doc = doc.update_node(&path, |_| Ok(retyped))?;

    Ok(StepResult {
        doc: new_doc,
        map: StepMap::identity(),
        inverse: vec![inverse],
    })
}

fn change_marks(
    schema: &Schema,
    doc: &Document,
    from: usize,
    to: usize,
    mark_type: &str,
    op: &dyn Fn(&[Mark]) -> EngineResult<Vec<Mark>>,
) -> EngineResult<StepResult> {
    if from > to || to > doc.size() {
        return Err(EngineError::StalePosition {
            pos: to,
            size: doc.size(),
        });
    }
    let mut inverse = Vec::new();
    let ctx = MarkChange {
        schema,
        from,
        to,
        mark_type,
        op,
    };
    let root = ctx.rewrite(doc.root(), 0, &mut inverse)?;
    Ok(StepResult {
        doc: Document::new(root),
        map: StepMap::identity(),
        inverse,
    })
}

struct MarkChange<'a> {
    schema: &'a Schema,
    from: usize,
    to: usize,
    mark_type: &'a str,
    op: &'a dyn Fn(&[Mark]) -> EngineResult<Vec<Mark>>,
}

impl MarkChange<'_> {
    /// `start` is the absolute position where `el`'s content starts.
    fn rewrite(&self, el: &Element, start: usize, inverse: &mut Vec<Step>) -> EngineResult<Element> {
        let end = start + el.content_size();
        if end <= self.from || start >= self.to {
            return Ok(el.clone());
        }

        let nt = self.schema.node_type(&el.node_type)?;
        if !nt.is_textblock() {
            let mut pos = start;
            let mut content = Vec::with_capacity(el.content.len());
            for child in &el.content {
                let size = child.size();
                content.push(match child {
                    Node::Element(inner) => Node::Element(self.rewrite(inner, pos + 1, inverse)?),
                    other => other.clone(),
                });
                pos += size;
            }
            return Ok(Element {
                content,
                ..el.clone()
            });
        }

        let lo = self.from.max(start) - start;
        let hi = self.to.min(end) - start;
        let (before, rest) = split_content(&el.content, lo);
        let (middle, after) = split_content(&rest, hi - lo);
        let mut content = before;
        for node in middle {
            content.push(match node {
                Node::Text(run) if nt.allows_mark(self.mark_type) => Node::Text(TextRun {
                    marks: (self.op)(&run.marks)?,
                    text: run.text,
                }),
                other => other,
            });
        }
        content.extend(after);
        let content = normalize_inline(content);

        if content != el.content {
            self.schema.check_content(nt, &content)?;
            inverse.push(Step::ReplaceRange {
                from: start,
                to: end,
                content: el.content.clone(),
            });
        }
        Ok(Element {
            content,
            ..el.clone()
        })
    }
}

fn split(
    schema: &Schema,
    doc: &Document,
    pos: usize,
    depth: usize,
    node_type: Option<&str>,
) -> EngineResult<StepResult> {
    let rp = doc.resolve(pos)?;
    let inner = rp.depth();
    let parent = rp.parent();
    if depth == 0 || inner < depth || !schema.is_textblock(&parent.node_type) {
        return Err(EngineError::UnsupportedStep(format!(
            "cannot split '{}' {depth} levels deep at {pos}",
            parent.node_type
        )));
    }

    let (left, right) = split_content(&parent.content, rp.parent_offset());
    let mut first = Element {
        content: normalize_inline(left),
        ..parent.clone()
    };
    let mut second = match node_type {
        Some(other) if other != parent.node_type => {
            // Alignment survives a retype, everything else resets
            let carried: Attrs = parent
                .attrs
                .iter()
                .filter(|(k, _)| {
                    k.as_str() == "textAlign" && schema.node_type(other).is_ok_and(|t| t.has_attr(k))
                })
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Element::new(other, schema.node_attrs(other, &carried)?, normalize_inline(right))
        }
        _ => Element {
            content: normalize_inline(right),
            ..parent.clone()
        },
    };
    schema.check_content(schema.node_type(&first.node_type)?, &first.content)?;
    schema.check_content(schema.node_type(&second.node_type)?, &second.content)?;

    // Split the enclosing elements too, innermost first
    for level in 1..depth {
        let ancestor_depth = inner - level;
        let ancestor = rp.node(ancestor_depth);
        let index = rp.index(ancestor_depth);
        let mut first_children = ancestor.content[..index].to_vec();
        first_children.push(Node::Element(first));
        let mut second_children = vec![Node::Element(second)];
        second_children.extend_from_slice(&ancestor.content[index + 1..]);
        first = Element {
            content: first_children,
            ..ancestor.clone()
        };
        second = Element {
            content: second_children,
            ..ancestor.clone()
        };
        schema.check_content(schema.node_type(&first.node_type)?, &first.content)?;
        schema.check_content(schema.node_type(&second.node_type)?, &second.content)?;
    }

    let container_depth = inner - depth;
    let container = rp.node(container_depth);
    let index = rp.index(container_depth);
    let original = container.content[index].clone();
    let before = rp.before(container_depth + 1);
    let split_size = 4 + first.content_size() + second.content_size();

    let mut children = container.content[..index].to_vec();
    children.push(Node::Element(first));
    children.push(Node::Element(second));
    children.extend_from_slice(&container.content[index + 1..]);
    schema.check_content(schema.node_type(&container.node_type)?, &children)?;

    let new_doc = doc.update_element(&rp.path(container_depth), |el| {
        Ok(Element {
            content: children,
            ..el.clone()
        })
    })?;

    Ok(StepResult {
        doc: new_doc,
        map: StepMap::new(pos, 0, 2 * depth),
        inverse: vec![Step::ReplaceRange {
            from: before,
            to: before + split_size,
            content: vec![original],
        }],
    })
}
