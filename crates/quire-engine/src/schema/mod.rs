//! # Schema - the node and mark type registry
//!
//! Node and mark types are plain data records ([`NodeTypeDef`],
//! [`MarkTypeDef`]) registered through a [`SchemaBuilder`]. The resulting
//! [`Schema`] is a lookup table that validation, HTML parsing and HTML
//! rendering are driven from. Deriving a type from another one is a struct
//! update:
//!
//! ```
//! use quire_engine::schema::{NodeTypeDef, blog};
//!
//! let aside = NodeTypeDef {
//!     name: "aside",
//!     ..blog::PARAGRAPH
//! };
//! assert_eq!(aside.content, "inline*");
//! ```

pub mod blog;
pub mod content;

use std::collections::HashMap;

use quire_syntax::HtmlElement;

use crate::error::{EngineError, EngineResult};
use crate::model::{AttrValue, Attrs, Document, Element, Leaf, Mark, Node, TextRun};
use content::ContentExpr;

/// Compile-time attribute default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrDefault {
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
}

impl AttrDefault {
    pub fn value(&self) -> AttrValue {
        match *self {
            AttrDefault::Null => AttrValue::Null,
            AttrDefault::Bool(b) => AttrValue::Bool(b),
            AttrDefault::Int(i) => AttrValue::Int(i),
            AttrDefault::Str(s) => AttrValue::Str(s.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub default: AttrDefault,
}

/// Which marks text directly inside a node may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkAllowance {
    All,
    None,
    Only(&'static [&'static str]),
}

/// Marks a mark type cannot coexist with. A mark never coexists with
/// another mark of its own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Excludes {
    Nothing,
    All,
    Only(&'static [&'static str]),
}

/// Matches an HTML element and extracts attributes from it.
#[derive(Debug, Clone, Copy)]
pub struct ParseRule {
    pub tag: &'static str,
    pub matches: fn(&HtmlElement) -> bool,
    pub attrs: fn(&HtmlElement) -> Attrs,
}

impl ParseRule {
    pub fn applies(&self, el: &HtmlElement) -> bool {
        self.tag == el.tag && (self.matches)(el)
    }
}

/// Output shape of a render rule. `Hole` marks where content goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomSpec {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<DomSpec>,
    },
    Text(String),
    Hole,
}

impl DomSpec {
    pub fn element(tag: &str) -> Self {
        DomSpec::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        if let DomSpec::Element { attrs, .. } = &mut self {
            attrs.push((name.to_string(), value.into()));
        }
        self
    }

    pub fn child(mut self, child: DomSpec) -> Self {
        if let DomSpec::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    /// Shorthand for an element whose only child is the content hole.
    pub fn wrap(tag: &str) -> Self {
        Self::element(tag).child(DomSpec::Hole)
    }
}

pub type RenderFn = fn(&Attrs) -> DomSpec;

/// Declaration of a node type.
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeDef {
    pub name: &'static str,
    pub groups: &'static [&'static str],
    /// Content expression; empty for leaves
    pub content: &'static str,
    pub marks: MarkAllowance,
    pub attrs: &'static [AttrSpec],
    pub inline: bool,
    /// Text-only, whitespace preserving, Enter inserts a newline
    pub code: bool,
    /// Attribute values the type can hold, checked after defaults are filled
    pub valid_attrs: fn(&Attrs) -> bool,
    pub parse: &'static [ParseRule],
    pub render: RenderFn,
}

/// Declaration of a mark type.
#[derive(Debug, Clone, Copy)]
pub struct MarkTypeDef {
    pub name: &'static str,
    pub attrs: &'static [AttrSpec],
    pub excludes: Excludes,
    /// Text typed at the end of a marked run continues the mark
    pub inclusive: bool,
    pub parse: &'static [ParseRule],
    pub render: RenderFn,
}

/// A registered node type with its compiled content expression.
#[derive(Debug, Clone)]
pub struct NodeType {
    pub def: NodeTypeDef,
    content: ContentExpr,
}

impl NodeType {
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn is_text(&self) -> bool {
        self.def.name == "text"
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty() && !self.is_text()
    }

    /// Holds inline content directly.
    pub fn is_textblock(&self) -> bool {
        self.content.names().any(|n| n == "inline" || n == "text")
    }

    pub fn is_code(&self) -> bool {
        self.def.code
    }

    pub fn content_expr(&self) -> &ContentExpr {
        &self.content
    }

    pub fn allows_mark(&self, mark_type: &str) -> bool {
        match self.def.marks {
            MarkAllowance::All => true,
            MarkAllowance::None => false,
            MarkAllowance::Only(names) => names.contains(&mark_type),
        }
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.def.attrs.iter().any(|a| a.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct MarkType {
    pub def: MarkTypeDef,
    pub rank: usize,
}

impl MarkType {
    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn excludes(&self, other: &str) -> bool {
        other == self.def.name
            || match self.def.excludes {
                Excludes::Nothing => false,
                Excludes::All => true,
                Excludes::Only(names) => names.contains(&other),
            }
    }
}

/// Collects type definitions and compiles them into a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    nodes: Vec<NodeTypeDef>,
    marks: Vec<MarkTypeDef>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, def: NodeTypeDef) -> Self {
        self.nodes.push(def);
        self
    }

    pub fn mark(mut self, def: MarkTypeDef) -> Self {
        self.marks.push(def);
        self
    }

    /// Compile the definitions. The first node type is the document root.
    pub fn build(self) -> EngineResult<Schema> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut node_index = HashMap::new();
        for def in self.nodes {
            if node_index.insert(def.name, nodes.len()).is_some() {
                return Err(EngineError::schema(format!("duplicate node type '{}'", def.name)));
            }
            nodes.push(NodeType {
                content: ContentExpr::parse(def.content)?,
                def,
            });
        }

        let mut marks = Vec::with_capacity(self.marks.len());
        let mut mark_index = HashMap::new();
        for (rank, def) in self.marks.into_iter().enumerate() {
            if mark_index.insert(def.name, rank).is_some() {
                return Err(EngineError::schema(format!("duplicate mark type '{}'", def.name)));
            }
            marks.push(MarkType { def, rank });
        }

        let known = |name: &str| {
            node_index.contains_key(name) || nodes.iter().any(|n| n.def.groups.contains(&name))
        };
        for node in &nodes {
            if let Some(unknown) = node.content.names().find(|n| !known(n)) {
                return Err(EngineError::schema(format!(
                    "content of '{}' references unknown type or group '{unknown}'",
                    node.name()
                )));
            }
        }

        let top = nodes
            .first()
            .map(|n| n.name())
            .ok_or_else(|| EngineError::schema("schema has no node types"))?;

        Ok(Schema {
            nodes,
            marks,
            node_index,
            mark_index,
            top,
        })
    }
}

/// The compiled type registry.
#[derive(Debug, Clone)]
pub struct Schema {
    nodes: Vec<NodeType>,
    marks: Vec<MarkType>,
    node_index: HashMap<&'static str, usize>,
    mark_index: HashMap<&'static str, usize>,
    top: &'static str,
}

impl Schema {
    pub fn top_node(&self) -> &'static str {
        self.top
    }

    pub fn node_type(&self, name: &str) -> EngineResult<&NodeType> {
        self.node_index
            .get(name)
            .map(|&i| &self.nodes[i])
            .ok_or_else(|| EngineError::schema(format!("unknown node type '{name}'")))
    }

    pub fn mark_type(&self, name: &str) -> EngineResult<&MarkType> {
        self.mark_index
            .get(name)
            .map(|&i| &self.marks[i])
            .ok_or_else(|| EngineError::schema(format!("unknown mark type '{name}'")))
    }

    pub fn node_types(&self) -> impl Iterator<Item = &NodeType> {
        self.nodes.iter()
    }

    /// Mark types in rank order.
    pub fn mark_types(&self) -> impl Iterator<Item = &MarkType> {
        self.marks.iter()
    }

    /// Whether a node of type `child` satisfies `name` in a content expression.
    pub fn in_group(&self, child: &str, name: &str) -> bool {
        child == name
            || self
                .node_type(child)
                .is_ok_and(|t| t.def.groups.contains(&name))
    }

    pub fn is_textblock(&self, node_type: &str) -> bool {
        self.node_type(node_type).is_ok_and(NodeType::is_textblock)
    }

    pub fn is_code(&self, node_type: &str) -> bool {
        self.node_type(node_type).is_ok_and(NodeType::is_code)
    }

    /// Fill declared defaults; unknown attribute names are a violation.
    pub fn fill_attrs(&self, specs: &[AttrSpec], owner: &str, given: &Attrs) -> EngineResult<Attrs> {
        if let Some(unknown) = given.keys().find(|k| !specs.iter().any(|s| s.name == *k)) {
            return Err(EngineError::schema(format!(
                "'{owner}' has no attribute '{unknown}'"
            )));
        }
        Ok(specs
            .iter()
            .map(|spec| {
                let value = given
                    .get(spec.name)
                    .cloned()
                    .unwrap_or_else(|| spec.default.value());
                (spec.name.to_string(), value)
            })
            .collect())
    }

    pub fn node_attrs(&self, node_type: &str, given: &Attrs) -> EngineResult<Attrs> {
        let nt = self.node_type(node_type)?;
        let attrs = self.fill_attrs(nt.def.attrs, node_type, given)?;
        Self::check_values(nt, &attrs)?;
        Ok(attrs)
    }

    fn check_values(nt: &NodeType, attrs: &Attrs) -> EngineResult<()> {
        if (nt.def.valid_attrs)(attrs) {
            Ok(())
        } else {
            Err(EngineError::schema(format!(
                "invalid attributes for '{}': {attrs:?}",
                nt.name()
            )))
        }
    }

    /// Create a checked element (or leaf, for leaf types).
    pub fn node(&self, node_type: &str, attrs: Attrs, content: Vec<Node>) -> EngineResult<Node> {
        let nt = self.node_type(node_type)?;
        let attrs = self.node_attrs(node_type, &attrs)?;
        if nt.is_text() {
            return Err(EngineError::schema("text nodes are created with Schema::text"));
        }
        if nt.is_leaf() {
            if !content.is_empty() {
                return Err(EngineError::schema(format!("'{node_type}' cannot have content")));
            }
            return Ok(Node::Leaf(Leaf {
                node_type: node_type.to_string(),
                attrs,
            }));
        }
        let content = crate::model::normalize_inline(content);
        self.check_content(nt, &content)?;
        Ok(Node::Element(Element::new(node_type, attrs, content)))
    }

    /// Create a text run with its marks ordered by rank.
    pub fn text(&self, text: &str, marks: &[Mark]) -> EngineResult<Node> {
        let mut set = Vec::new();
        for mark in marks {
            set = self.add_mark(&set, mark.clone())?;
        }
        Ok(Node::Text(TextRun {
            text: text.to_string(),
            marks: set,
        }))
    }

    pub fn mark(&self, mark_type: &str, attrs: Attrs) -> EngineResult<Mark> {
        let mt = self.mark_type(mark_type)?;
        let attrs = self.fill_attrs(mt.def.attrs, mark_type, &attrs)?;
        Ok(Mark::with_attrs(mark_type, attrs))
    }

    /// Add a mark to a set, dropping marks it excludes. Returns the set
    /// unchanged when an existing mark of another type excludes the new one.
    pub fn add_mark(&self, set: &[Mark], mark: Mark) -> EngineResult<Vec<Mark>> {
        let mt = self.mark_type(&mark.mark_type)?;
        let mut out = Vec::with_capacity(set.len() + 1);
        for existing in set {
            if existing.mark_type != mark.mark_type
                && self.mark_type(&existing.mark_type)?.excludes(&mark.mark_type)
            {
                return Ok(set.to_vec());
            }
            if !mt.excludes(&existing.mark_type) {
                out.push(existing.clone());
            }
        }
        let position = out
            .iter()
            .position(|m| self.mark_index.get(m.mark_type.as_str()).copied().unwrap_or(0) > mt.rank)
            .unwrap_or(out.len());
        out.insert(position, mark);
        Ok(out)
    }

    pub fn remove_mark(&self, set: &[Mark], mark_type: &str) -> Vec<Mark> {
        set.iter().filter(|m| m.mark_type != mark_type).cloned().collect()
    }

    /// Validate a content list against a parent type.
    pub fn check_content(&self, parent: &NodeType, content: &[Node]) -> EngineResult<()> {
        let names: Vec<&str> = content.iter().map(Node::type_name).collect();
        if !parent
            .content
            .matches(&names, &|child, name| self.in_group(child, name))
        {
            return Err(EngineError::schema(format!(
                "'{}' cannot contain [{}]",
                parent.name(),
                names.join(", ")
            )));
        }
        for node in content {
            if let Node::Text(run) = node {
                if run.text.is_empty() {
                    return Err(EngineError::schema("empty text run"));
                }
                if let Some(mark) = run.marks.iter().find(|m| !parent.allows_mark(&m.mark_type)) {
                    return Err(EngineError::schema(format!(
                        "'{}' does not allow mark '{}'",
                        parent.name(),
                        mark.mark_type
                    )));
                }
            }
        }
        Ok(())
    }

    /// Recursively validate a node: known types and attributes, content
    /// models, mark allowances.
    pub fn check_node(&self, node: &Node) -> EngineResult<()> {
        match node {
            Node::Text(run) => {
                for mark in &run.marks {
                    let mt = self.mark_type(&mark.mark_type)?;
                    self.check_attrs(mt.def.attrs, &mark.mark_type, &mark.attrs)?;
                }
                Ok(())
            }
            Node::Leaf(leaf) => {
                let nt = self.node_type(&leaf.node_type)?;
                if !nt.is_leaf() {
                    return Err(EngineError::schema(format!("'{}' is not a leaf", leaf.node_type)));
                }
                self.check_attrs(nt.def.attrs, &leaf.node_type, &leaf.attrs)?;
                Self::check_values(nt, &leaf.attrs)
            }
            Node::Element(el) => {
                let nt = self.node_type(&el.node_type)?;
                if nt.is_leaf() || nt.is_text() {
                    return Err(EngineError::schema(format!("'{}' cannot have content", el.node_type)));
                }
                self.check_attrs(nt.def.attrs, &el.node_type, &el.attrs)?;
                Self::check_values(nt, &el.attrs)?;
                self.check_content(nt, &el.content)?;
                el.content.iter().try_for_each(|child| self.check_node(child))
            }
        }
    }

    pub fn check_document(&self, doc: &Document) -> EngineResult<()> {
        if doc.root().node_type != self.top {
            return Err(EngineError::schema(format!(
                "document root must be '{}', got '{}'",
                self.top,
                doc.root().node_type
            )));
        }
        self.check_node(&Node::Element(doc.root().clone()))
    }

    fn check_attrs(&self, specs: &[AttrSpec], owner: &str, attrs: &Attrs) -> EngineResult<()> {
        let filled = self.fill_attrs(specs, owner, attrs)?;
        if filled.len() != attrs.len() {
            return Err(EngineError::schema(format!("'{owner}' is missing attributes")));
        }
        Ok(())
    }

    /// Build an empty instance of a type that needs content, recursively
    /// filling required children (a table cell gets an empty paragraph).
    pub fn create_filled(&self, node_type: &str, attrs: Attrs) -> EngineResult<Node> {
        let nt = self.node_type(node_type)?;
        let mut content = Vec::new();
        if let Some(required) = nt.content.first_required() {
            let child = self
                .node_types()
                .find(|t| t.name() == required || t.def.groups.contains(&required))
                .filter(|t| !t.is_text())
                .ok_or_else(|| EngineError::schema(format!("cannot fill '{node_type}'")))?;
            content.push(self.create_filled(child.name(), Attrs::new())?);
        }
        self.node(node_type, attrs, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attrs;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        blog::blog_schema()
    }

    #[test]
    fn fills_attribute_defaults() {
        let schema = schema();
        let node = schema
            .node("terminalBlock", Attrs::new(), vec![Node::text("npm i")])
            .unwrap();
        let attrs = node.attrs().unwrap();
        assert_eq!(attrs["packageManager"], AttrValue::from("npm"));
        assert_eq!(attrs["npmContent"], AttrValue::from(""));
        assert_eq!(attrs["pnpmContent"], AttrValue::from(""));
        assert_eq!(attrs["yarnContent"], AttrValue::from(""));
    }

    #[test]
    fn rejects_unknown_attribute() {
        let err = schema()
            .node("paragraph", attrs([("colour", "red".into())]), vec![])
            .unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation(_)));
    }

    #[test]
    fn rejects_table_inside_caption() {
        let schema = schema();
        let table = schema.create_filled("table", Attrs::new()).unwrap();
        let err = schema.node("caption", Attrs::new(), vec![table]).unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation(_)));
    }

    #[test]
    fn rejects_marks_in_code_blocks() {
        let schema = schema();
        let bold = schema.text("x", &[Mark::new("bold")]).unwrap();
        assert!(schema.node("fileCodeBlock", Attrs::new(), vec![bold]).is_err());
    }

    #[test]
    fn create_filled_cell_has_a_paragraph() {
        let schema = schema();
        let cell = schema.create_filled("tableCell", Attrs::new()).unwrap();
        assert_eq!(cell.size(), 4);
        assert_eq!(cell.as_element().unwrap().content[0].type_name(), "paragraph");
        schema.check_node(&cell).unwrap();
    }

    #[test]
    fn marks_are_kept_in_rank_order() {
        let schema = schema();
        let set = schema.add_mark(&[], Mark::new("italic")).unwrap();
        let set = schema.add_mark(&set, Mark::new("bold")).unwrap();
        let names: Vec<_> = set.iter().map(|m| m.mark_type.as_str()).collect();
        assert_eq!(names, vec!["bold", "italic"]);
    }

    #[test]
    fn code_mark_excludes_everything_else() {
        let schema = schema();
        let set = schema.add_mark(&[], Mark::new("bold")).unwrap();
        let set = schema.add_mark(&set, Mark::new("code")).unwrap();
        assert_eq!(set, vec![Mark::new("code")]);
        // and blocks later additions
        let set = schema.add_mark(&set, Mark::new("italic")).unwrap();
        assert_eq!(set, vec![Mark::new("code")]);
    }

    #[test]
    fn badge_and_code_do_not_mix() {
        let schema = schema();
        let set = schema.add_mark(&[], Mark::new("code")).unwrap();
        let set = schema.add_mark(&set, Mark::new("badge")).unwrap();
        assert_eq!(set, vec![Mark::new("code")]);
    }

    #[test]
    fn duplicate_types_are_rejected() {
        let err = SchemaBuilder::new()
            .node(blog::DOC)
            .node(blog::PARAGRAPH)
            .node(blog::PARAGRAPH)
            .node(blog::TEXT)
            .build()
            .unwrap_err();
        assert_eq!(err, EngineError::schema("duplicate node type 'paragraph'"));
    }

    #[test]
    fn unknown_content_reference_is_rejected() {
        let err = SchemaBuilder::new()
            .node(NodeTypeDef {
                content: "widget+",
                ..blog::DOC
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation(_)));
    }
}
