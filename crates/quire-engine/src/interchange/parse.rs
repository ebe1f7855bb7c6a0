use quire_syntax::{HtmlElement, HtmlNode, parse_fragment};

use crate::error::{EngineResult, InterchangeError};
use crate::model::{Attrs, Document, Mark, Node};
use crate::schema::{NodeType, Schema};

/// Parse interchange HTML into a checked document.
///
/// Elements no rule claims are transparent: their children are parsed in
/// the surrounding context. Empty input yields one empty paragraph.
pub fn from_html(schema: &Schema, html: &str) -> Result<Document, InterchangeError> {
    let parser = Parser { schema };
    let mut blocks = parser.block_content(&parse_fragment(html))?;
    if blocks.is_empty() {
        blocks.push(schema.node("paragraph", Attrs::new(), Vec::new())?);
    }
    let doc = Document::from_blocks(blocks);
    schema.check_document(&doc)?;
    Ok(doc)
}

/// What a parse rule resolved an element to.
enum Matched<'a> {
    Node(&'a NodeType, Attrs),
    Mark(Mark),
    Unknown,
}

struct Parser<'a> {
    schema: &'a Schema,
}

/// Block children collected so far plus stray inline content waiting for
/// a paragraph.
#[derive(Default)]
struct BlockCollector {
    blocks: Vec<Node>,
    pending: Vec<Node>,
}

impl<'a> Parser<'a> {
    fn match_element(&self, el: &HtmlElement) -> EngineResult<Matched<'a>> {
        for nt in self.schema.node_types() {
            if let Some(rule) = nt.def.parse.iter().find(|rule| rule.applies(el)) {
                return Ok(Matched::Node(nt, (rule.attrs)(el)));
            }
        }
        for mt in self.schema.mark_types() {
            if let Some(rule) = mt.def.parse.iter().find(|rule| rule.applies(el)) {
                return Ok(Matched::Mark(self.schema.mark(mt.name(), (rule.attrs)(el))?));
            }
        }
        Ok(Matched::Unknown)
    }

    fn block_content(&self, nodes: &[HtmlNode]) -> EngineResult<Vec<Node>> {
        let mut collector = BlockCollector::default();
        self.collect_blocks(nodes, &mut collector)?;
        self.flush_paragraph(&mut collector)?;
        Ok(collector.blocks)
    }

    fn collect_blocks(&self, nodes: &[HtmlNode], collector: &mut BlockCollector) -> EngineResult<()> {
        for node in nodes {
            match node {
                HtmlNode::Text(text) => {
                    if collector.pending.is_empty() && text.trim().is_empty() {
                        continue;
                    }
                    collector.pending.push(self.schema.text(text, &[])?);
                }
                HtmlNode::Element(el) => match self.match_element(el)? {
                    Matched::Node(nt, attrs) if !nt.def.inline => {
                        self.flush_paragraph(collector)?;
                        collector.blocks.push(self.build(nt, attrs, el)?);
                    }
                    Matched::Node(..) | Matched::Mark(_) => {
                        self.inline_node(node, &[], &mut collector.pending)?;
                    }
                    Matched::Unknown => self.collect_blocks(&el.children, collector)?,
                },
            }
        }
        Ok(())
    }

    /// Wrap pending inline content in a paragraph unless it is only
    /// whitespace.
    fn flush_paragraph(&self, collector: &mut BlockCollector) -> EngineResult<()> {
        let pending = std::mem::take(&mut collector.pending);
        let blank = pending
            .iter()
            .all(|n| matches!(n, Node::Text(run) if run.text.trim().is_empty()));
        if !blank {
            collector
                .blocks
                .push(self.schema.node("paragraph", Attrs::new(), pending)?);
        }
        Ok(())
    }

    fn build(&self, nt: &NodeType, attrs: Attrs, el: &HtmlElement) -> EngineResult<Node> {
        let name = nt.name();
        if nt.is_leaf() {
            return self.schema.node(name, attrs, Vec::new());
        }
        if nt.is_code() {
            let text = el.text_content();
            let content = if text.is_empty() {
                Vec::new()
            } else {
                vec![Node::text(text)]
            };
            return self.schema.node(name, attrs, content);
        }
        if nt.is_textblock() {
            let mut content = Vec::new();
            for child in &el.children {
                self.inline_node(child, &[], &mut content)?;
            }
            return self.schema.node(name, attrs, content);
        }
        let content = self.block_content(&el.children)?;
        if content.is_empty() {
            return self.schema.create_filled(name, attrs);
        }
        self.schema.node(name, attrs, content)
    }

    fn inline_node(&self, node: &HtmlNode, marks: &[Mark], out: &mut Vec<Node>) -> EngineResult<()> {
        match node {
            HtmlNode::Text(text) => {
                if !text.is_empty() {
                    out.push(self.schema.text(text, marks)?);
                }
            }
            HtmlNode::Element(el) => match self.match_element(el)? {
                Matched::Node(nt, attrs) if nt.def.inline => {
                    out.push(self.schema.node(nt.name(), attrs, Vec::new())?);
                }
                Matched::Mark(mark) => {
                    let marks = self.schema.add_mark(marks, mark)?;
                    for child in &el.children {
                        self.inline_node(child, &marks, out)?;
                    }
                }
                Matched::Node(..) | Matched::Unknown => {
                    for child in &el.children {
                        self.inline_node(child, marks, out)?;
                    }
                }
            },
        }
        Ok(())
    }
}
