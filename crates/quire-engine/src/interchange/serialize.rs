use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::model::{Document, Mark, Node};
use crate::schema::{DomSpec, Schema};

/// Elements written without an end tag.
const VOID_ELEMENTS: &[&str] = &["br", "hr"];

/// Serialize a document through each type's render rule.
pub fn to_html(schema: &Schema, doc: &Document) -> String {
    let mut out = String::new();
    write_content(schema, &doc.root().content, &mut out);
    out
}

/// Write a content list. Adjacent runs sharing a mark prefix share the
/// mark's element, so `<strong>a<em>b</em></strong>` stays one `strong`.
fn write_content(schema: &Schema, content: &[Node], out: &mut String) {
    let mut open: Vec<(&Mark, String)> = Vec::new();
    for node in content {
        let marks: &[Mark] = match node {
            Node::Text(run) => &run.marks,
            _ => &[],
        };
        let keep = open
            .iter()
            .zip(marks)
            .take_while(|((open_mark, _), mark)| *open_mark == *mark)
            .count();
        while open.len() > keep {
            if let Some((_, close)) = open.pop() {
                out.push_str(&close);
            }
        }
        for mark in &marks[keep..] {
            let (start, end) = mark_parts(schema, mark);
            out.push_str(&start);
            open.push((mark, end));
        }

        match node {
            Node::Text(run) => out.push_str(&encode_text(&run.text)),
            Node::Leaf(leaf) => {
                if let Ok(nt) = schema.node_type(&leaf.node_type) {
                    let (start, end) = split_spec(&(nt.def.render)(&leaf.attrs));
                    out.push_str(&start);
                    out.push_str(&end);
                }
            }
            Node::Element(el) => match schema.node_type(&el.node_type) {
                Ok(nt) => {
                    let (start, end) = split_spec(&(nt.def.render)(&el.attrs));
                    out.push_str(&start);
                    write_content(schema, &el.content, out);
                    out.push_str(&end);
                }
                Err(err) => {
                    log::warn!("skipping unrenderable node: {err}");
                    write_content(schema, &el.content, out);
                }
            },
        }
    }
    while let Some((_, close)) = open.pop() {
        out.push_str(&close);
    }
}

fn mark_parts(schema: &Schema, mark: &Mark) -> (String, String) {
    match schema.mark_type(&mark.mark_type) {
        Ok(mt) => split_spec(&(mt.def.render)(&mark.attrs)),
        Err(_) => (String::new(), String::new()),
    }
}

/// Render a spec into the markup before and after its content hole.
pub(crate) fn split_spec(spec: &DomSpec) -> (String, String) {
    let mut parts = (String::new(), String::new());
    let mut past_hole = false;
    write_spec(spec, &mut parts, &mut past_hole);
    parts
}

fn part<'a>(parts: &'a mut (String, String), past_hole: bool) -> &'a mut String {
    if past_hole { &mut parts.1 } else { &mut parts.0 }
}

fn write_spec(spec: &DomSpec, parts: &mut (String, String), past_hole: &mut bool) {
    match spec {
        DomSpec::Hole => *past_hole = true,
        DomSpec::Text(text) => part(parts, *past_hole).push_str(&encode_text(text)),
        DomSpec::Element {
            tag,
            attrs,
            children,
        } => {
            let out = part(parts, *past_hole);
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in children {
                write_spec(child, parts, past_hole);
            }
            let out = part(parts, *past_hole);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attrs, attrs};
    use crate::schema::blog::blog_schema;
    use pretty_assertions::assert_eq;

    #[test]
    fn split_spec_around_nested_hole() {
        let spec = DomSpec::element("table").child(DomSpec::wrap("tbody"));
        assert_eq!(
            split_spec(&spec),
            ("<table><tbody>".to_string(), "</tbody></table>".to_string())
        );
    }

    #[test]
    fn attribute_values_are_escaped() {
        let spec = DomSpec::wrap("a").attr("href", r#"/q?a=1&b="2""#);
        assert_eq!(split_spec(&spec).0, r#"<a href="/q?a=1&amp;b=&quot;2&quot;">"#);
    }

    #[test]
    fn shared_mark_prefix_is_not_reopened() {
        let schema = blog_schema();
        let bold = schema.mark("bold", Attrs::new()).unwrap();
        let italic = schema.mark("italic", Attrs::new()).unwrap();
        let para = schema
            .node(
                "paragraph",
                Attrs::new(),
                vec![
                    schema.text("a", &[bold.clone()]).unwrap(),
                    schema.text("b", &[bold, italic]).unwrap(),
                    schema.text(" <c>", &[]).unwrap(),
                ],
            )
            .unwrap();
        let doc = Document::from_blocks(vec![para]);
        assert_eq!(
            to_html(&schema, &doc),
            "<p><strong>a<em>b</em></strong> &lt;c&gt;</p>"
        );
    }

    #[test]
    fn void_elements_have_no_end_tag() {
        let schema = blog_schema();
        let hr = schema.node("horizontalRule", Attrs::new(), vec![]).unwrap();
        let para = schema
            .node(
                "paragraph",
                attrs([("textAlign", "justify".into())]),
                vec![
                    Node::text("a"),
                    schema.node("hardBreak", Attrs::new(), vec![]).unwrap(),
                    Node::text("b"),
                ],
            )
            .unwrap();
        let doc = Document::from_blocks(vec![hr, para]);
        assert_eq!(
            to_html(&schema, &doc),
            r#"<hr><p style="text-align: justify">a<br>b</p>"#
        );
    }
}
