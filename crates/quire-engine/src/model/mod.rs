//! Document model: immutable trees of elements, leaves and marked text runs
//! addressed by flat integer positions.

mod document;
mod node;
mod position;
mod selection;

pub use document::Document;
pub use node::{
    AttrValue, Attrs, Element, Leaf, Mark, Node, TextRun, attrs, content_size, normalize_inline,
    split_content, text_between,
};
pub use position::ResolvedPos;
pub use selection::Selection;
