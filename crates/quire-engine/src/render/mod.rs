//! # Render
//!
//! Presentation state for code-like blocks, derived from the document and
//! never written back to it. Three layers share one geometry:
//!
//! ```text
//! editable   transparent text + caret       (source of truth for input)
//! visual     styled lines                   (highlighter or tokenizer)
//! backdrop   per-line highlight strip
//! ```
//!
//! The [`Compositor`] owns the small amount of per-block state this needs
//! and the asynchronous highlighting handshake.

pub mod clipboard;
pub mod compositor;
pub mod highlight;
pub mod markup;
pub mod terminal;

pub use clipboard::{Clipboard, ClipboardError, CopyFeedback, MemoryClipboard};
pub use compositor::{
    BlockHeader, CompositedBlock, Compositor, EditableLayer, GutterButton, HighlightOutcome,
};
pub use highlight::{
    BlockId, HighlightError, HighlightRequest, HighlightResponse, Highlighter, SimpleHighlighter,
};
pub use markup::{SpanStyle, StyledLine, StyledSpan};

/// Font settings every layer of a block is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typography {
    pub font_family: &'static str,
    /// Pixels
    pub font_size: u16,
    /// Pixels
    pub line_height: u16,
}

pub const CODE_TYPOGRAPHY: Typography = Typography {
    font_family: "ui-monospace, SFMono-Regular, Menlo, monospace",
    font_size: 13,
    line_height: 20,
};

/// Whitespace handling shared by the layers. Only `pre` keeps them aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhiteSpace {
    #[default]
    Pre,
}
