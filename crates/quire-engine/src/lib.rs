//! # quire-engine
//!
//! A structured rich-text document engine. Documents are immutable trees
//! validated against a [`schema::Schema`]; every change is a
//! [`transform::Transaction`] of position-addressed steps, applied
//! atomically. Commands build transactions, extensions bind them to keys,
//! and the [`render`] compositor derives the layered presentation of code
//! blocks.
//!
//! ```text
//! key press ─► Keymap ─► Command ─► Transaction ─► EditorState
//!                                                   │
//!                       Compositor ◄── mapping ─────┤
//!                           │                       └─► on_change(text, html)
//!                 highlight requests ─► Highlighter (host)
//! ```
//!
//! ```
//! use quire_engine::commands;
//! use quire_engine::editor::{Editor, EditorOptions};
//!
//! let mut editor = Editor::new("", EditorOptions::default()).unwrap();
//! editor.insert_text("Hello");
//! editor.run(commands::toggle_heading(1));
//! editor.run(commands::split_block());
//! editor.insert_text("World");
//! assert_eq!(editor.html(), "<h1>Hello</h1><p>World</p>");
//! ```

pub mod commands;
pub mod editor;
pub mod error;
pub mod extensions;
pub mod interchange;
pub mod model;
pub mod outline;
pub mod render;
pub mod schema;
pub mod state;
pub mod transform;

pub use editor::{ChangeCallback, Editor, EditorOptions};
pub use error::{EngineError, EngineResult, InterchangeError};
pub use model::{Document, Node, Selection};
pub use state::EditorState;
pub use transform::Transaction;
