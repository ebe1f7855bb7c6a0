//! # Editor session
//!
//! An [`Editor`] is one independent editing session: it owns the state
//! (schema, document, selection, history), the keymap built from its
//! extensions and the compositor's derived block state. Nothing is shared
//! between sessions, so any number can live side by side.
//!
//! Every change goes through [`Editor::dispatch`]: one transaction per input
//! event, applied atomically or not at all. Rejected transactions are logged
//! and otherwise invisible to the host.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::commands::{self, Command};
use crate::error::InterchangeError;
use crate::extensions::{Extension, Key, Keymap, default_extensions, file_code, terminal};
use crate::interchange::{from_html, to_html, to_plain_text};
use crate::model::{Attrs, Selection};
use crate::render::{
    Clipboard, ClipboardError, CompositedBlock, Compositor, HighlightOutcome, HighlightRequest,
    HighlightResponse, Highlighter,
};
use crate::schema::Schema;
use crate::schema::blog::blog_schema;
use crate::state::EditorState;
use crate::transform::Transaction;

/// Receives `(plain_text, html)` after every committed content change.
pub type ChangeCallback = Box<dyn FnMut(&str, &str)>;

/// Per-session settings. Hosts usually build these from their own config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorOptions {
    pub history_depth: usize,
    /// Language rotation of file code blocks
    pub languages: Vec<String>,
    pub default_package_manager: String,
    pub copy_feedback: Duration,
    pub terminal_copy_feedback: Duration,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            history_depth: 100,
            languages: file_code::LANGUAGES.iter().map(|l| l.to_string()).collect(),
            default_package_manager: terminal::DEFAULT_MANAGER.to_string(),
            copy_feedback: Duration::from_millis(1000),
            terminal_copy_feedback: Duration::from_millis(1200),
        }
    }
}

pub struct Editor {
    id: Uuid,
    state: EditorState,
    keymap: Keymap,
    compositor: Compositor,
    options: EditorOptions,
    on_change: Option<ChangeCallback>,
}

impl Editor {
    /// A session over the blog schema with the default extensions.
    pub fn new(initial_content: &str, options: EditorOptions) -> Result<Self, InterchangeError> {
        Self::with_schema(
            Arc::new(blog_schema()),
            &default_extensions(),
            initial_content,
            options,
        )
    }

    pub fn with_schema(
        schema: Arc<Schema>,
        extensions: &[Extension],
        initial_content: &str,
        options: EditorOptions,
    ) -> Result<Self, InterchangeError> {
        let doc = from_html(&schema, initial_content)?;
        let state = EditorState::new(schema, doc, options.history_depth)?;
        let mut compositor = Compositor::new(options.copy_feedback, options.terminal_copy_feedback);
        compositor.sync(state.schema(), state.doc());
        let editor = Self {
            id: Uuid::new_v4(),
            keymap: Keymap::new(extensions, &options),
            state,
            compositor,
            options,
            on_change: None,
        };
        log::debug!(
            "[{}] editor opened with {} block(s)",
            editor.id,
            editor.state.doc().blocks().len()
        );
        Ok(editor)
    }

    pub fn on_change(mut self, callback: impl FnMut(&str, &str) + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn selection(&self) -> Selection {
        self.state.selection()
    }

    /// Apply one transaction. Returns whether it was committed.
    pub fn dispatch(&mut self, tr: &Transaction) -> bool {
        let commit = match self.state.apply(tr) {
            Ok(commit) => commit,
            Err(err) => {
                log::warn!("[{}] transaction rejected: {err}", self.id);
                return false;
            }
        };
        log::debug!(
            "[{}] applied {} step(s), doc changed: {}",
            self.id,
            tr.steps().len(),
            commit.doc_changed
        );
        self.compositor.map(&commit.mapping);
        self.state = commit.state;
        self.compositor.sync(self.state.schema(), self.state.doc());

        if commit.doc_changed
            && let Some(callback) = self.on_change.as_mut()
        {
            let text = to_plain_text(self.state.doc());
            let html = to_html(self.state.schema(), self.state.doc());
            callback(&text, &html);
        }
        true
    }

    /// Build `command` against the current state and dispatch it.
    pub fn run(&mut self, command: impl Command) -> bool {
        match command.build(&self.state) {
            Some(tr) => self.dispatch(&tr),
            None => false,
        }
    }

    /// Resolve a key press through the keymap.
    pub fn handle_key(&mut self, key: Key) -> bool {
        let Some((source, tr)) = self.keymap.resolve(key, &self.state) else {
            return false;
        };
        log::debug!("[{}] {key:?} handled by {source}", self.id);
        self.dispatch(&tr)
    }

    pub fn insert_text(&mut self, text: &str) -> bool {
        self.run(commands::insert_text(text))
    }

    pub fn set_selection(&mut self, anchor: usize, head: usize) -> bool {
        self.dispatch(&Transaction::new().set_selection(anchor, head))
    }

    pub fn undo(&mut self) -> bool {
        self.run(commands::undo())
    }

    pub fn redo(&mut self) -> bool {
        self.run(commands::redo())
    }

    pub fn html(&self) -> String {
        to_html(self.state.schema(), self.state.doc())
    }

    pub fn text(&self) -> String {
        to_plain_text(self.state.doc())
    }

    pub fn can(&self, command: impl Command) -> bool {
        commands::can(&self.state, &command)
    }

    pub fn is_active(&self, node_type: &str, attrs: &Attrs) -> bool {
        commands::is_active(&self.state, node_type, attrs)
    }

    pub fn is_mark_active(&self, mark_type: &str) -> bool {
        commands::is_mark_active(&self.state, mark_type)
    }

    pub fn formatting_disabled(&self) -> bool {
        commands::formatting_disabled(&self.state)
    }

    /// Advance the file code block at `pos` through this session's language
    /// rotation.
    pub fn cycle_language(&mut self, pos: usize) -> bool {
        self.run(file_code::cycle_language(pos, self.options.languages.clone()))
    }

    pub fn insert_terminal_block(&mut self) -> bool {
        let manager = self.options.default_package_manager.clone();
        self.run(terminal::insert_terminal_block(&manager))
    }

    /// Highlight requests started since the last call.
    pub fn take_highlight_requests(&mut self) -> Vec<HighlightRequest> {
        self.compositor.take_requests()
    }

    pub fn apply_highlight(&mut self, response: HighlightResponse) -> HighlightOutcome {
        self.compositor.complete(response)
    }

    /// Run every pending request through `highlighter` right away.
    pub fn highlight_with(&mut self, highlighter: &dyn Highlighter) {
        for request in self.compositor.take_requests() {
            self.compositor.complete(request.run(highlighter));
        }
    }

    pub fn composite(&self, now: Instant) -> Vec<CompositedBlock> {
        self.compositor
            .composite(self.state.doc(), self.state.selection(), now)
    }

    /// Copy the raw text of the code block at `pos`.
    pub fn copy_block(
        &mut self,
        pos: usize,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<bool, ClipboardError> {
        let copied = self.compositor.copy(self.state.doc(), pos, clipboard, now)?;
        if copied {
            log::debug!("[{}] copied block at {pos}", self.id);
        }
        Ok(copied)
    }
}
