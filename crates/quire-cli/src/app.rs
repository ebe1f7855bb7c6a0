use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use crossterm::event::{KeyCode as TermKey, KeyEvent, KeyModifiers};
use quire_engine::extensions::{Key, KeyCode, file_code};
use quire_engine::render::Clipboard;
use quire_engine::schema::blog::DEFAULT_LANGUAGE;
use quire_engine::{Editor, EditorOptions, EditorState};
use ratatui::widgets::ListState;

use crate::highlight::HighlightWorker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    Edit,
}

/// An open draft.
pub struct Session {
    pub path: PathBuf,
    pub editor: Editor,
    dirty: Rc<Cell<bool>>,
}

impl Session {
    fn open(path: PathBuf, options: &EditorOptions) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read draft {}", path.display()))?;
        let dirty = Rc::new(Cell::new(false));
        let flag = Rc::clone(&dirty);
        let editor = Editor::new(&content, options.clone())
            .with_context(|| format!("Failed to parse draft {}", path.display()))?
            .on_change(move |_, _| flag.set(true));
        log::info!("opened {} as session {}", path.display(), editor.id());
        Ok(Self {
            path,
            editor,
            dirty,
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn file_name(&self) -> String {
        display_name(&self.path)
    }
}

pub struct App {
    pub drafts: Vec<PathBuf>,
    pub list_state: ListState,
    pub mode: Mode,
    pub session: Option<Session>,
    pub status: Option<String>,
    options: EditorOptions,
    clipboard: Box<dyn Clipboard>,
    quit_armed: bool,
}

impl App {
    pub fn new(
        drafts_path: &Path,
        options: EditorOptions,
        clipboard: Box<dyn Clipboard>,
    ) -> Result<Self> {
        let drafts = list_drafts(drafts_path)?;
        let mut list_state = ListState::default();
        if !drafts.is_empty() {
            list_state.select(Some(0));
        }
        Ok(Self {
            drafts,
            list_state,
            mode: Mode::Browse,
            session: None,
            status: None,
            options,
            clipboard,
            quit_armed: false,
        })
    }

    pub fn next_draft(&mut self) {
        if self.drafts.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.drafts.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous_draft(&mut self) {
        if self.drafts.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.drafts.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    /// Open the selected draft for editing. Re-opening the current draft
    /// resumes its session.
    pub fn open_selected(&mut self) {
        let Some(path) = self.list_state.selected().and_then(|i| self.drafts.get(i)) else {
            return;
        };
        if self.session.as_ref().is_some_and(|s| &s.path == path) {
            self.mode = Mode::Edit;
            return;
        }
        if self.session.as_ref().is_some_and(Session::is_dirty) {
            self.status = Some("Unsaved changes: save with Ctrl-s first".into());
            return;
        }
        match Session::open(path.clone(), &self.options) {
            Ok(session) => {
                self.session = Some(session);
                self.mode = Mode::Edit;
                self.status = None;
            }
            Err(e) => {
                log::warn!("{e:#}");
                self.status = Some(format!("{e:#}"));
            }
        }
    }

    pub fn save(&mut self) -> Result<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        std::fs::write(&session.path, session.editor.html())
            .with_context(|| format!("Failed to save {}", session.path.display()))?;
        session.dirty.set(false);
        log::info!("saved {}", session.path.display());
        self.status = Some(format!("Saved {}", session.file_name()));
        Ok(())
    }

    /// Returns `false` when the app should exit.
    pub fn handle_key(&mut self, event: KeyEvent, now: Instant) -> Result<bool> {
        match self.mode {
            Mode::Browse => Ok(self.browse_key(event)),
            Mode::Edit => {
                self.edit_key(event, now)?;
                Ok(true)
            }
        }
    }

    fn browse_key(&mut self, event: KeyEvent) -> bool {
        if event.code != TermKey::Char('q') {
            self.quit_armed = false;
        }
        match event.code {
            TermKey::Char('q') => {
                if self.session.as_ref().is_some_and(Session::is_dirty) && !self.quit_armed {
                    self.quit_armed = true;
                    self.status = Some("Unsaved changes: press q again to quit".into());
                } else {
                    return false;
                }
            }
            TermKey::Down | TermKey::Char('j') => self.next_draft(),
            TermKey::Up | TermKey::Char('k') => self.previous_draft(),
            TermKey::Enter | TermKey::Char(' ') => self.open_selected(),
            _ => {}
        }
        true
    }

    fn edit_key(&mut self, event: KeyEvent, now: Instant) -> Result<()> {
        let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);
        let alt = event.modifiers.contains(KeyModifiers::ALT);
        match event.code {
            TermKey::Esc => {
                self.mode = Mode::Browse;
                return Ok(());
            }
            TermKey::Char('s') if ctrl => return self.save(),
            TermKey::Char('c') if ctrl => {
                self.copy_current_block(now);
                return Ok(());
            }
            _ => {}
        }

        let Some(session) = self.session.as_mut() else {
            self.mode = Mode::Browse;
            return Ok(());
        };
        let editor = &mut session.editor;
        match event.code {
            TermKey::Left => {
                move_horizontally(editor, false);
            }
            TermKey::Right => {
                move_horizontally(editor, true);
            }
            TermKey::Up => {
                move_vertically(editor, false);
            }
            TermKey::Down => {
                move_vertically(editor, true);
            }
            TermKey::Char('h') if alt && !ctrl => {
                if let Some((pos, line)) = file_code_line_at_caret(editor.state()) {
                    editor.run(file_code::toggle_highlighted_line(pos, line));
                }
            }
            TermKey::Char('t') if alt && !ctrl => {
                editor.insert_terminal_block();
            }
            TermKey::Char('f') if alt && !ctrl => {
                let language = self
                    .options
                    .languages
                    .first()
                    .map_or(DEFAULT_LANGUAGE, String::as_str);
                editor.run(file_code::insert_file_code_block("", language));
            }
            _ => {
                let Some(key) = engine_key(&event) else {
                    return Ok(());
                };
                if editor.handle_key(key) {
                    return Ok(());
                }
                if let TermKey::Char(c) = event.code
                    && !ctrl
                    && !alt
                {
                    editor.insert_text(c.encode_utf8(&mut [0; 4]));
                }
            }
        }
        Ok(())
    }

    fn copy_current_block(&mut self, now: Instant) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let Some((pos, _)) = session.editor.state().head_textblock() else {
            return;
        };
        self.status = match session.editor.copy_block(pos, self.clipboard.as_mut(), now) {
            Ok(true) => None,
            Ok(false) => Some("Nothing to copy outside code blocks".into()),
            Err(e) => {
                log::warn!("copy failed: {e}");
                Some(e.to_string())
            }
        };
    }

    /// Hand new highlight requests to the worker and apply what came back.
    pub fn pump_highlights(&mut self, worker: &HighlightWorker) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let id = session.editor.id();
        worker.submit(id, session.editor.take_highlight_requests());
        for response in worker.drain(id) {
            let outcome = session.editor.apply_highlight(response);
            log::debug!("highlight response: {outcome:?}");
        }
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The `.html` files directly inside `dir`, sorted by name.
pub fn list_drafts(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read drafts folder {}", dir.display()))?;
    let mut drafts = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "html") {
            drafts.push(path);
        }
    }
    drafts.sort();
    Ok(drafts)
}

/// Translate a terminal key press for the editor keymap. Ctrl is the
/// primary modifier.
pub fn engine_key(event: &KeyEvent) -> Option<Key> {
    let code = match event.code {
        TermKey::Char(c) => KeyCode::Char(c),
        TermKey::Enter => KeyCode::Enter,
        TermKey::Backspace => KeyCode::Backspace,
        TermKey::Tab => KeyCode::Tab,
        _ => return None,
    };
    let mut key = Key::new(code);
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        key = key.with_primary();
    }
    if event.modifiers.contains(KeyModifiers::SHIFT) {
        key = key.with_shift();
    }
    if event.modifiers.contains(KeyModifiers::ALT) {
        key = key.with_alt();
    }
    Some(key)
}

fn is_text_position(state: &EditorState, pos: usize) -> bool {
    state
        .doc()
        .resolve(pos)
        .is_ok_and(|rp| rp.depth() > 0 && state.schema().is_textblock(&rp.parent().node_type))
}

fn move_horizontally(editor: &mut Editor, forward: bool) -> bool {
    let target = {
        let state = editor.state();
        let size = state.doc().size();
        let mut pos = state.selection().head;
        loop {
            pos = if forward {
                if pos >= size {
                    break None;
                }
                pos + 1
            } else {
                match pos.checked_sub(1) {
                    Some(pos) => pos,
                    None => break None,
                }
            };
            if is_text_position(state, pos) {
                break Some(pos);
            }
        }
    };
    target.is_some_and(|pos| editor.set_selection(pos, pos))
}

fn move_vertically(editor: &mut Editor, down: bool) -> bool {
    vertical_target(editor.state(), down).is_some_and(|pos| editor.set_selection(pos, pos))
}

/// Next line inside a code block, otherwise the same offset in the
/// neighbouring textblock.
fn vertical_target(state: &EditorState, down: bool) -> Option<usize> {
    let head = state.selection().head;
    let blocks = state.doc().textblocks();
    let index = blocks
        .iter()
        .position(|(pos, el)| (pos + 1..=pos + 1 + el.content_size()).contains(&head))?;
    let (pos, el) = blocks[index];
    let offset = head - (pos + 1);
    if state.schema().is_code(&el.node_type)
        && let Some(target) = code_line_target(&el.text_content(), offset, down)
    {
        return Some(pos + 1 + target);
    }
    let neighbour = if down {
        blocks.get(index + 1)
    } else {
        index.checked_sub(1).and_then(|i| blocks.get(i))
    };
    let (pos, el) = neighbour?;
    Some(pos + 1 + offset.min(el.content_size()))
}

fn code_line_target(text: &str, offset: usize, down: bool) -> Option<usize> {
    let lengths: Vec<usize> = text.split('\n').map(|l| l.chars().count()).collect();
    let (mut line, mut start) = (0, 0);
    while line + 1 < lengths.len() && offset > start + lengths[line] {
        start += lengths[line] + 1;
        line += 1;
    }
    let column = offset - start;
    let target = if down { line + 1 } else { line.checked_sub(1)? };
    let length = *lengths.get(target)?;
    let target_start: usize = lengths[..target].iter().map(|n| n + 1).sum();
    Some(target_start + column.min(length))
}

/// The file code block holding the caret and the caret's line in it.
fn file_code_line_at_caret(state: &EditorState) -> Option<(usize, usize)> {
    let (pos, block) = state.head_textblock()?;
    if !block.is(file_code::NODE) {
        return None;
    }
    let offset = state.selection().head - (pos + 1);
    let line = block.text_content().chars().take(offset).filter(|c| *c == '\n').count();
    Some((pos, line))
}
