//! # Extensions
//!
//! Node behaviors as data. Each [`Extension`] is a plain record naming the
//! key bindings it contributes; its commands live in the extension's module
//! next to the constants it owns (table limits, package managers, language
//! rotation). The [`Keymap`] merges every extension's bindings and resolves a
//! key press to the first applicable command, highest priority first.
//!
//! ## Extensions
//!
//! - **`base`**: typing, Enter, Backspace, marks, headings, lists, undo/redo
//! - **`code`**: Enter inserts a newline inside code blocks
//! - **`badge`** / **`caption`**: formatting toggles
//! - **`table`**: Backspace in an empty cell deletes the table
//! - **`terminal`** / **`file_code`**: variant and language cycling

pub mod badge;
pub mod caption;
pub mod file_code;
pub mod table;
pub mod terminal;

use std::sync::Arc;

use crate::commands::{self, ChainMode, Command};
use crate::editor::EditorOptions;
use crate::state::EditorState;
use crate::transform::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Tab,
}

/// A key press. `primary` is the platform command modifier (Ctrl here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: KeyCode,
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Key {
    pub fn new(code: KeyCode) -> Self {
        let code = match code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        Self {
            code,
            primary: false,
            shift: false,
            alt: false,
        }
    }

    pub fn with_primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Parse `Mod-Shift-z` style descriptions.
    pub fn parse(desc: &str) -> Option<Self> {
        let mut parts: Vec<&str> = desc.split('-').collect();
        let name = parts.pop()?;
        let code = match name {
            "Enter" => KeyCode::Enter,
            "Backspace" => KeyCode::Backspace,
            "Tab" => KeyCode::Tab,
            _ => {
                let mut chars = name.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                KeyCode::Char(c)
            }
        };
        let mut key = Key::new(code);
        for modifier in parts {
            key = match modifier {
                "Mod" | "Ctrl" => key.with_primary(),
                "Shift" => key.with_shift(),
                "Alt" => key.with_alt(),
                _ => return None,
            };
        }
        Some(key)
    }
}

pub type SharedCommand = Arc<dyn Command>;

/// A binding as an extension declares it.
pub type BindingDecl = (&'static str, SharedCommand);

pub struct KeyBinding {
    pub key: Key,
    pub priority: i32,
    pub command: SharedCommand,
    /// Name of the extension that contributed the binding
    pub source: &'static str,
}

/// A node behavior: its name, its keymap priority and its bindings.
#[derive(Clone, Copy)]
pub struct Extension {
    pub name: &'static str,
    pub priority: i32,
    pub bindings: fn(&EditorOptions) -> Vec<BindingDecl>,
}

pub const BASE: Extension = Extension {
    name: "base",
    priority: 0,
    bindings: base_bindings,
};

pub const CODE: Extension = Extension {
    name: "code",
    priority: 100,
    bindings: |_| vec![("Enter", shared(insert_code_newline()))],
};

pub fn default_extensions() -> Vec<Extension> {
    vec![
        BASE,
        CODE,
        badge::EXTENSION,
        caption::EXTENSION,
        table::EXTENSION,
        terminal::EXTENSION,
        file_code::EXTENSION,
    ]
}

fn shared(command: impl Command + 'static) -> SharedCommand {
    Arc::new(command)
}

fn base_bindings(_: &EditorOptions) -> Vec<BindingDecl> {
    let hard_break = commands::chain(
        ChainMode::Advisory,
        vec![
            Box::new(commands::delete_selection()),
            Box::new(commands::insert_hard_break()),
        ],
    );
    vec![
        ("Enter", shared(commands::split_block())),
        ("Shift-Enter", shared(hard_break)),
        ("Backspace", shared(commands::delete_backward())),
        ("Mod-b", shared(commands::toggle_mark("bold"))),
        ("Mod-i", shared(commands::toggle_mark("italic"))),
        ("Mod-e", shared(commands::toggle_mark("code"))),
        ("Mod-z", shared(commands::undo())),
        ("Mod-Shift-z", shared(commands::redo())),
        ("Mod-y", shared(commands::redo())),
        ("Mod-Alt-0", shared(commands::set_paragraph())),
        ("Mod-Alt-1", shared(commands::toggle_heading(1))),
        ("Mod-Alt-2", shared(commands::toggle_heading(2))),
        ("Mod-Alt-3", shared(commands::toggle_heading(3))),
        ("Mod-Shift-8", shared(commands::toggle_bullet_list())),
        ("Mod-Shift-7", shared(commands::toggle_ordered_list())),
    ]
}

/// Enter inside a code block: a literal newline instead of a split.
pub fn insert_code_newline() -> impl Command {
    |state: &EditorState| -> Option<Transaction> {
        let (_, block) = state.head_textblock()?;
        if !state.schema().is_code(&block.node_type) {
            return None;
        }
        commands::insert_text("\n").build(state)
    }
}

/// Every extension's bindings, ordered for resolution.
pub struct Keymap {
    bindings: Vec<KeyBinding>,
}

impl Keymap {
    pub fn new(extensions: &[Extension], options: &EditorOptions) -> Self {
        let mut bindings = Vec::new();
        for ext in extensions {
            for (desc, command) in (ext.bindings)(options) {
                match Key::parse(desc) {
                    Some(key) => bindings.push(KeyBinding {
                        key,
                        priority: ext.priority,
                        command,
                        source: ext.name,
                    }),
                    None => log::warn!("{}: ignoring unparseable key '{desc}'", ext.name),
                }
            }
        }
        // stable, so equal priorities keep registration order
        bindings.sort_by_key(|b| std::cmp::Reverse(b.priority));
        Self { bindings }
    }

    pub fn bindings_for(&self, key: Key) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter().filter(move |b| b.key == key)
    }

    /// The first binding for `key` whose command applies.
    pub fn resolve(&self, key: Key, state: &EditorState) -> Option<(&'static str, Transaction)> {
        self.bindings_for(key)
            .find_map(|b| b.command.build(state).map(|tr| (b.source, tr)))
    }
}
