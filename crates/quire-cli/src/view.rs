use std::time::Instant;

use quire_engine::Editor;
use quire_engine::model::{Element, Mark, Node};
use quire_engine::outline::outline;
use quire_engine::render::{BlockHeader, CompositedBlock, SpanStyle, StyledLine};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, Mode, display_name};

const CARET: &str = "▏";

fn caret_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

/// Accumulates spans into lines and remembers which line got the caret.
#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    caret_line: Option<usize>,
}

impl LineBuilder {
    fn span(&mut self, text: &str, style: Style) {
        if !text.is_empty() {
            self.current.push(Span::styled(text.to_string(), style));
        }
    }

    fn caret(&mut self) {
        self.caret_line = Some(self.lines.len());
        self.current.push(Span::styled(CARET, caret_style()));
    }

    /// Push `text`, drawing the caret before char `caret` when given.
    fn text(&mut self, text: &str, style: Style, caret: Option<usize>) {
        match caret {
            Some(at) if at < text.chars().count() => {
                let split = text.char_indices().nth(at).map_or(text.len(), |(i, _)| i);
                self.span(&text[..split], style);
                self.caret();
                self.span(&text[split..], style);
            }
            _ => self.span(text, style),
        }
    }

    fn finish_line(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn blank(&mut self) {
        self.lines.push(Line::default());
    }
}

fn mark_style(mark: &Mark) -> Style {
    match mark.mark_type.as_str() {
        "bold" => Style::default().add_modifier(Modifier::BOLD),
        "italic" => Style::default().add_modifier(Modifier::ITALIC),
        "code" => Style::default().fg(Color::Yellow),
        "link" => Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        "badge" => Style::default().add_modifier(Modifier::REVERSED),
        _ => Style::default(),
    }
}

/// First `#rrggbb` colour in an inline style attribute.
fn inline_color(style: &str) -> Option<Color> {
    let hex = style.split('#').nth(1)?.get(..6)?;
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Color::Rgb(channel(0)?, channel(2)?, channel(4)?))
}

fn span_style(style: &SpanStyle) -> Style {
    match style {
        SpanStyle::Plain => Style::default(),
        SpanStyle::Accent => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        SpanStyle::Output => Style::default().fg(Color::Gray),
        SpanStyle::Token { class, style } => {
            if let Some(color) = style.as_deref().and_then(inline_color) {
                return Style::default().fg(color);
            }
            let class = class.as_deref().unwrap_or_default();
            let color = if class.contains("keyword") {
                Color::Magenta
            } else if class.contains("string") {
                Color::Green
            } else if class.contains("comment") {
                Color::DarkGray
            } else if class.contains("number") {
                Color::Yellow
            } else {
                Color::Reset
            };
            Style::default().fg(color)
        }
    }
}

/// Prefix for a textblock from its ancestors: list markers, quote bars and
/// table cell separators.
fn block_prefix(editor: &Editor, pos: usize) -> String {
    let Ok(rp) = editor.state().doc().resolve(pos + 1) else {
        return String::new();
    };
    let depth = rp.depth();
    let innermost_item = (1..depth).rev().find(|d| rp.node(*d).is("listItem"));
    let mut prefix = String::new();
    for d in 1..depth {
        let node = rp.node(d);
        match node.node_type.as_str() {
            "blockquote" => prefix.push_str("> "),
            "tableCell" | "tableHeader" => prefix.push_str("│ "),
            "listItem" if Some(d) == innermost_item => {
                let list = rp.node(d - 1);
                if list.is("orderedList") {
                    let start = list.attr("start").as_int().unwrap_or(1);
                    let number = start + i64::try_from(rp.index(d - 1)).unwrap_or_default();
                    prefix.push_str(&format!("{number}. "));
                } else {
                    prefix.push_str("• ");
                }
            }
            "listItem" => prefix.push_str("  "),
            _ => {}
        }
    }
    prefix
}

fn textblock_lines(editor: &Editor, pos: usize, el: &Element, out: &mut LineBuilder) {
    let head = editor.selection().head;
    let start = pos + 1;
    let caret = (start..=start + el.content_size())
        .contains(&head)
        .then(|| head - start);

    let mut base = Style::default();
    out.span(&block_prefix(editor, pos), Style::default().fg(Color::DarkGray));
    if el.is("heading") {
        let level = el.attr("level").as_int().unwrap_or(1).clamp(1, 3);
        out.span(&format!("{} ", "#".repeat(level as usize)), Style::default().fg(Color::DarkGray));
        base = base.add_modifier(Modifier::BOLD);
    } else if el.is("caption") {
        base = base.add_modifier(Modifier::ITALIC);
    }

    let mut offset = 0;
    for child in &el.content {
        let local = caret.and_then(|c| c.checked_sub(offset));
        match child {
            Node::Text(run) => {
                let style = run.marks.iter().fold(base, |s, m| s.patch(mark_style(m)));
                out.text(&run.text, style, local);
            }
            Node::Leaf(leaf) if leaf.node_type == "hardBreak" => {
                if local == Some(0) {
                    out.caret();
                }
                out.finish_line();
            }
            other => out.text(&other.text_content(), base, local),
        }
        offset += child.size();
    }
    if caret == Some(offset) {
        out.caret();
    }
    out.finish_line();
    out.blank();
}

fn code_block_lines(block: &CompositedBlock, out: &mut LineBuilder) {
    let dim = Style::default().fg(Color::DarkGray);
    match &block.header {
        BlockHeader::FileCode { filename, language } => {
            out.span(&format!("┌ {filename} · {language}"), dim);
        }
        BlockHeader::Terminal { active, managers } => {
            out.span("┌ ", dim);
            for manager in managers {
                let style = if *manager == active.as_str() {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    dim
                };
                out.span(&format!(" {manager} "), style);
            }
        }
        BlockHeader::None => out.span("┌", dim),
    }
    if block.copied {
        out.span("  copied ✓", Style::default().fg(Color::Green));
    }
    out.finish_line();

    for (i, line) in block.visual.iter().enumerate() {
        let highlighted = block.backdrop.get(i).copied().unwrap_or(false);
        let backdrop = if highlighted {
            Style::default().bg(Color::Rgb(60, 60, 20))
        } else {
            Style::default()
        };
        match block.gutter.get(i) {
            Some(button) => {
                let style = if button.highlighted { Color::Yellow } else { Color::DarkGray };
                out.span(&format!("│{:>3} ", button.number), Style::default().fg(style));
            }
            None => out.span("│ ", dim),
        }
        let caret = block.editable.caret.filter(|(l, _)| *l == i).map(|(_, c)| c);
        visual_line(line, backdrop, caret, out);
        out.finish_line();
    }
    out.span("└", dim);
    out.finish_line();
    out.blank();
}

fn visual_line(line: &StyledLine, backdrop: Style, caret: Option<usize>, out: &mut LineBuilder) {
    let mut offset = 0;
    for span in &line.spans {
        let local = caret.and_then(|c| c.checked_sub(offset));
        out.text(&span.text, span_style(&span.style).patch(backdrop), local);
        offset += span.text.chars().count();
    }
    if caret == Some(offset) {
        out.caret();
    }
}

/// The whole document as terminal lines, and the line holding the caret.
pub fn document_lines(editor: &Editor, now: Instant) -> (Vec<Line<'static>>, Option<usize>) {
    let blocks = editor.composite(now);
    let schema = editor.state().schema();
    let mut out = LineBuilder::default();
    editor.state().doc().descendants(|node, pos| match node {
        Node::Element(el) if schema.is_code(&el.node_type) => {
            if let Some(block) = blocks.iter().find(|b| b.pos == pos) {
                code_block_lines(block, &mut out);
            }
            false
        }
        Node::Element(el) if schema.is_textblock(&el.node_type) => {
            textblock_lines(editor, pos, el, &mut out);
            false
        }
        Node::Leaf(leaf) if leaf.node_type == "horizontalRule" => {
            out.span("────────────────", Style::default().fg(Color::DarkGray));
            out.finish_line();
            out.blank();
            false
        }
        _ => true,
    });
    (out.lines, out.caret_line)
}

pub fn ui(f: &mut Frame, app: &mut App, now: Instant) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)])
        .split(f.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);
    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[0]);

    let items: Vec<ListItem> = app
        .drafts
        .iter()
        .map(|path| ListItem::new(Line::from(display_name(path))))
        .collect();
    let drafts = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Drafts"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(drafts, sidebar[0], &mut app.list_state);

    let mut contents = Vec::new();
    if let Some(session) = &app.session {
        contents = outline(session.editor.state().doc())
            .iter()
            .flat_map(|entry| {
                std::iter::once(Line::from(entry.title.clone())).chain(
                    entry
                        .children
                        .iter()
                        .map(|child| Line::from(format!("  {}", child.title))),
                )
            })
            .collect();

        let (lines, caret_line) = document_lines(&session.editor, now);
        let visible = usize::from(columns[1].height.saturating_sub(2));
        let scroll = caret_line.map_or(0, |line| (line + 1).saturating_sub(visible));
        let title = format!(
            "{}{}",
            session.file_name(),
            if session.is_dirty() { " *" } else { "" }
        );
        let editor = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
        f.render_widget(editor, columns[1]);
    } else {
        let empty = Paragraph::new("Select a draft and press Enter to edit it")
            .block(Block::default().borders(Borders::ALL).title("Editor"));
        f.render_widget(empty, columns[1]);
    }

    let outline_panel =
        Paragraph::new(contents).block(Block::default().borders(Borders::ALL).title("On this page"));
    f.render_widget(outline_panel, sidebar[1]);

    let help = match app.mode {
        Mode::Browse => "q: Quit | ↑/k: Previous | ↓/j: Next | Enter: Edit",
        Mode::Edit => {
            "Esc: Drafts | Ctrl-s: Save | Ctrl-c: Copy block | Alt-t: Terminal | Alt-f: File code | Alt-h: Highlight line | Ctrl-Alt-p/l: Cycle"
        }
    };
    let mut footer = vec![Line::from(Span::raw(help))];
    if let Some(status) = &app.status {
        footer.push(Line::from(Span::styled(status.clone(), Style::default().fg(Color::Yellow))));
    }
    f.render_widget(Paragraph::new(footer), rows[1]);
}
