use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use quire_engine::commands;
use quire_engine::extensions::{Key, KeyCode, file_code, terminal};
use quire_engine::interchange::{from_html, to_html};
use quire_engine::model::{Node, Selection};
use quire_engine::render::{
    HighlightError, HighlightOutcome, MemoryClipboard, SimpleHighlighter,
};
use quire_engine::schema::blog::blog_schema;
use quire_engine::transform::Transaction;
use quire_engine::{Editor, EditorOptions};

fn editor(html: &str) -> Editor {
    Editor::new(html, EditorOptions::default()).unwrap()
}

#[test]
fn heading_then_paragraph_serializes_and_reparses() {
    let mut editor = editor("");
    editor.insert_text("Hello");
    assert!(editor.run(commands::toggle_heading(1)));
    assert!(editor.handle_key(Key::new(KeyCode::Enter)));
    editor.insert_text("World");

    let html = editor.html();
    assert_eq!(html, "<h1>Hello</h1><p>World</p>");
    let reparsed = from_html(&blog_schema(), &html).unwrap();
    let types: Vec<_> = reparsed.blocks().iter().map(|b| b.type_name().to_string()).collect();
    assert_eq!(types, vec!["heading", "paragraph"]);
}

#[test]
fn failing_step_rolls_back_the_whole_transaction() {
    let mut editor = editor("<p>Hello</p>");
    let before = editor.html();
    let tr = Transaction::new()
        .insert_text(6, " world", vec![])
        .replace(0, 0, vec![Node::text("loose")]);
    assert!(!editor.dispatch(&tr));
    assert_eq!(editor.html(), before);
    assert!(!editor.state().history().can_undo());
}

#[test]
fn positions_map_across_a_replacement() {
    let schema = blog_schema();
    let doc = from_html(&schema, "<p>abcdefghijklmnopqrstu</p>").unwrap();
    let applied = Transaction::new()
        .replace(5, 10, vec![Node::text("ab")])
        .apply(&schema, &doc, Selection::cursor(1))
        .unwrap();
    assert_eq!(applied.mapping.map(15), 12);
    assert_eq!(applied.mapping.map(3), 3);
    assert_eq!(applied.mapping.map(7), 5);
    assert!(applied.mapping.map_result(7).deleted);
}

#[test]
fn stale_highlight_never_overwrites_newer_one() {
    let mut editor = editor(r#"<pre data-type="file-code-block" data-language="ts"><code>let</code></pre>"#);
    let first = editor.take_highlight_requests().remove(0);
    editor.set_selection(4, 4);
    editor.insert_text(" x");
    let second = editor.take_highlight_requests().remove(0);

    let highlighter = SimpleHighlighter::new();
    assert_eq!(editor.apply_highlight(second.run(&highlighter)), HighlightOutcome::Applied);
    assert_eq!(editor.apply_highlight(first.run(&highlighter)), HighlightOutcome::Stale);

    let block = &editor.composite(Instant::now())[0];
    assert_eq!(block.visual[0].text(), "let x");
    assert!(block.is_aligned());
}

#[test]
fn highlighter_outage_keeps_previous_visual_layer() {
    let mut editor = editor(r#"<pre data-type="file-code-block" data-language="ts"><code>let a</code></pre>"#);
    editor.highlight_with(&SimpleHighlighter::new());

    editor.run(file_code::cycle_language(0, vec!["ts".into(), "js".into()]));
    let request = editor.take_highlight_requests().remove(0);
    assert_eq!(request.language, "js");
    let outage = request.respond(Err(HighlightError::ExternalServiceUnavailable("503".into())));
    assert_eq!(editor.apply_highlight(outage), HighlightOutcome::Failed);

    let block = &editor.composite(Instant::now())[0];
    assert_eq!(block.visual[0].spans[0].text, "let");
    assert_ne!(block.visual[0].spans[0].style, quire_engine::render::SpanStyle::Plain);
}

#[test]
fn package_manager_switch_clamps_caret() {
    let npm = "npm install --save-dev @types/node typescript eslint prettier";
    let mut editor = editor(&format!(
        r#"<div data-type="terminal-block" data-package-manager="npm" data-pnpm-content="pnpm add x">{npm}</div>"#
    ));
    assert!(editor.set_selection(51, 51));
    assert!(editor.run(terminal::switch_package_manager(0, "pnpm")));

    assert_eq!(editor.text(), "pnpm add x");
    assert_eq!(editor.selection(), Selection::cursor(11));
    assert!(editor.html().contains(&format!(r#"data-npm-content="{npm}""#)));

    assert!(editor.undo());
    assert_eq!(editor.text(), npm);
}

#[test]
fn backspace_deletes_table_only_from_an_empty_cell() {
    let mut empty = editor("<table><tr><td><p></p></td></tr></table><p>after</p>");
    empty.set_selection(4, 4);
    assert!(empty.handle_key(Key::new(KeyCode::Backspace)));
    assert_eq!(empty.html(), "<p>after</p>");

    let mut spaced = editor("<table><tr><td><p> </p></td></tr></table><p>after</p>");
    spaced.set_selection(4, 4);
    spaced.handle_key(Key::new(KeyCode::Backspace));
    assert!(spaced.html().starts_with("<table>"));
}

#[test]
fn highlighted_line_toggle_is_idempotent_in_pairs() {
    let mut editor = editor("<pre data-type=\"file-code-block\"><code>a\nb\nc</code></pre>");
    let original = editor.html();
    assert!(editor.run(file_code::toggle_highlighted_line(0, 1)));
    assert!(editor.html().contains(r#"data-highlighted-line="1""#));
    assert!(editor.run(file_code::toggle_highlighted_line(0, 1)));
    assert_eq!(editor.html(), original);
    assert!(!editor.run(file_code::toggle_highlighted_line(0, 3)));
}

#[test]
fn copy_writes_raw_text_and_shows_feedback() {
    let mut editor = editor(r#"<pre data-type="file-code-block"><code>a &lt; b</code></pre>"#);
    let mut clipboard = MemoryClipboard::default();
    let now = Instant::now();
    assert_eq!(editor.copy_block(0, &mut clipboard, now), Ok(true));
    assert_eq!(clipboard.contents.as_deref(), Some("a < b"));
    assert!(editor.composite(now + Duration::from_millis(500))[0].copied);
    assert!(!editor.composite(now + Duration::from_millis(1000))[0].copied);
}

#[test]
fn exported_html_round_trips_through_a_new_session() {
    let mut first = editor("<p>Intro</p>");
    first.set_selection(6, 6);
    first.run(commands::split_block());
    first.run(terminal::insert_terminal_block("yarn"));
    first.insert_text("yarn add quire");

    let second = editor(&first.html());
    assert_eq!(second.html(), first.html());
    assert_eq!(
        to_html(&blog_schema(), second.state().doc()),
        r#"<p>Intro</p><div data-type="terminal-block" data-package-manager="yarn">yarn add quire</div>"#
    );
}
