mod app;
mod clipboard;
mod highlight;
mod view;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use quire_config::{Config, EditorSettings};
use quire_engine::EditorOptions;
use quire_engine::render::SimpleHighlighter;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    env,
    fs::File,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

use app::App;
use clipboard::SystemClipboard;
use highlight::HighlightWorker;

const TICK: Duration = Duration::from_millis(100);

fn editor_options(settings: &EditorSettings) -> EditorOptions {
    EditorOptions {
        history_depth: settings.history_depth,
        languages: settings.languages.clone(),
        default_package_manager: settings.default_package_manager.clone(),
        copy_feedback: Duration::from_millis(settings.copy_feedback_ms),
        terminal_copy_feedback: Duration::from_millis(settings.terminal_copy_feedback_ms),
    }
}

/// Log to a file next to the drafts so the TUI stays intact. `RUST_LOG`
/// overrides the level.
fn init_logging(drafts_path: &Path) {
    let log_path = drafts_path.join(".quire.log");
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(log::LevelFilter::Info);
    if let Ok(value) = env::var("RUST_LOG") {
        builder.parse_filters(&value);
    }
    match File::create(&log_path) {
        Ok(file) => {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        // no log file, no logging: stderr would draw over the TUI
        Err(_) => {
            builder.filter_level(log::LevelFilter::Off);
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    // Determine drafts path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let (drafts_path, settings, from_config) = match args.len() {
        2 => {
            // an explicit folder still picks up editor settings from the config
            let settings = match Config::load() {
                Ok(Some(config)) => config.editor,
                _ => EditorSettings::default(),
            };
            (PathBuf::from(&args[1]), settings, false)
        }
        1 => match Config::load() {
            Ok(Some(config)) => (config.drafts_path, config.editor, true),
            Ok(None) => {
                eprintln!("Error: No drafts path provided and no config file found");
                eprintln!("Usage: {} <drafts-folder-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <drafts-folder-path>", args[0]);
                process::exit(1);
            }
        },
        _ => {
            eprintln!("Usage: {} [drafts-folder-path]", args[0]);
            process::exit(1);
        }
    };

    if !drafts_path.is_dir() {
        let source = if from_config {
            format!(" from config file '{}'", config_path.display())
        } else {
            String::new()
        };
        eprintln!(
            "Error: Drafts path '{}'{} is not a directory",
            drafts_path.display(),
            source
        );
        process::exit(1);
    }

    init_logging(&drafts_path);
    log::info!("quire starting up with drafts in {}", drafts_path.display());

    let mut app = App::new(
        &drafts_path,
        editor_options(&settings),
        Box::new(SystemClipboard::default()),
    )?;
    let worker = HighlightWorker::spawn(SimpleHighlighter::new());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &worker);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err:?}");
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    worker: &HighlightWorker,
) -> Result<()> {
    loop {
        app.pump_highlights(worker);
        let now = Instant::now();
        terminal
            .draw(|f| view::ui(f, app, now))
            .context("Failed to draw")?;

        // poll so highlight results and copy feedback show up without input
        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && !app.handle_key(key, Instant::now())?
        {
            return Ok(());
        }
    }
}
