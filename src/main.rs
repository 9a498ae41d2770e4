mod app;
mod chat;
mod config;
mod import;
mod library;
mod table;
mod theme;
mod ui;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::{App, Popup};
use chat::{openai, CONTEXT_RECORD_LIMIT};
use config::Preferences;
use library::{format_size, Category, Library, Visibility, STORAGE_QUOTA_BYTES};

#[derive(Parser, Debug)]
#[command(name = "filedeck")]
#[command(version = "0.1.0")]
#[command(about = "A terminal dashboard for your files, with an AI sidekick")]
struct Args {
    /// Import a file into the library without opening the TUI
    #[arg(short, long, value_name = "PATH")]
    import: Option<PathBuf>,

    /// Output library statistics as JSON (for scripts)
    #[arg(short, long)]
    stats: bool,

    /// Ask a one-shot question about the library and print the answer
    #[arg(short, long, value_name = "QUESTION")]
    ask: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Handle CLI-only commands
    if args.stats {
        return print_stats();
    }

    if let Some(path) = args.import {
        return import_file(&path);
    }

    if let Some(question) = args.ask {
        return ask_question(&question).await;
    }

    // Run TUI
    run_tui().await
}

fn print_stats() -> Result<()> {
    let library = Library::load();

    let mut by_category = serde_json::Map::new();
    for doc in &library.documents {
        let entry = by_category
            .entry(doc.category.as_str().to_string())
            .or_insert(serde_json::json!(0));
        *entry = serde_json::json!(entry.as_u64().unwrap_or(0) + 1);
    }

    let output = serde_json::json!({
        "files": library.documents.len(),
        "used_bytes": library.used_bytes(),
        "used": format_size(library.used_bytes()),
        "quota": format_size(STORAGE_QUOTA_BYTES),
        "used_percent": library.used_percent(),
        "by_category": by_category,
    });

    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn import_file(path: &PathBuf) -> Result<()> {
    let mut library = Library::load();
    let message = import_into(&mut library, path)?;
    library.save()?;

    // Notification failure must not fail an import that already saved
    if let Err(e) = notify("filedeck", &message) {
        tracing::warn!("Could not show notification: {}", e);
    }
    println!("{}", message);
    Ok(())
}

/// Import one file into the library, returning the success message.
fn import_into(library: &mut Library, path: &Path) -> Result<String> {
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string();
    // No tick loop on this path, so classify right away
    let category = Category::classify(&title);

    let (document, _data) = import::import_document(path, &title, category, Visibility::Private)?;

    if library.over_quota_with(document.size_bytes) {
        anyhow::bail!(
            "storage quota exceeded ({} free)",
            format_size(STORAGE_QUOTA_BYTES.saturating_sub(library.used_bytes()))
        );
    }
    let size = document.size_bytes;
    if library.merge(vec![document]) == 0 {
        anyhow::bail!("a file titled '{}' already exists", title);
    }

    Ok(format!(
        "Imported '{}' as {} ({})",
        title,
        category.as_str(),
        format_size(size)
    ))
}

async fn ask_question(question: &str) -> Result<()> {
    let Some(client) = openai::Client::from_env() else {
        anyhow::bail!("OPENAI_API_KEY is not set");
    };

    let library = Library::load();
    let mut prefs = Preferences::load().unwrap_or_default();
    let context = app::library_context(&library, prefs.date_format.pattern());

    let answer = client
        .ask(&prefs.model, question, &context.sample_json(CONTEXT_RECORD_LIMIT))
        .await?;

    prefs.record_usage(answer.total_tokens);
    let _ = prefs.save();

    println!("{}", answer.content);
    Ok(())
}

async fn run_tui() -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new()?;

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q')
                            if app.popup == Popup::None && !app.wants_text_input() =>
                        {
                            return Ok(())
                        }
                        KeyCode::Char('c')
                            if key.modifiers.contains(event::KeyModifiers::CONTROL) =>
                        {
                            return Ok(())
                        }
                        _ => {
                            // Handle key and catch any errors to prevent crashes
                            if let Err(e) = app.handle_key(key) {
                                app.status_message = Some(format!("Error: {}", e));
                            }
                        }
                    }
                }
            }
        }

        // Periodic refresh
        app.tick();
    }
}

fn notify(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .icon("folder-documents")
        .show()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "item,price\npen,2\nink,5").unwrap();
        path
    }

    #[test]
    fn import_into_adds_the_document_and_reports_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "invoice march.csv");

        let mut library = Library::in_memory(vec![]);
        let message = import_into(&mut library, &path).unwrap();

        assert_eq!(library.documents.len(), 1);
        assert_eq!(library.documents[0].title, "invoice march");
        assert!(message.contains("Imported 'invoice march'"));
    }

    #[test]
    fn importing_the_same_title_twice_fails_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "budget.csv");

        let mut library = Library::in_memory(vec![]);
        import_into(&mut library, &path).unwrap();
        let err = import_into(&mut library, &path).unwrap_err();

        assert!(err.to_string().contains("already exists"));
        assert_eq!(library.documents.len(), 1);
    }
}
