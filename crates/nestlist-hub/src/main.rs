mod app;
mod config;

use std::io;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

use nestlist_core::logging;
use nestlist_tree::NestedListTool;
use nestlist_tree::persist::SaveWorker;
use nestlist_tree::storage;

use app::App;
use config::HubConfig;

fn main() -> Result<()> {
    let config = HubConfig::resolve()?;
    logging::init_file_logging(&config.log_path)?;
    info!(data_dir = %config.data_dir.display(), "starting nestlist");

    // A store that fails to open still lets the UI start on the default tree.
    let store = storage::open_sqlite_store(&config.db_path);
    let worker = SaveWorker::spawn(store)?;

    let mut app = App::new(NestedListTool::new(worker));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main event loop
    let result = run_app(&mut terminal, &mut app, &config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.finish();

    if let Err(err) = result {
        error!(error = ?err, "event loop failed");
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    config: &HubConfig,
) -> Result<()> {
    loop {
        terminal.draw(|frame| {
            app.render(frame);
        })?;

        if app.should_quit {
            return Ok(());
        }

        // Poll with timeout so persistence events are picked up between keys
        if event::poll(config.tick_rate)? {
            let ev = event::read()?;
            app.handle_event(ev);
        }

        app.tick();
    }
}
