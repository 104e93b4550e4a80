use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use lgv_map::app::App;
use lgv_map::config::{Args, Config};
use lgv_map::data::{DatasetSource, OfflineSource, OverpassClient};
use lgv_map::loader::Origin;
use lgv_map::ui;
use ratatui::DefaultTerminal;
use std::fs::{self, File};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::from_args(Args::parse());

    init_logging(&config);
    info!(
        cache = %config.cache_dir.display(),
        endpoint = %config.endpoint,
        "starting lgv-map"
    );

    let source: Arc<dyn DatasetSource + Send + Sync> = if config.offline {
        Arc::new(OfflineSource)
    } else {
        Arc::new(OverpassClient::new(config.endpoint.clone(), config.area_id)?)
    };

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config, source);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Log to a file next to the cache; the terminal belongs to the UI.
/// Without a writable cache directory logs are discarded.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true);

    match open_log_file(config) {
        Ok(file) => builder.with_writer(Mutex::new(file)).init(),
        Err(_) => builder.with_writer(std::io::sink).init(),
    }
}

fn open_log_file(config: &Config) -> Result<File> {
    let path = config.log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    File::create(&path).with_context(|| format!("creating log file {}", path.display()))
}

/// Handle mouse events for panning, zooming and selecting
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        MouseEventKind::Down(MouseButton::Left) => app.begin_drag(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.handle_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(mouse.column, mouse.row),
        MouseEventKind::Down(MouseButton::Right) => app.select_at(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(
    terminal: &mut DefaultTerminal,
    config: &Config,
    source: Arc<dyn DatasetSource + Send + Sync>,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize);

    // Show the loader before blocking on cache and network
    app.loading = true;
    app.status.progress("Loading rail data", "reading cache, then Overpass API");
    terminal.draw(|frame| ui::render(frame, &app))?;

    let cache = app.open_cache(&config.cache_dir, Instant::now());
    if let Some(cache) = &cache {
        let origin = app.load(cache, source.as_ref(), Instant::now());
        if origin == Some(Origin::Cache) && config.refresh_on_start {
            app.start_refresh(cache, Arc::clone(&source));
        }
    } else {
        app.loading = false;
    }

    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                    KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                    KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                    KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                    KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                    KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                    KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                    KeyCode::Char('g') | KeyCode::Char('G') => {
                        app.renderer.settings.show_lgv = !app.renderer.settings.show_lgv;
                    }
                    KeyCode::Char('t') | KeyCode::Char('T') => {
                        app.renderer.settings.show_tunnels = !app.renderer.settings.show_tunnels;
                    }
                    KeyCode::Char('o') | KeyCode::Char('O') => {
                        app.renderer.settings.show_outline = !app.renderer.settings.show_outline;
                    }

                    KeyCode::Char('u') | KeyCode::Char('U') if !config.offline => {
                        if let Some(cache) = &cache {
                            app.start_refresh(cache, Arc::clone(&source));
                        }
                    }

                    KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                    _ => {}
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width as usize, height as usize),
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
