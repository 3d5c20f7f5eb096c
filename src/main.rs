use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use places_map::api::ApiClient;
use places_map::app::{App, Mode};
use places_map::config::Config;
use places_map::data;
use places_map::geocode::Geocoder;
use places_map::locate::Locator;
use places_map::place::VoteKind;
use places_map::ui;
use places_map::worker::{Services, Worker};
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;

fn main() -> Result<()> {
    let config = Config::parse();

    // The terminal belongs to the UI, so logs go to a file
    let log_file = File::create(&config.log_file)
        .with_context(|| format!("creating log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_max_level(config.log_level)
        .init();

    let timeout = config.timeout();
    let services = Services {
        api: ApiClient::new(&config.api_url, timeout)?,
        geocoder: Geocoder::new(&config.geocoder_url, timeout)?,
        locator: Locator::new(config.position, config.ip_lookup_url(), timeout)?,
    };
    let worker = Worker::new(services);
    info!(api = %config.api_url, landing = config.landing, "starting");

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, &config, &worker);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Mouse position relative to the map area, if inside it
fn map_cell(map: Rect, col: u16, row: u16) -> Option<(u16, u16)> {
    let inside = col >= map.x && col < map.x + map.width && row >= map.y && row < map.y + map.height;
    inside.then(|| (col - map.x, row - map.y))
}

/// Handle mouse events for panning, zooming and marker clicks
fn handle_mouse(app: &mut App, map: Rect, mouse: MouseEvent) {
    match mouse.kind {
        // Drags keep panning even when the pointer leaves the map
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
            return;
        }
        MouseEventKind::Up(MouseButton::Left) => {
            match map_cell(map, mouse.column, mouse.row) {
                Some((col, row)) => app.release(col, row),
                None => app.last_mouse = None,
            }
            return;
        }
        _ => {}
    }

    let Some((col, row)) = map_cell(map, mouse.column, mouse.row) else {
        return;
    };
    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(col, row),
        MouseEventKind::ScrollDown => app.zoom_out_at(col, row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Drag tracking works in screen cells, clicks in map cells
        MouseEventKind::Down(MouseButton::Left) => {
            app.press(mouse.column, mouse.row);
        }
        _ => {}
    }
}

/// Keys while no prompt or form is open
fn handle_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.back(),

        // Pan with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
        KeyCode::Char('0') => app.reset_view(),

        // Filters
        KeyCode::Char('/') => app.start_search(),
        KeyCode::Char('x') => app.clear_search(),
        KeyCode::Char('f') => app.cycle_category(true),
        KeyCode::Char('F') => app.cycle_category(false),
        KeyCode::Char('a') => app.show_all_categories(),
        KeyCode::Char('s') => app.start_filter(),

        // List and detail
        KeyCode::Char('J') | KeyCode::Tab => app.select_next(),
        KeyCode::Char('K') | KeyCode::BackTab => app.select_prev(),
        KeyCode::Enter => app.open_selected(),
        KeyCode::Char('u') => app.vote(VoteKind::Upvote),
        KeyCode::Char('d') => app.vote(VoteKind::Downvote),
        KeyCode::Char('c') => app.start_comment(),
        KeyCode::Char('r') => app.report_selected_comment(),

        KeyCode::Char('n') => app.start_submit(),
        KeyCode::Char('i') => app.start_feedback(),
        KeyCode::Char('m') => app.go_to_my_location(),
        KeyCode::Char('R') => app.reload(),

        // Layer toggles
        KeyCode::Char('b') | KeyCode::Char('B') => app.map_renderer.toggle_borders(),
        KeyCode::Char('L') => app.map_renderer.toggle_labels(),

        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config, worker: &Worker) -> Result<()> {
    let size = terminal.size()?;
    let mut areas = ui::layout(Rect::new(0, 0, size.width, size.height), false);
    let mut app = App::new(
        areas.map.width as usize,
        areas.map.height as usize,
        config.map_setup(),
        &config.author,
    );

    // Load all available GeoJSON data at different resolutions
    if config.data_dir.exists() {
        data::load_basemap(&mut app.map_renderer, &config.data_dir);
    }

    // Fall back to simple world if no data loaded
    if !app.map_renderer.has_data() {
        info!(dir = %config.data_dir.display(), "no basemap data, using simplified outlines");
        data::generate_simple_world(&mut app.map_renderer);
    }

    // Main loop
    loop {
        for request in app.take_requests() {
            worker.submit(request);
        }

        // Keep the viewport in step with the map area before drawing
        let size = terminal.size()?;
        areas = ui::layout(Rect::new(0, 0, size.width, size.height), app.detail.is_open());
        app.resize(areas.map.width as usize, areas.map.height as usize);

        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        if matches!(app.mode, Mode::Normal) {
                            handle_key(&mut app, key);
                        } else {
                            app.input_key(key.code);
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, areas.map, mouse);
                }
                _ => {}
            }
        }

        for response in worker.drain() {
            app.handle_response(response, Instant::now());
        }
        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
