use anyhow::Result;
use casemap::app::App;
use casemap::{data, ui};
use chrono::NaiveDate;
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// US county COVID-19 case counts as a zoomable terminal bubble map
#[derive(Parser)]
#[command(name = "casemap", version, about)]
struct Cli {
    /// Boundary document: a topology with counties and states objects, or a
    /// GeoJSON feature collection. Coordinates are taken as planar, y-down
    /// map units (a pre-projected atlas), not raw lon/lat
    #[arg(long, default_value = "data/counties-albers-10m.json")]
    counties: PathBuf,

    /// Cumulative case time series CSV (date, county, state, fips, cases)
    #[arg(long, default_value = "data/us-counties.csv")]
    cases: PathBuf,

    /// Show this date instead of the series' last date (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // Load everything before touching the terminal, so a bad file aborts
    // with a plain error instead of a garbled screen
    let data = data::load(&cli.counties, &cli.cases)?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, data, cli.date);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for hovering, panning, zooming, and clicking
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.mouse_moved(mouse.column, mouse.row),
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Press, drag to pan, release; a short press is a click
        MouseEventKind::Down(MouseButton::Left) => app.mouse_pressed(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_dragged(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_released(mouse.column, mouse.row),
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, data: data::WorldData, date: Option<NaiveDate>) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(data, size.width as usize, size.height as usize, date);
    let mut last_tick = Instant::now();

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Step the active date through the series
                            KeyCode::Char('[') => app.step_date(-1),
                            KeyCode::Char(']') => app.step_date(1),

                            // Layer toggles
                            KeyCode::Char('s') | KeyCode::Char('S') => {
                                app.renderer.toggle_states();
                            }
                            KeyCode::Char('c') | KeyCode::Char('C') => {
                                app.renderer.toggle_counties();
                            }
                            KeyCode::Char('b') | KeyCode::Char('B') => {
                                app.renderer.toggle_bubbles();
                            }
                            KeyCode::Char('L') => {
                                app.renderer.toggle_legend();
                            }

                            // Reset view
                            KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        // Advance the focus transition
        let now = Instant::now();
        app.tick(now - last_tick);
        last_tick = now;

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
