use crate::app::App;
use crate::map::renderer::{format_count, Legend};
use crate::map::MapLayers;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " US COVID-19 Cases ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Size the view to the inner area; braille gives 2x4 per character
    let mut view = app.view.clone();
    view.resize(inner.width as usize * 2, inner.height as usize * 4);

    let layers = app.renderer.render(
        &app.model,
        &view,
        app.active_state,
        app.hovered,
        inner.width as usize,
        inner.height as usize,
    );

    let legend = if app.renderer.settings.show_legend && inner.width >= 24 && inner.height >= 7 {
        Some(app.renderer.legend())
    } else {
        None
    };

    // Get mouse cursor position for marker
    let cursor_pos = app.mouse_pixel_pos().and_then(|(px, py)| {
        // Convert braille pixels to character position
        let cx = (px / 2) as u16;
        let cy = (py / 4) as u16;
        if cx < inner.width && cy < inner.height {
            Some((cx, cy))
        } else {
            None
        }
    });

    let map_widget = MapWidget {
        layers,
        legend,
        cursor_pos,
        inner_width: inner.width,
        inner_height: inner.height,
    };
    frame.render_widget(map_widget, inner);
}

/// Custom widget that renders braille layers with text labels overlaid
struct MapWidget {
    layers: MapLayers,
    legend: Option<Legend>,
    cursor_pos: Option<(u16, u16)>,
    inner_width: u16,
    inner_height: u16,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(
        &self,
        canvas: &crate::braille::BrailleCanvas,
        color: Color,
        area: Rect,
        buf: &mut Buffer,
    ) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Render layers from back to front:
        // 1. County outlines (DarkGray - at back)
        self.render_layer(&self.layers.counties, Color::DarkGray, area, buf);

        // 2. State borders (Gray)
        self.render_layer(&self.layers.states, Color::Gray, area, buf);

        // 3. Case bubbles (Red)
        self.render_layer(&self.layers.bubbles, Color::Red, area, buf);

        // 4. Active region highlight and hover halo (Yellow - on top)
        self.render_layer(&self.layers.active, Color::Yellow, area, buf);

        // Overlay hover labels
        let label_style = Style::default().fg(Color::White);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= self.inner_height || *lx >= self.inner_width {
                continue;
            }
            let x = area.x + *lx;
            let y = area.y + *ly;

            // Truncate label to fit the remaining row
            let max_len = (self.inner_width.saturating_sub(*lx)) as usize;
            let display_text: String = text.chars().take(max_len).collect();

            for (i, ch) in display_text.chars().enumerate() {
                let px = x + i as u16;
                if px < area.x + area.width {
                    buf[(px, y)].set_char(ch).set_style(label_style);
                }
            }
        }

        // Size legend floats bottom-right
        if let Some(legend) = &self.legend {
            let legend_width = legend.canvas.width() as u16 + 6;
            let legend_height = legend.canvas.height() as u16;
            if area.width > legend_width && area.height > legend_height {
                let legend_area = Rect {
                    x: area.right() - legend_width,
                    y: area.bottom() - legend_height,
                    width: legend_width,
                    height: legend_height,
                };
                self.render_layer(&legend.canvas, Color::Red, legend_area, buf);
                for (lx, ly, text) in &legend.labels {
                    let y = legend_area.y + ly;
                    for (i, ch) in text.chars().enumerate() {
                        let x = legend_area.x + lx + 1 + i as u16;
                        if x < area.right() {
                            buf[(x, y)].set_char(ch).set_fg(Color::Gray);
                        }
                    }
                }
            }
        }

        // Render cursor marker
        if let Some((cx, cy)) = self.cursor_pos {
            let x = area.x + cx;
            let y = area.y + cy;
            if x < area.x + area.width && y < area.y + area.height {
                buf[(x, y)].set_char('╋').set_fg(Color::White);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let settings = &app.renderer.settings;

    // Hovered county first, then the focused state, then nothing
    let readout = app
        .hovered
        .map(|i| {
            format!(
                "{}: {}",
                app.model.county_label(i),
                format_count(app.model.counties[i].cases)
            )
        })
        .or_else(|| app.active_state.map(|i| app.model.state_label(i)))
        .unwrap_or_default();

    let status = Line::from(vec![
        Span::styled(" Date: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.date_label(), Style::default().fg(Color::Yellow)),
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" ", Style::default()),
        // Toggle indicators
        Span::styled(
            if settings.show_states { "[S]tates " } else { "[s]tates " },
            Style::default().fg(if settings.show_states { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            if settings.show_counties { "[C]ounties " } else { "[c]ounties " },
            Style::default().fg(if settings.show_counties { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            if settings.show_bubbles { "[B]ubbles " } else { "[b]ubbles " },
            Style::default().fg(if settings.show_bubbles { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled(
            if settings.show_legend { "[L]egend " } else { "[l]egend " },
            Style::default().fg(if settings.show_legend { Color::Green } else { Color::DarkGray }),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(readout, Style::default().fg(Color::Cyan)),
        Span::styled(
            " | [/]:date hjkl:pan +/-:zoom r:reset q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let paragraph = Paragraph::new(status);
    frame.render_widget(paragraph, area);
}
