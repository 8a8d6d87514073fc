use chrono::NaiveDate;
use std::time::Duration;

use crate::data::{CaseTable, WorldData};
use crate::map::{MapModel, MapRenderer, Transition, View};

/// Cells of mouse travel beyond which a press is a drag. A drag's release
/// swallows the click that would otherwise fire.
const DRAG_THRESHOLD: u32 = 2;

/// Application state
pub struct App {
    pub model: MapModel,
    pub cases: CaseTable,
    pub renderer: MapRenderer,
    pub view: View,
    /// In-flight focus/reset transition, advanced each tick
    transition: Option<Transition>,
    /// The focused state, highlighted and zoomed to
    pub active_state: Option<usize>,
    /// The county bubble under the cursor
    pub hovered: Option<usize>,
    /// Date whose counts are joined onto the counties
    pub date: NaiveDate,
    pub should_quit: bool,
    /// Current mouse position for the cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Last mouse position while a button is held, for drag-to-pan
    last_mouse: Option<(u16, u16)>,
    /// Accumulated cells of travel in the current press
    drag_travel: u32,
    mouse_down: bool,
}

impl App {
    pub fn new(data: WorldData, width: usize, height: usize, date: Option<NaiveDate>) -> Self {
        let WorldData { mut model, cases } = data;

        // Snap a requested date into the series; default is the last row's
        let date = match date {
            Some(requested) => cases.step_date(requested, 0),
            None => cases.latest_date(),
        };
        model.apply_cases(&cases.cases_on(date));

        // Braille gives 2x4 resolution per character
        // Account for border (2 chars horizontal, 2 chars vertical including status bar)
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(3);
        let view = View::fitted(model.home, inner_width * 2, inner_height * 4);

        Self {
            model,
            cases,
            renderer: MapRenderer::new(),
            view,
            transition: None,
            active_state: None,
            hovered: None,
            date,
            should_quit: false,
            mouse_pos: None,
            last_mouse: None,
            drag_travel: 0,
            mouse_down: false,
        }
    }

    /// Update viewport size when the terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let inner_width = width.saturating_sub(2);
        let inner_height = height.saturating_sub(3);
        self.view.resize(inner_width * 2, inner_height * 4);
    }

    /// Advance the focus transition; interpolated states are applied
    /// directly, outside the manual pan/zoom paths.
    pub fn tick(&mut self, dt: Duration) {
        if let Some(transition) = &mut self.transition {
            let state = transition.advance(dt);
            self.view.apply(state);
            if transition.is_complete() {
                self.transition = None;
            }
            self.refresh_hover();
        }
    }

    /// Pan the map, interrupting any transition
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.transition = None;
        self.view.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.transition = None;
        self.view.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.transition = None;
        self.view.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        self.transition = None;
        let (px, py) = cell_to_pixel(col, row);
        self.view.zoom_in_at(px, py);
        self.refresh_hover();
    }

    /// Zoom out from a screen position (terminal column/row)
    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        self.transition = None;
        let (px, py) = cell_to_pixel(col, row);
        self.view.zoom_out_at(px, py);
        self.refresh_hover();
    }

    /// Zoom to a state and mark it active
    pub fn focus_state(&mut self, index: usize) {
        let Some(state) = self.model.states.get(index) else {
            return;
        };
        self.active_state = Some(index);
        self.transition = Some(Transition::new(
            self.view.state(),
            self.view.fit_state(state.bounds),
        ));
    }

    /// Clear the active state and glide back to the whole map
    pub fn reset_view(&mut self) {
        self.active_state = None;
        self.transition = Some(Transition::new(self.view.state(), self.view.home_state()));
    }

    /// Step the active date through the series and re-join the counts
    pub fn step_date(&mut self, delta: i64) {
        let date = self.cases.step_date(self.date, delta);
        if date != self.date {
            self.date = date;
            let cases = self.cases.cases_on(date);
            self.model.apply_cases(&cases);
            self.refresh_hover();
        }
    }

    pub fn mouse_pressed(&mut self, col: u16, row: u16) {
        self.mouse_down = true;
        self.mouse_pos = Some((col, row));
        self.last_mouse = Some((col, row));
        self.drag_travel = 0;
    }

    /// Handle mouse drag: pan, and accumulate travel for click arbitration
    pub fn mouse_dragged(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = last_col as i32 - col as i32;
            let dy = last_row as i32 - row as i32;
            self.drag_travel += dx.unsigned_abs() + dy.unsigned_abs();
            // Scale based on zoom: less sensitive when zoomed out
            let scale = if self.view.zoom < 2.0 {
                2
            } else if self.view.zoom < 4.0 {
                3
            } else {
                4
            };
            self.pan(dx * scale, dy * scale);
        }
        self.last_mouse = Some((col, row));
        self.mouse_pos = Some((col, row));
    }

    /// Handle mouse release: a release after real travel is the end of a
    /// drag, not a click
    pub fn mouse_released(&mut self, col: u16, row: u16) {
        let was_drag = self.drag_travel >= DRAG_THRESHOLD;
        self.mouse_down = false;
        self.last_mouse = None;
        self.drag_travel = 0;
        if !was_drag {
            self.click(col, row);
        }
    }

    /// Update cursor position and hover when no button is held
    pub fn mouse_moved(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        if !self.mouse_down {
            self.refresh_hover();
        }
    }

    /// Click a state to focus it; click the active state or the background
    /// to reset.
    fn click(&mut self, col: u16, row: u16) {
        let (px, py) = cell_to_pixel(col, row);
        let point = self.view.unproject(px, py);
        match self.model.state_at(point) {
            Some(state) if self.active_state != Some(state) => self.focus_state(state),
            _ => self.reset_view(),
        }
    }

    fn refresh_hover(&mut self) {
        self.hovered = self.mouse_pos.and_then(|(col, row)| {
            let (px, py) = cell_to_pixel(col, row);
            self.model.bubble_at(self.view.unproject(px, py))
        });
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.view.zoom)
    }

    /// Active date formatted for the status bar
    pub fn date_label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Get mouse position in braille pixel coordinates (for rendering marker)
    pub fn mouse_pixel_pos(&self) -> Option<(i32, i32)> {
        self.mouse_pos.map(|(col, row)| cell_to_pixel(col, row))
    }
}

/// Convert terminal coords to braille pixel coords
/// Each terminal cell is 2 braille pixels wide, 4 tall
/// Account for border (1 cell offset)
fn cell_to_pixel(col: u16, row: u16) -> (i32, i32) {
    (
        (col.saturating_sub(1)) as i32 * 2,
        (row.saturating_sub(1)) as i32 * 4,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::WorldData;
    use crate::map::model::Region;
    use glam::DVec2;
    use std::collections::HashMap;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x0 + size, y0),
            DVec2::new(x0 + size, y0 + size),
            DVec2::new(x0, y0 + size),
            DVec2::new(x0, y0),
        ]
    }

    fn region(fips: &str, name: &str, rings: Vec<Vec<DVec2>>) -> Region {
        Region {
            fips: fips.to_string(),
            name: Some(name.to_string()),
            rings,
        }
    }

    /// Two 10x10 counties and states side by side, terminal 42x18 cells,
    /// so the inner canvas is 80x60 braille pixels.
    fn app() -> App {
        let counties = vec![
            region("01001", "Alpha", vec![square(0.0, 0.0, 10.0)]),
            region("02001", "Beta", vec![square(10.0, 0.0, 10.0)]),
        ];
        let states = vec![
            region("01", "West", vec![square(0.0, 0.0, 10.0)]),
            region("02", "East", vec![square(10.0, 0.0, 10.0)]),
        ];
        let model =
            MapModel::build(counties, states, Vec::new(), None, HashMap::new()).unwrap();
        let cases = CaseTable::from_reader(
            "date,county,state,fips,cases\n\
             2020-03-01,Alpha,West,01001,100\n\
             2020-03-02,Alpha,West,01001,1000\n\
             2020-03-02,Beta,East,02001,250\n"
                .as_bytes(),
        )
        .unwrap();
        App::new(WorldData { model, cases }, 42, 18, None)
    }

    /// Terminal cell over a map point, inverting cell_to_pixel.
    fn cell_over(app: &App, p: DVec2) -> (u16, u16) {
        let (px, py) = app.view.project(p);
        ((px / 2 + 1) as u16, (py / 4 + 1) as u16)
    }

    fn settle(app: &mut App) {
        app.tick(Duration::from_secs(2));
    }

    #[test]
    fn test_active_date_defaults_to_last_row() {
        let app = app();
        assert_eq!(app.date_label(), "2020-03-02");
        assert_eq!(app.model.counties[0].cases, 1000);
    }

    #[test]
    fn test_requested_date_joins_that_day() {
        let model =
            MapModel::build(vec![region("01001", "Alpha", vec![square(0.0, 0.0, 10.0)])],
                Vec::new(), Vec::new(), None, HashMap::new())
            .unwrap();
        let cases = CaseTable::from_reader(
            "date,county,state,fips,cases\n\
             2020-04-05,Alpha,West,01001,42\n\
             2020-04-06,Alpha,West,01001,70\n"
                .as_bytes(),
        )
        .unwrap();
        let requested = NaiveDate::from_ymd_opt(2020, 4, 5).unwrap();
        let app = App::new(WorldData { model, cases }, 42, 18, Some(requested));
        assert_eq!(app.date_label(), "2020-04-05");
        assert_eq!(app.model.counties[0].cases, 42);
    }

    #[test]
    fn test_click_focuses_state() {
        let mut app = app();
        let (col, row) = cell_over(&app, DVec2::new(5.0, 5.0));
        app.mouse_pressed(col, row);
        app.mouse_released(col, row);
        assert_eq!(app.active_state, Some(0));

        settle(&mut app);
        assert!(app.view.zoom > 1.0);
        // West's center is (5, 5)
        assert!((app.view.center - DVec2::new(5.0, 5.0)).length() < 1e-9);
    }

    #[test]
    fn test_background_click_resets() {
        let mut app = app();
        app.focus_state(1);
        settle(&mut app);

        app.mouse_pressed(1, 1);
        app.mouse_released(1, 1);
        assert_eq!(app.active_state, None);
        settle(&mut app);
        assert_eq!(app.view.zoom, 1.0);
    }

    #[test]
    fn test_clicking_active_state_resets() {
        let mut app = app();
        let (col, row) = cell_over(&app, DVec2::new(15.0, 5.0));
        app.mouse_pressed(col, row);
        app.mouse_released(col, row);
        assert_eq!(app.active_state, Some(1));
        settle(&mut app);

        let (col, row) = cell_over(&app, DVec2::new(15.0, 5.0));
        app.mouse_pressed(col, row);
        app.mouse_released(col, row);
        assert_eq!(app.active_state, None);
    }

    #[test]
    fn test_drag_release_is_not_a_click() {
        let mut app = app();
        let (col, row) = cell_over(&app, DVec2::new(5.0, 5.0));
        app.mouse_pressed(col, row);
        app.mouse_dragged(col + 3, row);
        app.mouse_dragged(col + 6, row);
        app.mouse_released(col + 6, row);
        assert_eq!(app.active_state, None);
    }

    #[test]
    fn test_tiny_wobble_still_clicks() {
        let mut app = app();
        let (col, row) = cell_over(&app, DVec2::new(5.0, 5.0));
        app.mouse_pressed(col, row);
        app.mouse_dragged(col + 1, row);
        app.mouse_released(col + 1, row);
        assert_eq!(app.active_state, Some(0));
    }

    #[test]
    fn test_manual_zoom_interrupts_transition() {
        let mut app = app();
        app.focus_state(0);
        app.tick(Duration::from_millis(100));
        let mid = app.view.state();
        app.zoom_in();
        // A later tick must not keep applying the dead transition
        let after_zoom = app.view.state();
        app.tick(Duration::from_millis(100));
        assert_eq!(app.view.state(), after_zoom);
        assert_ne!(after_zoom, mid);
    }

    #[test]
    fn test_step_date_rejoins_counts() {
        let mut app = app();
        app.step_date(-1);
        assert_eq!(app.date_label(), "2020-03-01");
        assert_eq!(app.model.counties[0].cases, 100);
        assert_eq!(app.model.counties[1].cases, 0);
        app.step_date(1);
        assert_eq!(app.model.counties[1].cases, 250);
    }

    #[test]
    fn test_hover_tracks_bubbles() {
        let mut app = app();
        let (col, row) = cell_over(&app, DVec2::new(5.0, 5.0));
        app.mouse_moved(col, row);
        assert_eq!(app.hovered, Some(0));
        app.mouse_moved(1, 1);
        assert_eq!(app.hovered, None);
    }
}
