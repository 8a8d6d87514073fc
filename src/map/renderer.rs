use crate::braille::BrailleCanvas;
use glam::DVec2;

use super::geometry::{draw_circle_filled, draw_circle_outline, draw_line};
use super::model::MapModel;
use super::scale::CASE_SCALE;
use super::view::View;

/// Case counts sampled by the legend.
pub const LEGEND_SAMPLES: [u64; 3] = [10, 100, 1000];

/// Braille layers for one frame. The UI composites them back to front,
/// one color per layer.
pub struct MapLayers {
    pub states: BrailleCanvas,
    pub counties: BrailleCanvas,
    pub bubbles: BrailleCanvas,
    pub active: BrailleCanvas,
    pub labels: Vec<(u16, u16, String)>,
}

impl MapLayers {
    fn new(width: usize, height: usize) -> Self {
        Self {
            states: BrailleCanvas::new(width, height),
            counties: BrailleCanvas::new(width, height),
            bubbles: BrailleCanvas::new(width, height),
            active: BrailleCanvas::new(width, height),
            labels: Vec::new(),
        }
    }
}

/// The size legend: bottom-aligned nested circles with a count label at
/// each circle's top edge.
pub struct Legend {
    pub canvas: BrailleCanvas,
    pub labels: Vec<(u16, u16, String)>,
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_states: bool,
    pub show_counties: bool,
    pub show_bubbles: bool,
    pub show_legend: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_states: true,
            show_counties: false,
            show_bubbles: true,
            show_legend: true,
        }
    }
}

/// Draws the joined model through a view into braille layers.
pub struct MapRenderer {
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            settings: DisplaySettings::default(),
        }
    }

    /// Render one frame. `width` and `height` are character cells; `view`
    /// must already be sized to the matching braille pixel grid.
    pub fn render(
        &self,
        model: &MapModel,
        view: &View,
        active: Option<usize>,
        hovered: Option<usize>,
        width: usize,
        height: usize,
    ) -> MapLayers {
        let mut layers = MapLayers::new(width, height);
        let visible = view.visible_bounds();

        if self.settings.show_states {
            for line in &model.mesh {
                draw_polyline(&mut layers.states, line, view);
            }
        }

        if self.settings.show_counties {
            for county in &model.counties {
                if !county.bounds.intersects(&visible) {
                    continue;
                }
                for ring in &county.rings {
                    draw_polyline(&mut layers.counties, ring, view);
                }
            }
        }

        if self.settings.show_bubbles {
            // Largest bubbles first, so small ones stay readable on top
            for &i in model.draw_order() {
                let county = &model.counties[i];
                if county.cases == 0 {
                    continue;
                }
                let radius = (CASE_SCALE.radius(county.cases as f64) * view.scale()).round() as i32;
                let (px, py) = view.project(county.centroid);
                if !circle_might_be_visible(&layers.bubbles, px, py, radius) {
                    continue;
                }
                draw_circle_filled(&mut layers.bubbles, px, py, radius);
            }
        }

        if let Some(active) = active {
            if let Some(state) = model.states.get(active) {
                for ring in &state.rings {
                    draw_polyline(&mut layers.active, ring, view);
                }
            }
        }

        if let Some(hovered) = hovered {
            self.render_hover(model, view, hovered, &mut layers);
        }

        layers
    }

    /// Halo the hovered bubble and attach its readout label.
    fn render_hover(&self, model: &MapModel, view: &View, hovered: usize, layers: &mut MapLayers) {
        let Some(county) = model.counties.get(hovered) else {
            return;
        };
        let (px, py) = view.project(county.centroid);
        if !view.is_visible(px, py) {
            return;
        }
        let radius = (CASE_SCALE.radius(county.cases as f64) * view.scale()).round() as i32;
        draw_circle_outline(&mut layers.active, px, py, radius + 2);

        let char_x = (px / 2) as u16;
        let char_y = (py / 4) as u16;
        if let Some(label_x) = char_x.checked_add(2) {
            layers.labels.push((
                label_x,
                char_y,
                format!(
                    "{}: {}",
                    model.county_label(hovered),
                    format_count(county.cases)
                ),
            ));
        }
    }

    /// The static size legend, drawn through the same radius scale as the
    /// bubbles and unaffected by zoom.
    pub fn legend(&self) -> Legend {
        let mut canvas = BrailleCanvas::new(9, 5);
        let baseline = canvas.pixel_height() as i32 - 2;
        let cx = 8;
        let mut labels = Vec::new();
        for &value in LEGEND_SAMPLES.iter().rev() {
            let radius = CASE_SCALE.radius(value as f64).round().max(1.0) as i32;
            draw_circle_outline(&mut canvas, cx, baseline - radius, radius);
            let top = (baseline - 2 * radius).max(0) as u16;
            labels.push((canvas.width() as u16, top / 4, format_count(value)));
        }
        Legend { canvas, labels }
    }

    pub fn toggle_states(&mut self) {
        self.settings.show_states = !self.settings.show_states;
    }

    pub fn toggle_counties(&mut self) {
        self.settings.show_counties = !self.settings.show_counties;
    }

    pub fn toggle_bubbles(&mut self) {
        self.settings.show_bubbles = !self.settings.show_bubbles;
    }

    pub fn toggle_legend(&mut self) {
        self.settings.show_legend = !self.settings.show_legend;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Group digits with commas: 12345 -> "12,345".
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn draw_polyline(canvas: &mut BrailleCanvas, line: &[DVec2], view: &View) {
    if line.len() < 2 {
        return;
    }
    let mut prev: Option<(i32, i32)> = None;
    for &point in line {
        let (px, py) = view.project(point);
        if let Some((ax, ay)) = prev {
            if view.line_might_be_visible((ax, ay), (px, py)) {
                draw_line(canvas, ax, ay, px, py);
            }
        }
        prev = Some((px, py));
    }
}

fn circle_might_be_visible(canvas: &BrailleCanvas, cx: i32, cy: i32, radius: i32) -> bool {
    cx + radius >= 0
        && cy + radius >= 0
        && cx - radius < canvas.pixel_width() as i32
        && cy - radius < canvas.pixel_height() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::model::Region;
    use crate::map::view::Bounds;
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

    fn model() -> MapModel {
        let counties = vec![
            Region {
                fips: "01001".to_string(),
                name: Some("Alpha".to_string()),
                rings: vec![square(0.0, 0.0, 10.0)],
            },
            Region {
                fips: "02001".to_string(),
                name: Some("Beta".to_string()),
                rings: vec![square(10.0, 0.0, 10.0)],
            },
        ];
        let states = vec![Region {
            fips: "01".to_string(),
            name: Some("West".to_string()),
            rings: vec![square(0.0, 0.0, 10.0)],
        }];
        let mesh = vec![vec![DVec2::new(10.0, 0.0), DVec2::new(10.0, 10.0)]];
        let mut model = MapModel::build(counties, states, mesh, None, HashMap::new()).unwrap();
        let mut cases = HashMap::new();
        cases.insert("01001".to_string(), 1000u64);
        model.apply_cases(&cases);
        model
    }

    fn view(model: &MapModel) -> View {
        View::fitted(model.home, 40, 20)
    }

    fn dot_count(canvas: &BrailleCanvas) -> usize {
        canvas
            .rows()
            .map(|row| row.chars().filter(|&c| c != '\u{2800}').count())
            .sum()
    }

    #[test]
    fn test_bubbles_drawn_for_joined_counties() {
        let m = model();
        let layers = MapRenderer::new().render(&m, &view(&m), None, None, 20, 5);
        assert!(dot_count(&layers.bubbles) > 0);
        assert!(dot_count(&layers.states) > 0);
        assert_eq!(dot_count(&layers.active), 0);
    }

    #[test]
    fn test_toggles_suppress_layers() {
        let m = model();
        let mut renderer = MapRenderer::new();
        renderer.toggle_bubbles();
        renderer.toggle_states();
        let layers = renderer.render(&m, &view(&m), None, None, 20, 5);
        assert_eq!(dot_count(&layers.bubbles), 0);
        assert_eq!(dot_count(&layers.states), 0);
    }

    #[test]
    fn test_county_outlines_are_off_by_default() {
        let m = model();
        let mut renderer = MapRenderer::new();
        let layers = renderer.render(&m, &view(&m), None, None, 20, 5);
        assert_eq!(dot_count(&layers.counties), 0);
        renderer.toggle_counties();
        let layers = renderer.render(&m, &view(&m), None, None, 20, 5);
        assert!(dot_count(&layers.counties) > 0);
    }

    #[test]
    fn test_active_state_highlight() {
        let m = model();
        let layers = MapRenderer::new().render(&m, &view(&m), Some(0), None, 20, 5);
        assert!(dot_count(&layers.active) > 0);
    }

    #[test]
    fn test_hover_labels_county_readout() {
        let m = model();
        let layers = MapRenderer::new().render(&m, &view(&m), None, Some(0), 20, 5);
        assert_eq!(layers.labels.len(), 1);
        assert_eq!(layers.labels[0].2, "Alpha, West: 1,000");
    }

    #[test]
    fn test_offscreen_counties_are_culled() {
        let m = model();
        let mut v = view(&m);
        // zoom hard onto Beta's far corner so Alpha is offscreen
        v.zoom = 8.0;
        v.center = DVec2::new(19.0, 9.0);
        let mut renderer = MapRenderer::new();
        renderer.toggle_counties();
        let layers = renderer.render(&m, &v, None, None, 20, 5);
        let all_counties = {
            let full = renderer.render(&m, &view(&m), None, None, 20, 5);
            dot_count(&full.counties)
        };
        assert!(dot_count(&layers.counties) < all_counties);
    }

    #[test]
    fn test_legend_samples_through_case_scale() {
        let legend = MapRenderer::new().legend();
        assert!(dot_count(&legend.canvas) > 0);
        let texts: Vec<&str> = legend.labels.iter().map(|(_, _, t)| t.as_str()).collect();
        assert_eq!(texts, vec!["1,000", "100", "10"]);
    }

    #[test]
    fn test_format_count_groups_digits() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }
}
