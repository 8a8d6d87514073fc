use glam::DVec2;

/// Manual zoom clamp range.
pub const ZOOM_MIN: f64 = 1.0;
pub const ZOOM_MAX: f64 = 8.0;
/// Wheel/key zoom step factor.
pub const ZOOM_STEP: f64 = 1.5;
/// Fraction of the viewport a focused region may fill.
const FIT_PADDING: f64 = 0.9;

/// Axis-aligned bounds in planar map units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Smallest bounds covering all points. `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = DVec2>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.include(p);
        }
        Some(bounds)
    }

    pub fn include(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn merge(&mut self, other: Bounds) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }
}

/// Where the view is looking: a transition interpolates between two of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub center: DVec2,
    pub zoom: f64,
}

/// Viewport over the planar map space.
///
/// `zoom` is relative to the base fit: at 1.0 the whole document is visible.
/// Pixel coordinates are braille dots, y down, matching the map's own y-down
/// plane, so projection is a pure scale-and-translate.
#[derive(Clone)]
pub struct View {
    /// Bounds of the whole document (the base fit, and the pan clamp)
    home: Bounds,
    /// Center of the visible area in map units
    pub center: DVec2,
    /// Zoom factor relative to the base fit
    pub zoom: f64,
    /// Canvas size in braille pixels
    pub width: usize,
    pub height: usize,
}

impl View {
    /// Create a view showing the whole document.
    pub fn fitted(home: Bounds, width: usize, height: usize) -> Self {
        Self {
            home,
            center: home.center(),
            zoom: 1.0,
            width,
            height,
        }
    }

    /// Pixels per map unit at zoom 1 (the letterboxed whole-document fit).
    fn base_scale(&self) -> f64 {
        let sx = self.width as f64 / self.home.width().max(f64::EPSILON);
        let sy = self.height as f64 / self.home.height().max(f64::EPSILON);
        sx.min(sy).max(f64::EPSILON)
    }

    /// Pixels per map unit at the current zoom.
    pub fn scale(&self) -> f64 {
        self.base_scale() * self.zoom
    }

    /// Project a map-space point to pixel coordinates.
    pub fn project(&self, p: DVec2) -> (i32, i32) {
        let s = self.scale();
        let px = (p.x - self.center.x) * s + self.width as f64 / 2.0;
        let py = (p.y - self.center.y) * s + self.height as f64 / 2.0;
        (px.round() as i32, py.round() as i32)
    }

    /// Map-space point under a pixel coordinate.
    pub fn unproject(&self, px: i32, py: i32) -> DVec2 {
        let s = self.scale();
        DVec2::new(
            (px as f64 - self.width as f64 / 2.0) / s + self.center.x,
            (py as f64 - self.height as f64 / 2.0) / s + self.center.y,
        )
    }

    /// Pan by a pixel delta.
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let s = self.scale();
        self.set_center(self.center + DVec2::new(dx as f64 / s, dy as f64 / s));
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    /// Zoom in towards a specific pixel location.
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, ZOOM_STEP);
    }

    /// Zoom out from a specific pixel location.
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / ZOOM_STEP);
    }

    /// Zoom by factor while keeping the point under (px, py) anchored.
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let anchor = self.unproject(px, py);
        self.set_zoom(self.zoom * factor);
        let (new_px, new_py) = self.project(anchor);
        self.pan(new_px - px, new_py - py);
    }

    /// The whole-document resting state.
    pub fn home_state(&self) -> ViewState {
        ViewState {
            center: self.home.center(),
            zoom: 1.0,
        }
    }

    /// State that centers `bounds` with padding, capped at the region zoom
    /// limit. This is the click-to-focus target.
    pub fn fit_state(&self, bounds: Bounds) -> ViewState {
        let s = self.base_scale();
        let kx = self.width as f64 / (s * bounds.width().max(f64::EPSILON));
        let ky = self.height as f64 / (s * bounds.height().max(f64::EPSILON));
        ViewState {
            center: bounds.center(),
            zoom: (FIT_PADDING * kx.min(ky)).clamp(ZOOM_MIN, ZOOM_MAX),
        }
    }

    pub fn state(&self) -> ViewState {
        ViewState {
            center: self.center,
            zoom: self.zoom,
        }
    }

    /// Jump to a state (transitions call this once per frame).
    pub fn apply(&mut self, state: ViewState) {
        self.zoom = state.zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        self.set_center(state.center);
    }

    /// Update pixel dimensions when the terminal resizes.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    /// Whether a pixel lies on the canvas.
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= 0 && px < self.width as i32 && py >= 0 && py < self.height as i32
    }

    /// Cheap reject for segments entirely past one edge of the canvas.
    pub fn line_might_be_visible(&self, a: (i32, i32), b: (i32, i32)) -> bool {
        let w = self.width as i32;
        let h = self.height as i32;
        !((a.0 < 0 && b.0 < 0)
            || (a.0 >= w && b.0 >= w)
            || (a.1 < 0 && b.1 < 0)
            || (a.1 >= h && b.1 >= h))
    }

    /// Map-space rectangle currently on screen.
    pub fn visible_bounds(&self) -> Bounds {
        Bounds::new(
            self.unproject(0, 0),
            self.unproject(self.width as i32, self.height as i32),
        )
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
    }

    fn set_center(&mut self, center: DVec2) {
        self.center = center.clamp(self.home.min, self.home.max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn home() -> Bounds {
        Bounds::new(DVec2::ZERO, DVec2::new(975.0, 610.0))
    }

    fn view() -> View {
        View::fitted(home(), 200, 100)
    }

    #[test]
    fn test_project_center() {
        let v = view();
        let (x, y) = v.project(v.center);
        assert_eq!((x, y), (100, 50));
    }

    #[test]
    fn test_unproject_round_trip() {
        let v = view();
        let p = v.unproject(37, 81);
        let (px, py) = v.project(p);
        assert_eq!((px, py), (37, 81));
    }

    #[test]
    fn test_pan_moves_center() {
        let mut v = view();
        let before = v.center;
        v.pan(10, 0);
        assert!(v.center.x > before.x);
        assert_eq!(v.center.y, before.y);
    }

    #[test]
    fn test_pan_clamped_to_document() {
        let mut v = view();
        v.pan(1_000_000, 1_000_000);
        assert!(home().contains(v.center));
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut v = view();
        v.zoom = 2.0;
        let anchor = v.unproject(30, 20);
        v.zoom_in_at(30, 20);
        let (px, py) = v.project(anchor);
        assert!((px - 30).abs() <= 1, "anchor drifted to {}", px);
        assert!((py - 20).abs() <= 1, "anchor drifted to {}", py);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut v = view();
        for _ in 0..20 {
            v.zoom_in();
        }
        assert!(v.zoom <= ZOOM_MAX);
        for _ in 0..40 {
            v.zoom_out();
        }
        assert!(v.zoom >= ZOOM_MIN);
    }

    #[test]
    fn test_fit_state_centers_bounds() {
        let v = view();
        let region = Bounds::new(DVec2::new(100.0, 100.0), DVec2::new(300.0, 200.0));
        let state = v.fit_state(region);
        assert_eq!(state.center, region.center());
        assert!(state.zoom > 1.0 && state.zoom <= ZOOM_MAX);
    }

    #[test]
    fn test_fit_state_caps_region_zoom() {
        let v = view();
        // A tiny region wants a huge zoom; the cap holds it at the limit
        let region = Bounds::new(DVec2::new(500.0, 300.0), DVec2::new(501.0, 301.0));
        assert_eq!(v.fit_state(region).zoom, ZOOM_MAX);
    }

    #[test]
    fn test_visible_bounds_shrink_with_zoom() {
        let mut v = view();
        let whole = v.visible_bounds();
        v.zoom = 4.0;
        let zoomed = v.visible_bounds();
        assert!(zoomed.width() < whole.width());
        assert!(whole.intersects(&zoomed));
    }

    #[test]
    fn test_fit_region_padding_leaves_margin() {
        let v = view();
        let region = Bounds::new(DVec2::new(200.0, 200.0), DVec2::new(700.0, 500.0));
        let mut focused = v.clone();
        focused.apply(v.fit_state(region));
        let (x0, _) = focused.project(region.min);
        let (x1, y1) = focused.project(region.max);
        assert!(x0 >= 0 && x1 <= focused.width as i32);
        assert!(y1 <= focused.height as i32);
    }
}
