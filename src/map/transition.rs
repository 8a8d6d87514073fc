use std::time::Duration;

use crate::map::view::ViewState;

/// Fixed length of a click-to-zoom transition.
pub const TRANSITION: Duration = Duration::from_millis(750);

/// Cubic in-out easing over t in [0, 1].
pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// An in-flight animated move between two view states, advanced once per
/// frame from the event-poll loop. Centers interpolate linearly, zoom
/// geometrically, so the motion reads evenly at every magnification.
pub struct Transition {
    from: ViewState,
    to: ViewState,
    elapsed: Duration,
}

impl Transition {
    pub fn new(from: ViewState, to: ViewState) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by a frame delta and return the state to show.
    pub fn advance(&mut self, dt: Duration) -> ViewState {
        self.elapsed = (self.elapsed + dt).min(TRANSITION);
        let t = self.elapsed.as_secs_f64() / TRANSITION.as_secs_f64();
        let e = ease_cubic_in_out(t);
        ViewState {
            center: self.from.center.lerp(self.to.center, e),
            zoom: self.from.zoom * (self.to.zoom / self.from.zoom).powf(e),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= TRANSITION
    }
}
