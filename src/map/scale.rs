/// Square-root radius scale: bubble area stays proportional to the value.
///
/// Maps `0..=domain_max` onto `0..=range_max`; values past the domain keep
/// extrapolating on the same curve, so extreme counts are never flattened.
#[derive(Debug, Clone, Copy)]
pub struct SqrtScale {
    domain_max: f64,
    range_max: f64,
}

/// Radius scale for county bubbles: 0-1000 cases over 0-8 map units.
pub const CASE_SCALE: SqrtScale = SqrtScale::new(1000.0, 8.0);

impl SqrtScale {
    pub const fn new(domain_max: f64, range_max: f64) -> Self {
        Self {
            domain_max,
            range_max,
        }
    }

    /// Radius in map units for a value. Non-positive values collapse to 0.
    pub fn radius(&self, value: f64) -> f64 {
        if value <= 0.0 {
            return 0.0;
        }
        (value / self.domain_max).sqrt() * self.range_max
    }
}
