//! First-order low-pass smoothing for two-axis control signals.

use nalgebra::Vector2;

/// First-order low-pass filter over a 2D signal
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    last: Option<Vector2<f64>>,
}

impl LowPassFilter {
    /// Create a new first-order low-pass filter
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range (0, 1]
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self { alpha, last: None }
    }

    /// Feed one sample and return the filtered value
    pub fn apply(&mut self, input: Vector2<f64>) -> Vector2<f64> {
        let filtered = match self.last {
            Some(last) => last + (input - last) * self.alpha,
            None => input,
        };
        self.last = Some(filtered);
        filtered
    }

    /// Last filtered value, if any
    #[must_use]
    pub const fn last(&self) -> Option<Vector2<f64>> {
        self.last
    }

    /// Forget the filter history
    pub fn reset(&mut self) {
        self.last = None;
    }
}
