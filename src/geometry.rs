//! Screen-space geometry shared by the cursor, dwell and dispatch stages.

use serde::{Deserialize, Serialize};

/// A point in screen coordinates (origin top-left, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal coordinate in points
    pub x: f64,
    /// Vertical coordinate in points
    pub y: f64,
}

impl ScreenPoint {
    /// Create a new point
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Move the point by a delta
    #[must_use]
    pub fn offset(self, delta: CursorDelta) -> Self {
        Self::new(self.x + delta.dx, self.y + delta.dy)
    }
}

/// A per-tick cursor displacement in screen points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CursorDelta {
    /// Horizontal displacement
    pub dx: f64,
    /// Vertical displacement (positive moves down)
    pub dy: f64,
}

impl CursorDelta {
    /// A displacement that leaves the cursor where it is
    pub const ZERO: Self = Self { dx: 0.0, dy: 0.0 };

    /// Create a new delta
    #[must_use]
    pub const fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Euclidean length of the displacement
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Whether both components are finite numbers
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.dx.is_finite() && self.dy.is_finite()
    }
}

/// Size of the surface the cursor moves on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

impl ScreenSize {
    /// Create a new size
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Center of the surface
    #[must_use]
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Clamp a point into `[0, width] x [0, height]`
    #[must_use]
    pub fn clamp(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(point.x.clamp(0.0, self.width), point.y.clamp(0.0, self.height))
    }

    /// Whether the point lies on the surface, edges included
    #[must_use]
    pub fn contains(&self, point: ScreenPoint) -> bool {
        (0.0..=self.width).contains(&point.x) && (0.0..=self.height).contains(&point.y)
    }

    /// Whether both dimensions are finite and strictly positive
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle used as a target hit region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width in points
    pub width: f64,
    /// Height in points
    pub height: f64,
}

impl Rect {
    /// Create a rectangle from its origin and size
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Create a rectangle spanning two corners, in any order
    #[must_use]
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);
        Self::new(x, y, (a.x - b.x).abs(), (a.y - b.y).abs())
    }

    /// Whether the point lies inside the rectangle, edges included.
    ///
    /// Degenerate rectangles (non-finite or negative size) contain nothing.
    #[must_use]
    pub fn contains(&self, point: ScreenPoint) -> bool {
        if !self.is_valid() {
            return false;
        }
        point.x >= self.x && point.x <= self.x + self.width && point.y >= self.y && point.y <= self.y + self.height
    }

    /// Center of the rectangle
    #[must_use]
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height].iter().all(|v| v.is_finite()) && self.width >= 0.0 && self.height >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains_edges() {
        let rect = Rect::from_corners(ScreenPoint::new(600.0, 500.0), ScreenPoint::new(400.0, 300.0));
        assert_eq!(rect, Rect::new(400.0, 300.0, 200.0, 200.0));
        assert!(rect.contains(ScreenPoint::new(500.0, 400.0)));
        assert!(rect.contains(ScreenPoint::new(400.0, 300.0)));
        assert!(rect.contains(ScreenPoint::new(600.0, 500.0)));
        assert!(!rect.contains(ScreenPoint::new(600.1, 400.0)));
        assert!(!rect.contains(ScreenPoint::new(500.0, 299.9)));
    }

    #[test]
    fn test_degenerate_rect_contains_nothing() {
        let rect = Rect::new(0.0, 0.0, f64::NAN, 10.0);
        assert!(!rect.contains(ScreenPoint::new(0.0, 0.0)));

        let rect = Rect::new(10.0, 10.0, -5.0, 5.0);
        assert!(!rect.contains(ScreenPoint::new(8.0, 12.0)));
    }

    #[test]
    fn test_screen_clamp() {
        let size = ScreenSize::new(1000.0, 800.0);
        assert_eq!(size.center(), ScreenPoint::new(500.0, 400.0));
        assert_eq!(size.clamp(ScreenPoint::new(-20.0, 900.0)), ScreenPoint::new(0.0, 800.0));
        assert!(size.contains(ScreenPoint::new(1000.0, 0.0)));
        assert!(!size.contains(ScreenPoint::new(1000.5, 0.0)));
    }
}
