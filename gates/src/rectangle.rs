use serde::{Deserialize, Serialize};

use super::error::{GateError, Result};
use super::geometry::ensure_finite;
use super::traits::*;
use super::types::Point;

/// Axis-aligned rectangle over two channels. Corners may be given in either order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectangleGeometry {
    pub x1: f64,
    pub x2: f64,
    pub y1: f64,
    pub y2: f64,
}

impl RectangleGeometry {
    pub fn new(x1: f64, x2: f64, y1: f64, y2: f64) -> Result<Self> {
        let rectangle = Self { x1, x2, y1, y2 };
        rectangle.validate()?;
        Ok(rectangle)
    }
}

impl GateLabel for RectangleGeometry {
    fn default_label(&self) -> Point {
        [(self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0]
    }
}

impl GateContainment for RectangleGeometry {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        let (min_x, min_y, max_x, max_y) = self.bounding_box();
        x >= min_x && x <= max_x && y >= min_y && y <= max_y
    }
}

impl GateBounds for RectangleGeometry {
    fn bounding_box(&self) -> (f64, f64, f64, f64) {
        (
            self.x1.min(self.x2),
            self.y1.min(self.y2),
            self.x1.max(self.x2),
            self.y1.max(self.y2),
        )
    }
}

impl GateValidation for RectangleGeometry {
    fn validate(&self) -> Result<()> {
        ensure_finite("rectangle_x1", self.x1)?;
        ensure_finite("rectangle_x2", self.x2)?;
        ensure_finite("rectangle_y1", self.y1)?;
        ensure_finite("rectangle_y2", self.y2)?;

        if self.x1 == self.x2 || self.y1 == self.y2 {
            return Err(GateError::invalid_geometry(format!(
                "Rectangle has zero area: x=({}, {}), y=({}, {})",
                self.x1, self.x2, self.y1, self.y2
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_order_does_not_matter() {
        let rect = RectangleGeometry::new(500.0, 100.0, 600.0, 200.0).unwrap();
        assert!(rect.contains_point(300.0, 400.0));
        assert!(rect.contains_point(100.0, 200.0));
        assert!(!rect.contains_point(50.0, 400.0));
        assert_eq!(rect.bounding_box(), (100.0, 200.0, 500.0, 600.0));
        assert_eq!(rect.default_label(), [300.0, 400.0]);
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(matches!(
            RectangleGeometry::new(1.0, 1.0, 0.0, 5.0),
            Err(GateError::InvalidGeometry { .. })
        ));
        assert!(matches!(
            RectangleGeometry::new(f64::NAN, 1.0, 0.0, 5.0),
            Err(GateError::InvalidCoordinate { .. })
        ));
    }
}
