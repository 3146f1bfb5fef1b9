use serde::{Deserialize, Serialize};

use super::error::{GateError, Result};
use super::geometry::ensure_finite;
use super::traits::*;
use super::types::Point;

/// One-dimensional interval on the x channel. `y` only positions the label,
/// as a fraction of the plot height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeGeometry {
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
}

impl RangeGeometry {
    pub fn new(x1: f64, x2: f64, y: f64) -> Result<Self> {
        let range = Self { x1, x2, y };
        range.validate()?;
        Ok(range)
    }
}

impl GateLabel for RangeGeometry {
    fn default_label(&self) -> Point {
        [(self.x1 + self.x2) / 2.0, self.y]
    }
}

impl GateContainment for RangeGeometry {
    /// Only the x coordinate is considered
    fn contains_point(&self, x: f64, _y: f64) -> bool {
        x >= self.x1.min(self.x2) && x <= self.x1.max(self.x2)
    }
}

impl GateValidation for RangeGeometry {
    fn validate(&self) -> Result<()> {
        ensure_finite("range_x1", self.x1)?;
        ensure_finite("range_x2", self.x2)?;
        ensure_finite("range_y", self.y)?;

        if self.x1 == self.x2 {
            return Err(GateError::invalid_geometry(format!(
                "Range has zero width at x={}",
                self.x1
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_and_containment() {
        let range = RangeGeometry::new(10.0, 30.0, 0.5).unwrap();
        assert_eq!(range.default_label(), [20.0, 0.5]);
        assert!(range.contains_point(10.0, 1e9));
        assert!(range.contains_point(30.0, -1e9));
        assert!(!range.contains_point(30.5, 0.0));
    }
}
