use serde::{Deserialize, Serialize};

use super::error::Result;
use super::geometry::ensure_finite;
use super::traits::*;
use super::types::Point;

/// Split of the x channel at `x` into a left and a right sector. `y` positions
/// the labels, as a fraction of the plot height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitGeometry {
    pub x: f64,
    pub y: f64,
}

impl SplitGeometry {
    pub fn new(x: f64, y: f64) -> Result<Self> {
        let split = Self { x, y };
        split.validate()?;
        Ok(split)
    }
}

impl SectorClassifier for SplitGeometry {
    const SECTORS: &'static [&'static str] = &["L", "R"];

    /// Events on the split line fall right
    fn sector_of(&self, x: f64, _y: f64) -> Option<usize> {
        if x.is_nan() {
            None
        } else if x < self.x {
            Some(0)
        } else {
            Some(1)
        }
    }

    fn corner_labels(&self, x_extrema: (f64, f64), _y_extrema: (f64, f64)) -> Vec<Point> {
        vec![[x_extrema.0, self.y], [x_extrema.1, self.y]]
    }
}

impl GateValidation for SplitGeometry {
    fn validate(&self) -> Result<()> {
        ensure_finite("split_x", self.x)?;
        ensure_finite("split_y", self.y)
    }
}
