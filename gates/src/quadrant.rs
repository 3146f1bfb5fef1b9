//! Quadrant gates.
//!
//! A quadrant is a center point plus four ray angles (radians, counter-clockwise
//! from the positive x axis). Sector `i` is the wedge swept counter-clockwise
//! from `angles[i]` to `angles[(i + 1) % 4]`; with the default right angles the
//! sectors come out in the order upper-right, upper-left, lower-left, lower-right.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::error::{GateError, Result};
use super::geometry::ensure_finite;
use super::traits::*;
use super::types::Point;

/// Right-angled quadrants
pub const DEFAULT_QUADRANT_ANGLES: [f64; 4] = [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2];

const ANGLE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadrantGeometry {
    pub x: f64,
    pub y: f64,
    pub angles: [f64; 4],
}

impl QuadrantGeometry {
    pub fn new(x: f64, y: f64, angles: [f64; 4]) -> Result<Self> {
        let quadrant = Self { x, y, angles };
        quadrant.validate()?;
        Ok(quadrant)
    }

    fn span(from: f64, to: f64) -> f64 {
        (to - from).rem_euclid(TAU)
    }
}

impl SectorClassifier for QuadrantGeometry {
    const SECTORS: &'static [&'static str] = &["UR", "UL", "LL", "LR"];

    fn sector_of(&self, x: f64, y: f64) -> Option<usize> {
        if x.is_nan() || y.is_nan() {
            return None;
        }
        let theta = (y - self.y).atan2(x - self.x).rem_euclid(TAU);
        // Rounding at a wedge boundary can miss every span; the first sector takes it
        let sector = (0..4)
            .find(|&i| {
                let start = self.angles[i];
                let end = self.angles[(i + 1) % 4];
                Self::span(start, theta) < Self::span(start, end)
            })
            .unwrap_or(0);
        Some(sector)
    }

    fn corner_labels(&self, x_extrema: (f64, f64), y_extrema: (f64, f64)) -> Vec<Point> {
        let (x_min, x_max) = x_extrema;
        let (y_min, y_max) = y_extrema;
        vec![
            [x_max, y_max],
            [x_min, y_max],
            [x_min, y_min],
            [x_max, y_min],
        ]
    }
}

impl GateValidation for QuadrantGeometry {
    fn validate(&self) -> Result<()> {
        ensure_finite("quadrant_x", self.x)?;
        ensure_finite("quadrant_y", self.y)?;
        for (idx, angle) in self.angles.iter().enumerate() {
            ensure_finite(&format!("quadrant_angle_{}", idx), *angle)?;
        }

        // The four wedges must tile the plane exactly once
        let total: f64 = (0..4)
            .map(|i| Self::span(self.angles[i], self.angles[(i + 1) % 4]))
            .sum();
        if (total - TAU).abs() > ANGLE_TOLERANCE {
            return Err(GateError::invalid_geometry(format!(
                "Quadrant angles {:?} are not in counter-clockwise order",
                self.angles
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sectors() {
        let quadrant = QuadrantGeometry::new(0.0, 0.0, DEFAULT_QUADRANT_ANGLES).unwrap();
        assert_eq!(quadrant.sector_of(1.0, 1.0), Some(0));
        assert_eq!(quadrant.sector_of(-1.0, 1.0), Some(1));
        assert_eq!(quadrant.sector_of(-1.0, -1.0), Some(2));
        assert_eq!(quadrant.sector_of(1.0, -1.0), Some(3));
    }

    #[test]
    fn test_skewed_angles() {
        // UR wedge narrowed to the first 45 degrees
        let quadrant =
            QuadrantGeometry::new(10.0, 10.0, [0.0, PI / 4.0, PI, 3.0 * FRAC_PI_2]).unwrap();
        assert_eq!(quadrant.sector_of(20.0, 11.0), Some(0));
        assert_eq!(quadrant.sector_of(11.0, 20.0), Some(1));
    }

    #[test]
    fn test_wrapping_angles() {
        let quadrant = QuadrantGeometry::new(
            0.0,
            0.0,
            [-FRAC_PI_2 / 2.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2],
        )
        .unwrap();
        assert_eq!(quadrant.sector_of(1.0, -0.1), Some(0));
        assert_eq!(quadrant.sector_of(1.0, -2.0), Some(3));
    }

    #[test]
    fn test_rejects_unordered_angles() {
        assert!(QuadrantGeometry::new(0.0, 0.0, [0.0, PI, FRAC_PI_2, 3.0 * FRAC_PI_2]).is_err());
        assert!(QuadrantGeometry::new(0.0, 0.0, [1.0; 4]).is_err());
    }

    #[test]
    fn test_corner_labels() {
        let quadrant = QuadrantGeometry::new(0.0, 0.0, DEFAULT_QUADRANT_ANGLES).unwrap();
        assert_eq!(
            quadrant.corner_labels((-5.0, 100.0), (1.0, 50.0)),
            vec![[100.0, 50.0], [-5.0, 50.0], [-5.0, 1.0], [100.0, 1.0]]
        );
    }
}
