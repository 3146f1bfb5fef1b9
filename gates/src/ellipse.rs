use serde::{Deserialize, Serialize};

use super::error::{GateError, Result};
use super::geometry::ensure_finite;
use super::traits::*;
use super::types::Point;

/// Rotated ellipse. `major` and `minor` are full axis lengths, `angle` is the
/// rotation of the major axis in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EllipseGeometry {
    pub center: Point,
    pub angle: f64,
    pub major: f64,
    pub minor: f64,
}

impl EllipseGeometry {
    pub fn new(center: Point, angle: f64, major: f64, minor: f64) -> Result<Self> {
        let ellipse = Self {
            center,
            angle,
            major,
            minor,
        };
        ellipse.validate()?;
        Ok(ellipse)
    }

    fn radii(&self) -> (f64, f64) {
        (self.major / 2.0, self.minor / 2.0)
    }
}

impl GateLabel for EllipseGeometry {
    fn default_label(&self) -> Point {
        self.center
    }
}

impl GateContainment for EllipseGeometry {
    fn contains_point(&self, x: f64, y: f64) -> bool {
        let [cx, cy] = self.center;
        let (radius_x, radius_y) = self.radii();

        // Rotate point around center by -angle
        let cos_a = self.angle.cos();
        let sin_a = self.angle.sin();
        let dx = x - cx;
        let dy = y - cy;
        let rotated_x = dx * cos_a + dy * sin_a;
        let rotated_y = -dx * sin_a + dy * cos_a;

        (rotated_x / radius_x).powi(2) + (rotated_y / radius_y).powi(2) <= 1.0
    }
}

impl GateBounds for EllipseGeometry {
    fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let [cx, cy] = self.center;
        let (radius_x, radius_y) = self.radii();
        let cos_a = self.angle.cos();
        let sin_a = self.angle.sin();

        // Maximum extents along each axis after rotation
        let extent_x = ((radius_x * cos_a).powi(2) + (radius_y * sin_a).powi(2)).sqrt();
        let extent_y = ((radius_x * sin_a).powi(2) + (radius_y * cos_a).powi(2)).sqrt();

        (cx - extent_x, cy - extent_y, cx + extent_x, cy + extent_y)
    }
}

impl GateValidation for EllipseGeometry {
    fn validate(&self) -> Result<()> {
        ensure_finite("ellipse_center_x", self.center[0])?;
        ensure_finite("ellipse_center_y", self.center[1])?;
        ensure_finite("ellipse_angle", self.angle)?;
        ensure_finite("ellipse_major", self.major)?;
        ensure_finite("ellipse_minor", self.minor)?;

        if self.major <= 0.0 || self.minor <= 0.0 {
            return Err(GateError::invalid_geometry(format!(
                "Ellipse axes must be positive: major={}, minor={}",
                self.major, self.minor
            )));
        }
        Ok(())
    }
}
