//! Geometry construction utilities.
//!
//! Helpers that build validated `GateGeometry` values from plain coordinates,
//! and the `GateDraft` that turns a geometry plus naming and label choices into
//! a complete gate.

pub mod construction;

pub use construction::{
    GateDraft, GateDraftBuilder, create_ellipse_geometry, create_polygon_geometry,
    create_quadrant_geometry, create_range_geometry, create_rectangle_geometry,
    create_split_geometry,
};

use crate::error::{GateError, Result};

/// Reject NaN and infinite coordinates, naming the offending one
pub(crate) fn ensure_finite(coordinate: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(GateError::invalid_coordinate(coordinate, value))
    }
}
