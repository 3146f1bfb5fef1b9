use crate::error::Result;
use crate::types::Point;

/// Trait for simple gates that derive a default label from their shape
pub trait GateLabel {
    /// Midpoint of the gate in raw data coordinates
    fn default_label(&self) -> Point;
}

/// Trait for simple gates that support point containment testing
pub trait GateContainment {
    /// Check if a point (in raw coordinates) is inside the gate
    fn contains_point(&self, x: f64, y: f64) -> bool;
}

/// Trait for gate types that have a bounding box
pub trait GateBounds {
    /// Calculate the bounding box (min_x, min_y, max_x, max_y) in raw coordinates
    fn bounding_box(&self) -> (f64, f64, f64, f64);
}

/// Trait for gate types that can be validated
pub trait GateValidation {
    /// Check the shape parameters, naming the first offending value
    fn validate(&self) -> Result<()>;
}

/// Trait for compound gates whose one shape fans out into named sectors
pub trait SectorClassifier {
    /// Sector name suffixes in sector order
    const SECTORS: &'static [&'static str];

    /// Index into `SECTORS` of the sector containing the point; `None` for
    /// points with a NaN coordinate, which fall in no sector
    fn sector_of(&self, x: f64, y: f64) -> Option<usize>;

    /// One label per sector, placed from the axis scale extrema
    fn corner_labels(&self, x_extrema: (f64, f64), y_extrema: (f64, f64)) -> Vec<Point>;
}
