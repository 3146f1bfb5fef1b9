use crate::quadrant::DEFAULT_QUADRANT_ANGLES;

/// Label height used for range gates when none is given, as a fraction of the
/// plot height
pub const DEFAULT_RANGE_LABEL_Y: f64 = 0.5;

/// Defaults applied when a gate is drafted without the corresponding field
#[derive(Debug, Clone, PartialEq)]
pub struct GateDefaults {
    pub locked: bool,
    pub range_label_y: f64,
    pub quadrant_angles: [f64; 4],
}

impl Default for GateDefaults {
    fn default() -> Self {
        Self {
            locked: false,
            range_label_y: DEFAULT_RANGE_LABEL_Y,
            quadrant_angles: DEFAULT_QUADRANT_ANGLES,
        }
    }
}
