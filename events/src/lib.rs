//! # cyto-events
//!
//! Numeric processing of flow cytometry event tables: per-channel scale
//! transforms (linear, log, arcsinh) and spillover compensation.
//!
//! Event tables are Polars `DataFrame`s with one column per channel. Channel
//! names are the join key between scales, compensation matrices and tables, and
//! are matched case-sensitively.
//!
//! ```rust
//! use cyto_events::{CompensationMatrix, ScaleSet, ScaleSetOptions, ScaleSpec};
//! use cyto_events::table::{column_values, event_table};
//!
//! # fn example() -> Result<(), cyto_events::EventError> {
//! let events = event_table([("FL1-A", vec![120.0, 900.0]), ("FL2-A", vec![40.0, 15.0])])?;
//!
//! let comp = CompensationMatrix::from_spill_string("2,FL1-A,FL2-A,1,0.02,0,1")?;
//! let compensated = comp.apply(&events)?;
//!
//! let mut scales = ScaleSet::new();
//! scales.set("FL1-A", ScaleSpec::arcsinh(-200.0, 5000.0, 5.0));
//! let scaled = scales.apply(&compensated, &ScaleSetOptions { clamp: true })?;
//! assert_eq!(column_values(&scaled, "FL1-A")?.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod compensation;
pub mod error;
pub mod matrix;
pub mod scaleset;
pub mod spill;
pub mod table;
pub mod transform;

pub use compensation::{CompensationMatrix, CompensationOptions};
pub use error::{EventError, Result as EventResult};
pub use matrix::MatrixOps;
pub use scaleset::{ScaleSet, ScaleSetOptions};
pub use spill::{parse_spill_string, to_spill_string};
pub use table::{ChannelName, EventDatum, EventTable};
pub use transform::{
    DEFAULT_COFACTOR, ResolvedScale, ScaleSpec, ScaleSpecBuilder, ScaleType, Transformable,
};
