//! # cyto-gates
//!
//! Gate definitions for flow cytometry analysis: typed gate geometries,
//! gate families with per-sample tailoring, and boolean population expressions.
//!
//! ## Overview
//!
//! - **Gate kinds**: rectangle, polygon, ellipse and range gates select one
//!   region each; quadrant and split gates fan one definition out into four or
//!   two named sectors, each with its own gid
//! - **Tailoring**: a gate family has one global instance and optional
//!   per-sample overrides; a sample's tailored instance always wins
//! - **Populations**: flat `$and`/`$or`/`$not`/`$xor` expressions over simple
//!   gate gids and sector gids
//! - **Evaluation**: masks over `cyto-events` tables, honouring tailoring
//!
//! ## Quick Start
//!
//! ```rust
//! use cyto_gates::*;
//! use cyto_gates::geometry::*;
//! use cyto_events::ScaleSet;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = GateRegistry::new(IdGenerator::from_os_rng());
//!
//! let draft = GateDraft::builder()
//!     .name("Lymphocytes")
//!     .x_channel("FSC-A")
//!     .y_channel("SSC-A")
//!     .geometry(create_polygon_geometry(vec![
//!         (100.0, 200.0),
//!         (300.0, 200.0),
//!         (300.0, 400.0),
//!     ])?)
//!     .build()?;
//! let gate = registry.create_global(draft, &ScaleSet::new())?;
//!
//! // Override the shape for one sample
//! let narrower = create_polygon_geometry(vec![(120.0, 200.0), (280.0, 200.0), (280.0, 380.0)])?;
//! registry.create_tailored(&gate.gid, "sample-1", narrower)?;
//! assert_ne!(registry.resolve(&gate.gid, Some("sample-1"))?.id, gate.id);
//! assert_eq!(registry.resolve(&gate.gid, Some("sample-2"))?.id, gate.id);
//!
//! let expr = ComplexPopulationBuilder::new("Lymphocytes").and(&gate.gid).build();
//! expr.validate(&registry)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The library uses [`GateError`] for all error conditions. Most operations return
//! [`Result<T, GateError>`](GateResult).

pub mod config;
pub mod ellipse;
pub mod error;
pub mod filtering;
pub mod geometry;
pub mod id;
pub mod polygon;
pub mod population;
pub mod quadrant;
pub mod range;
pub mod rectangle;
pub mod sample;
pub mod split;
pub mod tailoring;
pub mod traits;
pub mod types;


/// Error types for gate operations
pub use error::{GateError, Result as GateResult};

/// Defaults for drafted gates
pub use config::GateDefaults;

/// Local gate evaluation
pub use filtering::{gate_mask, gid_masks, population_mask, sector_masks, selected_indices};

/// Geometry construction helpers
pub use geometry::{
    GateDraft, GateDraftBuilder, create_ellipse_geometry, create_polygon_geometry,
    create_quadrant_geometry, create_range_geometry, create_rectangle_geometry,
    create_split_geometry,
};

/// Identifier generation
pub use id::{Clock, FixedClock, IdGenerator, SystemClock, is_valid_id};

/// Per-kind gate shapes
pub use ellipse::EllipseGeometry;
pub use polygon::PolygonGeometry;
pub use quadrant::{DEFAULT_QUADRANT_ANGLES, QuadrantGeometry};
pub use range::RangeGeometry;
pub use rectangle::RectangleGeometry;
pub use split::SplitGeometry;

/// Population expressions
pub use population::{
    BooleanOperation, ComplexPopulationBuilder, ExprNode, GateIds, Population,
    PopulationExpression,
};

/// Sample references
pub use sample::{SampleError, SampleRef, SampleResolver};

/// Gate families and tailoring
pub use tailoring::{GateFamily, GateRegistry, TailoringDiff};

/// Core gate types and structures
pub use types::{Gate, GateGeometry, GateKind, Point, Sector};

/// Gate geometry traits
pub use traits::{GateBounds, GateContainment, GateLabel, GateValidation, SectorClassifier};
