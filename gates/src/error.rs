//! Error types for gate operations.
//!
//! This module provides `GateError`, the error type for every gate, tailoring and
//! population operation. It uses `thiserror` for convenient error construction and
//! wraps the event-table and sample-resolution errors it propagates.

use std::error::Error as StdError;
use thiserror::Error;

use crate::sample::SampleError;
use crate::types::GateKind;
use cyto_events::EventError;

/// Custom error type for gate operations.
///
/// All gate operations return `Result<T, GateError>`. Each error is scoped to
/// the call that raised it; nothing is retried internally.
#[derive(Debug, Error)]
pub enum GateError {
    /// Geometry validation failures
    #[error("Invalid geometry: {message}")]
    InvalidGeometry { message: String },

    /// Missing required parameter/channel
    #[error("Missing parameter '{parameter}' in context: {context}")]
    MissingParameter { parameter: String, context: String },

    /// Invalid coordinate values
    #[error("Invalid coordinate '{coordinate}': value {value} is not finite")]
    InvalidCoordinate { coordinate: String, value: f64 },

    /// A tailored instance's geometry kind differs from its family's
    #[error("Gate kind mismatch: family is {expected}, instance is {found}")]
    GateKindMismatch { expected: GateKind, found: GateKind },

    /// Caller-supplied labels do not fit the gate kind
    #[error("Invalid labels for {kind}: expected {expected}, got {found}")]
    InvalidLabelShape {
        kind: GateKind,
        expected: String,
        found: String,
    },

    /// No gate, family or sector with this identifier
    #[error("Unknown gate '{id}'")]
    UnknownGate { id: String },

    /// An instance already exists for this `(gid, fcs_file_id)` pair
    #[error("Gate '{gid}' already has an instance for {}", .fcs_file_id.as_deref().unwrap_or("the global definition"))]
    DuplicateInstance {
        gid: String,
        fcs_file_id: Option<String>,
    },

    /// The global instance cannot be removed while tailored instances depend on it
    #[error("Gate '{gid}' still has {tailored} tailored instance(s); delete the family or those instances first")]
    GlobalInstanceInUse { gid: String, tailored: usize },

    /// A population expression referenced a compound gate's top-level gid
    #[error("'{gid}' is a compound gate; reference one of its sector gids instead")]
    CompoundGateReference { gid: String },

    /// Event evaluation failures
    #[error("Filtering error: {message}")]
    FilteringError { message: String },

    /// Sample name resolution failed in the caller's resolver
    #[error(transparent)]
    Sample(#[from] SampleError),

    /// Event-table or scale errors
    #[error(transparent)]
    Event(#[from] EventError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error with context (for wrapping other errors)
    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl GateError {
    /// Create an InvalidGeometry error with a message
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Create a MissingParameter error
    pub fn missing_parameter(parameter: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingParameter {
            parameter: parameter.into(),
            context: context.into(),
        }
    }

    /// Create an InvalidCoordinate error
    pub fn invalid_coordinate(coordinate: impl Into<String>, value: f64) -> Self {
        Self::InvalidCoordinate {
            coordinate: coordinate.into(),
            value,
        }
    }

    pub fn invalid_label_shape(
        kind: GateKind,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::InvalidLabelShape {
            kind,
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn unknown_gate(id: impl Into<String>) -> Self {
        Self::UnknownGate { id: id.into() }
    }

    pub fn duplicate_instance(gid: impl Into<String>, fcs_file_id: Option<&str>) -> Self {
        Self::DuplicateInstance {
            gid: gid.into(),
            fcs_file_id: fcs_file_id.map(str::to_string),
        }
    }

    /// Create a FilteringError with a message
    pub fn filtering_error(message: impl Into<String>) -> Self {
        Self::FilteringError {
            message: message.into(),
        }
    }

    /// Add context to an error
    ///
    /// Errors that callers match on by identity (kind mismatches, unknown ids,
    /// sample resolution) are returned unchanged.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        match self {
            Self::InvalidGeometry { message } => Self::InvalidGeometry {
                message: format!("{}: {}", context.into(), message),
            },
            Self::MissingParameter {
                parameter,
                context: ctx,
            } => Self::MissingParameter {
                parameter,
                context: format!("{}: {}", context.into(), ctx),
            },
            Self::FilteringError { message } => Self::FilteringError {
                message: format!("{}: {}", context.into(), message),
            },
            Self::SerializationError(e) => Self::Other {
                message: format!("{}: {}", context.into(), e),
                source: Some(Box::new(e)),
            },
            Self::Other { message, source } => Self::Other {
                message: format!("{}: {}", context.into(), message),
                source,
            },
            other => other,
        }
    }
}

// Conversion from anyhow::Error for convenience
impl From<anyhow::Error> for GateError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None, // anyhow::Error already contains the full context
        }
    }
}

// Type alias for Result using GateError
pub type Result<T> = std::result::Result<T, GateError>;
