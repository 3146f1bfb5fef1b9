//! Error types for event-table operations.
//!
//! `EventError` covers scale evaluation, spillover parsing and compensation.
//! Each variant is scoped to the single call that produced it; nothing here is
//! retried internally.

use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventError {
    /// The scale's type string is not one of the known scale kinds.
    ///
    /// Raised when a channel carrying the scale is evaluated, never when a
    /// scale set is loaded.
    #[error("Invalid scale type '{scale_type}'")]
    InvalidScaleType { scale_type: String },

    /// A compensation matrix names a channel the event table does not have
    #[error("Channel '{channel}' is present in the compensation matrix but not in the event table")]
    ChannelMismatch { channel: String },

    /// A channel is named more than once in a spillover matrix
    #[error("Channel '{channel}' appears more than once in the spillover matrix")]
    DuplicateChannel { channel: String },

    /// A channel was named for scaling but has no scale configured
    #[error("No scale configured for channel '{channel}'")]
    MissingScale { channel: String },

    /// The spillover matrix has no inverse
    #[error("Singular spillover matrix: {message}")]
    SingularMatrix { message: String },

    /// Matrix or column shapes disagree
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch { message: String },

    /// A spill string could not be tokenized into a channel list and matrix
    #[error("Malformed spill string: {message}")]
    MalformedSpillString { message: String },

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl EventError {
    pub fn invalid_scale_type(scale_type: impl Into<String>) -> Self {
        Self::InvalidScaleType {
            scale_type: scale_type.into(),
        }
    }

    pub fn channel_mismatch(channel: impl Into<String>) -> Self {
        Self::ChannelMismatch {
            channel: channel.into(),
        }
    }

    pub fn duplicate_channel(channel: impl Into<String>) -> Self {
        Self::DuplicateChannel {
            channel: channel.into(),
        }
    }

    pub fn missing_scale(channel: impl Into<String>) -> Self {
        Self::MissingScale {
            channel: channel.into(),
        }
    }

    pub fn singular_matrix(message: impl Into<String>) -> Self {
        Self::SingularMatrix {
            message: message.into(),
        }
    }

    pub fn dimension_mismatch(message: impl Into<String>) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
        }
    }

    pub fn malformed_spill_string(message: impl Into<String>) -> Self {
        Self::MalformedSpillString {
            message: message.into(),
        }
    }

    /// Prefix the error message with additional context.
    ///
    /// Variants that identify a channel or scale type by field keep that field
    /// untouched so callers can still match on it.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        match self {
            Self::SingularMatrix { message } => Self::SingularMatrix {
                message: format!("{}: {}", context.into(), message),
            },
            Self::DimensionMismatch { message } => Self::DimensionMismatch {
                message: format!("{}: {}", context.into(), message),
            },
            Self::MalformedSpillString { message } => Self::MalformedSpillString {
                message: format!("{}: {}", context.into(), message),
            },
            Self::Polars(e) => Self::Other {
                message: format!("{}: {}", context.into(), e),
                source: Some(Box::new(e)),
            },
            Self::Serialization(e) => Self::Other {
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

impl From<anyhow::Error> for EventError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            message: err.to_string(),
            source: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EventError>;
