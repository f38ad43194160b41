//! Error types for the FallWatch risk engine.
//!
//! ## Hierarchy
//!
//! ```text
//! RiskError (top-level)
//! ├── ConfigError   (config validation / file loading)
//! ├── PostureError  (keypoints too weak to derive geometry)
//! └── CoreError     (sample construction)
//! ```
//!
//! Only configuration errors are fatal. Everything raised while evaluating a
//! tick is folded into [`crate::TickOutcome`] by the engine.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use fallwatch_core::{CoreError, KeypointType};
use thiserror::Error;

// ---------------------------------------------------------------------------
// RiskResult
// ---------------------------------------------------------------------------

/// Convenient `Result` alias for risk-engine operations.
pub type RiskResult<T> = Result<T, RiskError>;

// ---------------------------------------------------------------------------
// RiskError
// ---------------------------------------------------------------------------

/// Top-level error type for the risk engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RiskError {
    /// A configuration validation or loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Posture could not be derived from a sample.
    #[error("Posture error: {0}")]
    Posture(#[from] PostureError),

    /// A sample could not be constructed.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// A sample arrived with a timestamp not after the newest stored sample.
    #[error("Out-of-order sample at {got} (newest stored: {last})")]
    OutOfOrder {
        /// Timestamp of the newest stored sample.
        last: DateTime<Utc>,
        /// Timestamp of the rejected sample.
        got: DateTime<Utc>,
    },
}

impl RiskError {
    /// Construct a [`RiskError::OutOfOrder`].
    pub fn out_of_order(last: DateTime<Utc>, got: DateTime<Utc>) -> Self {
        RiskError::OutOfOrder { last, got }
    }
}

// ---------------------------------------------------------------------------
// PostureError
// ---------------------------------------------------------------------------

/// Errors produced by the posture analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostureError {
    /// A torso keypoint is missing or below the confidence floor.
    #[error("Insufficient keypoints: {keypoint} below confidence floor")]
    InsufficientKeypoints {
        /// First torso keypoint that failed the check.
        keypoint: KeypointType,
    },
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors produced when loading or validating a [`crate::RiskConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field has an invalid value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// Human-readable reason.
        reason: String,
    },

    /// A configuration file could not be read or written.
    #[error("Cannot access config file `{path}`: {source}")]
    FileRead {
        /// Path that was being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration file contains malformed JSON.
    #[error("Cannot parse config file `{path}`: {source}")]
    ParseError {
        /// Path that was being parsed.
        path: PathBuf,
        /// Underlying JSON parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Construct a [`ConfigError::InvalidValue`].
    pub fn invalid_value<S: Into<String>>(field: &'static str, reason: S) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}
