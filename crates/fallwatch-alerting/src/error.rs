//! Error types for the alerting layer.
//!
//! Delivery failures never reach the risk engine: the dispatcher logs them and
//! the repeat mechanism retries through the next reminder.

use fallwatch_risk::ConfigError;
use thiserror::Error;

use crate::record::{AckState, AlertId};

/// Convenient `Result` alias for alerting operations.
pub type AlertResult<T> = Result<T, AlertError>;

/// Top-level error type for the alerting layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AlertError {
    /// An acknowledgment named an alert this manager never created.
    #[error("Alert {id} not found")]
    UnknownAlert {
        /// Identifier from the acknowledgment.
        id: AlertId,
    },

    /// An acknowledgment arrived for an alert that is no longer pending.
    #[error("Alert {id} is already {state}")]
    AlreadyResolved {
        /// Identifier from the acknowledgment.
        id: AlertId,
        /// Final state of the record.
        state: AckState,
    },

    /// A notification channel could not deliver.
    #[error("Delivery via {channel} failed: {message}")]
    Delivery {
        /// Channel name.
        channel: String,
        /// Human-readable failure description.
        message: String,
    },

    /// Journal file I/O failed.
    #[error("Journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A journal entry could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid alerting configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AlertError {
    /// Construct an [`AlertError::Delivery`].
    pub fn delivery<C: Into<String>, M: Into<String>>(channel: C, message: M) -> Self {
        AlertError::Delivery {
            channel: channel.into(),
            message: message.into(),
        }
    }
}
