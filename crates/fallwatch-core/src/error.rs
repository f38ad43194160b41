//! Error types shared across FallWatch crates.
//!
//! Uses [`thiserror`] for the `Display` and `Error` implementations.

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while constructing or decoding core pose types.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum CoreError {
    /// Validation error for input data
    #[error("Validation error: {message}")]
    Validation {
        /// Description of what validation failed
        message: String,
    },

    /// A keypoint name that is not part of the COCO-17 set
    #[error("Unknown keypoint: '{name}'")]
    UnknownKeypoint {
        /// The rejected name
        name: String,
    },
}

impl CoreError {
    /// Creates a new validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new unknown keypoint error.
    #[must_use]
    pub fn unknown_keypoint(name: impl Into<String>) -> Self {
        Self::UnknownKeypoint { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::validation("confidence out of range");
        assert_eq!(err.to_string(), "Validation error: confidence out of range");

        let err = CoreError::unknown_keypoint("tail");
        assert_eq!(err.to_string(), "Unknown keypoint: 'tail'");
    }
}
