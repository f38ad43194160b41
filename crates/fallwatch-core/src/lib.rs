//! # FallWatch Core
//!
//! Core types shared by the FallWatch crates.
//!
//! This crate provides the foundational building blocks used by the risk
//! engine and the alerting layer:
//!
//! - **Pose Types**: [`KeypointSample`], [`Keypoint`], [`KeypointType`] and
//!   [`Confidence`] for representing one normalized pose observation as it
//!   arrives from an external pose-estimation backend.
//!
//! - **Skeleton Topology**: [`SKELETON_EDGES`], the COCO limb list used when
//!   rendering anonymized snapshots.
//!
//! - **Error Types**: [`CoreError`] and the [`CoreResult`] alias.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization via serde
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use fallwatch_core::{KeypointSample, KeypointType};
//!
//! let ts = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
//! let sample = KeypointSample::new(ts)
//!     .with_point(KeypointType::LeftHip, 0.48, 0.60, 0.9)
//!     .with_point(KeypointType::RightHip, 0.52, 0.60, 0.9);
//!
//! assert!(sample.get(KeypointType::LeftHip).is_usable(0.5));
//! assert!(!sample.get(KeypointType::Nose).is_usable(0.5));
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use types::{Confidence, Keypoint, KeypointSample, KeypointType, SKELETON_EDGES};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of keypoints per sample (COCO format)
pub const MAX_KEYPOINTS: usize = 17;

/// Minimum confidence for a keypoint to be drawn in a skeleton snapshot
pub const SNAPSHOT_CONFIDENCE_THRESHOLD: f32 = 0.2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(MAX_KEYPOINTS, KeypointType::all().len());
        assert!(SNAPSHOT_CONFIDENCE_THRESHOLD > 0.0);
    }
}
