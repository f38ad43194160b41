//! Core data types for FallWatch.
//!
//! # Type Categories
//!
//! - **Pose Types**: [`KeypointSample`], [`Keypoint`], [`KeypointType`]
//! - **Common Types**: [`Confidence`]
//!
//! Coordinates are normalized frame coordinates: `x` grows to the right and
//! `y` grows downward, both in `[0.0, 1.0]`.

use std::str::FromStr;

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::MAX_KEYPOINTS;

// =============================================================================
// Common Types
// =============================================================================

/// Confidence score in the range [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Confidence(f32);

impl Confidence {
    /// Creates a new confidence value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in the range [0.0, 1.0].
    pub fn new(value: f32) -> CoreResult<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(CoreError::validation(format!(
                "Confidence must be in [0.0, 1.0], got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Creates a confidence value, clamping into [0.0, 1.0]. `NaN` maps to 0.0.
    #[must_use]
    pub fn saturating(value: f32) -> Self {
        if value.is_nan() {
            return Self::MIN;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Returns the raw confidence value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.0
    }

    /// Returns `true` if the confidence reaches the given threshold.
    #[must_use]
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.0 >= threshold
    }

    /// Maximum confidence (1.0).
    pub const MAX: Self = Self(1.0);

    /// Minimum confidence (0.0).
    pub const MIN: Self = Self(0.0);
}

impl Default for Confidence {
    fn default() -> Self {
        Self::MIN
    }
}

// =============================================================================
// Pose Types
// =============================================================================

/// Types of body keypoints following COCO format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum KeypointType {
    /// Nose
    Nose = 0,
    /// Left eye
    LeftEye = 1,
    /// Right eye
    RightEye = 2,
    /// Left ear
    LeftEar = 3,
    /// Right ear
    RightEar = 4,
    /// Left shoulder
    LeftShoulder = 5,
    /// Right shoulder
    RightShoulder = 6,
    /// Left elbow
    LeftElbow = 7,
    /// Right elbow
    RightElbow = 8,
    /// Left wrist
    LeftWrist = 9,
    /// Right wrist
    RightWrist = 10,
    /// Left hip
    LeftHip = 11,
    /// Right hip
    RightHip = 12,
    /// Left knee
    LeftKnee = 13,
    /// Right knee
    RightKnee = 14,
    /// Left ankle
    LeftAnkle = 15,
    /// Right ankle
    RightAnkle = 16,
}

impl KeypointType {
    /// Returns all keypoint types in order.
    #[must_use]
    pub fn all() -> &'static [Self; MAX_KEYPOINTS] {
        &[
            Self::Nose,
            Self::LeftEye,
            Self::RightEye,
            Self::LeftEar,
            Self::RightEar,
            Self::LeftShoulder,
            Self::RightShoulder,
            Self::LeftElbow,
            Self::RightElbow,
            Self::LeftWrist,
            Self::RightWrist,
            Self::LeftHip,
            Self::RightHip,
            Self::LeftKnee,
            Self::RightKnee,
            Self::LeftAnkle,
            Self::RightAnkle,
        ]
    }

    /// Returns the keypoint name as a string.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// Index of this keypoint in a [`KeypointSample`].
    #[must_use]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Returns `true` for the four joints that define the torso.
    #[must_use]
    pub fn is_torso(&self) -> bool {
        matches!(
            self,
            Self::LeftShoulder | Self::RightShoulder | Self::LeftHip | Self::RightHip
        )
    }
}

impl TryFrom<u8> for KeypointType {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::all()
            .get(usize::from(value))
            .copied()
            .ok_or_else(|| CoreError::validation(format!("Invalid keypoint type: {value}")))
    }
}

impl FromStr for KeypointType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .find(|kp| kp.name() == s)
            .copied()
            .ok_or_else(|| CoreError::unknown_keypoint(s))
    }
}

impl std::fmt::Display for KeypointType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// COCO limb connections used for skeleton rendering.
pub const SKELETON_EDGES: [(KeypointType, KeypointType); 12] = [
    (KeypointType::LeftShoulder, KeypointType::RightShoulder),
    (KeypointType::LeftHip, KeypointType::RightHip),
    (KeypointType::LeftShoulder, KeypointType::LeftElbow),
    (KeypointType::LeftElbow, KeypointType::LeftWrist),
    (KeypointType::RightShoulder, KeypointType::RightElbow),
    (KeypointType::RightElbow, KeypointType::RightWrist),
    (KeypointType::LeftHip, KeypointType::LeftKnee),
    (KeypointType::LeftKnee, KeypointType::LeftAnkle),
    (KeypointType::RightHip, KeypointType::RightKnee),
    (KeypointType::RightKnee, KeypointType::RightAnkle),
    (KeypointType::LeftShoulder, KeypointType::LeftHip),
    (KeypointType::RightShoulder, KeypointType::RightHip),
];

/// A single body keypoint with position and confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    /// Type of keypoint
    pub keypoint_type: KeypointType,
    /// X coordinate (normalized 0.0-1.0)
    pub x: f32,
    /// Y coordinate (normalized 0.0-1.0, grows downward)
    pub y: f32,
    /// Detection confidence
    pub confidence: Confidence,
}

impl Keypoint {
    /// Creates a new 2D keypoint.
    #[must_use]
    pub fn new(keypoint_type: KeypointType, x: f32, y: f32, confidence: Confidence) -> Self {
        Self {
            keypoint_type,
            x,
            y,
            confidence,
        }
    }

    /// A keypoint the backend did not report.
    #[must_use]
    pub fn missing(keypoint_type: KeypointType) -> Self {
        Self::new(keypoint_type, 0.0, 0.0, Confidence::MIN)
    }

    /// Returns `true` if the keypoint has finite coordinates and reaches
    /// `min_confidence`.
    #[must_use]
    pub fn is_usable(&self, min_confidence: f32) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.confidence.value() > 0.0
            && self.confidence.exceeds(min_confidence)
    }

    /// Returns the 2D position as a tuple.
    #[must_use]
    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Calculates the Euclidean distance to another keypoint.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// One normalized pose observation produced by the pose backend.
///
/// Holds every COCO-17 keypoint; joints the backend did not report carry
/// zero confidence. A sample is immutable once built.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeypointSample {
    timestamp: DateTime<Utc>,
    points: [Keypoint; MAX_KEYPOINTS],
}

impl KeypointSample {
    /// Creates a sample with every keypoint missing.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        let all = KeypointType::all();
        Self {
            timestamp,
            points: std::array::from_fn(|i| Keypoint::missing(all[i])),
        }
    }

    /// Builder: sets one keypoint. The score is clamped into [0.0, 1.0].
    #[must_use]
    pub fn with_point(mut self, keypoint_type: KeypointType, x: f32, y: f32, score: f32) -> Self {
        self.points[keypoint_type.index()] =
            Keypoint::new(keypoint_type, x, y, Confidence::saturating(score));
        self
    }

    /// Builds a sample from `(name, [x, y, score])` pairs as emitted by
    /// MoveNet-style backends.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownKeypoint`] for a name outside COCO-17 and
    /// [`CoreError::Validation`] for a score outside [0.0, 1.0].
    pub fn from_named<I, S>(timestamp: DateTime<Utc>, points: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (S, [f32; 3])>,
        S: AsRef<str>,
    {
        let mut sample = Self::new(timestamp);
        for (name, [x, y, score]) in points {
            let keypoint_type: KeypointType = name.as_ref().parse()?;
            let confidence = Confidence::new(score)?;
            sample.points[keypoint_type.index()] = Keypoint::new(keypoint_type, x, y, confidence);
        }
        Ok(sample)
    }

    /// Observation time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the keypoint of the given type.
    #[must_use]
    pub fn get(&self, keypoint_type: KeypointType) -> &Keypoint {
        &self.points[keypoint_type.index()]
    }

    /// Iterates over all keypoints in COCO order.
    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.points.iter()
    }

    /// Midpoint of two keypoints, or `None` if either is below
    /// `min_confidence`.
    #[must_use]
    pub fn midpoint(&self, a: KeypointType, b: KeypointType, min_confidence: f32) -> Option<(f32, f32)> {
        let pa = self.get(a);
        let pb = self.get(b);
        if !pa.is_usable(min_confidence) || !pb.is_usable(min_confidence) {
            return None;
        }
        Some(((pa.x + pb.x) / 2.0, (pa.y + pb.y) / 2.0))
    }

    /// Mean confidence of the keypoints that were reported at all.
    #[must_use]
    pub fn mean_confidence(&self) -> f32 {
        let (sum, count) = self
            .points
            .iter()
            .filter(|kp| kp.confidence.value() > 0.0)
            .fold((0.0_f32, 0_u32), |(s, n), kp| (s + kp.confidence.value(), n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_confidence_validation() {
        assert!(Confidence::new(0.5).is_ok());
        assert!(Confidence::new(0.0).is_ok());
        assert!(Confidence::new(1.0).is_ok());
        assert!(Confidence::new(-0.1).is_err());
        assert!(Confidence::new(1.1).is_err());
    }

    #[test]
    fn test_confidence_saturating() {
        assert_eq!(Confidence::saturating(1.7), Confidence::MAX);
        assert_eq!(Confidence::saturating(-3.0), Confidence::MIN);
        assert_eq!(Confidence::saturating(f32::NAN), Confidence::MIN);
    }

    #[test]
    fn test_keypoint_type_lookup() {
        assert_eq!("left_hip".parse::<KeypointType>().unwrap(), KeypointType::LeftHip);
        assert!("tail".parse::<KeypointType>().is_err());
        assert_eq!(KeypointType::try_from(12).unwrap(), KeypointType::RightHip);
        assert!(KeypointType::try_from(17).is_err());

        for (i, kp) in KeypointType::all().iter().enumerate() {
            assert_eq!(kp.index(), i);
        }
    }

    #[test]
    fn test_keypoint_distance() {
        let kp1 = Keypoint::new(KeypointType::Nose, 0.0, 0.0, Confidence::MAX);
        let kp2 = Keypoint::new(KeypointType::LeftEye, 3.0, 4.0, Confidence::MAX);

        assert_relative_eq!(kp1.distance_to(&kp2), 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_sample_missing_points_are_unusable() {
        let sample = KeypointSample::new(ts());
        assert!(sample.keypoints().all(|kp| !kp.is_usable(0.0)));
        assert_eq!(sample.mean_confidence(), 0.0);
    }

    #[test]
    fn test_sample_midpoint() {
        let sample = KeypointSample::new(ts())
            .with_point(KeypointType::LeftHip, 0.4, 0.6, 0.9)
            .with_point(KeypointType::RightHip, 0.6, 0.7, 0.8);

        let (x, y) = sample
            .midpoint(KeypointType::LeftHip, KeypointType::RightHip, 0.5)
            .unwrap();
        assert_relative_eq!(x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(y, 0.65, epsilon = 1e-6);

        assert!(sample
            .midpoint(KeypointType::LeftHip, KeypointType::RightHip, 0.85)
            .is_none());
        assert_relative_eq!(sample.mean_confidence(), 0.85, epsilon = 1e-6);
    }

    #[test]
    fn test_sample_from_named() {
        let sample = KeypointSample::from_named(
            ts(),
            vec![("left_shoulder", [0.45, 0.3, 0.95]), ("right_shoulder", [0.55, 0.3, 0.9])],
        )
        .unwrap();
        assert!(sample.get(KeypointType::LeftShoulder).is_usable(0.5));
        assert_eq!(sample.timestamp(), ts());

        let err = KeypointSample::from_named(ts(), vec![("wing", [0.0, 0.0, 1.0])]);
        assert!(matches!(err, Err(CoreError::UnknownKeypoint { .. })));

        let err = KeypointSample::from_named(ts(), vec![("nose", [0.0, 0.0, 1.5])]);
        assert!(matches!(err, Err(CoreError::Validation { .. })));
    }
}
