//! Pure torso geometry derived from one or two samples.
//!
//! Everything here is stateless. The torso is described by the midpoint of
//! the hips and the midpoint of the shoulders; all four joints must reach the
//! confidence floor or the sample yields
//! [`PostureError::InsufficientKeypoints`].

use fallwatch_core::{KeypointSample, KeypointType};

use crate::error::PostureError;

/// Hip-to-shoulder vectors shorter than this are treated as horizontal.
const DEGENERATE_TORSO: f32 = 0.001;

/// Hip and shoulder midpoints of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorsoMidpoints {
    /// Midpoint of the hips.
    pub hip: (f32, f32),
    /// Midpoint of the shoulders.
    pub shoulder: (f32, f32),
}

impl TorsoMidpoints {
    /// Extracts the torso midpoints of `sample`.
    ///
    /// # Errors
    ///
    /// Returns [`PostureError::InsufficientKeypoints`] naming the first torso
    /// joint below `min_confidence`.
    pub fn from_sample(sample: &KeypointSample, min_confidence: f32) -> Result<Self, PostureError> {
        for keypoint_type in [
            KeypointType::LeftHip,
            KeypointType::RightHip,
            KeypointType::LeftShoulder,
            KeypointType::RightShoulder,
        ] {
            if !sample.get(keypoint_type).is_usable(min_confidence) {
                return Err(PostureError::InsufficientKeypoints {
                    keypoint: keypoint_type,
                });
            }
        }
        let hip = sample.midpoint(KeypointType::LeftHip, KeypointType::RightHip, min_confidence);
        let shoulder = sample.midpoint(
            KeypointType::LeftShoulder,
            KeypointType::RightShoulder,
            min_confidence,
        );
        match (hip, shoulder) {
            (Some(hip), Some(shoulder)) => Ok(Self { hip, shoulder }),
            _ => Err(PostureError::InsufficientKeypoints {
                keypoint: KeypointType::LeftHip,
            }),
        }
    }

    /// Torso angle against the horizontal axis, in `[0, 90]` degrees.
    pub fn torso_angle(&self) -> f32 {
        let vx = self.shoulder.0 - self.hip.0;
        let vy = self.shoulder.1 - self.hip.1;
        if vx.abs() < DEGENERATE_TORSO && vy.abs() < DEGENERATE_TORSO {
            return 0.0;
        }
        vy.abs().atan2(vx.abs()).to_degrees().clamp(0.0, 90.0)
    }

    /// Displacement of the hip midpoint.
    pub fn hip_displacement(&self, later: &Self) -> f32 {
        distance(self.hip, later.hip)
    }

    /// Displacement of the shoulder midpoint.
    pub fn shoulder_displacement(&self, later: &Self) -> f32 {
        distance(self.shoulder, later.shoulder)
    }

    /// Averaged hip and shoulder displacement.
    pub fn movement_to(&self, later: &Self) -> f32 {
        (self.hip_displacement(later) + self.shoulder_displacement(later)) / 2.0
    }

    /// Combined hip and shoulder displacement.
    pub fn position_change_to(&self, later: &Self) -> f32 {
        self.hip_displacement(later) + self.shoulder_displacement(later)
    }

    /// Downward travel of the hip midpoint. Upward motion yields a negative value.
    pub fn vertical_drop_to(&self, later: &Self) -> f32 {
        later.hip.1 - self.hip.1
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Torso angle of one sample: 0 degrees lying flat, 90 degrees upright.
///
/// # Errors
///
/// Returns [`PostureError::InsufficientKeypoints`] if a hip or shoulder is
/// below `min_confidence`.
pub fn torso_angle(sample: &KeypointSample, min_confidence: f32) -> Result<f32, PostureError> {
    Ok(TorsoMidpoints::from_sample(sample, min_confidence)?.torso_angle())
}

/// Movement magnitude between two samples in normalized frame units.
///
/// # Errors
///
/// Returns [`PostureError::InsufficientKeypoints`] if either sample fails the
/// confidence rule.
pub fn movement(
    earlier: &KeypointSample,
    later: &KeypointSample,
    min_confidence: f32,
) -> Result<f32, PostureError> {
    let a = TorsoMidpoints::from_sample(earlier, min_confidence)?;
    let b = TorsoMidpoints::from_sample(later, min_confidence)?;
    Ok(a.movement_to(&b))
}

/// Posture of the newest sample, recomputed every tick and never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureSnapshot {
    /// Torso angle in degrees.
    pub torso_angle: f32,
    /// Movement since the previous sample, when both were usable.
    pub movement: Option<f32>,
}
