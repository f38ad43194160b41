//! Events emitted by the risk state machine.

use std::fmt;

use chrono::{DateTime, Utc};
use fallwatch_core::{KeypointSample, KeypointType, SNAPSHOT_CONFIDENCE_THRESHOLD};
use serde::{Deserialize, Serialize};

use crate::thresholds::ThresholdSet;

/// Kind of emergency an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    /// Drop signature confirmed by brief stillness.
    FallFast,
    /// First-tier immobility warning.
    ImmobilitySoft,
    /// Escalated immobility emergency.
    ImmobilityHard,
}

impl AlertCategory {
    pub fn all() -> [AlertCategory; 3] {
        [
            AlertCategory::FallFast,
            AlertCategory::ImmobilitySoft,
            AlertCategory::ImmobilityHard,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::FallFast => "fall_fast",
            AlertCategory::ImmobilitySoft => "immobility_soft",
            AlertCategory::ImmobilityHard => "immobility_hard",
        }
    }

    /// `true` for the categories raised from `HARD_ALERT`.
    pub fn is_hard(&self) -> bool {
        !matches!(self, AlertCategory::ImmobilitySoft)
    }
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One visible joint of an anonymized skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkeletonPoint {
    pub keypoint: KeypointType,
    pub x: f32,
    pub y: f32,
}

/// Joint positions of the triggering sample, without any image content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SkeletonSnapshot {
    pub points: Vec<SkeletonPoint>,
}

impl SkeletonSnapshot {
    /// Keeps the joints whose confidence exceeds the snapshot floor.
    pub fn from_sample(sample: &KeypointSample) -> Self {
        let points = sample
            .keypoints()
            .filter(|kp| {
                kp.x.is_finite()
                    && kp.y.is_finite()
                    && kp.confidence.value() > SNAPSHOT_CONFIDENCE_THRESHOLD
            })
            .map(|kp| SkeletonPoint {
                keypoint: kp.keypoint_type,
                x: kp.x,
                y: kp.y,
            })
            .collect();
        Self { points }
    }

    pub fn point(&self, keypoint: KeypointType) -> Option<&SkeletonPoint> {
        self.points.iter().find(|p| p.keypoint == keypoint)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// An emitted emergency, handed to the alert lifecycle manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    pub category: AlertCategory,
    /// Timestamp of the sample that raised the event.
    pub at: DateTime<Utc>,
    /// Torso angle at emission.
    pub torso_angle: Option<f32>,
    /// Seconds the subject had been still.
    pub still_for_s: f64,
    /// Thresholds in force at emission.
    pub thresholds: ThresholdSet,
    /// Anonymized pose of the triggering sample.
    pub snapshot: Option<SkeletonSnapshot>,
}

impl RiskEvent {
    /// One-line human-readable description.
    pub fn summary(&self) -> String {
        let angle = self
            .torso_angle
            .map_or_else(|| "unknown".to_string(), |a| format!("{a:.0}°"));
        match self.category {
            AlertCategory::FallFast => format!(
                "Possible fall: sudden drop followed by {:.0}s without movement (torso {angle})",
                self.still_for_s
            ),
            AlertCategory::ImmobilitySoft => format!(
                "No movement for {:.0}s (torso {angle}); checking in",
                self.still_for_s
            ),
            AlertCategory::ImmobilityHard => format!(
                "EMERGENCY: no movement for {:.0}s (torso {angle})",
                self.still_for_s
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_names_are_stable() {
        let names: Vec<_> = AlertCategory::all().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, ["fall_fast", "immobility_soft", "immobility_hard"]);
        assert_eq!(
            serde_json::to_string(&AlertCategory::ImmobilityHard).unwrap(),
            "\"immobility_hard\""
        );
        assert!(AlertCategory::FallFast.is_hard());
        assert!(!AlertCategory::ImmobilitySoft.is_hard());
    }

    #[test]
    fn snapshot_drops_low_confidence_joints() {
        let sample = KeypointSample::new(Utc::now())
            .with_point(KeypointType::Nose, 0.5, 0.2, 0.9)
            .with_point(KeypointType::LeftWrist, 0.3, 0.5, 0.2)
            .with_point(KeypointType::LeftHip, 0.45, 0.6, 0.21);
        let snapshot = SkeletonSnapshot::from_sample(&sample);
        assert_eq!(snapshot.points.len(), 2);
        assert!(snapshot.point(KeypointType::LeftWrist).is_none());
        assert!(snapshot.point(KeypointType::LeftHip).is_some());
    }
}
