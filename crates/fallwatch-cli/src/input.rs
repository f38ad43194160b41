//! JSON-lines sample input.
//!
//! One object per line:
//!
//! ```json
//! {"timestamp": "2024-05-01T02:00:00.100Z",
//!  "keypoints": {"left_hip": [0.48, 0.60, 0.93], "right_hip": [0.52, 0.60, 0.91]},
//!  "occupied": true}
//! ```
//!
//! Keypoint values are `[x, y, score]` in normalized frame coordinates.
//! Missing joints are allowed; `occupied` is optional and drives the
//! occupancy gate when present.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fallwatch_core::{KeypointSample, KeypointType};
use serde::{Deserialize, Serialize};

/// One line of the input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub keypoints: BTreeMap<String, [f32; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupied: Option<bool>,
}

impl SampleRecord {
    /// Parses one line. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        serde_json::from_str(line)
            .map(Some)
            .context("malformed sample line")
    }

    pub fn to_sample(&self) -> Result<KeypointSample> {
        KeypointSample::from_named(self.timestamp, self.keypoints.iter().map(|(k, v)| (k, *v)))
            .with_context(|| format!("invalid sample at {}", self.timestamp))
    }

    /// Serializes the usable joints of `sample`.
    pub fn from_sample(sample: &KeypointSample) -> Self {
        let keypoints = KeypointType::all()
            .iter()
            .map(|kp| sample.get(*kp))
            .filter(|kp| kp.x.is_finite() && kp.y.is_finite() && kp.confidence.value() > 0.0)
            .map(|kp| {
                (
                    kp.keypoint_type.name().to_string(),
                    [kp.x, kp.y, kp.confidence.value()],
                )
            })
            .collect();
        Self {
            timestamp: sample.timestamp(),
            keypoints,
            occupied: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fallwatch_risk::synthetic::body_sample;

    #[test]
    fn parses_sample_line() {
        let line = r#"{"timestamp":"2024-05-01T02:00:00.100Z","keypoints":{"left_hip":[0.48,0.6,0.93],"right_hip":[0.52,0.6,0.91]}}"#;
        let record = SampleRecord::parse_line(line).unwrap().unwrap();
        assert_eq!(record.occupied, None);
        let sample = record.to_sample().unwrap();
        assert!(sample.get(KeypointType::LeftHip).is_usable(0.5));
        assert!(!sample.get(KeypointType::Nose).is_usable(0.1));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(SampleRecord::parse_line("   ").unwrap().is_none());
        assert!(SampleRecord::parse_line("# recorded 2024-05-01").unwrap().is_none());
        assert!(SampleRecord::parse_line("{not json").is_err());
    }

    #[test]
    fn rejects_unknown_keypoint() {
        let line = r#"{"timestamp":"2024-05-01T02:00:00Z","keypoints":{"tail":[0.5,0.5,0.9]}}"#;
        let record = SampleRecord::parse_line(line).unwrap().unwrap();
        assert!(record.to_sample().is_err());
    }

    #[test]
    fn sample_roundtrips_through_record() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
        let sample = body_sample(ts, (0.5, 0.6), 90.0, 0.9);
        let record = SampleRecord::from_sample(&sample);
        assert_eq!(record.keypoints.len(), 17);
        assert_eq!(record.to_sample().unwrap(), sample);
    }
}
