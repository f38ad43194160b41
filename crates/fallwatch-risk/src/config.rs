//! Risk engine configuration.
//!
//! [`RiskConfig`] is the single source of truth for every tunable threshold.
//! The configuration is read-only once an engine is built; several engines may
//! share one instance.
//!
//! # Example
//!
//! ```rust
//! use fallwatch_risk::RiskConfig;
//!
//! let cfg = RiskConfig {
//!     soft_immobility_s: 20.0,
//!     ..RiskConfig::default()
//! };
//! cfg.validate().expect("config should be valid");
//! ```

use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest accepted value for a duration setting, in seconds (one day).
pub const MAX_DURATION_S: f64 = 86_400.0;

/// Largest accepted `cooldown_s` (one week).
pub const MAX_COOLDOWN_S: f64 = 7.0 * MAX_DURATION_S;

// ---------------------------------------------------------------------------
// OccupancyPolicy
// ---------------------------------------------------------------------------

/// What happens to a session while the occupancy gate reports an empty room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyPolicy {
    /// Pause the session: on re-enable the timers are shifted forward by the
    /// disabled duration and the motion buffer is cleared.
    #[default]
    Freeze,
    /// Fully reset the session on disable (buffer cleared, state `IDLE`).
    Reset,
}

// ---------------------------------------------------------------------------
// RiskConfig
// ---------------------------------------------------------------------------

/// Complete configuration for one monitored session.
///
/// Geometry thresholds are in normalized frame units, angles in degrees and
/// durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    // -----------------------------------------------------------------------
    // Posture
    // -----------------------------------------------------------------------
    /// Torso angle separating upright (at or above) from bent/lying (below).
    /// Default: **50.0**.
    pub angle_threshold_deg: f32,

    /// Hip and shoulder keypoints below this confidence are ignored.
    /// Default: **0.1**.
    pub min_keypoint_confidence: f32,

    // -----------------------------------------------------------------------
    // Fall-candidate detection
    // -----------------------------------------------------------------------
    /// Downward hip displacement within the drop window. Default: **0.15**.
    pub drop_threshold: f32,

    /// Lookback of the drop detector. Default: **1.0**.
    pub drop_window_s: f64,

    /// Torso angle change within the drop window. Default: **30.0**.
    pub angle_change_threshold: f32,

    /// Combined hip + shoulder displacement within the drop window.
    /// Default: **0.15**.
    pub position_change_threshold: f32,

    // -----------------------------------------------------------------------
    // Immobility
    // -----------------------------------------------------------------------
    /// Lookback used to average movement. Default: **10.0**.
    pub immobile_window_s: f64,

    /// Stillness before a soft alert. Default: **30.0**.
    pub soft_immobility_s: f64,

    /// Stillness before a hard alert. Default: **60.0**.
    pub hard_immobility_s: f64,

    /// Stillness after a fall candidate that confirms the fall. Default: **12.0**.
    pub fast_fall_immobility_s: f64,

    /// Movement tolerance while bent or lying. Default: **0.12**.
    pub movement_tolerance_low_angle: f32,

    /// Movement tolerance while upright. Default: **0.05**.
    pub movement_tolerance_high_angle: f32,

    /// Width of the band below `angle_threshold_deg` over which the tolerance
    /// blends linearly from low-angle to high-angle. `0.0` is a hard switch.
    /// Default: **5.0**.
    pub tolerance_blend_deg: f32,

    /// Only escalate immobility while the torso is below `angle_threshold_deg`.
    /// Default: **false**.
    pub immobility_requires_low_posture: bool,

    // -----------------------------------------------------------------------
    // Alert suppression
    // -----------------------------------------------------------------------
    /// Per-category suppression interval after an emitted alert. Default: **600.0**.
    pub cooldown_s: f64,

    // -----------------------------------------------------------------------
    // Shower awareness
    // -----------------------------------------------------------------------
    /// Widen immobility durations during shower hours. Default: **true**.
    pub shower_mode_enabled: bool,

    /// First local hour of the shower window (inclusive). Default: **6**.
    pub shower_start_hour: u32,

    /// Local hour ending the shower window (exclusive). Wraps past midnight
    /// when smaller than the start. Default: **22**.
    pub shower_end_hour: u32,

    /// Multiplier applied to soft/hard durations in the window. Default: **4.0**.
    pub shower_duration_multiplier: f64,

    /// Offset of local time from UTC used for hour-of-day decisions.
    /// Default: **0**.
    pub utc_offset_minutes: i32,

    // -----------------------------------------------------------------------
    // Session hygiene
    // -----------------------------------------------------------------------
    /// Reset the session after this long without usable torso keypoints.
    /// `0.0` disables the reset. Default: **10.0**.
    pub absence_reset_s: f64,

    /// Longest gap between consecutive samples that counts in full towards
    /// the stillness timers. The part of a longer gap beyond this bound is
    /// treated as a clock anomaly and excluded. Default: **10.0**.
    pub max_tick_gap_s: f64,

    /// Behavior while the occupancy gate reports an empty room.
    /// Default: **freeze**.
    pub occupancy_policy: OccupancyPolicy,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            angle_threshold_deg: 50.0,
            min_keypoint_confidence: 0.1,
            drop_threshold: 0.15,
            drop_window_s: 1.0,
            angle_change_threshold: 30.0,
            position_change_threshold: 0.15,
            immobile_window_s: 10.0,
            soft_immobility_s: 30.0,
            hard_immobility_s: 60.0,
            fast_fall_immobility_s: 12.0,
            movement_tolerance_low_angle: 0.12,
            movement_tolerance_high_angle: 0.05,
            tolerance_blend_deg: 5.0,
            immobility_requires_low_posture: false,
            cooldown_s: 600.0,
            shower_mode_enabled: true,
            shower_start_hour: 6,
            shower_end_hour: 22,
            shower_duration_multiplier: 4.0,
            utc_offset_minutes: 0,
            absence_reset_s: 10.0,
            max_tick_gap_s: 10.0,
            occupancy_policy: OccupancyPolicy::Freeze,
        }
    }
}

impl RiskConfig {
    /// Load and validate a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the file cannot be opened,
    /// [`ConfigError::ParseError`] if the JSON is malformed and
    /// [`ConfigError::InvalidValue`] if validation fails.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: RiskConfig =
            serde_json::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this configuration to pretty-printed JSON and write it to
    /// `path`, creating parent directories if necessary.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FileRead`] if the directory cannot be created or
    /// the file cannot be written.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::FileRead {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::invalid_value("(serialization)", e.to_string()))?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(())
    }

    /// Validate all fields, returning the first invalid one.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Posture
        if !(self.angle_threshold_deg > 0.0 && self.angle_threshold_deg <= 90.0) {
            return Err(ConfigError::invalid_value(
                "angle_threshold_deg",
                "must be in (0.0, 90.0]",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_keypoint_confidence) {
            return Err(ConfigError::invalid_value(
                "min_keypoint_confidence",
                "must be in [0.0, 1.0]",
            ));
        }

        // Drop detector
        if !(self.drop_threshold > 0.0) {
            return Err(ConfigError::invalid_value("drop_threshold", "must be > 0.0"));
        }
        if !(self.drop_window_s > 0.0) {
            return Err(ConfigError::invalid_value("drop_window_s", "must be > 0.0"));
        }
        if !(self.angle_change_threshold > 0.0) {
            return Err(ConfigError::invalid_value(
                "angle_change_threshold",
                "must be > 0.0",
            ));
        }
        if !(self.position_change_threshold > 0.0) {
            return Err(ConfigError::invalid_value(
                "position_change_threshold",
                "must be > 0.0",
            ));
        }

        // Immobility
        if !(self.immobile_window_s > 0.0) {
            return Err(ConfigError::invalid_value("immobile_window_s", "must be > 0.0"));
        }
        if !(self.soft_immobility_s > 0.0) {
            return Err(ConfigError::invalid_value("soft_immobility_s", "must be > 0.0"));
        }
        if !(self.hard_immobility_s > self.soft_immobility_s) {
            return Err(ConfigError::invalid_value(
                "hard_immobility_s",
                "must be > soft_immobility_s",
            ));
        }
        if !(self.fast_fall_immobility_s > 0.0) {
            return Err(ConfigError::invalid_value(
                "fast_fall_immobility_s",
                "must be > 0.0",
            ));
        }
        if self.fast_fall_immobility_s >= self.hard_immobility_s {
            return Err(ConfigError::invalid_value(
                "fast_fall_immobility_s",
                "must be < hard_immobility_s",
            ));
        }
        if !(self.movement_tolerance_low_angle > 0.0) {
            return Err(ConfigError::invalid_value(
                "movement_tolerance_low_angle",
                "must be > 0.0",
            ));
        }
        if !(self.movement_tolerance_high_angle > 0.0) {
            return Err(ConfigError::invalid_value(
                "movement_tolerance_high_angle",
                "must be > 0.0",
            ));
        }
        if !(self.tolerance_blend_deg >= 0.0 && self.tolerance_blend_deg <= self.angle_threshold_deg)
        {
            return Err(ConfigError::invalid_value(
                "tolerance_blend_deg",
                "must be in [0.0, angle_threshold_deg]",
            ));
        }

        // Suppression
        if !(self.cooldown_s >= 0.0) {
            return Err(ConfigError::invalid_value("cooldown_s", "must be >= 0.0"));
        }

        // Shower window
        if self.shower_start_hour > 23 {
            return Err(ConfigError::invalid_value("shower_start_hour", "must be in 0..=23"));
        }
        if self.shower_end_hour > 23 {
            return Err(ConfigError::invalid_value("shower_end_hour", "must be in 0..=23"));
        }
        if !(self.shower_duration_multiplier >= 1.0) {
            return Err(ConfigError::invalid_value(
                "shower_duration_multiplier",
                "must be >= 1.0",
            ));
        }
        if self.local_offset().is_none() {
            return Err(ConfigError::invalid_value(
                "utc_offset_minutes",
                "must be within one day of UTC",
            ));
        }

        // Session hygiene
        if !(self.absence_reset_s >= 0.0) {
            return Err(ConfigError::invalid_value("absence_reset_s", "must be >= 0.0"));
        }
        if !(self.max_tick_gap_s > 0.0) {
            return Err(ConfigError::invalid_value("max_tick_gap_s", "must be > 0.0"));
        }

        // Upper bounds
        for (field, value, max) in [
            ("drop_window_s", self.drop_window_s, MAX_DURATION_S),
            ("immobile_window_s", self.immobile_window_s, MAX_DURATION_S),
            ("soft_immobility_s", self.soft_immobility_s, MAX_DURATION_S),
            ("hard_immobility_s", self.hard_immobility_s, MAX_DURATION_S),
            ("fast_fall_immobility_s", self.fast_fall_immobility_s, MAX_DURATION_S),
            ("cooldown_s", self.cooldown_s, MAX_COOLDOWN_S),
            ("absence_reset_s", self.absence_reset_s, MAX_DURATION_S),
            ("max_tick_gap_s", self.max_tick_gap_s, MAX_DURATION_S),
        ] {
            if value > max {
                return Err(ConfigError::invalid_value(field, format!("must be <= {max}")));
            }
        }

        Ok(())
    }

    /// The local-time offset, or `None` if `utc_offset_minutes` is out of range.
    pub fn local_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Longest lookback any evaluation needs; the motion buffer keeps at
    /// least this much history.
    pub fn max_lookback_s(&self) -> f64 {
        self.drop_window_s
            .max(self.immobile_window_s)
            .max(self.fast_fall_immobility_s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_config_is_valid() {
        let cfg = RiskConfig::default();
        cfg.validate().expect("default config should be valid");
    }

    #[test]
    fn json_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("risk.json");

        let original = RiskConfig {
            cooldown_s: 120.0,
            occupancy_policy: OccupancyPolicy::Reset,
            ..RiskConfig::default()
        };
        original.to_json(&path).expect("serialization should succeed");

        let loaded = RiskConfig::from_json(&path).expect("deserialization should succeed");
        assert_eq!(loaded, original);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: RiskConfig = serde_json::from_str(r#"{ "soft_immobility_s": 20.0 }"#).unwrap();
        assert_eq!(cfg.soft_immobility_s, 20.0);
        assert_eq!(cfg.hard_immobility_s, 60.0);
        assert_eq!(cfg.occupancy_policy, OccupancyPolicy::Freeze);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("risk.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            RiskConfig::from_json(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            RiskConfig::from_json(&tmp.path().join("absent.json")),
            Err(ConfigError::FileRead { .. })
        ));
    }

    #[test]
    fn hard_not_above_soft_is_invalid() {
        let mut cfg = RiskConfig::default();
        cfg.hard_immobility_s = cfg.soft_immobility_s;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn fast_fall_must_beat_hard_immobility() {
        let mut cfg = RiskConfig::default();
        cfg.fast_fall_immobility_s = cfg.hard_immobility_s;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn nan_threshold_is_invalid() {
        let mut cfg = RiskConfig::default();
        cfg.drop_threshold = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn shower_hour_out_of_range_is_invalid() {
        let mut cfg = RiskConfig::default();
        cfg.shower_end_hour = 24;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn blend_wider_than_threshold_is_invalid() {
        let mut cfg = RiskConfig::default();
        cfg.tolerance_blend_deg = cfg.angle_threshold_deg + 1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn utc_offset_out_of_range_is_invalid() {
        let mut cfg = RiskConfig::default();
        cfg.utc_offset_minutes = 24 * 60;
        assert!(cfg.validate().is_err());
        cfg.utc_offset_minutes = -120;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn huge_window_is_invalid() {
        let cfg = RiskConfig {
            immobile_window_s: 1e13,
            ..RiskConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "immobile_window_s", .. })
        ));

        let cfg = RiskConfig {
            cooldown_s: f64::INFINITY,
            ..RiskConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "cooldown_s", .. })
        ));

        let cfg = RiskConfig {
            cooldown_s: MAX_COOLDOWN_S,
            ..RiskConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn lookback_covers_every_window() {
        let cfg = RiskConfig::default();
        assert_eq!(cfg.max_lookback_s(), 12.0);
    }
}
