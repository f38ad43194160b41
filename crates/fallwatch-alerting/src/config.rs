//! Alerting configuration.
//!
//! Loaded and validated the same way as [`fallwatch_risk::RiskConfig`]:
//! serde with documented defaults, `validate()` on load, and JSON helpers.

use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use fallwatch_risk::config::MAX_DURATION_S;
use fallwatch_risk::ConfigError;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AlertConfig
// ---------------------------------------------------------------------------

/// Reminder, heartbeat and notification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Interval between reminders for an unacknowledged alert. `0.0`
    /// disables reminders and expiry. Default: **120.0**.
    pub repeat_unacked_after_s: f64,

    /// Reminders sent before a pending alert expires. Default: **3**.
    pub max_repeats: u32,

    /// Emit the daily heartbeat. Default: **true**.
    pub heartbeat_enabled: bool,

    /// Local hour at which the heartbeat is sent. Default: **9**.
    pub heartbeat_hour: u32,

    /// Offset of local time from UTC for the heartbeat hour. Default: **0**.
    pub utc_offset_minutes: i32,

    /// Offer the "Stop" action alongside "OK" and "False Alarm".
    /// Default: **true**.
    pub include_stop_action: bool,

    /// Attach the rendered skeleton to the first notification of an alert.
    /// Default: **true**.
    pub attach_snapshot: bool,

    /// Resolved records kept for inspection. Default: **256**.
    pub history_limit: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            repeat_unacked_after_s: 120.0,
            max_repeats: 3,
            heartbeat_enabled: true,
            heartbeat_hour: 9,
            utc_offset_minutes: 0,
            include_stop_action: true,
            attach_snapshot: true,
            history_limit: 256,
        }
    }
}

impl AlertConfig {
    /// Load from a JSON file and validate.
    pub fn from_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&json).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Write as pretty-printed JSON.
    pub fn to_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.repeat_unacked_after_s.is_finite() || self.repeat_unacked_after_s < 0.0 {
            return Err(ConfigError::invalid_value(
                "repeat_unacked_after_s",
                format!("must be a finite value >= 0.0, got {}", self.repeat_unacked_after_s),
            ));
        }
        if self.repeat_unacked_after_s > MAX_DURATION_S {
            return Err(ConfigError::invalid_value(
                "repeat_unacked_after_s",
                format!("must be <= {MAX_DURATION_S}, got {}", self.repeat_unacked_after_s),
            ));
        }
        if self.heartbeat_hour > 23 {
            return Err(ConfigError::invalid_value(
                "heartbeat_hour",
                format!("must be in 0..=23, got {}", self.heartbeat_hour),
            ));
        }
        if self.local_offset().is_none() {
            return Err(ConfigError::invalid_value(
                "utc_offset_minutes",
                format!("must be within ±24h, got {}", self.utc_offset_minutes),
            ));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::invalid_value("history_limit", "must be > 0"));
        }
        Ok(())
    }

    /// `true` when unacknowledged alerts are re-sent.
    pub fn reminders_enabled(&self) -> bool {
        self.repeat_unacked_after_s > 0.0
    }

    pub fn local_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
    }
}

// ---------------------------------------------------------------------------
// JournalConfig
// ---------------------------------------------------------------------------

/// Append-only alert journal with size-based rotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Write the journal at all. Default: **true**.
    pub enabled: bool,

    /// Active journal file. Default: **`alerts.jsonl`**.
    pub path: PathBuf,

    /// Rotate once the active file exceeds this many KiB. `0` disables
    /// rotation. Default: **256**.
    pub rotate_kb: u64,

    /// Number of files kept, counting the active one. Default: **3**.
    pub keep: u32,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: PathBuf::from("alerts.jsonl"),
            rotate_kb: 256,
            keep: 3,
        }
    }
}

impl JournalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value("journal.path", "must not be empty"));
        }
        if self.keep == 0 {
            return Err(ConfigError::invalid_value("journal.keep", "must be >= 1"));
        }
        Ok(())
    }

    /// Size in bytes past which the journal rotates.
    pub fn rotate_bytes(&self) -> Option<u64> {
        (self.rotate_kb > 0).then(|| self.rotate_kb.saturating_mul(1024))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_are_valid() {
        AlertConfig::default().validate().unwrap();
        JournalConfig::default().validate().unwrap();
        assert!(AlertConfig::default().reminders_enabled());
        assert_eq!(JournalConfig::default().rotate_bytes(), Some(256 * 1024));
    }

    #[test]
    fn rejects_bad_heartbeat_hour() {
        let cfg = AlertConfig {
            heartbeat_hour: 24,
            ..AlertConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "heartbeat_hour", .. })
        ));
    }

    #[test]
    fn rejects_negative_repeat_interval() {
        let cfg = AlertConfig {
            repeat_unacked_after_s: -1.0,
            ..AlertConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AlertConfig {
            repeat_unacked_after_s: f64::NAN,
            ..AlertConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_repeat_interval_beyond_a_day() {
        let cfg = AlertConfig {
            repeat_unacked_after_s: 1e13,
            ..AlertConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue { field: "repeat_unacked_after_s", .. })
        ));
    }

    #[test]
    fn zero_rotation_disables_rotation() {
        let cfg = JournalConfig {
            rotate_kb: 0,
            ..JournalConfig::default()
        };
        assert_eq!(cfg.rotate_bytes(), None);
        assert!(JournalConfig {
            keep: 0,
            ..JournalConfig::default()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn json_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerting.json");
        let cfg = AlertConfig {
            max_repeats: 5,
            heartbeat_hour: 20,
            ..AlertConfig::default()
        };
        cfg.to_json(&path).unwrap();
        assert_eq!(AlertConfig::from_json(&path).unwrap(), cfg);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: AlertConfig = serde_json::from_str(r#"{"max_repeats": 1}"#).unwrap();
        assert_eq!(cfg.max_repeats, 1);
        assert_eq!(cfg.heartbeat_hour, 9);
    }
}
