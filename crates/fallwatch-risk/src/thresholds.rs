//! Threshold adaptation.
//!
//! All posture and time-of-day branching lives here. [`effective_thresholds`]
//! is a pure function of the configuration, the local wall-clock time and the
//! current torso angle; the engine calls it once per tick and threads the
//! resulting [`ThresholdSet`] through every other component.

use chrono::Timelike;
use serde::{Deserialize, Serialize};

use crate::config::RiskConfig;

/// Thresholds in force for one evaluation instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSet {
    /// Torso angle separating upright from bent/lying.
    pub angle_threshold_deg: f32,
    /// Downward hip displacement that flags a drop.
    pub drop_threshold: f32,
    /// Torso angle change that flags a drop.
    pub angle_change_threshold: f32,
    /// Combined hip + shoulder displacement that flags a drop.
    pub position_change_threshold: f32,
    /// Configured tolerance while bent or lying.
    pub movement_tolerance_low_angle: f32,
    /// Configured tolerance while upright.
    pub movement_tolerance_high_angle: f32,
    /// Tolerance selected for the current posture.
    pub movement_tolerance: f32,
    /// Effective stillness before a soft alert.
    pub soft_immobility_s: f64,
    /// Effective stillness before a hard alert.
    pub hard_immobility_s: f64,
    /// Stillness after a fall candidate that confirms it.
    pub fast_fall_immobility_s: f64,
    /// Drop detector lookback.
    pub drop_window_s: f64,
    /// Movement averaging lookback.
    pub immobile_window_s: f64,
    /// Whether the shower multiplier was applied.
    pub shower_active: bool,
}

/// Returns `true` if `hour` lies in `[start, end)`, wrapping past midnight
/// when `start > end`. An empty window (`start == end`) never matches.
pub fn in_shower_window(start: u32, end: u32, hour: u32) -> bool {
    match start.cmp(&end) {
        std::cmp::Ordering::Less => (start..end).contains(&hour),
        std::cmp::Ordering::Greater => hour >= start || hour < end,
        std::cmp::Ordering::Equal => false,
    }
}

/// Movement tolerance for a torso angle.
///
/// At or above the angle threshold the high-angle tolerance applies exactly.
/// Inside the blend band just below it the tolerance moves linearly towards
/// the low-angle value, which applies exactly below the band. An unknown
/// posture uses the high-angle tolerance.
pub fn movement_tolerance(config: &RiskConfig, torso_angle: Option<f32>) -> f32 {
    let high = config.movement_tolerance_high_angle;
    let low = config.movement_tolerance_low_angle;
    let Some(angle) = torso_angle else {
        return high;
    };
    let threshold = config.angle_threshold_deg;
    if angle >= threshold {
        return high;
    }
    let band = config.tolerance_blend_deg;
    let band_start = threshold - band;
    if band <= 0.0 || angle < band_start {
        return low;
    }
    let t = (angle - band_start) / band;
    low + (high - low) * t
}

/// Computes the thresholds in force at local time `now` for the given torso
/// angle.
pub fn effective_thresholds<T: Timelike>(
    config: &RiskConfig,
    now: &T,
    torso_angle: Option<f32>,
) -> ThresholdSet {
    let shower_active = config.shower_mode_enabled
        && in_shower_window(config.shower_start_hour, config.shower_end_hour, now.hour());
    let multiplier = if shower_active {
        config.shower_duration_multiplier
    } else {
        1.0
    };

    ThresholdSet {
        angle_threshold_deg: config.angle_threshold_deg,
        drop_threshold: config.drop_threshold,
        angle_change_threshold: config.angle_change_threshold,
        position_change_threshold: config.position_change_threshold,
        movement_tolerance_low_angle: config.movement_tolerance_low_angle,
        movement_tolerance_high_angle: config.movement_tolerance_high_angle,
        movement_tolerance: movement_tolerance(config, torso_angle),
        soft_immobility_s: config.soft_immobility_s * multiplier,
        hard_immobility_s: config.hard_immobility_s * multiplier,
        fast_fall_immobility_s: config.fast_fall_immobility_s,
        drop_window_s: config.drop_window_s,
        immobile_window_s: config.immobile_window_s,
        shower_active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveTime;

    fn hour(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 30, 0).unwrap()
    }

    #[test]
    fn shower_window_wraps_midnight() {
        assert!(in_shower_window(6, 22, 6));
        assert!(in_shower_window(6, 22, 21));
        assert!(!in_shower_window(6, 22, 22));
        assert!(!in_shower_window(6, 22, 3));

        assert!(in_shower_window(22, 6, 23));
        assert!(in_shower_window(22, 6, 0));
        assert!(in_shower_window(22, 6, 5));
        assert!(!in_shower_window(22, 6, 6));
        assert!(!in_shower_window(22, 6, 12));

        assert!(!in_shower_window(7, 7, 7));
    }

    #[test]
    fn shower_hours_widen_only_immobility() {
        let cfg = RiskConfig::default();
        let day = effective_thresholds(&cfg, &hour(8), Some(80.0));
        let night = effective_thresholds(&cfg, &hour(23), Some(80.0));

        assert!(day.shower_active);
        assert!(!night.shower_active);
        assert_relative_eq!(day.soft_immobility_s, 120.0);
        assert_relative_eq!(day.hard_immobility_s, 240.0);
        assert_relative_eq!(night.soft_immobility_s, 30.0);
        assert_eq!(day.fast_fall_immobility_s, night.fast_fall_immobility_s);
        assert_eq!(day.drop_threshold, night.drop_threshold);
        assert_eq!(day.position_change_threshold, night.position_change_threshold);
    }

    #[test]
    fn disabled_shower_mode_never_applies() {
        let cfg = RiskConfig {
            shower_mode_enabled: false,
            ..RiskConfig::default()
        };
        let set = effective_thresholds(&cfg, &hour(8), None);
        assert!(!set.shower_active);
        assert_relative_eq!(set.soft_immobility_s, 30.0);
    }

    #[test]
    fn tolerance_blends_below_threshold() {
        let cfg = RiskConfig::default();
        assert_relative_eq!(movement_tolerance(&cfg, Some(50.0)), 0.05);
        assert_relative_eq!(movement_tolerance(&cfg, Some(90.0)), 0.05);
        assert_relative_eq!(movement_tolerance(&cfg, Some(45.0)), 0.12);
        assert_relative_eq!(movement_tolerance(&cfg, Some(10.0)), 0.12);
        assert_relative_eq!(movement_tolerance(&cfg, Some(47.5)), 0.085, epsilon = 1e-6);
        assert_relative_eq!(movement_tolerance(&cfg, None), 0.05);
    }

    #[test]
    fn zero_blend_is_a_hard_switch() {
        let cfg = RiskConfig {
            tolerance_blend_deg: 0.0,
            ..RiskConfig::default()
        };
        assert_relative_eq!(movement_tolerance(&cfg, Some(49.99)), 0.12);
        assert_relative_eq!(movement_tolerance(&cfg, Some(50.0)), 0.05);
    }

    #[test]
    fn effective_thresholds_is_pure() {
        let cfg = RiskConfig::default();
        let a = effective_thresholds(&cfg, &hour(14), Some(30.0));
        let b = effective_thresholds(&cfg, &hour(14), Some(30.0));
        assert_eq!(a, b);
        assert_eq!(cfg, RiskConfig::default());
    }
}
