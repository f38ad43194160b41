//! `fallwatch thresholds`: show the effective thresholds for an hour and
//! posture.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Args;
use colored::Colorize;
use fallwatch_risk::{effective_thresholds, RiskConfig, ThresholdSet};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{table, MetricRow};
use crate::settings::AppConfig;
use crate::OutputFormat;

/// Arguments for the thresholds command
#[derive(Args, Debug)]
pub struct ThresholdsArgs {
    /// Local hour of day
    #[arg(long, default_value = "12", value_parser = clap::value_parser!(u32).range(0..24))]
    pub hour: u32,

    /// Torso angle in degrees (unknown posture when omitted)
    #[arg(short, long)]
    pub angle: Option<f32>,

    /// Show soft/hard durations for every hour instead
    #[arg(long)]
    pub all_hours: bool,

    /// Configuration file
    #[arg(short, long, env = "FALLWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Hourly duration row
#[derive(Tabled, Serialize)]
struct HourRow {
    #[tabled(rename = "Hour")]
    hour: u32,
    #[tabled(rename = "Shower")]
    shower: String,
    #[tabled(rename = "Soft (s)")]
    soft_s: f64,
    #[tabled(rename = "Hard (s)")]
    hard_s: f64,
}

/// Thresholds in force at `hour:00` local time for a torso angle.
pub fn thresholds_at(config: &RiskConfig, hour: u32, angle: Option<f32>) -> Result<ThresholdSet> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).context("hour must be in 0..=23")?;
    Ok(effective_thresholds(config, &time, angle))
}

fn threshold_rows(set: &ThresholdSet) -> Vec<MetricRow> {
    vec![
        MetricRow::new("angle_threshold_deg", set.angle_threshold_deg),
        MetricRow::new("drop_threshold", set.drop_threshold),
        MetricRow::new("drop_window_s", set.drop_window_s),
        MetricRow::new("angle_change_threshold", set.angle_change_threshold),
        MetricRow::new("position_change_threshold", set.position_change_threshold),
        MetricRow::new("movement_tolerance", format!("{:.3}", set.movement_tolerance)),
        MetricRow::new("movement_tolerance_low_angle", set.movement_tolerance_low_angle),
        MetricRow::new("movement_tolerance_high_angle", set.movement_tolerance_high_angle),
        MetricRow::new("immobile_window_s", set.immobile_window_s),
        MetricRow::new("soft_immobility_s", set.soft_immobility_s),
        MetricRow::new("hard_immobility_s", set.hard_immobility_s),
        MetricRow::new("fast_fall_immobility_s", set.fast_fall_immobility_s),
        MetricRow::new("shower_active", set.shower_active),
    ]
}

/// Execute the thresholds command
pub async fn execute(args: ThresholdsArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;

    if args.all_hours {
        let rows = (0..24)
            .map(|hour| {
                thresholds_at(&config.risk, hour, args.angle).map(|set| HourRow {
                    hour,
                    shower: if set.shower_active { "yes" } else { "no" }.to_string(),
                    soft_s: set.soft_immobility_s,
                    hard_s: set.hard_immobility_s,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
            OutputFormat::Table => println!("{}", table(rows)),
        }
        return Ok(());
    }

    let set = thresholds_at(&config.risk, args.hour, args.angle)?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&set)?),
        OutputFormat::Table => {
            let posture = args
                .angle
                .map_or_else(|| "unknown posture".to_string(), |a| format!("torso {a:.0}°"));
            println!(
                "{} {:02}:00 local, {}",
                "Effective thresholds".bold().cyan(),
                args.hour,
                posture
            );
            println!("{}", table(threshold_rows(&set)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shower_hours_widen_durations() {
        let config = RiskConfig::default();
        let night = thresholds_at(&config, 2, None).unwrap();
        let morning = thresholds_at(&config, 8, None).unwrap();
        assert!(!night.shower_active);
        assert!(morning.shower_active);
        assert_eq!(morning.soft_immobility_s, night.soft_immobility_s * 4.0);
        assert_eq!(morning.fast_fall_immobility_s, night.fast_fall_immobility_s);
    }

    #[test]
    fn posture_selects_tolerance() {
        let config = RiskConfig::default();
        let upright = thresholds_at(&config, 2, Some(80.0)).unwrap();
        let lying = thresholds_at(&config, 2, Some(10.0)).unwrap();
        assert_eq!(upright.movement_tolerance, config.movement_tolerance_high_angle);
        assert_eq!(lying.movement_tolerance, config.movement_tolerance_low_angle);
        assert!(thresholds_at(&config, 24, None).is_err());
    }
}
