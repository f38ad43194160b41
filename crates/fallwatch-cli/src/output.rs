//! Terminal rendering shared by the commands.

use chrono::{DateTime, Utc};
use colored::{ColoredString, Colorize};
use fallwatch_alerting::FeedbackStats;
use fallwatch_risk::{RiskEvent, RiskState, StatusIndicator, Transition};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::session::SessionStats;

// ============================================================================
// Display Structs for Tables
// ============================================================================

/// Transition display row
#[derive(Tabled, Serialize)]
pub struct TransitionRow {
    #[tabled(rename = "At")]
    pub at: String,
    #[tabled(rename = "From")]
    pub from: String,
    #[tabled(rename = "To")]
    pub to: String,
    #[tabled(rename = "Reason")]
    pub reason: String,
}

impl TransitionRow {
    pub fn new(transition: &Transition, origin: Option<DateTime<Utc>>) -> Self {
        Self {
            at: format_at(transition.at, origin),
            from: transition.from.to_string(),
            to: transition.to.to_string(),
            reason: transition.reason.to_string(),
        }
    }
}

/// Event display row
#[derive(Tabled, Serialize)]
pub struct EventRow {
    #[tabled(rename = "At")]
    pub at: String,
    #[tabled(rename = "Category")]
    pub category: String,
    #[tabled(rename = "Torso")]
    pub torso: String,
    #[tabled(rename = "Still (s)")]
    pub still_for_s: String,
    #[tabled(rename = "Shower")]
    pub shower: String,
}

impl EventRow {
    pub fn new(event: &RiskEvent, origin: Option<DateTime<Utc>>) -> Self {
        Self {
            at: format_at(event.at, origin),
            category: event.category.to_string(),
            torso: event
                .torso_angle
                .map_or_else(|| "-".to_string(), |a| format!("{a:.0}°")),
            still_for_s: format!("{:.1}", event.still_for_s),
            shower: if event.thresholds.shower_active { "yes" } else { "no" }.to_string(),
        }
    }
}

/// Key/value display row
#[derive(Tabled, Serialize)]
pub struct MetricRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl MetricRow {
    pub fn new(metric: &str, value: impl ToString) -> Self {
        Self {
            metric: metric.to_string(),
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Formatting
// ============================================================================

/// Seconds since `origin` when given, otherwise wall-clock time.
pub fn format_at(at: DateTime<Utc>, origin: Option<DateTime<Utc>>) -> String {
    match origin {
        Some(origin) => format!("+{:.1}s", (at - origin).num_milliseconds() as f64 / 1000.0),
        None => at.format("%H:%M:%S%.3f").to_string(),
    }
}

pub fn color_state(state: RiskState) -> ColoredString {
    let label = state.as_str();
    match state {
        RiskState::Idle => label.green(),
        RiskState::FallCandidate => label.yellow(),
        RiskState::SoftAlert => label.yellow().bold(),
        RiskState::HardAlert => label.red().bold(),
        RiskState::Cooldown => label.blue(),
    }
}

pub fn color_status(status: StatusIndicator) -> ColoredString {
    let label = status.to_string();
    match status {
        StatusIndicator::Inactive => label.dimmed(),
        StatusIndicator::Monitoring => label.green(),
        StatusIndicator::SoftAlert => label.yellow().bold(),
        StatusIndicator::Emergency => label.red().bold(),
    }
}

pub fn print_transition(transition: &Transition, origin: Option<DateTime<Utc>>) {
    println!(
        "{} {} {} -> {} ({})",
        "[FallWatch]".bright_cyan().bold(),
        format_at(transition.at, origin).dimmed(),
        color_state(transition.from),
        color_state(transition.to),
        transition.reason
    );
}

pub fn table<T: Tabled>(rows: impl IntoIterator<Item = T>) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn summary_rows(
    stats: &SessionStats,
    state: RiskState,
    pending: usize,
    feedback: FeedbackStats,
) -> Vec<MetricRow> {
    let ratio = feedback
        .false_positive_ratio()
        .map_or_else(|| "-".to_string(), |r| format!("{:.0}%", r * 100.0));
    vec![
        MetricRow::new("Samples", stats.samples),
        MetricRow::new("Evaluated", stats.evaluated),
        MetricRow::new("Inconclusive", stats.inconclusive),
        MetricRow::new("Out of order", stats.out_of_order),
        MetricRow::new("Paused", stats.paused),
        MetricRow::new("Transitions", stats.transitions.len()),
        MetricRow::new("Events", stats.events.len()),
        MetricRow::new("Reminders", stats.reminders),
        MetricRow::new("Final state", state),
        MetricRow::new("Pending alerts", pending),
        MetricRow::new("Acknowledged OK", feedback.acked_ok),
        MetricRow::new("False alarms", feedback.acked_false_alarm),
        MetricRow::new("False-positive ratio", ratio),
    ]
}
