//! Alert records and their acknowledgment state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fallwatch_risk::history::elapsed_s;
use fallwatch_risk::{AlertCategory, RiskEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AlertConfig;
use crate::error::{AlertError, AlertResult};

/// Unique identifier for an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(Uuid);

impl AlertId {
    /// Create a new random alert ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlertId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Alert priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Emergency, immediate response
    Critical = 1,
    /// Check-in requested
    High = 2,
    /// Informational
    Low = 4,
}

impl Priority {
    pub fn from_category(category: AlertCategory) -> Self {
        match category {
            AlertCategory::FallFast | AlertCategory::ImmobilityHard => Priority::Critical,
            AlertCategory::ImmobilitySoft => Priority::High,
        }
    }

    /// Get numeric value (lower = higher priority)
    pub fn value(&self) -> u8 {
        *self as u8
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Priority::Critical => "!!",
            Priority::High => "!",
            Priority::Low => "i",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Critical => write!(f, "CRITICAL"),
            Priority::High => write!(f, "HIGH"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// Acknowledgment state of an [`AlertRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckState {
    /// Waiting for a response
    Pending,
    /// Caregiver confirmed the subject is fine
    AckedOk,
    /// Caregiver marked the alert as a false alarm
    AckedFalseAlarm,
    /// Reminders exhausted without a response
    Expired,
}

impl AckState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckState::Pending => "pending",
            AckState::AckedOk => "acked_ok",
            AckState::AckedFalseAlarm => "acked_false_alarm",
            AckState::Expired => "expired",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, AckState::Pending)
    }
}

impl fmt::Display for AckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raised alert, from first notification to retirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    id: AlertId,
    category: AlertCategory,
    priority: Priority,
    created_at: DateTime<Utc>,
    state: AckState,
    repeat_count: u32,
    last_sent_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
    event: RiskEvent,
}

impl AlertRecord {
    /// A pending record whose first notification goes out at `now`.
    pub fn new(event: RiskEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: AlertId::new(),
            category: event.category,
            priority: Priority::from_category(event.category),
            created_at: now,
            state: AckState::Pending,
            repeat_count: 0,
            last_sent_at: now,
            resolved_at: None,
            event,
        }
    }

    pub fn id(&self) -> AlertId {
        self.id
    }

    pub fn category(&self) -> AlertCategory {
        self.category
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn state(&self) -> AckState {
        self.state
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn last_sent_at(&self) -> &DateTime<Utc> {
        &self.last_sent_at
    }

    pub fn resolved_at(&self) -> Option<&DateTime<Utc>> {
        self.resolved_at.as_ref()
    }

    /// Most recent event folded into this record.
    pub fn event(&self) -> &RiskEvent {
        &self.event
    }

    pub fn is_pending(&self) -> bool {
        self.state == AckState::Pending
    }

    /// Folds a newer event into a pending record.
    ///
    /// The category follows the new event unless that would lower the
    /// priority. The reminder cycle restarts. Returns `true` when the
    /// priority rose.
    pub fn update(&mut self, event: RiskEvent, now: DateTime<Utc>) -> bool {
        let priority = Priority::from_category(event.category);
        let escalated = priority < self.priority;
        if priority <= self.priority {
            self.category = event.category;
            self.priority = priority;
        }
        self.event = event;
        self.repeat_count = 0;
        self.last_sent_at = now;
        escalated
    }

    /// `true` when another reminder or expiry is due at `now`.
    pub fn reminder_due(&self, now: DateTime<Utc>, config: &AlertConfig) -> bool {
        self.is_pending()
            && config.reminders_enabled()
            && elapsed_s(now, self.last_sent_at) >= config.repeat_unacked_after_s
    }

    /// `true` once every allowed reminder has been sent.
    pub fn reminders_exhausted(&self, config: &AlertConfig) -> bool {
        self.repeat_count >= config.max_repeats
    }

    pub fn mark_reminded(&mut self, now: DateTime<Utc>) {
        self.repeat_count += 1;
        self.last_sent_at = now;
    }

    /// Resolves a pending record with a caregiver response.
    pub fn acknowledge(&mut self, outcome: AckState, now: DateTime<Utc>) -> AlertResult<()> {
        if self.state.is_final() {
            return Err(AlertError::AlreadyResolved {
                id: self.id,
                state: self.state,
            });
        }
        self.state = outcome;
        self.resolved_at = Some(now);
        Ok(())
    }

    pub fn expire(&mut self, now: DateTime<Utc>) {
        if self.is_pending() {
            self.state = AckState::Expired;
            self.resolved_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use fallwatch_risk::RiskConfig;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap()
    }

    fn event(category: AlertCategory) -> RiskEvent {
        RiskEvent {
            category,
            at: now(),
            torso_angle: Some(8.0),
            still_for_s: 30.0,
            thresholds: fallwatch_risk::effective_thresholds(&RiskConfig::default(), &now(), None),
            snapshot: None,
        }
    }

    #[test]
    fn priority_follows_category() {
        assert_eq!(Priority::from_category(AlertCategory::FallFast), Priority::Critical);
        assert_eq!(Priority::from_category(AlertCategory::ImmobilityHard), Priority::Critical);
        assert_eq!(Priority::from_category(AlertCategory::ImmobilitySoft), Priority::High);
        assert!(Priority::Critical < Priority::Low);
    }

    #[test]
    fn update_escalates_but_never_downgrades() {
        let mut record = AlertRecord::new(event(AlertCategory::ImmobilitySoft), now());
        record.mark_reminded(now() + Duration::seconds(120));

        assert!(record.update(event(AlertCategory::ImmobilityHard), now() + Duration::seconds(130)));
        assert_eq!(record.category(), AlertCategory::ImmobilityHard);
        assert_eq!(record.repeat_count(), 0);

        assert!(!record.update(event(AlertCategory::ImmobilitySoft), now() + Duration::seconds(140)));
        assert_eq!(record.category(), AlertCategory::ImmobilityHard);
        assert_eq!(record.event().category, AlertCategory::ImmobilitySoft);
    }

    #[test]
    fn reminder_due_after_interval() {
        let config = AlertConfig::default();
        let record = AlertRecord::new(event(AlertCategory::FallFast), now());
        assert!(!record.reminder_due(now() + Duration::seconds(119), &config));
        assert!(record.reminder_due(now() + Duration::seconds(120), &config));

        let disabled = AlertConfig {
            repeat_unacked_after_s: 0.0,
            ..AlertConfig::default()
        };
        assert!(!record.reminder_due(now() + Duration::hours(5), &disabled));
    }

    #[test]
    fn acknowledge_once() {
        let mut record = AlertRecord::new(event(AlertCategory::FallFast), now());
        record.acknowledge(AckState::AckedFalseAlarm, now()).unwrap();
        assert_eq!(record.state(), AckState::AckedFalseAlarm);
        assert!(record.resolved_at().is_some());

        let err = record.acknowledge(AckState::AckedOk, now()).unwrap_err();
        assert!(matches!(
            err,
            AlertError::AlreadyResolved { state: AckState::AckedFalseAlarm, .. }
        ));
    }

    #[test]
    fn alert_id_parses_from_display() {
        let id = AlertId::new();
        assert_eq!(id.to_string().parse::<AlertId>().unwrap(), id);
        assert!("not-a-uuid".parse::<AlertId>().is_err());
    }
}
