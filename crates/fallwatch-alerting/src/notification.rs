//! Outbound notifications and inbound acknowledgments.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use fallwatch_risk::AlertCategory;
use serde::{Deserialize, Serialize};

use crate::record::{AckState, AlertId, AlertRecord, Priority};

/// A response a caregiver can choose on a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckAction {
    /// "I'm OK"
    Ok,
    /// "False Alarm"
    FalseAlarm,
    /// Stop monitoring
    Stop,
}

impl AckAction {
    pub fn label(&self) -> &'static str {
        match self {
            AckAction::Ok => "OK",
            AckAction::FalseAlarm => "False Alarm",
            AckAction::Stop => "Stop",
        }
    }

    /// Record state this action resolves to; `None` for [`AckAction::Stop`].
    pub fn outcome(&self) -> Option<AckState> {
        match self {
            AckAction::Ok => Some(AckState::AckedOk),
            AckAction::FalseAlarm => Some(AckState::AckedFalseAlarm),
            AckAction::Stop => None,
        }
    }
}

impl fmt::Display for AckAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AckAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ok" | "ack_ok" => Ok(AckAction::Ok),
            "false" | "false_alarm" | "false-alarm" | "ack_false" => Ok(AckAction::FalseAlarm),
            "stop" | "stop_app" => Ok(AckAction::Stop),
            other => Err(format!("unknown action '{other}' (expected ok, false or stop)")),
        }
    }
}

/// A caregiver response, delivered into the manager's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub alert_id: AlertId,
    pub action: AckAction,
    pub at: DateTime<Utc>,
}

impl Acknowledgment {
    pub fn new(alert_id: AlertId, action: AckAction, at: DateTime<Utc>) -> Self {
        Self {
            alert_id,
            action,
            at,
        }
    }
}

/// Why a notification was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// First delivery of an alert, or an escalation of a pending one.
    Alert,
    /// Re-send of an unacknowledged alert.
    Reminder,
    /// Daily liveness message.
    Heartbeat,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Alert => "alert",
            NotificationKind::Reminder => "reminder",
            NotificationKind::Heartbeat => "heartbeat",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message handed to the notification channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    /// `None` for heartbeats.
    pub alert_id: Option<AlertId>,
    pub category: Option<AlertCategory>,
    pub priority: Priority,
    pub summary: String,
    /// Reminder number, `0` for the first delivery.
    pub repeat: u32,
    /// Anonymized skeleton as an SVG document.
    pub snapshot_svg: Option<String>,
    /// Responses offered to the caregiver.
    pub actions: Vec<AckAction>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// First delivery or escalation of `record`.
    pub fn alert(
        record: &AlertRecord,
        actions: Vec<AckAction>,
        snapshot_svg: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: NotificationKind::Alert,
            alert_id: Some(record.id()),
            category: Some(record.category()),
            priority: record.priority(),
            summary: record.event().summary(),
            repeat: 0,
            snapshot_svg,
            actions,
            created_at: now,
        }
    }

    /// Reminder for a still-pending `record`.
    pub fn reminder(record: &AlertRecord, actions: Vec<AckAction>, now: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::Reminder,
            alert_id: Some(record.id()),
            category: Some(record.category()),
            priority: record.priority(),
            summary: format!(
                "Reminder {}: {} has not been acknowledged. {}",
                record.repeat_count(),
                record.category(),
                record.event().summary()
            ),
            repeat: record.repeat_count(),
            snapshot_svg: None,
            actions,
            created_at: now,
        }
    }

    pub fn heartbeat(summary: String, now: DateTime<Utc>) -> Self {
        Self {
            kind: NotificationKind::Heartbeat,
            alert_id: None,
            category: None,
            priority: Priority::Low,
            summary,
            repeat: 0,
            snapshot_svg: None,
            actions: Vec::new(),
            created_at: now,
        }
    }

    pub fn title(&self) -> String {
        match (self.kind, self.category) {
            (NotificationKind::Heartbeat, _) => "FallWatch heartbeat".to_string(),
            (kind, Some(category)) => format!("FallWatch {kind}: {category}"),
            (kind, None) => format!("FallWatch {kind}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_from_button_names() {
        assert_eq!("ok".parse::<AckAction>().unwrap(), AckAction::Ok);
        assert_eq!("ACK_FALSE".parse::<AckAction>().unwrap(), AckAction::FalseAlarm);
        assert_eq!(" stop ".parse::<AckAction>().unwrap(), AckAction::Stop);
        assert!("maybe".parse::<AckAction>().is_err());
    }

    #[test]
    fn stop_has_no_record_outcome() {
        assert_eq!(AckAction::Ok.outcome(), Some(AckState::AckedOk));
        assert_eq!(AckAction::FalseAlarm.outcome(), Some(AckState::AckedFalseAlarm));
        assert_eq!(AckAction::Stop.outcome(), None);
    }

    #[test]
    fn heartbeat_has_no_alert() {
        let n = Notification::heartbeat("all good".into(), Utc::now());
        assert!(n.alert_id.is_none());
        assert!(n.actions.is_empty());
        assert_eq!(n.priority, Priority::Low);
        assert_eq!(n.title(), "FallWatch heartbeat");
    }
}
