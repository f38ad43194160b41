//! Alert lifecycle management.
//!
//! [`AlertLifecycleManager`] is the only component that creates outbound
//! notifications or accepts acknowledgments. Notifications leave through an
//! unbounded channel drained by a [`crate::NotificationDispatcher`] task;
//! acknowledgments arrive through the manager's own inbox and are applied on
//! the next [`AlertLifecycleManager::poll`].

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use fallwatch_risk::{ConfigError, RiskEvent};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::config::AlertConfig;
use crate::error::{AlertError, AlertResult};
use crate::feedback::FeedbackStats;
use crate::notification::{AckAction, Acknowledgment, Notification};
use crate::record::{AckState, AlertId, AlertRecord, Priority};
use crate::render::{render_svg, CanvasSize};

/// What the caller must do after an acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckEffect {
    /// Return the risk state machine to `IDLE`.
    ReturnToIdle { alert_id: AlertId, outcome: AckState },
    /// Shut monitoring down.
    StopRequested { alert_id: AlertId },
}

/// Everything one [`AlertLifecycleManager::poll`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    pub effects: Vec<AckEffect>,
    pub reminders_sent: u32,
    pub expired: Vec<AlertId>,
    pub heartbeat_sent: bool,
}

impl PollReport {
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
            && self.reminders_sent == 0
            && self.expired.is_empty()
            && !self.heartbeat_sent
    }

    pub fn stop_requested(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, AckEffect::StopRequested { .. }))
    }
}

/// Owns alert records, reminders, acknowledgments and the heartbeat.
pub struct AlertLifecycleManager {
    config: AlertConfig,
    offset: FixedOffset,
    canvas: CanvasSize,
    pending: RwLock<HashMap<AlertId, AlertRecord>>,
    history: RwLock<VecDeque<AlertRecord>>,
    feedback: RwLock<FeedbackStats>,
    last_heartbeat: RwLock<Option<NaiveDate>>,
    outbox: mpsc::UnboundedSender<Notification>,
    inbox_tx: mpsc::UnboundedSender<Acknowledgment>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<Acknowledgment>>,
}

impl AlertLifecycleManager {
    /// Validates `config`; notifications are sent into `outbox`.
    pub fn new(config: AlertConfig, outbox: mpsc::UnboundedSender<Notification>) -> AlertResult<Self> {
        config.validate()?;
        let offset = config.local_offset().ok_or_else(|| {
            ConfigError::invalid_value("utc_offset_minutes", "offset out of range")
        })?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            offset,
            canvas: CanvasSize::default(),
            pending: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            feedback: RwLock::new(FeedbackStats::default()),
            last_heartbeat: RwLock::new(None),
            outbox,
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
        })
    }

    pub fn with_canvas(mut self, canvas: CanvasSize) -> Self {
        self.canvas = canvas;
        self
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Sender for caregiver responses; safe to clone into any task.
    pub fn ack_sender(&self) -> mpsc::UnboundedSender<Acknowledgment> {
        self.inbox_tx.clone()
    }

    /// Responses offered on every alert notification.
    pub fn actions(&self) -> Vec<AckAction> {
        let mut actions = vec![AckAction::Ok, AckAction::FalseAlarm];
        if self.config.include_stop_action {
            actions.push(AckAction::Stop);
        }
        actions
    }

    /// Creates an alert for `event`, or folds it into the pending one.
    pub fn on_event(&self, event: &RiskEvent, now: DateTime<Utc>) -> AlertId {
        let (id, notification) = {
            let mut pending = self.pending.write();
            let current = pending
                .values_mut()
                .max_by_key(|r| *r.created_at());
            match current {
                Some(record) => {
                    let previous = record.category();
                    let escalated = record.update(event.clone(), now);
                    tracing::info!(
                        alert_id = %record.id(),
                        from = %previous,
                        category = %record.category(),
                        escalated,
                        "Pending alert updated"
                    );
                    (record.id(), self.alert_notification(record, now))
                }
                None => {
                    let record = AlertRecord::new(event.clone(), now);
                    tracing::info!(
                        alert_id = %record.id(),
                        category = %record.category(),
                        priority = ?record.priority(),
                        "Alert raised"
                    );
                    let id = record.id();
                    let notification = self.alert_notification(&record, now);
                    pending.insert(id, record);
                    (id, notification)
                }
            }
        };
        self.send(notification);
        id
    }

    /// Applies one caregiver response.
    ///
    /// "Stop" must name an alert this manager issued, pending or retired;
    /// it leaves the record untouched.
    pub fn on_acknowledgment(&self, ack: &Acknowledgment) -> AlertResult<AckEffect> {
        let Some(outcome) = ack.action.outcome() else {
            if !self.pending.read().contains_key(&ack.alert_id)
                && self.find_retired(&ack.alert_id).is_none()
            {
                let err = AlertError::UnknownAlert { id: ack.alert_id };
                tracing::warn!(alert_id = %ack.alert_id, error = %err, "Stop request rejected");
                return Err(err);
            }
            tracing::info!(alert_id = %ack.alert_id, "Stop requested by caregiver");
            return Ok(AckEffect::StopRequested {
                alert_id: ack.alert_id,
            });
        };

        let mut pending = self.pending.write();
        let Some(mut record) = pending.remove(&ack.alert_id) else {
            let err = match self.find_retired(&ack.alert_id) {
                Some(record) => AlertError::AlreadyResolved {
                    id: ack.alert_id,
                    state: record.state(),
                },
                None => AlertError::UnknownAlert { id: ack.alert_id },
            };
            tracing::warn!(alert_id = %ack.alert_id, error = %err, "Acknowledgment rejected");
            return Err(err);
        };

        record.acknowledge(outcome, ack.at)?;
        tracing::info!(
            alert_id = %ack.alert_id,
            outcome = %outcome,
            repeats = record.repeat_count(),
            "Alert acknowledged"
        );
        self.feedback.write().record(outcome);
        self.retire(record);
        Ok(AckEffect::ReturnToIdle {
            alert_id: ack.alert_id,
            outcome,
        })
    }

    /// Drains the inbox, sends due reminders, expires exhausted alerts and
    /// emits the heartbeat when its hour comes round.
    pub fn poll(&self, now: DateTime<Utc>) -> PollReport {
        let mut report = PollReport::default();

        for ack in self.drain_inbox() {
            if let Ok(effect) = self.on_acknowledgment(&ack) {
                report.effects.push(effect);
            }
        }

        let mut outgoing = Vec::new();
        {
            let mut pending = self.pending.write();
            let due: Vec<AlertId> = pending
                .values()
                .filter(|r| r.reminder_due(now, &self.config))
                .map(|r| r.id())
                .collect();
            for id in due {
                let exhausted = pending
                    .get(&id)
                    .is_some_and(|r| r.reminders_exhausted(&self.config));
                if exhausted {
                    if let Some(mut record) = pending.remove(&id) {
                        record.expire(now);
                        tracing::warn!(
                            alert_id = %id,
                            category = %record.category(),
                            repeats = record.repeat_count(),
                            "Alert expired without acknowledgment"
                        );
                        self.feedback.write().record(AckState::Expired);
                        self.retire(record);
                        report.expired.push(id);
                    }
                } else if let Some(record) = pending.get_mut(&id) {
                    record.mark_reminded(now);
                    tracing::info!(
                        alert_id = %id,
                        repeat = record.repeat_count(),
                        "Sending reminder"
                    );
                    outgoing.push(Notification::reminder(record, self.actions(), now));
                    report.reminders_sent += 1;
                }
            }
        }
        for notification in outgoing {
            self.send(notification);
        }

        if let Some(heartbeat) = self.heartbeat_due(now) {
            self.send(heartbeat);
            report.heartbeat_sent = true;
        }
        report
    }

    /// Snapshot of the pending records, oldest first.
    pub fn pending(&self) -> Vec<AlertRecord> {
        let mut records: Vec<_> = self.pending.read().values().cloned().collect();
        records.sort_by_key(|r| *r.created_at());
        records
    }

    pub fn pending_count(&self) -> usize {
        self.pending.read().len()
    }

    /// `true` while an emergency-priority alert awaits a response.
    pub fn has_pending_critical(&self) -> bool {
        self.pending
            .read()
            .values()
            .any(|r| r.priority() == Priority::Critical)
    }

    /// Looks a record up among pending and retired alerts.
    pub fn get(&self, id: &AlertId) -> Option<AlertRecord> {
        self.pending
            .read()
            .get(id)
            .cloned()
            .or_else(|| self.find_retired(id))
    }

    /// Retired records, oldest first.
    pub fn history(&self) -> Vec<AlertRecord> {
        self.history.read().iter().cloned().collect()
    }

    pub fn feedback(&self) -> FeedbackStats {
        *self.feedback.read()
    }

    fn drain_inbox(&self) -> Vec<Acknowledgment> {
        let mut rx = self.inbox_rx.lock();
        let mut acks = Vec::new();
        while let Ok(ack) = rx.try_recv() {
            acks.push(ack);
        }
        acks
    }

    fn alert_notification(&self, record: &AlertRecord, now: DateTime<Utc>) -> Notification {
        let snapshot_svg = if self.config.attach_snapshot {
            record
                .event()
                .snapshot
                .as_ref()
                .and_then(|s| render_svg(s, self.canvas))
        } else {
            None
        };
        Notification::alert(record, self.actions(), snapshot_svg, now)
    }

    fn heartbeat_due(&self, now: DateTime<Utc>) -> Option<Notification> {
        if !self.config.heartbeat_enabled {
            return None;
        }
        let local = now.with_timezone(&self.offset);
        if local.hour() != self.config.heartbeat_hour {
            return None;
        }
        let today = local.date_naive();
        {
            let mut last = self.last_heartbeat.write();
            if *last == Some(today) {
                return None;
            }
            *last = Some(today);
        }

        let stats = self.feedback();
        let summary = format!(
            "System running normally. Acknowledged OK: {}, false alarms: {}, expired: {}, pending: {}",
            stats.acked_ok,
            stats.acked_false_alarm,
            stats.expired,
            self.pending_count()
        );
        tracing::info!(date = %today, "Sending heartbeat");
        Some(Notification::heartbeat(summary, now))
    }

    fn retire(&self, record: AlertRecord) {
        let mut history = self.history.write();
        history.push_back(record);
        while history.len() > self.config.history_limit {
            history.pop_front();
        }
    }

    fn find_retired(&self, id: &AlertId) -> Option<AlertRecord> {
        self.history
            .read()
            .iter()
            .rev()
            .find(|r| r.id() == *id)
            .cloned()
    }

    fn send(&self, notification: Notification) {
        let kind = notification.kind;
        let alert_id = notification.alert_id;
        if self.outbox.send(notification).is_err() {
            tracing::warn!(
                kind = %kind,
                alert_id = ?alert_id,
                "Notification outbox closed; relying on reminders"
            );
        }
    }
}

impl std::fmt::Debug for AlertLifecycleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertLifecycleManager")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .field("feedback", &self.feedback())
            .finish()
    }
}
