//! One monitored session: risk engine plus alert lifecycle manager.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use fallwatch_alerting::{
    AckEffect, AlertLifecycleManager, ConsoleChannel, JournalChannel, Notification,
    NotificationDispatcher, PollReport,
};
use fallwatch_core::KeypointSample;
use fallwatch_risk::{
    RiskConfig, RiskEngine, RiskEvent, RiskState, StatusIndicator, TickOutcome, TickReport,
    Transition,
};
use tokio::sync::mpsc;

use crate::settings::AppConfig;

/// Running totals for a session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub samples: u64,
    pub evaluated: u64,
    pub inconclusive: u64,
    pub out_of_order: u64,
    pub paused: u64,
    pub reminders: u64,
    pub transitions: Vec<Transition>,
    pub events: Vec<RiskEvent>,
}

/// Drives a [`RiskEngine`] and forwards its events to the alert manager.
pub struct Monitor {
    engine: RiskEngine,
    manager: Arc<AlertLifecycleManager>,
    stats: SessionStats,
    stop_requested: bool,
}

impl Monitor {
    pub fn new(
        risk: Arc<RiskConfig>,
        manager: Arc<AlertLifecycleManager>,
    ) -> Result<Self> {
        Ok(Self {
            engine: RiskEngine::new(risk)?,
            manager,
            stats: SessionStats::default(),
            stop_requested: false,
        })
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    pub fn manager(&self) -> &Arc<AlertLifecycleManager> {
        &self.manager
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn state(&self) -> RiskState {
        self.engine.state()
    }

    pub fn status(&self) -> StatusIndicator {
        self.engine.status(self.manager.has_pending_critical())
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Evaluates one sample and raises alerts for its events.
    pub fn process(&mut self, sample: KeypointSample) -> TickReport {
        let report = self.engine.tick(sample);
        self.stats.samples += 1;
        match report.outcome {
            TickOutcome::Evaluated => self.stats.evaluated += 1,
            TickOutcome::Inconclusive(_) => self.stats.inconclusive += 1,
            TickOutcome::OutOfOrder => self.stats.out_of_order += 1,
            TickOutcome::Paused => self.stats.paused += 1,
        }
        for event in &report.events {
            self.manager.on_event(event, event.at);
        }
        self.stats.transitions.extend(report.transitions.iter().copied());
        self.stats.events.extend(report.events.iter().cloned());
        report
    }

    /// Applies acknowledgments and runs reminders and the heartbeat.
    pub fn poll(&mut self, now: DateTime<Utc>) -> PollReport {
        let report = self.manager.poll(now);
        self.stats.reminders += u64::from(report.reminders_sent);
        for effect in &report.effects {
            match effect {
                AckEffect::ReturnToIdle { .. } => {
                    if let Some(transition) = self.engine.acknowledge(now) {
                        self.stats.transitions.push(transition);
                    }
                }
                AckEffect::StopRequested { .. } => self.stop_requested = true,
            }
        }
        report
    }

    pub fn set_occupancy(&mut self, occupied: bool, now: DateTime<Utc>) {
        if occupied == self.engine.is_occupied() {
            return;
        }
        if let Some(transition) = self.engine.set_occupancy(occupied, now) {
            self.stats.transitions.push(transition);
        }
    }
}

/// Builds the dispatcher for `config` and returns it with the outbox sender.
pub fn build_dispatcher(
    config: &AppConfig,
    console: bool,
) -> (NotificationDispatcher, mpsc::UnboundedSender<Notification>, mpsc::UnboundedReceiver<Notification>) {
    let mut dispatcher = NotificationDispatcher::new();
    if console {
        dispatcher.add_channel(Box::new(ConsoleChannel));
    }
    if config.journal.enabled {
        dispatcher.add_channel(Box::new(JournalChannel::new(config.journal.clone())));
    }
    let (tx, rx) = mpsc::unbounded_channel();
    (dispatcher, tx, rx)
}
