//! Per-session risk engine.
//!
//! [`RiskEngine`] wires the motion buffer, posture analysis, drop detector,
//! threshold adapter, immobility tracker and state machine together. It is
//! driven by [`RiskEngine::tick`], once per incoming sample, and performs no
//! I/O. Engines share nothing but their read-only [`RiskConfig`].

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use fallwatch_core::KeypointSample;
use tracing::{debug, info, trace, warn};

use crate::config::{OccupancyPolicy, RiskConfig};
use crate::detector::{self, DetectorOutcome};
use crate::error::{ConfigError, PostureError, RiskResult};
use crate::events::{RiskEvent, SkeletonSnapshot};
use crate::history::{elapsed_s, seconds, MotionHistory};
use crate::immobility::{ImmobilityReading, ImmobilityTracker};
use crate::posture::{PostureSnapshot, TorsoMidpoints};
use crate::state::{MachineInput, RiskState, RiskStateMachine, Transition, TransitionReason};
use crate::status::StatusIndicator;
use crate::thresholds::{effective_thresholds, ThresholdSet};

/// Why a tick produced no new evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InconclusiveReason {
    /// Torso keypoints of the newest sample were too weak.
    InsufficientKeypoints(PostureError),
    /// Not enough usable samples to measure movement or a drop.
    InsufficientHistory,
}

/// How a tick was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The sample was evaluated and the state machine stepped.
    Evaluated,
    /// The sample was stored but carried no usable evidence; state held.
    Inconclusive(InconclusiveReason),
    /// The sample was not newer than the previous one and was dropped.
    OutOfOrder,
    /// The occupancy gate is closed; the sample was ignored.
    Paused,
}

/// Everything the engine derived from one sample.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub outcome: TickOutcome,
    /// State after the tick.
    pub state: RiskState,
    pub posture: Option<PostureSnapshot>,
    pub thresholds: Option<ThresholdSet>,
    pub detector: Option<DetectorOutcome>,
    pub reading: Option<ImmobilityReading>,
    /// Transitions applied during the tick, in order.
    pub transitions: Vec<Transition>,
    pub events: Vec<RiskEvent>,
}

impl TickReport {
    fn new(at: DateTime<Utc>, outcome: TickOutcome, state: RiskState) -> Self {
        Self {
            at,
            outcome,
            state,
            posture: None,
            thresholds: None,
            detector: None,
            reading: None,
            transitions: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Decision core for one monitored subject.
#[derive(Debug)]
pub struct RiskEngine {
    config: Arc<RiskConfig>,
    offset: FixedOffset,
    history: MotionHistory,
    tracker: ImmobilityTracker,
    machine: RiskStateMachine,
    /// Timers restart from the next accepted sample.
    restart_pending: bool,
    last_usable_at: Option<DateTime<Utc>>,
    occupied: bool,
    vacated_at: Option<DateTime<Utc>>,
}

impl RiskEngine {
    /// Builds an engine after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RiskError::Config`] if the configuration is invalid.
    pub fn new(config: Arc<RiskConfig>) -> RiskResult<Self> {
        config.validate()?;
        let offset = config
            .local_offset()
            .ok_or_else(|| ConfigError::invalid_value("utc_offset_minutes", "out of range"))?;
        Ok(Self {
            offset,
            history: MotionHistory::new(config.max_lookback_s()),
            tracker: ImmobilityTracker::new(DateTime::<Utc>::MIN_UTC),
            machine: RiskStateMachine::new(config.cooldown_s),
            restart_pending: true,
            last_usable_at: None,
            occupied: true,
            vacated_at: None,
            config,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn state(&self) -> RiskState {
        self.machine.state()
    }

    pub fn history(&self) -> &MotionHistory {
        &self.history
    }

    pub fn tracker(&self) -> &ImmobilityTracker {
        &self.tracker
    }

    pub fn machine(&self) -> &RiskStateMachine {
        &self.machine
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Indicator projection; `hard_alert_pending` comes from the alert manager.
    pub fn status(&self, hard_alert_pending: bool) -> StatusIndicator {
        StatusIndicator::project(self.state(), self.occupied, hard_alert_pending)
    }

    /// Thresholds in force at `now` for a given torso angle.
    pub fn thresholds_at(&self, now: DateTime<Utc>, torso_angle: Option<f32>) -> ThresholdSet {
        effective_thresholds(&self.config, &now.with_timezone(&self.offset), torso_angle)
    }

    /// Evaluates one sample.
    pub fn tick(&mut self, sample: KeypointSample) -> TickReport {
        let now = sample.timestamp();

        if !self.occupied {
            trace!(at = %now, "sample ignored while unoccupied");
            return TickReport::new(now, TickOutcome::Paused, self.state());
        }

        let mut transitions = Vec::new();
        if let Some(last) = self.history.last_timestamp() {
            if now <= last {
                warn!(at = %now, last = %last, "dropping out-of-order sample");
                return TickReport::new(now, TickOutcome::OutOfOrder, self.state());
            }
            let gap_s = elapsed_s(now, last);
            let absent_s = self.last_usable_at.map(|t| elapsed_s(now, t));
            if self.config.absence_reset_s > 0.0
                && absent_s.is_some_and(|s| s >= self.config.absence_reset_s)
            {
                info!(absent_s = absent_s.unwrap_or_default(), "subject absent, resetting session");
                transitions.extend(self.reset(now));
            } else if gap_s > self.config.max_tick_gap_s {
                let excluded_s = gap_s - self.config.max_tick_gap_s;
                warn!(gap_s, excluded_s, "sample gap exceeds limit; excess excluded from timers");
                self.tracker.shift(seconds(excluded_s));
            }
        }

        if let Err(err) = self.history.append(sample) {
            warn!(error = %err, "sample rejected by history");
            return TickReport::new(now, TickOutcome::OutOfOrder, self.state());
        }
        if self.restart_pending {
            self.tracker.reset(now);
            self.restart_pending = false;
        }

        let latest = match self
            .history
            .latest()
            .map(|s| TorsoMidpoints::from_sample(s, self.config.min_keypoint_confidence))
        {
            Some(Ok(torso)) => torso,
            Some(Err(err)) => {
                debug!(at = %now, error = %err, "tick inconclusive");
                let mut report = TickReport::new(
                    now,
                    TickOutcome::Inconclusive(InconclusiveReason::InsufficientKeypoints(err)),
                    self.state(),
                );
                report.transitions = transitions;
                return report;
            }
            None => {
                let mut report = TickReport::new(
                    now,
                    TickOutcome::Inconclusive(InconclusiveReason::InsufficientHistory),
                    self.state(),
                );
                report.transitions = transitions;
                return report;
            }
        };
        self.last_usable_at = Some(now);

        let torso_angle = latest.torso_angle();
        let thresholds = self.thresholds_at(now, Some(torso_angle));
        let min_confidence = self.config.min_keypoint_confidence;

        let detector = detector::evaluate(
            self.history.window(thresholds.drop_window_s, now),
            &thresholds,
            min_confidence,
        );
        let low_posture = torso_angle < thresholds.angle_threshold_deg;
        let low_posture_drop = detector.is_candidate() && low_posture;

        if self.config.immobility_requires_low_posture && !low_posture {
            self.tracker.mark_motion(now);
        }
        let reading = self
            .tracker
            .update(now, &self.history, &thresholds, min_confidence, low_posture_drop);

        let posture = PostureSnapshot {
            torso_angle,
            movement: reading.evidence.latest_pair,
        };

        let mut report = TickReport::new(now, TickOutcome::Evaluated, self.state());
        report.posture = Some(posture);
        report.thresholds = Some(thresholds);
        report.detector = Some(detector);
        report.reading = Some(reading);
        report.transitions = transitions;

        let detector_inconclusive = matches!(detector, DetectorOutcome::Inconclusive { .. });
        if reading.moving.is_none() && detector_inconclusive {
            debug!(at = %now, "tick inconclusive: insufficient history");
            report.outcome = TickOutcome::Inconclusive(InconclusiveReason::InsufficientHistory);
            return report;
        }

        let step = self.machine.step(MachineInput {
            now,
            low_posture_drop,
            reading: &reading,
            thresholds: &thresholds,
        });

        if let Some(transition) = step.transition {
            match transition.reason {
                TransitionReason::MovementResumed => self.tracker.disarm(),
                TransitionReason::CooldownExpired => self.tracker.reset(now),
                _ => {}
            }
            report.transitions.push(transition);
        }

        if let Some(category) = step.emitted {
            let event = RiskEvent {
                category,
                at: now,
                torso_angle: Some(torso_angle),
                still_for_s: reading.still_for_s,
                thresholds,
                snapshot: self.history.latest().map(SkeletonSnapshot::from_sample),
            };
            info!(
                category = %category,
                still_for_s = reading.still_for_s,
                torso_angle,
                "risk event emitted"
            );
            report.events.push(event);
        }

        report.state = self.state();
        report
    }

    /// Applies an "I'm OK" / "False alarm" acknowledgment: back to `IDLE`
    /// with stillness measured from `now`.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        self.tracker.reset(now);
        self.machine.acknowledge(now)
    }

    /// Clears the buffer and returns to `IDLE`. Cooldowns and any pending
    /// alert records are left alone.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        self.history.clear();
        self.tracker.reset(now);
        self.restart_pending = true;
        self.last_usable_at = None;
        self.machine.reset(now)
    }

    /// Opens or closes the occupancy gate.
    pub fn set_occupancy(&mut self, occupied: bool, now: DateTime<Utc>) -> Option<Transition> {
        if occupied == self.occupied {
            return None;
        }
        self.occupied = occupied;
        info!(occupied, policy = ?self.config.occupancy_policy, "occupancy changed");

        match (occupied, self.config.occupancy_policy) {
            (false, OccupancyPolicy::Reset) => self.reset(now),
            (false, OccupancyPolicy::Freeze) => {
                self.vacated_at = Some(now);
                None
            }
            (true, OccupancyPolicy::Freeze) => {
                if let Some(vacated_at) = self.vacated_at.take() {
                    self.tracker.shift(seconds(elapsed_s(now, vacated_at)));
                }
                self.history.clear();
                self.last_usable_at = None;
                None
            }
            (true, OccupancyPolicy::Reset) => None,
        }
    }
}
