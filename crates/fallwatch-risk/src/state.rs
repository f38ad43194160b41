//! Risk state machine.
//!
//! `IDLE → FALL_CANDIDATE → HARD_ALERT → COOLDOWN → IDLE`, with the immobility
//! path `IDLE → SOFT_ALERT → HARD_ALERT` alongside. At most one transition
//! happens per tick. Every entry into `SOFT_ALERT` or `HARD_ALERT` emits one
//! event unless its category is still cooling down, in which case the entry
//! is logged and nothing is queued.
//!
//! Only `HARD_ALERT` passes through the `COOLDOWN` state, on the first still
//! tick after it is entered. `SOFT_ALERT` stays put so that it can still
//! escalate to `HARD_ALERT`; it leaves only on escalation, renewed movement,
//! an acknowledgment or a session reset. Re-raising a soft alert is
//! suppressed by the per-category cooldown instead, which starts when the
//! soft event is emitted and lasts `cooldown_s`.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::events::AlertCategory;
use crate::history::{elapsed_s, seconds};
use crate::immobility::ImmobilityReading;
use crate::thresholds::ThresholdSet;

/// Decision state of one monitored session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskState {
    #[default]
    Idle,
    FallCandidate,
    SoftAlert,
    HardAlert,
    Cooldown,
}

impl RiskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskState::Idle => "IDLE",
            RiskState::FallCandidate => "FALL_CANDIDATE",
            RiskState::SoftAlert => "SOFT_ALERT",
            RiskState::HardAlert => "HARD_ALERT",
            RiskState::Cooldown => "COOLDOWN",
        }
    }

    /// `true` in `SOFT_ALERT` and `HARD_ALERT`.
    pub fn is_alerting(&self) -> bool {
        matches!(self, RiskState::SoftAlert | RiskState::HardAlert)
    }
}

impl fmt::Display for RiskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    DropDetected,
    FastFallConfirmed,
    CandidateDismissed,
    SoftImmobility,
    HardImmobility,
    MovementResumed,
    Acknowledged,
    CooldownStarted,
    CooldownExpired,
    SessionReset,
}

impl TransitionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionReason::DropDetected => "drop_detected",
            TransitionReason::FastFallConfirmed => "fast_fall_confirmed",
            TransitionReason::CandidateDismissed => "candidate_dismissed",
            TransitionReason::SoftImmobility => "soft_immobility",
            TransitionReason::HardImmobility => "hard_immobility",
            TransitionReason::MovementResumed => "movement_resumed",
            TransitionReason::Acknowledged => "acknowledged",
            TransitionReason::CooldownStarted => "cooldown_started",
            TransitionReason::CooldownExpired => "cooldown_expired",
            TransitionReason::SessionReset => "session_reset",
        }
    }
}

impl fmt::Display for TransitionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded state change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: RiskState,
    pub to: RiskState,
    pub at: DateTime<Utc>,
    pub reason: TransitionReason,
}

/// Per-tick facts the machine decides on.
#[derive(Debug, Clone, Copy)]
pub struct MachineInput<'a> {
    pub now: DateTime<Utc>,
    /// The drop detector fired while the torso was below the angle threshold.
    pub low_posture_drop: bool,
    pub reading: &'a ImmobilityReading,
    pub thresholds: &'a ThresholdSet,
}

/// Result of one [`RiskStateMachine::step`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutcome {
    pub transition: Option<Transition>,
    /// Category to report as a new event.
    pub emitted: Option<AlertCategory>,
    /// Category whose entry was silenced by its cooldown.
    pub suppressed: Option<AlertCategory>,
}

/// Owns the [`RiskState`] of one session and the per-category cooldowns.
#[derive(Debug, Clone)]
pub struct RiskStateMachine {
    state: RiskState,
    cooldown_s: f64,
    cooldown_until: Option<DateTime<Utc>>,
    last_emitted: HashMap<AlertCategory, DateTime<Utc>>,
}

impl RiskStateMachine {
    /// Creates a machine in `IDLE`.
    pub fn new(cooldown_s: f64) -> Self {
        Self {
            state: RiskState::Idle,
            cooldown_s,
            cooldown_until: None,
            last_emitted: HashMap::new(),
        }
    }

    pub fn state(&self) -> RiskState {
        self.state
    }

    /// End of the current `COOLDOWN`, if any.
    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    /// Last emission time of `category`.
    pub fn last_emitted(&self, category: AlertCategory) -> Option<DateTime<Utc>> {
        self.last_emitted.get(&category).copied()
    }

    /// Returns `true` if `category` is still inside its cooldown at `now`.
    pub fn is_cooling_down(&self, category: AlertCategory, now: DateTime<Utc>) -> bool {
        self.last_emitted(category)
            .is_some_and(|at| now >= at && elapsed_s(now, at) < self.cooldown_s)
    }

    /// Advances the machine by one conclusive tick.
    pub fn step(&mut self, input: MachineInput<'_>) -> StepOutcome {
        let now = input.now;
        let reading = input.reading;
        let thresholds = input.thresholds;
        let moving = reading.moving == Some(true);

        match self.state {
            RiskState::Idle => {
                if input.low_posture_drop {
                    self.move_to(RiskState::FallCandidate, now, TransitionReason::DropDetected)
                } else if reading.still_for_s >= thresholds.soft_immobility_s {
                    self.raise(
                        RiskState::SoftAlert,
                        AlertCategory::ImmobilitySoft,
                        now,
                        TransitionReason::SoftImmobility,
                    )
                } else {
                    StepOutcome::default()
                }
            }
            RiskState::FallCandidate => {
                if reading.fast_fall_confirmed {
                    self.raise(
                        RiskState::HardAlert,
                        AlertCategory::FallFast,
                        now,
                        TransitionReason::FastFallConfirmed,
                    )
                } else if reading.candidate_dismissed {
                    self.move_to(RiskState::Idle, now, TransitionReason::CandidateDismissed)
                } else if reading.still_for_s >= thresholds.soft_immobility_s {
                    self.raise(
                        RiskState::SoftAlert,
                        AlertCategory::ImmobilitySoft,
                        now,
                        TransitionReason::SoftImmobility,
                    )
                } else {
                    StepOutcome::default()
                }
            }
            RiskState::SoftAlert => {
                if moving {
                    self.move_to(RiskState::Idle, now, TransitionReason::MovementResumed)
                } else if reading.fast_fall_confirmed {
                    self.raise(
                        RiskState::HardAlert,
                        AlertCategory::FallFast,
                        now,
                        TransitionReason::FastFallConfirmed,
                    )
                } else if reading.still_for_s >= thresholds.hard_immobility_s {
                    self.raise(
                        RiskState::HardAlert,
                        AlertCategory::ImmobilityHard,
                        now,
                        TransitionReason::HardImmobility,
                    )
                } else {
                    StepOutcome::default()
                }
            }
            RiskState::HardAlert => {
                if moving {
                    self.move_to(RiskState::Idle, now, TransitionReason::MovementResumed)
                } else {
                    let until = now
                        .checked_add_signed(seconds(self.cooldown_s))
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    self.cooldown_until = Some(until);
                    self.move_to(RiskState::Cooldown, now, TransitionReason::CooldownStarted)
                }
            }
            RiskState::Cooldown => {
                let expired = self.cooldown_until.map_or(true, |until| now >= until);
                if expired {
                    self.cooldown_until = None;
                    self.move_to(RiskState::Idle, now, TransitionReason::CooldownExpired)
                } else if input.low_posture_drop {
                    self.cooldown_until = None;
                    self.move_to(RiskState::FallCandidate, now, TransitionReason::DropDetected)
                } else {
                    StepOutcome::default()
                }
            }
        }
    }

    /// Applies an "I'm OK" or "False alarm" acknowledgment.
    pub fn acknowledge(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        if self.state == RiskState::Idle {
            return None;
        }
        self.cooldown_until = None;
        self.move_to(RiskState::Idle, now, TransitionReason::Acknowledged)
            .transition
    }

    /// Returns to `IDLE` after a session reset. Cooldowns survive.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Transition> {
        self.cooldown_until = None;
        if self.state == RiskState::Idle {
            return None;
        }
        self.move_to(RiskState::Idle, now, TransitionReason::SessionReset)
            .transition
    }

    fn raise(
        &mut self,
        to: RiskState,
        category: AlertCategory,
        now: DateTime<Utc>,
        reason: TransitionReason,
    ) -> StepOutcome {
        let mut outcome = self.move_to(to, now, reason);
        if self.is_cooling_down(category, now) {
            warn!(category = %category, state = %to, "alert suppressed by cooldown");
            outcome.suppressed = Some(category);
        } else {
            self.last_emitted.insert(category, now);
            outcome.emitted = Some(category);
        }
        outcome
    }

    fn move_to(&mut self, to: RiskState, now: DateTime<Utc>, reason: TransitionReason) -> StepOutcome {
        let from = self.state;
        self.state = to;
        info!(from = %from, to = %to, reason = ?reason, "risk state transition");
        StepOutcome {
            transition: Some(Transition {
                from,
                to,
                at: now,
                reason,
            }),
            ..StepOutcome::default()
        }
    }
}
