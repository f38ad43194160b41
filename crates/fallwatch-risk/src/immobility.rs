//! Immobility timers.
//!
//! The tracker owns the two timestamps the state machine reasons about:
//! when movement last rose above the adaptive tolerance, and when the
//! fast-fall timer was armed. Nothing else writes them.
//!
//! Movement evidence per tick:
//!
//! - the pair movement between the two newest samples, and
//! - the mean displacement of the samples in the immobility window relative
//!   to the newest sample.
//!
//! Either one above tolerance counts as motion. The armed fast-fall timer is
//! judged only on evidence gathered since it was armed, so the fall itself
//! does not dismiss its own candidate.

use chrono::{DateTime, Duration, Utc};
use fallwatch_core::KeypointSample;
use tracing::debug;

use crate::history::{elapsed_s, MotionHistory};
use crate::posture::TorsoMidpoints;
use crate::thresholds::ThresholdSet;

/// Movement measurements for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementEvidence {
    /// Movement between the two newest samples.
    pub latest_pair: Option<f32>,
    /// Mean displacement over the immobility window.
    pub window_mean: Option<f32>,
    /// Mean displacement over the samples since arming.
    pub since_armed_mean: Option<f32>,
}

/// What the tracker concluded on one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImmobilityReading {
    pub evidence: MovementEvidence,
    /// `None` when no movement measure was available.
    pub moving: Option<bool>,
    /// Seconds since movement last exceeded tolerance.
    pub still_for_s: f64,
    /// Armed candidate held still for the fast-fall duration.
    pub fast_fall_confirmed: bool,
    /// Armed candidate cancelled by renewed movement.
    pub candidate_dismissed: bool,
    /// Arming time of the fast-fall timer after this tick.
    pub armed_at: Option<DateTime<Utc>>,
}

/// Stateful stillness timers for one session.
#[derive(Debug, Clone)]
pub struct ImmobilityTracker {
    last_motion_above_tolerance_at: DateTime<Utc>,
    fall_candidate_armed_at: Option<DateTime<Utc>>,
}

impl ImmobilityTracker {
    /// Starts a tracker that considers `now` the last moment of motion.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_motion_above_tolerance_at: now,
            fall_candidate_armed_at: None,
        }
    }

    pub fn last_motion_above_tolerance_at(&self) -> DateTime<Utc> {
        self.last_motion_above_tolerance_at
    }

    pub fn fall_candidate_armed_at(&self) -> Option<DateTime<Utc>> {
        self.fall_candidate_armed_at
    }

    /// Seconds since movement last exceeded tolerance.
    pub fn still_for_s(&self, now: DateTime<Utc>) -> f64 {
        elapsed_s(now, self.last_motion_above_tolerance_at)
    }

    /// Forgets all evidence; `now` becomes the last moment of motion.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.last_motion_above_tolerance_at = now;
        self.fall_candidate_armed_at = None;
    }

    /// Records motion without measuring it.
    pub fn mark_motion(&mut self, now: DateTime<Utc>) {
        self.last_motion_above_tolerance_at = now;
    }

    /// Disarms the fast-fall timer.
    pub fn disarm(&mut self) {
        self.fall_candidate_armed_at = None;
    }

    /// Moves both timers forward so that `by` does not count as stillness.
    pub fn shift(&mut self, by: Duration) {
        let shifted = |at: DateTime<Utc>| at.checked_add_signed(by).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.last_motion_above_tolerance_at = shifted(self.last_motion_above_tolerance_at);
        self.fall_candidate_armed_at = self.fall_candidate_armed_at.map(shifted);
    }

    /// Updates the timers for the newest sample in `history`.
    ///
    /// `arm` is set when the drop detector fired this tick while the torso
    /// was low; it (re)starts the fast-fall timer at `now`.
    pub fn update(
        &mut self,
        now: DateTime<Utc>,
        history: &MotionHistory,
        thresholds: &ThresholdSet,
        min_confidence: f32,
        arm: bool,
    ) -> ImmobilityReading {
        if arm {
            self.fall_candidate_armed_at = Some(now);
        }

        let evidence = self.measure(now, history, thresholds, min_confidence);
        let tolerance = thresholds.movement_tolerance;
        let above = |m: Option<f32>| m.is_some_and(|v| v > tolerance);

        let moving = if evidence.latest_pair.is_none() && evidence.window_mean.is_none() {
            None
        } else {
            Some(above(evidence.latest_pair) || above(evidence.window_mean))
        };
        if moving == Some(true) {
            self.last_motion_above_tolerance_at = now;
        }

        let mut candidate_dismissed = false;
        let mut fast_fall_confirmed = false;
        if let (Some(armed_at), false) = (self.fall_candidate_armed_at, arm) {
            if above(evidence.latest_pair) || above(evidence.since_armed_mean) {
                debug!(armed_at = %armed_at, "fall candidate dismissed by movement");
                self.fall_candidate_armed_at = None;
                candidate_dismissed = true;
            } else if evidence.since_armed_mean.is_some()
                && elapsed_s(now, armed_at) >= thresholds.fast_fall_immobility_s
            {
                self.fall_candidate_armed_at = None;
                fast_fall_confirmed = true;
            }
        }

        ImmobilityReading {
            evidence,
            moving,
            still_for_s: self.still_for_s(now),
            fast_fall_confirmed,
            candidate_dismissed,
            armed_at: self.fall_candidate_armed_at,
        }
    }

    fn measure(
        &self,
        now: DateTime<Utc>,
        history: &MotionHistory,
        thresholds: &ThresholdSet,
        min_confidence: f32,
    ) -> MovementEvidence {
        let Some(latest) = history
            .latest()
            .and_then(|s| TorsoMidpoints::from_sample(s, min_confidence).ok())
        else {
            return MovementEvidence::default();
        };

        let latest_pair = history
            .previous()
            .and_then(|s| TorsoMidpoints::from_sample(s, min_confidence).ok())
            .map(|prev| prev.movement_to(&latest));

        let window_mean = mean_displacement(
            history.window(thresholds.immobile_window_s, now),
            &latest,
            min_confidence,
        );
        let since_armed_mean = self.fall_candidate_armed_at.and_then(|armed_at| {
            mean_displacement(history.since(armed_at), &latest, min_confidence)
        });

        MovementEvidence {
            latest_pair,
            window_mean,
            since_armed_mean,
        }
    }
}

/// Mean displacement of `samples` relative to `reference`. `None` unless at
/// least two qualifying samples (the reference included) are present.
fn mean_displacement<'a, I>(samples: I, reference: &TorsoMidpoints, min_confidence: f32) -> Option<f32>
where
    I: IntoIterator<Item = &'a KeypointSample>,
{
    let (sum, count) = samples
        .into_iter()
        .filter_map(|s| TorsoMidpoints::from_sample(s, min_confidence).ok())
        .fold((0.0_f32, 0_u32), |(sum, n), torso| (sum + torso.movement_to(reference), n + 1));
    (count >= 2).then(|| sum / count as f32)
}
