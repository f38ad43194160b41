//! Sudden-drop signature detection over the drop window.
//!
//! The detector is stateless: it compares the oldest and newest qualifying
//! samples of the window it is given. A candidate is a momentary signal; it
//! arms the fast-fall timer but never raises an alert on its own.

use fallwatch_core::KeypointSample;

use crate::posture::TorsoMidpoints;
use crate::thresholds::ThresholdSet;

/// Measurements between the oldest and newest qualifying sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropMeasures {
    /// Downward hip travel (negative when rising).
    pub vertical_drop: f32,
    /// Absolute torso angle change in degrees.
    pub angle_change: f32,
    /// Combined hip + shoulder displacement.
    pub position_change: f32,
    /// Seconds spanned by the compared samples.
    pub span_s: f64,
    /// Number of qualifying samples in the window.
    pub qualifying: usize,
}

/// Which criteria fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DropTriggers {
    pub vertical_drop: bool,
    pub angle_change: bool,
    pub position_change: bool,
}

impl DropTriggers {
    pub fn any(&self) -> bool {
        self.vertical_drop || self.angle_change || self.position_change
    }
}

/// Result of one detector evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorOutcome {
    /// At least one criterion reached its threshold.
    Candidate {
        measures: DropMeasures,
        triggers: DropTriggers,
    },
    /// Enough evidence and nothing fired.
    Quiet { measures: DropMeasures },
    /// Fewer than two qualifying samples in the window.
    Inconclusive { qualifying: usize },
}

impl DetectorOutcome {
    pub fn is_candidate(&self) -> bool {
        matches!(self, DetectorOutcome::Candidate { .. })
    }
}

/// Evaluates a drop window.
///
/// Samples whose torso keypoints fall below `min_confidence` do not qualify
/// and are skipped.
pub fn evaluate<'a, I>(window: I, thresholds: &ThresholdSet, min_confidence: f32) -> DetectorOutcome
where
    I: IntoIterator<Item = &'a KeypointSample>,
{
    let mut first: Option<(&KeypointSample, TorsoMidpoints)> = None;
    let mut last: Option<(&KeypointSample, TorsoMidpoints)> = None;
    let mut qualifying = 0usize;

    for sample in window {
        let Ok(torso) = TorsoMidpoints::from_sample(sample, min_confidence) else {
            continue;
        };
        qualifying += 1;
        if first.is_none() {
            first = Some((sample, torso));
        }
        last = Some((sample, torso));
    }

    let (Some((oldest, start)), Some((newest, end))) = (first, last) else {
        return DetectorOutcome::Inconclusive { qualifying };
    };
    if qualifying < 2 {
        return DetectorOutcome::Inconclusive { qualifying };
    }

    let measures = DropMeasures {
        vertical_drop: start.vertical_drop_to(&end),
        angle_change: (end.torso_angle() - start.torso_angle()).abs(),
        position_change: start.position_change_to(&end),
        span_s: crate::history::elapsed_s(newest.timestamp(), oldest.timestamp()),
        qualifying,
    };
    let triggers = DropTriggers {
        vertical_drop: measures.vertical_drop >= thresholds.drop_threshold,
        angle_change: measures.angle_change >= thresholds.angle_change_threshold,
        position_change: measures.position_change >= thresholds.position_change_threshold,
    };

    if triggers.any() {
        DetectorOutcome::Candidate { measures, triggers }
    } else {
        DetectorOutcome::Quiet { measures }
    }
}
