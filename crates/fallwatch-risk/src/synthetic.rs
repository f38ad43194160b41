//! Deterministic synthetic pose streams.
//!
//! Each [`Scenario`] renders a single subject as a full COCO-17 skeleton at a
//! fixed frame rate. No randomness is involved; a small index-derived jitter
//! keeps the signal from being perfectly flat.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use fallwatch_core::{CoreError, KeypointSample, KeypointType};

/// Hip midpoint while standing.
const STANDING_HIP: (f32, f32) = (0.5, 0.6);
/// Hip midpoint while lying on the floor.
const FLOOR_HIP: (f32, f32) = (0.45, 0.82);
/// Torso angle while lying.
const LYING_ANGLE: f32 = 5.0;
const TORSO_LENGTH: f32 = 0.3;
const JITTER: f32 = 0.001;

/// Built-in movement patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    /// Standing, sudden collapse to the floor, then motionless.
    HardFall,
    /// Standing, lying down over ten seconds, then motionless.
    SlowLieDown,
    /// Standing motionless.
    UprightStill,
    /// Standing, one vertical jump with a deep landing, then standing.
    UprightJump,
}

impl ScenarioKind {
    pub fn all() -> [ScenarioKind; 4] {
        [
            ScenarioKind::HardFall,
            ScenarioKind::SlowLieDown,
            ScenarioKind::UprightStill,
            ScenarioKind::UprightJump,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::HardFall => "hard-fall",
            ScenarioKind::SlowLieDown => "slow-lie-down",
            ScenarioKind::UprightStill => "upright-still",
            ScenarioKind::UprightJump => "upright-jump",
        }
    }

    /// Length used when none is given.
    pub fn default_duration_s(&self) -> f64 {
        match self {
            ScenarioKind::HardFall => 90.0,
            ScenarioKind::SlowLieDown => 120.0,
            ScenarioKind::UprightStill => 200.0,
            ScenarioKind::UprightJump => 20.0,
        }
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioKind::all()
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| CoreError::validation(format!("unknown scenario '{s}'")))
    }
}

/// Torso placement at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyPose {
    pub hip: (f32, f32),
    pub torso_angle_deg: f32,
}

/// A finite, timestamped pose stream.
#[derive(Debug, Clone)]
pub struct Scenario {
    kind: ScenarioKind,
    start: DateTime<Utc>,
    rate_hz: f64,
    duration_s: f64,
}

impl Scenario {
    /// A scenario at 10 Hz with the kind's default duration.
    pub fn new(kind: ScenarioKind, start: DateTime<Utc>) -> Self {
        Self {
            kind,
            start,
            rate_hz: 10.0,
            duration_s: kind.default_duration_s(),
        }
    }

    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.rate_hz = rate_hz.max(0.1);
        self
    }

    pub fn with_duration(mut self, duration_s: f64) -> Self {
        self.duration_s = duration_s.max(0.0);
        self
    }

    pub fn kind(&self) -> ScenarioKind {
        self.kind
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Number of frames the stream yields.
    pub fn frame_count(&self) -> usize {
        (self.duration_s * self.rate_hz).floor() as usize + 1
    }

    /// Torso placement `t` seconds into the scenario.
    pub fn pose_at(&self, t: f64) -> BodyPose {
        let standing = BodyPose {
            hip: STANDING_HIP,
            torso_angle_deg: 90.0,
        };
        let lying = BodyPose {
            hip: FLOOR_HIP,
            torso_angle_deg: LYING_ANGLE,
        };
        match self.kind {
            ScenarioKind::UprightStill => standing,
            ScenarioKind::HardFall => blend_phases(t, &[(3.0, standing), (3.6, lying)]),
            ScenarioKind::SlowLieDown => blend_phases(t, &[(3.0, standing), (13.0, lying)]),
            ScenarioKind::UprightJump => {
                let at = |y: f32, angle: f32| BodyPose {
                    hip: (STANDING_HIP.0, y),
                    torso_angle_deg: angle,
                };
                blend_phases(
                    t,
                    &[
                        (3.0, standing),
                        (3.2, at(0.65, 80.0)),
                        (3.4, at(0.45, 90.0)),
                        (3.6, at(0.60, 88.0)),
                        (3.8, at(0.78, 70.0)),
                        (4.6, standing),
                    ],
                )
            }
        }
    }

    /// The sample stream, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = KeypointSample> + '_ {
        let step_ms = (1000.0 / self.rate_hz).round() as i64;
        (0..self.frame_count()).map(move |i| {
            let t = (i as i64 * step_ms) as f64 / 1000.0;
            let ts = self.start + Duration::milliseconds(i as i64 * step_ms);
            let jitter = JITTER * ((i as f32) * 12.9898).sin();
            let pose = self.pose_at(t);
            body_sample(
                ts,
                (pose.hip.0 + jitter, pose.hip.1 - jitter),
                pose.torso_angle_deg,
                0.9,
            )
        })
    }
}

/// Linear interpolation through `(time, pose)` keyframes; clamps outside.
fn blend_phases(t: f64, keyframes: &[(f64, BodyPose)]) -> BodyPose {
    let Some(&(first_t, first)) = keyframes.first() else {
        return BodyPose {
            hip: STANDING_HIP,
            torso_angle_deg: 90.0,
        };
    };
    if t <= first_t {
        return first;
    }
    for pair in keyframes.windows(2) {
        let (t0, a) = pair[0];
        let (t1, b) = pair[1];
        if t <= t1 {
            let k = ((t - t0) / (t1 - t0)) as f32;
            return BodyPose {
                hip: (lerp(a.hip.0, b.hip.0, k), lerp(a.hip.1, b.hip.1, k)),
                torso_angle_deg: lerp(a.torso_angle_deg, b.torso_angle_deg, k),
            };
        }
    }
    keyframes.last().map_or(first, |&(_, last)| last)
}

fn lerp(a: f32, b: f32, k: f32) -> f32 {
    a + (b - a) * k
}

/// Renders a full skeleton from a hip midpoint and torso angle.
///
/// The torso points from the hips towards the head; legs extend the other
/// way. Left and right joints are mirrored across the torso axis so the hip
/// and shoulder midpoints are exact.
pub fn body_sample(
    timestamp: DateTime<Utc>,
    hip: (f32, f32),
    torso_angle_deg: f32,
    confidence: f32,
) -> KeypointSample {
    let theta = torso_angle_deg.to_radians();
    // Unit vector from hips to head (image y grows downward).
    let axis = (theta.cos(), -theta.sin());
    let across = (theta.sin(), theta.cos());
    let along = |from: (f32, f32), d: f32| (from.0 + axis.0 * d, from.1 + axis.1 * d);
    let side = |from: (f32, f32), w: f32| {
        (
            (from.0 - across.0 * w, from.1 - across.1 * w),
            (from.0 + across.0 * w, from.1 + across.1 * w),
        )
    };

    let shoulder = along(hip, TORSO_LENGTH);
    let head = along(shoulder, 0.08);
    let elbow = along(shoulder, -0.12);
    let wrist = along(shoulder, -0.22);
    let knee = along(hip, -0.22);
    let ankle = along(hip, -0.42);

    let joints = [
        (KeypointType::LeftShoulder, KeypointType::RightShoulder, side(shoulder, 0.05)),
        (KeypointType::LeftHip, KeypointType::RightHip, side(hip, 0.04)),
        (KeypointType::LeftElbow, KeypointType::RightElbow, side(elbow, 0.07)),
        (KeypointType::LeftWrist, KeypointType::RightWrist, side(wrist, 0.07)),
        (KeypointType::LeftKnee, KeypointType::RightKnee, side(knee, 0.04)),
        (KeypointType::LeftAnkle, KeypointType::RightAnkle, side(ankle, 0.04)),
        (KeypointType::LeftEye, KeypointType::RightEye, side(head, 0.015)),
        (KeypointType::LeftEar, KeypointType::RightEar, side(along(head, -0.01), 0.035)),
    ];

    let mut sample = KeypointSample::new(timestamp).with_point(
        KeypointType::Nose,
        head.0,
        head.1,
        confidence,
    );
    for (left, right, (l, r)) in joints {
        sample = sample
            .with_point(left, l.0, l.1, confidence)
            .with_point(right, r.0, r.1, confidence);
    }
    sample
}
