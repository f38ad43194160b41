//! # FallWatch Risk Engine
//!
//! Real-time fall and prolonged-immobility decisions for a single subject,
//! driven by a stream of [`KeypointSample`]s from an external pose backend.
//!
//! ## Pipeline
//!
//! ```text
//! KeypointSample ─► MotionHistory ─┬─► posture (torso angle, movement)
//!                                  ├─► detector (sudden drop)
//!                                  └─► ImmobilityTracker (stillness timers)
//!                                              │
//!                     effective_thresholds ──► RiskStateMachine ─► RiskEvent
//! ```
//!
//! - [`MotionHistory`]: bounded, time-ordered sample buffer
//! - [`posture`]: stateless torso geometry
//! - [`detector`]: sudden-drop signature over the drop window
//! - [`thresholds`]: posture- and time-of-day-aware threshold adaptation
//! - [`ImmobilityTracker`]: stillness and fast-fall timers
//! - [`RiskStateMachine`]: `IDLE` / `FALL_CANDIDATE` / `SOFT_ALERT` /
//!   `HARD_ALERT` / `COOLDOWN`
//! - [`RiskEngine`]: per-session composition, one [`RiskEngine::tick`] per sample
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::{TimeZone, Utc};
//! use fallwatch_risk::synthetic::{Scenario, ScenarioKind};
//! use fallwatch_risk::{AlertCategory, RiskConfig, RiskEngine};
//!
//! let mut engine = RiskEngine::new(Arc::new(RiskConfig::default())).unwrap();
//! let start = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
//!
//! let events: Vec<_> = Scenario::new(ScenarioKind::HardFall, start)
//!     .samples()
//!     .flat_map(|sample| engine.tick(sample).events)
//!     .collect();
//!
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].category, AlertCategory::FallFast);
//! ```

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod detector;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod immobility;
pub mod posture;
pub mod state;
pub mod status;
pub mod synthetic;
pub mod thresholds;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{OccupancyPolicy, RiskConfig};
pub use detector::{DetectorOutcome, DropMeasures, DropTriggers};
pub use engine::{InconclusiveReason, RiskEngine, TickOutcome, TickReport};
pub use error::{ConfigError, PostureError, RiskError, RiskResult};
pub use events::{AlertCategory, RiskEvent, SkeletonPoint, SkeletonSnapshot};
pub use history::MotionHistory;
pub use immobility::{ImmobilityReading, ImmobilityTracker, MovementEvidence};
pub use posture::{movement, torso_angle, PostureSnapshot, TorsoMidpoints};
pub use state::{RiskState, RiskStateMachine, StepOutcome, Transition, TransitionReason};
pub use status::StatusIndicator;
pub use thresholds::{effective_thresholds, ThresholdSet};

pub use fallwatch_core::{KeypointSample, KeypointType};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
