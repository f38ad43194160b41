//! # FallWatch Alerting
//!
//! Turns [`fallwatch_risk::RiskEvent`]s into caregiver notifications and
//! feeds caregiver responses back.
//!
//! ## Flow
//!
//! ```text
//! RiskEvent ─► AlertLifecycleManager ─► mpsc ─► NotificationDispatcher ─┬─► ConsoleChannel
//!                    ▲                                                  └─► JournalChannel
//!                    └── Acknowledgment inbox (ok / false alarm / stop)
//! ```
//!
//! - [`AlertLifecycleManager`]: alert records, reminders, expiry, heartbeat
//! - [`NotificationDispatcher`]: fan-out to [`NotificationChannel`]s
//! - [`JournalChannel`]: rotating JSON-lines journal
//! - [`render_svg`]: anonymized skeleton image
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use fallwatch_alerting::{AckAction, Acknowledgment, AlertConfig, AlertLifecycleManager};
//! use fallwatch_risk::{effective_thresholds, AlertCategory, RiskConfig, RiskEvent};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::unbounded_channel();
//! let manager = AlertLifecycleManager::new(AlertConfig::default(), tx).unwrap();
//!
//! let now = Utc.with_ymd_and_hms(2024, 5, 1, 2, 0, 0).unwrap();
//! let event = RiskEvent {
//!     category: AlertCategory::FallFast,
//!     at: now,
//!     torso_angle: Some(5.0),
//!     still_for_s: 12.0,
//!     thresholds: effective_thresholds(&RiskConfig::default(), &now, Some(5.0)),
//!     snapshot: None,
//! };
//! let id = manager.on_event(&event, now);
//! assert!(rx.try_recv().is_ok());
//!
//! manager
//!     .ack_sender()
//!     .send(Acknowledgment::new(id, AckAction::Ok, now))
//!     .unwrap();
//! let report = manager.poll(now);
//! assert_eq!(report.effects.len(), 1);
//! assert_eq!(manager.pending_count(), 0);
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod feedback;
pub mod journal;
pub mod manager;
pub mod notification;
pub mod record;
pub mod render;

pub use config::{AlertConfig, JournalConfig};
pub use dispatcher::{
    ConsoleChannel, DispatchReport, MemoryChannel, NotificationChannel, NotificationDispatcher,
};
pub use error::{AlertError, AlertResult};
pub use feedback::FeedbackStats;
pub use journal::{JournalChannel, JournalEntry};
pub use manager::{AckEffect, AlertLifecycleManager, PollReport};
pub use notification::{AckAction, Acknowledgment, Notification, NotificationKind};
pub use record::{AckState, AlertId, AlertRecord, Priority};
pub use render::{render_svg, CanvasSize};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
