//! Notification delivery.
//!
//! The dispatcher fans each [`Notification`] out to every registered
//! [`NotificationChannel`]. A failing channel is logged and skipped; the
//! manager's reminder cycle is the retry mechanism.

use std::sync::Arc;

use colored::Colorize;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::error::AlertResult;
use crate::notification::{Notification, NotificationKind};
use crate::record::Priority;

/// Delivery target for notifications
#[async_trait::async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name
    fn name(&self) -> &str;

    /// Deliver one notification
    async fn deliver(&self, notification: &Notification) -> AlertResult<()>;
}

/// Per-notification delivery tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans notifications out to the registered channels.
#[derive(Default)]
pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a delivery channel
    pub fn add_channel(&mut self, channel: Box<dyn NotificationChannel>) {
        self.channels.push(channel);
    }

    pub fn with_channel(mut self, channel: Box<dyn NotificationChannel>) -> Self {
        self.add_channel(channel);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver to every channel.
    pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
        let mut report = DispatchReport::default();
        for channel in &self.channels {
            match channel.deliver(notification).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        alert_id = ?notification.alert_id,
                        kind = %notification.kind,
                        channel = %channel.name(),
                        error = %e,
                        "Channel failed to deliver notification"
                    );
                }
            }
        }
        report
    }

    /// Deliver everything from `rx` until every sender is dropped. Returns
    /// the number of notifications processed.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<Notification>) -> u64 {
        let mut processed = 0;
        while let Some(notification) = rx.recv().await {
            self.dispatch(&notification).await;
            processed += 1;
        }
        tracing::debug!(processed, "Notification outbox closed");
        processed
    }
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("channels", &self.channel_names())
            .finish()
    }
}

/// Terminal output for local monitoring
pub struct ConsoleChannel;

#[async_trait::async_trait]
impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, notification: &Notification) -> AlertResult<()> {
        let rule = "=".repeat(60);
        let title = notification.title();
        let title = match notification.priority {
            Priority::Critical => title.red().bold(),
            Priority::High => title.yellow().bold(),
            Priority::Low => title.blue(),
        };

        println!("\n{} {}", notification.priority.symbol(), title);
        if let Some(id) = notification.alert_id {
            println!("ID: {}", id.to_string().dimmed());
        }
        println!("Priority: {}", notification.priority);
        println!("{rule}");
        println!("{}", notification.summary);
        if notification.kind != NotificationKind::Heartbeat {
            let actions: Vec<_> = notification.actions.iter().map(|a| a.label()).collect();
            println!("Actions: {}", actions.join(" / ").cyan());
            if notification.snapshot_svg.is_some() {
                println!("Snapshot: anonymized skeleton attached");
            }
        }
        println!("{rule}\n");
        Ok(())
    }
}

/// Keeps delivered notifications in memory. Clones share one buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    sent: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.read().clone()
    }

    pub fn len(&self) -> usize {
        self.sent.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.read().is_empty()
    }

    pub fn clear(&self) {
        self.sent.write().clear();
    }
}

#[async_trait::async_trait]
impl NotificationChannel for MemoryChannel {
    fn name(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, notification: &Notification) -> AlertResult<()> {
        self.sent.write().push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AlertError;
    use chrono::Utc;

    struct FailingChannel;

    #[async_trait::async_trait]
    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _notification: &Notification) -> AlertResult<()> {
            Err(AlertError::delivery("failing", "unreachable"))
        }
    }

    #[tokio::test]
    async fn failing_channel_does_not_block_others() {
        let memory = MemoryChannel::new();
        let dispatcher = NotificationDispatcher::new()
            .with_channel(Box::new(FailingChannel))
            .with_channel(Box::new(memory.clone()));

        let report = dispatcher
            .dispatch(&Notification::heartbeat("ok".into(), Utc::now()))
            .await;

        assert_eq!(report, DispatchReport { delivered: 1, failed: 1 });
        assert_eq!(memory.len(), 1);
    }

    #[tokio::test]
    async fn run_drains_until_senders_drop() {
        let memory = MemoryChannel::new();
        let dispatcher = NotificationDispatcher::new().with_channel(Box::new(memory.clone()));
        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..3 {
            tx.send(Notification::heartbeat("ok".into(), Utc::now())).unwrap();
        }
        drop(tx);

        assert_eq!(dispatcher.run(rx).await, 3);
        assert_eq!(memory.notifications().len(), 3);
    }

    #[tokio::test]
    async fn console_channel_accepts_every_kind() {
        let n = Notification::heartbeat("System running normally".into(), Utc::now());
        assert!(ConsoleChannel.deliver(&n).await.is_ok());
        assert_eq!(
            NotificationDispatcher::new()
                .with_channel(Box::new(ConsoleChannel))
                .channel_names(),
            ["console"]
        );
    }
}
