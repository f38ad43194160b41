//! Append-only JSON-lines alert journal.
//!
//! One line per notification with structural fields only: no summary text and
//! no snapshot. The active file rotates to `<path>.1`, `<path>.2`, ... once it
//! grows past the configured size.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fallwatch_risk::AlertCategory;
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::config::JournalConfig;
use crate::dispatcher::NotificationChannel;
use crate::error::AlertResult;
use crate::notification::{Notification, NotificationKind};
use crate::record::{AlertId, Priority};

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub kind: NotificationKind,
    pub alert_id: Option<AlertId>,
    pub category: Option<AlertCategory>,
    pub priority: Priority,
    pub repeat: u32,
    pub snapshot_attached: bool,
}

impl From<&Notification> for JournalEntry {
    fn from(n: &Notification) -> Self {
        Self {
            at: n.created_at,
            kind: n.kind,
            alert_id: n.alert_id,
            category: n.category,
            priority: n.priority,
            repeat: n.repeat,
            snapshot_attached: n.snapshot_svg.is_some(),
        }
    }
}

/// `<path>.<index>`
pub fn rotated_path(path: &Path, index: u32) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(format!(".{index}"));
    PathBuf::from(name)
}

/// Journal writer usable as a notification channel.
#[derive(Debug)]
pub struct JournalChannel {
    config: JournalConfig,
    write_lock: Mutex<()>,
}

impl JournalChannel {
    pub fn new(config: JournalConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Appends one entry and rotates when the size limit is exceeded.
    pub async fn append(&self, entry: &JournalEntry) -> AlertResult<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let size = {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.config.path)
                .await?;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
            file.metadata().await?.len()
        };

        if let Some(limit) = self.config.rotate_bytes() {
            if size > limit {
                self.rotate().await?;
            }
        }
        Ok(())
    }

    async fn rotate(&self) -> AlertResult<()> {
        let path = &self.config.path;
        let backups = self.config.keep.saturating_sub(1);
        tracing::debug!(path = %path.display(), backups, "Rotating alert journal");

        if backups == 0 {
            remove_if_exists(path).await?;
            return Ok(());
        }
        remove_if_exists(&rotated_path(path, backups)).await?;
        for index in (1..backups).rev() {
            rename_if_exists(&rotated_path(path, index), &rotated_path(path, index + 1)).await?;
        }
        fs::rename(path, rotated_path(path, 1)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl NotificationChannel for JournalChannel {
    fn name(&self) -> &str {
        "journal"
    }

    async fn deliver(&self, notification: &Notification) -> AlertResult<()> {
        self.append(&JournalEntry::from(notification)).await
    }
}

async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

async fn rename_if_exists(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rotated_path_appends_index() {
        assert_eq!(
            rotated_path(Path::new("/var/log/alerts.jsonl"), 2),
            PathBuf::from("/var/log/alerts.jsonl.2")
        );
    }

    #[tokio::test]
    async fn entries_are_json_lines_without_text() {
        let dir = tempdir().unwrap();
        let journal = JournalChannel::new(JournalConfig {
            path: dir.path().join("alerts.jsonl"),
            ..JournalConfig::default()
        });
        let n = Notification::heartbeat("private text".into(), Utc::now());
        journal.deliver(&n).await.unwrap();
        journal.deliver(&n).await.unwrap();

        let content = std::fs::read_to_string(journal.path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(!content.contains("private text"));
        let entry: JournalEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(entry.kind, NotificationKind::Heartbeat);
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let journal = JournalChannel::new(JournalConfig {
            path: dir.path().join("nested/logs/alerts.jsonl"),
            ..JournalConfig::default()
        });
        journal
            .deliver(&Notification::heartbeat("ok".into(), Utc::now()))
            .await
            .unwrap();
        assert!(journal.path().exists());
    }
}
