//! Notification history
//!
//! Every announced notification is appended as a JSON line to
//! `<state dir>/jenkins-deck/notifications.log`.

use crate::config::{schema::Config, ConfigManager};
use crate::monitor::Notification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// One history line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub notification: Notification,
}

/// Append-only notification log
#[derive(Debug, Clone)]
pub struct NotificationHistory {
    enabled: bool,
    path: PathBuf,
}

impl NotificationHistory {
    pub fn new(config: &Config) -> Self {
        Self::with_path(ConfigManager::history_path(), config.general.history)
    }

    pub fn with_path(path: PathBuf, enabled: bool) -> Self {
        Self { enabled, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a notification.
    ///
    /// IO failures are logged and dropped; the history never interrupts detection.
    pub async fn record(&self, notification: &Notification) {
        if !self.enabled {
            return;
        }

        let entry = HistoryEntry {
            timestamp: Utc::now(),
            notification: notification.clone(),
        };

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize notification: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write notification history: {}", e);
        }
    }

    /// Most recent `limit` entries, oldest first; unreadable lines are skipped
    pub async fn recent(&self, limit: usize) -> std::io::Result<Vec<HistoryEntry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let entries: Vec<HistoryEntry> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.into_iter().skip(skip).collect())
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
