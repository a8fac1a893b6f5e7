//! Durable, append-only audit log of feedback events.
//!
//! Independent of the in-memory ledger: nothing reads it back for metrics.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::ledger::Feedback;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line of the feedback log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackLogEntry {
    /// Local time, second precision.
    pub timestamp: String,
    pub user_id: String,
    pub candidate_id: String,
    pub feedback: Feedback,
}

impl FeedbackLogEntry {
    pub fn new(user_id: &str, candidate_id: &str, feedback: Feedback) -> Self {
        Self::at(Local::now(), user_id, candidate_id, feedback)
    }

    pub fn at(
        time: DateTime<Local>,
        user_id: &str,
        candidate_id: &str,
        feedback: Feedback,
    ) -> Self {
        Self {
            timestamp: time.format(TIMESTAMP_FORMAT).to_string(),
            user_id: user_id.to_string(),
            candidate_id: candidate_id.to_string(),
            feedback,
        }
    }
}

/// JSON Lines feedback log. Appends are serialised through a mutex so
/// concurrent events never interleave within a line.
#[derive(Debug)]
pub struct FeedbackLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FeedbackLogError`](crate::RagError::FeedbackLogError)
    /// if the file cannot be opened or written.
    pub async fn append(&self, entry: &FeedbackLogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_has_second_precision() {
        let time = Local.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        let entry = FeedbackLogEntry::at(time, "42", "7", Feedback::Helpful);
        assert_eq!(entry.timestamp, "2026-03-09 14:05:07");
    }

    #[tokio::test]
    async fn appends_one_json_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback.jsonl"));

        log.append(&FeedbackLogEntry::new("u1", "7", Feedback::Helpful)).await.unwrap();
        log.append(&FeedbackLogEntry::new("u2", "9", Feedback::NotHelpful)).await.unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<FeedbackLogEntry> =
            content.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].candidate_id, "9");
        assert_eq!(lines[1].feedback, Feedback::NotHelpful);
    }
}
