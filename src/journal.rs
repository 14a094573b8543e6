//! Append-only study journal.
//!
//! One JSON record per line, timestamped, recording box transitions with
//! episode durations plus the transcript and generated reply of each
//! successful pipeline run. This is the durable trail for downstream
//! analysis; nothing in the controller reads it back at runtime.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::{BoxPresence, Transition};

/// Errors that can occur writing or replaying the journal.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A single journal record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub record: JournalRecord,
}

/// The kinds of records the journal holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalRecord {
    /// The box settled into a new state; the previous episode lasted
    /// `episode_secs`.
    BoxTransition {
        to: BoxPresence,
        episode_secs: f64,
    },

    /// What the user said when recording a commitment.
    Transcript { text: String },

    /// The generated check-in that will be synthesized.
    Reply { text: String },
}

/// Append-only JSONL journal.
#[derive(Debug, Clone)]
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Open a journal, creating parent directories as needed.
    pub async fn open(path: PathBuf) -> Result<Self, JournalError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(Self::new(path))
    }

    /// Append one record with the current timestamp.
    pub async fn append(&self, record: JournalRecord) -> Result<(), JournalError> {
        let entry = JournalEntry {
            timestamp: Utc::now(),
            record,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let json = serde_json::to_string(&entry)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Record a committed presence transition.
    pub async fn box_transition(&self, transition: &Transition) -> Result<(), JournalError> {
        self.append(JournalRecord::BoxTransition {
            to: transition.to,
            episode_secs: transition.ended_episode.as_secs_f64(),
        })
        .await
    }

    /// Record a transcript.
    pub async fn transcript(&self, text: &str) -> Result<(), JournalError> {
        self.append(JournalRecord::Transcript {
            text: text.to_string(),
        })
        .await
    }

    /// Record a generated reply.
    pub async fn reply(&self, text: &str) -> Result<(), JournalError> {
        self.append(JournalRecord::Reply {
            text: text.to_string(),
        })
        .await
    }

    /// Read back all entries in append order.
    pub async fn replay(&self) -> Result<Vec<JournalEntry>, JournalError> {
        let mut entries = Vec::new();

        if !self.path.exists() {
            return Ok(entries);
        }

        let file = File::open(&self.path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_and_replay_order() {
        let temp = TempDir::new().unwrap();
        let journal = Journal::new(temp.path().join("study.jsonl"));

        journal
            .box_transition(&Transition {
                to: BoxPresence::Out,
                ended_episode: Duration::from_secs(90),
            })
            .await
            .unwrap();
        journal.transcript("go for a walk").await.unwrap();
        journal.reply("Hey, your phone is still out.").await.unwrap();

        let entries = journal.replay().await.unwrap();
        assert_eq!(entries.len(), 3);

        match &entries[0].record {
            JournalRecord::BoxTransition { to, episode_secs } => {
                assert_eq!(*to, BoxPresence::Out);
                assert!((episode_secs - 90.0).abs() < f64::EPSILON);
            }
            other => panic!("unexpected first record: {:?}", other),
        }

        assert!(matches!(entries[1].record, JournalRecord::Transcript { .. }));
        assert!(matches!(entries[2].record, JournalRecord::Reply { .. }));

        // Timestamps never go backwards within a single journal
        assert!(entries[0].timestamp <= entries[1].timestamp);
        assert!(entries[1].timestamp <= entries[2].timestamp);
    }

    #[tokio::test]
    async fn test_one_record_per_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("study.jsonl");
        let journal = Journal::new(path.clone());

        journal.transcript("tidy the desk").await.unwrap();
        journal.reply("Imagine the clear desk.").await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"kind\":\"transcript\""));
        assert!(lines[1].contains("\"kind\":\"reply\""));
    }
}
