//! Core data types shared across the controller.
//!
//! Small value types: presence classification, captured recordings, and the
//! single-slot reminder asset the pipeline publishes and the scheduler
//! consumes.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Debounced classification of whether the phone is inside the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxPresence {
    /// Phone is in the box.
    In,

    /// Phone has been taken out.
    Out,
}

impl BoxPresence {
    /// Classify a raw distance reading against the threshold.
    ///
    /// Anything beyond the threshold means the phone is no longer sitting
    /// over the sensor, i.e. `Out`.
    pub fn classify(distance_cm: f64, threshold_cm: f64) -> Self {
        if distance_cm > threshold_cm {
            Self::Out
        } else {
            Self::In
        }
    }
}

impl std::fmt::Display for BoxPresence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::In => write!(f, "in"),
            Self::Out => write!(f, "out"),
        }
    }
}

/// A single ranging measurement.
#[derive(Debug, Clone, Copy)]
pub struct DistanceSample {
    pub taken_at: DateTime<Utc>,
    pub distance_cm: f64,
}

impl DistanceSample {
    pub fn now(distance_cm: f64) -> Self {
        Self {
            taken_at: Utc::now(),
            distance_cm,
        }
    }
}

/// A committed presence change emitted by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// The newly stable presence.
    pub to: BoxPresence,

    /// How long the just-ended episode lasted.
    pub ended_episode: Duration,
}

/// A captured commitment recording, ready for the pipeline.
#[derive(Debug, Clone)]
pub struct Recording {
    /// Session that produced this recording.
    pub session_id: Uuid,

    /// Path to the WAV artifact on disk.
    pub path: PathBuf,

    /// Measured capture duration.
    pub duration: Duration,
}

/// The latest synthesized reminder, produced by one pipeline run.
///
/// Single-slot: a newer asset supersedes the older one. An asset is never
/// dropped for age, only replaced.
#[derive(Debug, Clone)]
pub struct ReminderAsset {
    /// What the user said.
    pub transcript: String,

    /// The generated check-in text.
    pub reply_text: String,

    /// Path to the synthesized audio.
    pub audio_path: PathBuf,

    /// When the pipeline published this asset.
    pub created_at: DateTime<Utc>,
}

/// Shared cell holding the most recent [`ReminderAsset`].
///
/// The pipeline publishes into it, the control loop reads from it. Writes
/// replace the previous asset wholesale, so readers never observe a
/// half-built asset.
#[derive(Debug, Clone, Default)]
pub struct AssetSlot {
    inner: Arc<RwLock<Option<ReminderAsset>>>,
}

impl AssetSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current asset with a newly produced one.
    pub fn publish(&self, asset: ReminderAsset) {
        let mut slot = self.inner.write().expect("asset slot poisoned");
        *slot = Some(asset);
    }

    /// Clone of the current asset, if any.
    pub fn latest(&self) -> Option<ReminderAsset> {
        self.inner.read().expect("asset slot poisoned").clone()
    }

    /// Whether any asset has been published yet.
    pub fn is_ready(&self) -> bool {
        self.inner.read().expect("asset slot poisoned").is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_against_threshold() {
        assert_eq!(BoxPresence::classify(15.0, 10.0), BoxPresence::Out);
        assert_eq!(BoxPresence::classify(8.0, 10.0), BoxPresence::In);
        // On-threshold reads as present
        assert_eq!(BoxPresence::classify(10.0, 10.0), BoxPresence::In);
        // Sentinel value from a failed measurement reads as present
        assert_eq!(BoxPresence::classify(0.0, 10.0), BoxPresence::In);
    }

    #[test]
    fn test_asset_slot_supersedes() {
        let slot = AssetSlot::new();
        assert!(!slot.is_ready());

        let asset = |text: &str| ReminderAsset {
            transcript: "do the dishes".to_string(),
            reply_text: text.to_string(),
            audio_path: PathBuf::from("/tmp/reply.pcm"),
            created_at: Utc::now(),
        };

        slot.publish(asset("first"));
        slot.publish(asset("second"));

        let latest = slot.latest().unwrap();
        assert_eq!(latest.reply_text, "second");
        assert!(slot.is_ready());
    }
}
