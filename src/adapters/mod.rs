//! Collaborator interfaces for hardware and network services.
//!
//! Each external dependency of the controller is a narrow trait so the
//! production adapters (subprocess and HTTP) can be swapped for
//! deterministic doubles in tests.

pub mod alsa;
pub mod button;
pub mod elevenlabs;
pub mod openai;
pub mod sensor;
pub mod systemd;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

pub use alsa::{AplayPlayer, ArecordCapture};
pub use button::{ButtonEvent, GpiomonButtons};
pub use elevenlabs::ElevenLabsSynthesizer;
pub use openai::{OpenAiReplyGenerator, OpenAiTranscriber};
pub use sensor::{RangingSensor, SensorError};
pub use systemd::SdNotifier;

/// Errors from starting or stopping an audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to start capture: {0}")]
    Start(#[source] anyhow::Error),

    #[error("failed to stop capture: {0}")]
    Stop(#[source] anyhow::Error),
}

/// Ranging sensor: one distance measurement on demand.
#[async_trait]
pub trait DistanceSensor: Send + Sync {
    /// Measure the distance to whatever sits over the sensor, in cm.
    async fn sample(&self) -> Result<f64, SensorError>;
}

/// Microphone capture via an OS recording utility.
///
/// Produces mono 16 kHz 16-bit PCM WAV files.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Handle to a running capture session.
    type Handle: Send;

    /// Begin capturing to `path`. The capture self-terminates after
    /// `max_duration` even if never stopped.
    async fn start(&self, path: &Path, max_duration: Duration)
        -> Result<Self::Handle, CaptureError>;

    /// Stop a running capture and wait for the file to be finalized.
    async fn stop(&self, handle: Self::Handle) -> Result<(), CaptureError>;
}

/// Speaker playback, fixed device and format.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play an audio file to completion.
    async fn play(&self, path: &Path) -> Result<()>;
}

/// Speech-to-text service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a recorded audio file.
    async fn transcribe(&self, audio_path: &Path) -> Result<String>;
}

/// Chat-completion service producing the reminder text.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply to `user_text` under a fixed system instruction.
    async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String>;
}

/// Text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` and stream the audio into `out_path`.
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()>;
}

/// Supervisor liveness signalling.
///
/// Implementations must never fail the caller; delivery problems are
/// logged and swallowed.
pub trait LivenessNotifier: Send + Sync {
    /// One-time startup signal.
    fn ready(&self);

    /// Periodic heartbeat, once per control-loop tick.
    fn heartbeat(&self);
}
