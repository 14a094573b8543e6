//! Configuration for the nudgebox controller.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (NUDGEBOX_CONFIG, NUDGEBOX_HOME)
//! 2. Config file (YAML)
//! 3. Defaults (~/.nudgebox, original device constants)
//!
//! API keys are not part of the config file; they come from the environment
//! (`OPENAI_API_KEY`, `ELEVENLABS_API_KEY`), optionally via a `.env` file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Complete resolved configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sensor: SensorConfig,
    pub presence: PresenceConfig,
    pub reminder: ReminderConfig,
    pub recording: RecordingConfig,
    pub playback: PlaybackConfig,
    pub speech: SpeechConfig,
    pub button: ButtonConfig,
    pub paths: PathsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            presence: PresenceConfig::default(),
            reminder: ReminderConfig::default(),
            recording: RecordingConfig::default(),
            playback: PlaybackConfig::default(),
            speech: SpeechConfig::default(),
            button: ButtonConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

/// Distance sensing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Command that prints one distance reading (centimeters) to stdout.
    pub command: Vec<String>,

    /// Readings beyond this are classified as "out of box".
    pub threshold_cm: f64,

    /// Hard bound on a single measurement.
    pub sample_timeout_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            command: vec!["nudgebox-range".to_string()],
            threshold_cm: 10.0,
            sample_timeout_ms: 250,
        }
    }
}

impl SensorConfig {
    pub fn sample_timeout(&self) -> Duration {
        Duration::from_millis(self.sample_timeout_ms)
    }
}

/// Presence debouncing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// A raw state must hold this long before it becomes stable.
    pub stability_window_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            stability_window_secs: 2,
        }
    }
}

impl PresenceConfig {
    pub fn stability_window(&self) -> Duration {
        Duration::from_secs(self.stability_window_secs)
    }
}

/// Reminder scheduling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Time out-of-box (with an asset) before the reminder plays.
    pub delay_secs: u64,

    /// Sustained in-box time that cancels the cycle and re-arms the prompt.
    pub cancel_secs: u64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            delay_secs: 10 * 60,
            cancel_secs: 180,
        }
    }
}

impl ReminderConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn cancel(&self) -> Duration {
        Duration::from_secs(self.cancel_secs)
    }
}

/// Commitment recording.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Recordings shorter than this are discarded.
    pub min_secs: u64,

    /// Hard cap; the watchdog force-stops the session at this point.
    pub max_secs: u64,

    /// Substring to look for in `arecord -l` when picking the capture device.
    pub device_hint: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            min_secs: 1,
            max_secs: 20,
            device_hint: "USB PnP Sound Device".to_string(),
        }
    }
}

impl RecordingConfig {
    pub fn min_duration(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }
}

/// Audio playback.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// ALSA output device.
    pub device: String,

    /// Cue played at startup.
    pub start_cue: PathBuf,

    /// Cue played at shutdown.
    pub stop_cue: PathBuf,

    /// One-time prompt at the start of an out-episode.
    pub pickup_prompt: PathBuf,

    /// Short acknowledgement after a recording is accepted.
    pub ack_cue: PathBuf,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device: "plughw:sndrpihifiberry".to_string(),
            start_cue: PathBuf::from("sounds/start.wav"),
            stop_cue: PathBuf::from("sounds/stop.wav"),
            pickup_prompt: PathBuf::from("sounds/pickup.wav"),
            ack_cue: PathBuf::from("sounds/feedback_fast.wav"),
        }
    }
}

/// Transcription / reply / synthesis services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub transcribe_model: String,
    pub chat_model: String,
    pub voice_id: String,
    pub tts_model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            transcribe_model: "whisper-1".to_string(),
            chat_model: "gpt-4".to_string(),
            voice_id: "FTNCalFNG5bRnkkaP5Ug".to_string(),
            tts_model: "eleven_multilingual_v2".to_string(),
        }
    }
}

/// Record button wiring.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    /// GPIO chip name passed to gpiomon.
    pub chip: String,

    /// GPIO line offset of the button.
    pub line: u32,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            chip: "gpiochip0".to_string(),
            line: 22,
        }
    }
}

/// Filesystem layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// State directory; recordings, assets, and the journal live under it.
    pub home: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self { home: None }
    }
}

impl Config {
    /// Load configuration, preferring an explicit path, then
    /// `NUDGEBOX_CONFIG`, then defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(PathBuf::from)
            .or_else(|| std::env::var("NUDGEBOX_CONFIG").ok().map(PathBuf::from));

        match path {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load a config from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// State directory: `NUDGEBOX_HOME`, then config, then `~/.nudgebox`.
    pub fn home(&self) -> Result<PathBuf> {
        if let Ok(env_home) = std::env::var("NUDGEBOX_HOME") {
            return Ok(PathBuf::from(env_home));
        }

        if let Some(ref home) = self.paths.home {
            return Ok(home.clone());
        }

        Ok(dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".nudgebox"))
    }

    /// Where captured recordings land before the pipeline consumes them.
    pub fn recordings_dir(&self) -> Result<PathBuf> {
        Ok(self.home()?.join("recordings"))
    }

    /// Where synthesized reminder assets are written.
    pub fn assets_dir(&self) -> Result<PathBuf> {
        Ok(self.home()?.join("assets"))
    }

    /// Path of the append-only study journal.
    pub fn journal_path(&self) -> Result<PathBuf> {
        Ok(self.home()?.join("study.jsonl"))
    }
}
