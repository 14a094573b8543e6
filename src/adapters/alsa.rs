//! ALSA capture and playback via arecord / aplay subprocesses.
//!
//! Capture is mono 16 kHz 16-bit WAV. The capture device is discovered by
//! scanning `arecord -l` for a configured name hint, falling back to the
//! first card. Playback uses a fixed output device with explicit format
//! flags so raw PCM reminder assets play the same way as WAV cues.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::{AudioCapture, AudioPlayer, CaptureError};

/// Fallback ALSA device when discovery finds nothing.
const FALLBACK_CAPTURE_DEVICE: &str = "plughw:0,0";

/// Microphone capture through `arecord`.
pub struct ArecordCapture {
    device_hint: String,
}

impl ArecordCapture {
    pub fn new(device_hint: impl Into<String>) -> Self {
        Self {
            device_hint: device_hint.into(),
        }
    }

    /// Pick the capture device by scanning `arecord -l` output.
    async fn find_device(&self) -> String {
        let listing = Command::new("arecord")
            .arg("-l")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        match listing {
            Ok(output) => {
                let text = String::from_utf8_lossy(&output.stdout);
                match parse_device_listing(&text, &self.device_hint) {
                    Some(device) => device,
                    None => {
                        warn!(hint = %self.device_hint, "Capture device not found, using fallback");
                        FALLBACK_CAPTURE_DEVICE.to_string()
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not list capture devices, using fallback");
                FALLBACK_CAPTURE_DEVICE.to_string()
            }
        }
    }
}

#[async_trait]
impl AudioCapture for ArecordCapture {
    type Handle = Child;

    async fn start(&self, path: &Path, max_duration: Duration) -> Result<Child, CaptureError> {
        let device = self.find_device().await;
        debug!(device = %device, "Starting arecord");

        Command::new("arecord")
            .args(["-D", &device])
            .args(["-f", "S16_LE", "-r", "16000", "-c", "1", "-t", "wav"])
            .args(["-d", &max_duration.as_secs().to_string()])
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CaptureError::Start(anyhow::Error::new(e).context("spawning arecord")))
    }

    async fn stop(&self, mut handle: Child) -> Result<(), CaptureError> {
        // arecord may already have exited on its own -d deadline.
        if let Ok(Some(_)) = handle.try_wait() {
            return Ok(());
        }

        handle
            .start_kill()
            .map_err(|e| CaptureError::Stop(anyhow::Error::new(e).context("killing arecord")))?;
        handle
            .wait()
            .await
            .map_err(|e| CaptureError::Stop(anyhow::Error::new(e).context("waiting for arecord")))?;

        Ok(())
    }
}

/// Parse `arecord -l` output, returning `plughw:<card>,<device>` for the
/// first line whose name contains `hint`.
fn parse_device_listing(listing: &str, hint: &str) -> Option<String> {
    for line in listing.lines() {
        if !line.contains(hint) {
            continue;
        }

        let card = field_number(line, "card ")?;
        let device = field_number(line, "device ")?;
        return Some(format!("plughw:{},{}", card, device));
    }
    None
}

/// Extract the integer that follows `prefix` in `line`.
fn field_number(line: &str, prefix: &str) -> Option<u32> {
    let rest = &line[line.find(prefix)? + prefix.len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Speaker playback through `aplay`.
pub struct AplayPlayer {
    device: String,
}

impl AplayPlayer {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

#[async_trait]
impl AudioPlayer for AplayPlayer {
    async fn play(&self, path: &Path) -> Result<()> {
        let status = Command::new("aplay")
            .args(["-D", &self.device])
            .args(["-f", "S16_LE", "-r", "16000", "-c", "1"])
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .context("Failed to run aplay")?;

        if !status.success() {
            anyhow::bail!(
                "aplay exited with {} for {}",
                status.code().unwrap_or(-1),
                path.display()
            );
        }

        Ok(())
    }
}
