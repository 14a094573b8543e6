//! ElevenLabs streaming text-to-speech.
//!
//! Synthesized audio is streamed chunk by chunk into a fresh asset file as
//! raw 16 kHz PCM, matching the playback format of the reminder player.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;

use super::SpeechSynthesizer;

const OUTPUT_FORMAT: &str = "pcm_16000";

/// ElevenLabs streaming synthesizer.
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    pub fn new(
        api_key: impl Into<String>,
        voice_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            voice_id: voice_id.into(),
            model_id: model_id.into(),
        }
    }

    fn stream_url(&self) -> String {
        format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}/stream?output_format={}",
            self.voice_id, OUTPUT_FORMAT
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str, out_path: &Path) -> Result<()> {
        if let Some(parent) = out_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create asset directory")?;
        }

        let payload = json!({
            "text": text,
            "model_id": self.model_id,
        });

        let mut response = self
            .client
            .post(self.stream_url())
            .header("xi-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("Synthesis request failed")?
            .error_for_status()
            .context("Synthesis service returned an error")?;

        let mut file = tokio::fs::File::create(out_path)
            .await
            .with_context(|| format!("Failed to create asset file: {}", out_path.display()))?;

        while let Some(chunk) = response
            .chunk()
            .await
            .context("Failed reading synthesis stream")?
        {
            file.write_all(&chunk)
                .await
                .context("Failed writing audio chunk")?;
        }

        file.flush().await.context("Failed to flush asset file")?;

        Ok(())
    }
}
