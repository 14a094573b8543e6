//! Recording-to-reminder processing pipeline.
//!
//! Transcribe the commitment, generate the check-in text, synthesize it to
//! audio, then publish the result as the new reminder asset. Steps run
//! strictly in order, each under the retry policy; a run that fails leaves
//! the previously published asset untouched. A run lock guarantees no two
//! runs ever interleave their service calls.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{ReplyGenerator, SpeechSynthesizer, Transcriber};
use crate::core::retry::{retry, RetryPolicy};
use crate::domain::{AssetSlot, Recording, ReminderAsset};
use crate::journal::Journal;

/// Fixed instruction for the reply step: a two-sentence empathetic
/// check-in followed by a reflective question. Static product copy, never
/// mutated by the pipeline.
pub const REPLY_SYSTEM_PROMPT: &str = "You are a supportive and encouraging assistant \
helping someone follow through on an offline activity they intended to do after using \
their phone. Your response should always be two sentences: Start with a warm, friendly \
check-in that gently reminds the user their phone is still out of the box (this doesn't \
mean they're using it). Example: Hey, I noticed you haven't put your phone back yet. \
Hi there, just checking in - remember what you told me before? Restate their planned \
activity vividly, using sensory or emotional language. Highlight a possible reward or \
positive feeling, and end with an open-ended, reflective question (not a command). \
Examples: Can you picture how nice it will feel to have the dishes done - what would \
you have to do first to start? Imagine the fresh air on your face during your walk - \
where would you like to go? Keep the tone friendly, non-judgmental, gently encouraging, \
and reflective. Avoid direct instructions or pressure. The planned activity is:";

/// A pipeline step failed after exhausting its retries.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transcription failed: {0}")]
    Transcription(#[source] anyhow::Error),

    #[error("reply generation failed: {0}")]
    ReplyGeneration(#[source] anyhow::Error),

    #[error("speech synthesis failed: {0}")]
    Synthesis(#[source] anyhow::Error),
}

/// Serialized transcribe → generate → synthesize pipeline.
pub struct ProcessingPipeline {
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,

    journal: Journal,
    assets: AssetSlot,
    assets_dir: PathBuf,
    policy: RetryPolicy,

    // Guards the whole multi-step external-call sequence; at most one run
    // executes at any time.
    run_lock: Mutex<()>,
}

impl ProcessingPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        journal: Journal,
        assets: AssetSlot,
        assets_dir: PathBuf,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            transcriber,
            generator,
            synthesizer,
            journal,
            assets,
            assets_dir,
            policy,
            run_lock: Mutex::new(()),
        }
    }

    /// Run the pipeline for one captured recording.
    ///
    /// On success the new [`ReminderAsset`] has been published; on failure
    /// the previous asset (or none) remains authoritative.
    pub async fn run(&self, recording: Recording) -> Result<ReminderAsset, PipelineError> {
        let _run = self.run_lock.lock().await;

        info!(
            session = %recording.session_id,
            duration_secs = recording.duration.as_secs_f64(),
            "Processing recording"
        );

        let transcript = retry(self.policy, "transcribe", || {
            self.transcriber.transcribe(&recording.path)
        })
        .await
        .map_err(PipelineError::Transcription)?;

        info!(transcript = %transcript, "Transcription complete");
        if let Err(e) = self.journal.transcript(&transcript).await {
            warn!(error = %e, "Failed to journal transcript");
        }

        let reply = retry(self.policy, "generate_reply", || {
            self.generator.generate(REPLY_SYSTEM_PROMPT, &transcript)
        })
        .await
        .map_err(PipelineError::ReplyGeneration)?;

        info!(reply = %reply, "Reply generated");
        if let Err(e) = self.journal.reply(&reply).await {
            warn!(error = %e, "Failed to journal reply");
        }

        let audio_path = self.assets_dir.join(format!("reply-{}.pcm", Uuid::new_v4()));
        retry(self.policy, "synthesize", || {
            self.synthesizer.synthesize(&reply, &audio_path)
        })
        .await
        .map_err(PipelineError::Synthesis)?;

        let asset = ReminderAsset {
            transcript,
            reply_text: reply,
            audio_path,
            created_at: Utc::now(),
        };
        self.assets.publish(asset.clone());
        info!(audio = %asset.audio_path.display(), "Reminder asset published");

        // The recording has been consumed; its scratch file can go.
        if let Err(e) = tokio::fs::remove_file(&recording.path).await {
            warn!(error = %e, "Failed to remove consumed recording");
        }

        Ok(asset)
    }
}
