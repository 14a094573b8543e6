//! Processing Pipeline Integration Tests
//!
//! Step ordering, per-step retry, asset publication, and single-run
//! exclusion, all against deterministic service doubles.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;
use uuid::Uuid;

use nudgebox::adapters::{ReplyGenerator, SpeechSynthesizer, Transcriber};
use nudgebox::domain::{AssetSlot, Recording, ReminderAsset};
use nudgebox::journal::{Journal, JournalRecord};
use nudgebox::{PipelineError, ProcessingPipeline, RetryPolicy};

#[derive(Default)]
struct StubTranscriber {
    calls: AtomicU32,
    active: AtomicU32,
    max_active: AtomicU32,
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio_path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        // Hold the step open long enough for a concurrent run to overlap
        // if the run lock were broken.
        tokio::time::sleep(Duration::from_millis(20)).await;

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok("water the plants".to_string())
    }
}

/// Fails the first `failures` calls, then succeeds.
struct FlakyGenerator {
    calls: AtomicU32,
    failures: u32,
}

impl FlakyGenerator {
    fn new(failures: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures,
        }
    }
}

#[async_trait]
impl ReplyGenerator for FlakyGenerator {
    async fn generate(&self, _system_prompt: &str, user_text: &str) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            anyhow::bail!("service unavailable");
        }
        Ok(format!("Hey, remember: {}. How would you start?", user_text))
    }
}

#[derive(Default)]
struct StubSynthesizer {
    calls: AtomicU32,
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str, out_path: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::write(out_path, b"pcm-bytes").await?;
        Ok(())
    }
}

struct Fixture {
    pipeline: Arc<ProcessingPipeline>,
    transcriber: Arc<StubTranscriber>,
    generator: Arc<FlakyGenerator>,
    synthesizer: Arc<StubSynthesizer>,
    assets: AssetSlot,
    journal: Journal,
    temp: TempDir,
}

fn fixture(generator_failures: u32) -> Fixture {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("assets")).unwrap();
    let journal = Journal::new(temp.path().join("study.jsonl"));
    let assets = AssetSlot::new();

    let transcriber = Arc::new(StubTranscriber::default());
    let generator = Arc::new(FlakyGenerator::new(generator_failures));
    let synthesizer = Arc::new(StubSynthesizer::default());

    let pipeline = Arc::new(ProcessingPipeline::new(
        transcriber.clone(),
        generator.clone(),
        synthesizer.clone(),
        journal.clone(),
        assets.clone(),
        temp.path().join("assets"),
        RetryPolicy::default(),
    ));

    Fixture {
        pipeline,
        transcriber,
        generator,
        synthesizer,
        assets,
        journal,
        temp,
    }
}

async fn recording_in(dir: &Path) -> Recording {
    let path = dir.join(format!("commitment-{}.wav", Uuid::new_v4()));
    tokio::fs::write(&path, b"RIFF fake wav").await.unwrap();
    Recording {
        session_id: Uuid::new_v4(),
        path,
        duration: Duration::from_secs(3),
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_transient_failure_still_publishes() {
    // transcribe succeeds, generate fails once then succeeds, synthesize
    // succeeds: the asset is published and generate was retried exactly
    // once.
    let fx = fixture(1);

    let recording = recording_in(fx.temp.path()).await;
    let asset = fx.pipeline.run(recording).await.expect("run succeeds");

    assert_eq!(asset.transcript, "water the plants");
    assert!(asset.audio_path.exists());
    assert!(fx.assets.is_ready());

    assert_eq!(fx.transcriber.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.synthesizer.calls.load(Ordering::SeqCst), 1);

    // Transcript and reply were journaled
    let entries = fx.journal.replay().await.unwrap();
    assert!(entries
        .iter()
        .any(|e| matches!(e.record, JournalRecord::Transcript { .. })));
    assert!(entries
        .iter()
        .any(|e| matches!(e.record, JournalRecord::Reply { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_step_leaves_previous_asset() {
    // Generation fails on every attempt: the run aborts, later steps never
    // execute, and the previously published asset stays authoritative.
    let fx = fixture(10);

    let previous = ReminderAsset {
        transcript: "old commitment".to_string(),
        reply_text: "old reply".to_string(),
        audio_path: PathBuf::from("/tmp/old.pcm"),
        created_at: Utc::now(),
    };
    fx.assets.publish(previous);

    let recording = recording_in(fx.temp.path()).await;
    let err = fx.pipeline.run(recording).await.unwrap_err();

    assert!(matches!(err, PipelineError::ReplyGeneration(_)));
    // Both attempts were made, no more
    assert_eq!(fx.generator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.synthesizer.calls.load(Ordering::SeqCst), 0);

    let latest = fx.assets.latest().unwrap();
    assert_eq!(latest.reply_text, "old reply");
}

#[tokio::test(start_paused = true)]
async fn test_runs_never_interleave() {
    // Two recordings completing in quick succession: the run lock keeps
    // their external-call steps from overlapping.
    let fx = fixture(0);

    let a = recording_in(fx.temp.path()).await;
    let b = recording_in(fx.temp.path()).await;

    let p1 = fx.pipeline.clone();
    let p2 = fx.pipeline.clone();
    let (ra, rb) = tokio::join!(p1.run(a), p2.run(b));

    ra.unwrap();
    rb.unwrap();

    assert_eq!(fx.transcriber.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fx.transcriber.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_consumed_recording_removed() {
    let fx = fixture(0);

    let recording = recording_in(fx.temp.path()).await;
    let path = recording.path.clone();

    fx.pipeline.run(recording).await.unwrap();
    assert!(!path.exists());
}
