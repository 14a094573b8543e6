//! Command-line interface for nudgebox.
//!
//! Process bootstrapping only: wire the adapters to the control logic and
//! run until interrupted. All behavior lives in the library modules.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::adapters::{
    AplayPlayer, ArecordCapture, AudioPlayer, ElevenLabsSynthesizer, GpiomonButtons,
    LivenessNotifier, OpenAiReplyGenerator, OpenAiTranscriber, RangingSensor, SdNotifier,
};
use crate::config::Config;
use crate::core::{
    play_detached, run_button_loop, ControlLoop, PresenceDebouncer, ProcessingPipeline,
    RecordingController, ReminderScheduler, RetryPolicy,
};
use crate::domain::{AssetSlot, BoxPresence};
use crate::journal::Journal;

/// nudgebox - phone-box nudge controller
#[derive(Parser, Debug)]
#[command(name = "nudgebox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the controller until interrupted
    Run {
        /// Config file (YAML); falls back to NUDGEBOX_CONFIG, then defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the resolved configuration
    Config {
        /// Config file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run { config } => {
                let config = Config::load(config.as_deref())?;
                run_device(config).await
            }
            Commands::Config { config } => {
                let config = Config::load(config.as_deref())?;
                println!("{:#?}", config);
                println!("home: {}", config.home()?.display());
                Ok(())
            }
        }
    }
}

/// Wire everything together and run until ctrl-c.
async fn run_device(config: Config) -> Result<()> {
    let recordings_dir = config.recordings_dir()?;
    let assets_dir = config.assets_dir()?;
    tokio::fs::create_dir_all(&recordings_dir).await?;
    tokio::fs::create_dir_all(&assets_dir).await?;

    let journal = Journal::open(config.journal_path()?).await?;
    let assets = AssetSlot::new();

    let openai_key = std::env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;
    let elevenlabs_key =
        std::env::var("ELEVENLABS_API_KEY").context("ELEVENLABS_API_KEY not set")?;

    let player: Arc<dyn AudioPlayer> = Arc::new(AplayPlayer::new(config.playback.device.clone()));
    let notifier: Arc<dyn LivenessNotifier> = Arc::new(SdNotifier::from_env());

    let sensor = Arc::new(RangingSensor::new(
        config.sensor.command.clone(),
        config.sensor.sample_timeout(),
    ));

    let recorder = Arc::new(RecordingController::new(
        ArecordCapture::new(config.recording.device_hint.clone()),
        config.recording.min_duration(),
        config.recording.max_duration(),
        recordings_dir,
    ));

    let pipeline = Arc::new(ProcessingPipeline::new(
        Arc::new(OpenAiTranscriber::new(
            openai_key.clone(),
            config.speech.transcribe_model.clone(),
        )),
        Arc::new(OpenAiReplyGenerator::new(
            openai_key,
            config.speech.chat_model.clone(),
        )),
        Arc::new(ElevenLabsSynthesizer::new(
            elevenlabs_key,
            config.speech.voice_id.clone(),
            config.speech.tts_model.clone(),
        )),
        journal.clone(),
        assets.clone(),
        assets_dir,
        RetryPolicy::default(),
    ));

    let debouncer = PresenceDebouncer::new(
        config.sensor.threshold_cm,
        config.presence.stability_window(),
        // Startup assumes the phone is with the user; a phone already in
        // the box settles to `in` after one stability window.
        BoxPresence::Out,
        Instant::now(),
    );
    let scheduler = ReminderScheduler::new(config.reminder.delay(), config.reminder.cancel());

    let control = ControlLoop::new(
        sensor,
        debouncer,
        scheduler,
        journal,
        assets,
        player.clone(),
        notifier.clone(),
        config.playback.pickup_prompt.clone(),
    );

    let button_events = GpiomonButtons::new(config.button.chip.clone(), config.button.line)
        .spawn()
        .context("Failed to start button monitor")?;

    tokio::spawn(run_button_loop(
        button_events,
        recorder.clone(),
        pipeline,
        player.clone(),
        config.playback.ack_cue.clone(),
    ));

    notifier.ready();
    play_detached(player.clone(), config.playback.start_cue.clone());

    let (stop_tx, stop_rx) = mpsc::channel(1);
    let loop_task = tokio::spawn(control.run(stop_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down");

    let _ = stop_tx.send(()).await;
    let _ = loop_task.await;

    // A recording left running would otherwise hold the microphone open.
    let _ = recorder.release().await;

    if let Err(e) = player.play(&config.playback.stop_cue).await {
        warn!(error = %e, "Failed to play stop cue");
    }

    info!("Stopped");
    Ok(())
}
