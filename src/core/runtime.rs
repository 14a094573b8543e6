//! Control loop and task supervision.
//!
//! One sequential loop polls the sensor at 1 Hz, drives the debouncer and
//! scheduler, and emits a liveness heartbeat per iteration. Button events
//! arrive on their own channel and drive the recording controller. All
//! fire-and-forget work (watchdog, pipeline runs, playback) goes through
//! [`spawn_logged`] so a failing task can never take the loop down.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::adapters::{
    AudioCapture, AudioPlayer, ButtonEvent, DistanceSensor, LivenessNotifier, SensorError,
};
use crate::core::debounce::PresenceDebouncer;
use crate::core::pipeline::ProcessingPipeline;
use crate::core::recorder::RecordingController;
use crate::core::scheduler::{ReminderScheduler, SchedulerAction};
use crate::domain::AssetSlot;
use crate::journal::Journal;

/// Distance substituted when a measurement fails; reads as "in the box"
/// so a flaky sensor never triggers spurious reminders.
pub const SENTINEL_DISTANCE_CM: f64 = 0.0;

/// How long the loop backs off after a failed iteration.
const TICK_FAILURE_BACKOFF: Duration = Duration::from_secs(2);

/// Spawn a background task whose failure is caught and logged, never
/// propagated. Every fire-and-forget unit of work goes through here.
pub fn spawn_logged<F>(task: &'static str, fut: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            error!(task, error = %e, "Background task failed");
        }
    });
}

/// Play an audio file without waiting for it.
pub fn play_detached(player: Arc<dyn AudioPlayer>, path: PathBuf) {
    spawn_logged("playback", async move { player.play(&path).await });
}

/// The 1 Hz sense-and-schedule loop.
pub struct ControlLoop {
    sensor: Arc<dyn DistanceSensor>,
    debouncer: PresenceDebouncer,
    scheduler: ReminderScheduler,
    journal: Journal,
    assets: AssetSlot,
    player: Arc<dyn AudioPlayer>,
    notifier: Arc<dyn LivenessNotifier>,
    pickup_prompt: PathBuf,
}

impl ControlLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor: Arc<dyn DistanceSensor>,
        debouncer: PresenceDebouncer,
        scheduler: ReminderScheduler,
        journal: Journal,
        assets: AssetSlot,
        player: Arc<dyn AudioPlayer>,
        notifier: Arc<dyn LivenessNotifier>,
        pickup_prompt: PathBuf,
    ) -> Self {
        Self {
            sensor,
            debouncer,
            scheduler,
            journal,
            assets,
            player,
            notifier,
            pickup_prompt,
        }
    }

    /// Run until a stop signal arrives. A failed iteration is logged and
    /// the loop continues after a short backoff.
    pub async fn run(mut self, mut stop: mpsc::Receiver<()>) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!("Control loop running");

        loop {
            tokio::select! {
                _ = stop.recv() => {
                    info!("Control loop stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "Control loop iteration failed");
                        tokio::time::sleep(TICK_FAILURE_BACKOFF).await;
                    }
                }
            }
        }
    }

    async fn tick(&mut self) -> Result<()> {
        self.notifier.heartbeat();

        let distance = match self.sensor.sample().await {
            Ok(cm) => cm,
            Err(SensorError::Timeout) => {
                warn!("Distance measurement timed out, assuming phone present");
                SENTINEL_DISTANCE_CM
            }
            Err(e) => {
                warn!(error = %e, "Distance measurement failed, assuming phone present");
                SENTINEL_DISTANCE_CM
            }
        };
        debug!(distance_cm = distance, "Distance sampled");

        let now = Instant::now();

        if let Some(transition) = self.debouncer.observe(distance, now) {
            info!(
                to = %transition.to,
                episode_secs = transition.ended_episode.as_secs_f64(),
                "Box state changed"
            );
            self.journal.box_transition(&transition).await?;
        }

        let actions = self
            .scheduler
            .tick(now, self.debouncer.stable(), self.assets.is_ready());

        for action in actions {
            match action {
                SchedulerAction::PlayPickupPrompt => {
                    info!("Playing pickup prompt");
                    play_detached(self.player.clone(), self.pickup_prompt.clone());
                }
                SchedulerAction::PlayReminder => {
                    if let Some(asset) = self.assets.latest() {
                        info!(audio = %asset.audio_path.display(), "Playing reminder");
                        play_detached(self.player.clone(), asset.audio_path);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Consume button events and drive the recording controller.
///
/// Runs on its own task; shares only the session state and the asset slot
/// with the control loop, each behind its own lock.
pub async fn run_button_loop<C>(
    mut events: mpsc::Receiver<ButtonEvent>,
    recorder: Arc<RecordingController<C>>,
    pipeline: Arc<ProcessingPipeline>,
    player: Arc<dyn AudioPlayer>,
    ack_cue: PathBuf,
) where
    C: AudioCapture + Send + Sync + 'static,
{
    while let Some(event) = events.recv().await {
        match event {
            ButtonEvent::Pressed => match recorder.press().await {
                Ok(Some(session_id)) => {
                    arm_watchdog(
                        recorder.clone(),
                        pipeline.clone(),
                        player.clone(),
                        ack_cue.clone(),
                        session_id,
                    );
                }
                Ok(None) => debug!("Button press ignored, session already active"),
                Err(e) => error!(error = %e, "Recording start failed"),
            },
            ButtonEvent::Released => {
                if let Some(recording) = recorder.release().await {
                    dispatch_recording(
                        recording,
                        pipeline.clone(),
                        player.clone(),
                        ack_cue.clone(),
                    );
                }
            }
        }
    }

    debug!("Button event channel closed");
}

/// Force-stop the session at the max duration; fires exactly once per
/// session thanks to the id check in `auto_stop`.
fn arm_watchdog<C>(
    recorder: Arc<RecordingController<C>>,
    pipeline: Arc<ProcessingPipeline>,
    player: Arc<dyn AudioPlayer>,
    ack_cue: PathBuf,
    session_id: uuid::Uuid,
) where
    C: AudioCapture + Send + Sync + 'static,
{
    let max = recorder.max_duration();
    spawn_logged("recording watchdog", async move {
        tokio::time::sleep(max).await;
        if let Some(recording) = recorder.auto_stop(session_id).await {
            dispatch_recording(recording, pipeline, player, ack_cue);
        }
        Ok(())
    });
}

/// Acknowledge a kept recording and hand it to the pipeline, both
/// fire-and-forget; the caller never waits on pipeline completion.
fn dispatch_recording(
    recording: crate::domain::Recording,
    pipeline: Arc<ProcessingPipeline>,
    player: Arc<dyn AudioPlayer>,
    ack_cue: PathBuf,
) {
    play_detached(player, ack_cue);
    spawn_logged("pipeline run", async move {
        pipeline.run(recording).await?;
        Ok(())
    });
}
