//! Commitment recording lifecycle.
//!
//! One session at a time, system-wide. A press starts capture, a release
//! stops it, and a watchdog force-stops it at the max duration. Recordings
//! shorter than the minimum are discarded without touching the pipeline.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::adapters::{AudioCapture, CaptureError};
use crate::domain::Recording;

/// Controller for the single recording session.
pub struct RecordingController<C: AudioCapture> {
    capture: C,
    session: Mutex<Option<ActiveSession<C::Handle>>>,

    min_duration: Duration,
    max_duration: Duration,
    recordings_dir: PathBuf,
}

struct ActiveSession<H> {
    id: Uuid,
    handle: H,
    started_at: Instant,
    path: PathBuf,
}

impl<C: AudioCapture> RecordingController<C> {
    pub fn new(
        capture: C,
        min_duration: Duration,
        max_duration: Duration,
        recordings_dir: PathBuf,
    ) -> Self {
        Self {
            capture,
            session: Mutex::new(None),
            min_duration,
            max_duration,
            recordings_dir,
        }
    }

    /// Maximum session length; callers arm the auto-stop watchdog with it.
    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Whether a session is currently active.
    pub async fn is_recording(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Start a capture session.
    ///
    /// Returns the new session id, or `None` if a session is already
    /// active (the command is a no-op, not an error). A capture-start
    /// failure aborts the session and is surfaced to the caller.
    pub async fn press(&self) -> Result<Option<Uuid>, CaptureError> {
        let mut session = self.session.lock().await;
        if session.is_some() {
            return Ok(None);
        }

        let id = Uuid::new_v4();
        let path = self.recordings_dir.join(format!("commitment-{}.wav", id));

        info!(session = %id, path = %path.display(), "Recording started");

        let handle = self.capture.start(&path, self.max_duration).await?;
        *session = Some(ActiveSession {
            id,
            handle,
            started_at: Instant::now(),
            path,
        });

        Ok(Some(id))
    }

    /// Stop the active session, if any.
    ///
    /// Returns the finished [`Recording`] when it met the minimum
    /// duration; too-short recordings are deleted and `None` is returned.
    /// Stopping with no active session is a no-op.
    pub async fn release(&self) -> Option<Recording> {
        let taken = self.session.lock().await.take();
        match taken {
            Some(session) => self.finish(session).await,
            None => None,
        }
    }

    /// Watchdog stop: only acts if `id` is still the active session, so a
    /// session stopped by hand (or a successor session) is left alone.
    pub async fn auto_stop(&self, id: Uuid) -> Option<Recording> {
        let taken = {
            let mut session = self.session.lock().await;
            match session.as_ref() {
                Some(active) if active.id == id => session.take(),
                _ => None,
            }
        };

        match taken {
            Some(session) => {
                info!(session = %id, "Recording auto-stopped at max duration");
                self.finish(session).await
            }
            None => None,
        }
    }

    async fn finish(&self, session: ActiveSession<C::Handle>) -> Option<Recording> {
        let duration = session.started_at.elapsed();

        // Cleanup proceeds regardless of how the stop went.
        if let Err(e) = self.capture.stop(session.handle).await {
            warn!(session = %session.id, error = %e, "Problem stopping capture process");
        }

        if duration < self.min_duration {
            info!(
                session = %session.id,
                duration_ms = duration.as_millis() as u64,
                "Recording too short, discarding"
            );
            if let Err(e) = tokio::fs::remove_file(&session.path).await {
                warn!(error = %e, "Failed to remove discarded recording");
            }
            return None;
        }

        info!(
            session = %session.id,
            duration_secs = duration.as_secs_f64(),
            "Recording saved"
        );

        Some(Recording {
            session_id: session.id,
            path: session.path,
            duration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeCapture {
        starts: AtomicU32,
        stops: AtomicU32,
    }

    #[async_trait]
    impl AudioCapture for Arc<FakeCapture> {
        type Handle = ();

        async fn start(
            &self,
            path: &Path,
            _max_duration: Duration,
        ) -> Result<(), CaptureError> {
            tokio::fs::write(path, b"RIFF").await.map_err(|e| {
                CaptureError::Start(e.into())
            })?;
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn stop(&self, _handle: ()) -> Result<(), CaptureError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(
        capture: Arc<FakeCapture>,
        dir: &TempDir,
    ) -> RecordingController<Arc<FakeCapture>> {
        RecordingController::new(
            capture,
            Duration::from_secs(1),
            Duration::from_secs(20),
            dir.path().to_path_buf(),
        )
    }

    #[tokio::test]
    async fn test_second_press_is_noop() {
        let capture = Arc::new(FakeCapture::default());
        let temp = TempDir::new().unwrap();
        let rec = controller(capture.clone(), &temp);

        let first = rec.press().await.unwrap();
        assert!(first.is_some());
        assert!(rec.is_recording().await);

        let second = rec.press().await.unwrap();
        assert!(second.is_none());
        assert_eq!(capture.starts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_release_without_session_is_noop() {
        let capture = Arc::new(FakeCapture::default());
        let temp = TempDir::new().unwrap();
        let rec = controller(capture.clone(), &temp);

        assert!(rec.release().await.is_none());
        assert_eq!(capture.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_recording_discarded() {
        let capture = Arc::new(FakeCapture::default());
        let temp = TempDir::new().unwrap();
        let rec = controller(capture.clone(), &temp);

        rec.press().await.unwrap();
        // Released almost immediately; under the 1s minimum
        let recording = rec.release().await;

        assert!(recording.is_none());
        assert_eq!(capture.stops.load(Ordering::SeqCst), 1);

        // Artifact was removed
        let mut entries = tokio::fs::read_dir(temp.path()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_auto_stop_ignores_stale_session() {
        let capture = Arc::new(FakeCapture::default());
        let temp = TempDir::new().unwrap();
        let rec = controller(capture.clone(), &temp);

        let id = rec.press().await.unwrap().unwrap();
        rec.release().await;

        // Watchdog for the finished session fires late: nothing happens
        assert!(rec.auto_stop(id).await.is_none());
        assert_eq!(capture.stops.load(Ordering::SeqCst), 1);
    }
}
