//! Core control logic: debouncing, recording, pipeline, scheduling, and
//! the control loop that ties them together.

pub mod debounce;
pub mod pipeline;
pub mod recorder;
pub mod retry;
pub mod runtime;
pub mod scheduler;

pub use debounce::PresenceDebouncer;
pub use pipeline::{PipelineError, ProcessingPipeline, REPLY_SYSTEM_PROMPT};
pub use recorder::RecordingController;
pub use retry::{retry, RetryPolicy};
pub use runtime::{play_detached, run_button_loop, spawn_logged, ControlLoop};
pub use scheduler::{ReminderScheduler, SchedulerAction, TimerState};
