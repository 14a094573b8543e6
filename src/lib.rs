//! nudgebox - phone-box nudge controller
//!
//! A storage box holds a phone over an ultrasonic ranging sensor. Taking
//! the phone out starts an episode: the box plays a pickup prompt, the
//! user records a short spoken commitment with a button, and a
//! transcribe → generate-reply → synthesize pipeline turns it into a
//! personalized voice reminder that plays after a delay (and keeps
//! repeating) while the phone stays out. Putting the phone back for a
//! sustained stretch cancels the cycle.
//!
//! # Architecture
//!
//! - `core`: the state machines and the 1 Hz control loop
//!   (PresenceDebouncer, RecordingController, ProcessingPipeline,
//!   ReminderScheduler, ControlLoop)
//! - `adapters`: narrow traits for hardware and network collaborators,
//!   with subprocess/HTTP production implementations
//! - `domain`: shared value types and the single-slot reminder asset
//! - `journal`: append-only JSONL trail of transitions, transcripts, and
//!   replies
//! - `cli`: process bootstrapping

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod journal;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use core::{
    ControlLoop, PipelineError, PresenceDebouncer, ProcessingPipeline, RecordingController,
    ReminderScheduler, RetryPolicy, SchedulerAction, TimerState,
};
pub use domain::{AssetSlot, BoxPresence, Recording, ReminderAsset, Transition};
pub use journal::{Journal, JournalEntry, JournalRecord};
