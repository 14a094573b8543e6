//! Reminder scheduling.
//!
//! Drives the pickup prompt and the delayed, repeating reminder from the
//! debounced box state. Re-evaluated once per control-loop tick; all side
//! effects are returned as actions for the caller to dispatch.
//!
//! The countdown is pure wall clock from the moment it started: a brief
//! return of the phone neither pauses nor resets it. Only sustained
//! presence (the cancel duration) tears the cycle down and re-arms the
//! pickup prompt. The asymmetry is intentional, kept from the original
//! device behavior pending a product decision.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::domain::BoxPresence;

/// Where the reminder timer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Box state is `in`; nothing armed.
    Idle,

    /// Phone is out but no reminder asset exists yet.
    AwaitingAsset,

    /// Counting down toward the reminder.
    Counting,

    /// Reminder just played this tick; rearms on the next.
    Fired,
}

/// Side effects requested by a scheduler tick, dispatched by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    /// Play the one-time pickup prompt for this out-episode.
    PlayPickupPrompt,

    /// Play the current reminder asset.
    PlayReminder,
}

/// State machine for pickup-prompt and reminder playback.
#[derive(Debug)]
pub struct ReminderScheduler {
    delay: Duration,
    cancel: Duration,

    state: TimerState,
    counting_since: Option<Instant>,
    in_since: Option<Instant>,
    prompt_played: bool,
}

impl ReminderScheduler {
    pub fn new(delay: Duration, cancel: Duration) -> Self {
        Self {
            delay,
            cancel,
            state: TimerState::Idle,
            counting_since: None,
            in_since: None,
            prompt_played: false,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Whether the pickup prompt has been played for the current
    /// out-episode.
    pub fn prompt_played(&self) -> bool {
        self.prompt_played
    }

    /// Evaluate one tick of debounced state.
    pub fn tick(
        &mut self,
        now: Instant,
        presence: BoxPresence,
        has_asset: bool,
    ) -> Vec<SchedulerAction> {
        match presence {
            BoxPresence::Out => self.tick_out(now, has_asset),
            BoxPresence::In => self.tick_in(now),
        }
    }

    fn tick_out(&mut self, now: Instant, has_asset: bool) -> Vec<SchedulerAction> {
        self.in_since = None;
        let mut actions = Vec::new();

        if !self.prompt_played {
            actions.push(SchedulerAction::PlayPickupPrompt);
            self.prompt_played = true;
            info!("Pickup prompt armed for this out-episode");
        }

        match self.state {
            TimerState::Idle | TimerState::AwaitingAsset | TimerState::Fired => {
                if has_asset {
                    self.state = TimerState::Counting;
                    self.counting_since = Some(now);
                    info!("Reminder countdown started");
                } else {
                    self.state = TimerState::AwaitingAsset;
                }
            }
            TimerState::Counting => {
                if let Some(since) = self.counting_since {
                    let elapsed = now.duration_since(since);
                    debug!(elapsed_secs = elapsed.as_secs(), "Reminder countdown running");

                    if elapsed >= self.delay {
                        actions.push(SchedulerAction::PlayReminder);
                        self.state = TimerState::Fired;
                        self.counting_since = None;
                        info!("Reminder fired, cycle rearms");
                    }
                } else {
                    // Counting without a start instant cannot happen; fall
                    // back to rearming.
                    self.state = TimerState::AwaitingAsset;
                }
            }
        }

        actions
    }

    fn tick_in(&mut self, now: Instant) -> Vec<SchedulerAction> {
        let since = *self.in_since.get_or_insert(now);

        if now.duration_since(since) >= self.cancel {
            if self.state == TimerState::Counting {
                info!("Reminder cancelled after sustained presence");
            }
            self.state = TimerState::Idle;
            self.counting_since = None;
            self.prompt_played = false;
        }

        // Countdown keeps accruing while presence is brief; nothing fires
        // until the phone is back out.
        Vec::new()
    }
}
