//! Presence debouncing.
//!
//! Turns noisy periodic distance samples into a stable in/out state. A raw
//! state change only commits after it has held continuously for the
//! stability window; any reversal inside the window restarts it. This keeps
//! a phone wobbling near the threshold from chattering the scheduler.

use std::time::{Duration, Instant};

use crate::domain::{BoxPresence, Transition};

/// Hysteresis filter over raw presence classifications.
///
/// Driven by caller-supplied timestamps so the control loop passes
/// `Instant::now()` and tests pass synthetic clocks.
#[derive(Debug)]
pub struct PresenceDebouncer {
    threshold_cm: f64,
    stability_window: Duration,

    stable: BoxPresence,
    stable_since: Instant,
    pending: Option<Pending>,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    state: BoxPresence,
    since: Instant,
}

impl PresenceDebouncer {
    /// Create a debouncer with a known initial stable state.
    pub fn new(
        threshold_cm: f64,
        stability_window: Duration,
        initial: BoxPresence,
        now: Instant,
    ) -> Self {
        Self {
            threshold_cm,
            stability_window,
            stable: initial,
            stable_since: now,
            pending: None,
        }
    }

    /// The current stable state.
    pub fn stable(&self) -> BoxPresence {
        self.stable
    }

    /// Feed one distance sample. Returns a [`Transition`] when the stable
    /// state commits to a new value, carrying the length of the episode
    /// that just ended.
    pub fn observe(&mut self, distance_cm: f64, now: Instant) -> Option<Transition> {
        let raw = BoxPresence::classify(distance_cm, self.threshold_cm);

        if raw == self.stable {
            // Back in agreement; drop any half-finished candidate.
            self.pending = None;
            return None;
        }

        match self.pending {
            Some(pending) if pending.state == raw => {
                if now.duration_since(pending.since) >= self.stability_window {
                    let ended_episode = now.duration_since(self.stable_since);
                    self.stable = raw;
                    self.stable_since = now;
                    self.pending = None;
                    return Some(Transition { to: raw, ended_episode });
                }
            }
            _ => {
                // New candidate (or a reversal); the window restarts.
                self.pending = Some(Pending { state: raw, since: now });
            }
        }

        None
    }
}
