//! Time sources and the single-slot timer.
//!
//! The core never sleeps or spawns. A host either polls [`crate::PlaybackEngine::tick`]
//! every animation frame, or arms one native timer from `pending_timer()` and calls
//! `fire_timer(token)` when it expires. Cancelling bumps the slot's epoch, so a
//! host timer that fires after cancellation carries a stale token and is ignored.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::ids::TimerToken;

/// Supplies the current time in milliseconds. Only differences are meaningful.
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Manually advanced clock. Clones share the same instant.
#[derive(Clone, Debug, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn new(start_ms: f64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, ms: f64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.0.set(self.0.get() + ms);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

/// Monotonic wall clock for native hosts.
#[derive(Clone, Copy, Debug)]
pub struct MonotonicTime {
    epoch: Instant,
}

impl MonotonicTime {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicTime {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTime {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Next discrete frame, or the next keyframe boundary in continuous mode.
    Step,
    /// End of the restart settle delay.
    Start,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingTimer {
    pub token: TimerToken,
    pub kind: TimerKind,
    /// Absolute due time on the engine's time source.
    pub due_ms: f64,
}

impl PendingTimer {
    /// Milliseconds from `now_ms` until due, clamped at zero.
    pub fn delay_ms(&self, now_ms: f64) -> f64 {
        (self.due_ms - now_ms).max(0.0)
    }
}

/// Holds at most one pending timer.
#[derive(Debug, Default)]
pub struct TimerSlot {
    epoch: u32,
    pending: Option<PendingTimer>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace any pending timer with a new one.
    pub fn schedule(&mut self, kind: TimerKind, due_ms: f64) -> TimerToken {
        self.epoch = self.epoch.wrapping_add(1);
        let timer = PendingTimer {
            token: TimerToken(self.epoch),
            kind,
            due_ms,
        };
        self.pending = Some(timer);
        timer.token
    }

    /// Drop the pending timer and invalidate every token issued so far.
    pub fn cancel(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        self.pending = None;
    }

    pub fn pending(&self) -> Option<PendingTimer> {
        self.pending
    }

    /// Take the pending timer if it is due at `now_ms`.
    pub fn take_due(&mut self, now_ms: f64) -> Option<PendingTimer> {
        match self.pending {
            Some(t) if t.due_ms <= now_ms => self.pending.take(),
            _ => None,
        }
    }

    /// Take the pending timer if `token` is current; stale tokens yield `None`.
    pub fn take_if_current(&mut self, token: TimerToken) -> Option<PendingTimer> {
        match self.pending {
            Some(t) if t.token == token => self.pending.take(),
            _ => None,
        }
    }
}
