//! Single-threaded tick scheduling with an explicit pause flag.

use std::time::{Duration, Instant};

/// Tracks when the next automatic tick is due. There is never more than
/// one pending deadline: `start` and `resume` replace any previous one,
/// and `poll` yields at most one due tick before re-arming from `now`, so
/// a late caller gets one tick, not a burst.
#[derive(Clone, Debug)]
pub struct TickTimer {
    interval: Duration,
    paused: bool,
    next_due: Option<Instant>,
}

impl TickTimer {
    /// Timer with the given interval, not yet armed.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            paused: false,
            next_due: None,
        }
    }

    /// Arm (or re-arm) the timer: the next tick is one interval from `now`.
    pub fn start(&mut self, now: Instant) {
        self.paused = false;
        self.next_due = Some(now + self.interval);
    }

    /// Stop scheduling ticks until `resume`.
    pub fn pause(&mut self) {
        self.paused = true;
        self.next_due = None;
    }

    /// Leave the paused state and re-arm from `now`.
    pub fn resume(&mut self, now: Instant) {
        self.start(now);
    }

    /// Whether the pause flag is set.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Consume one due tick, if any.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.paused {
            return false;
        }
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}
