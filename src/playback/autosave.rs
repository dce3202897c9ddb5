//! Recurring persistence task owned by the playback manager.
//!
//! Runs only while playing. The runtime polls it from its loop; a poll that
//! finds the task due reschedules it one interval from `now` (missed ticks
//! are not replayed).

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Autosave {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Autosave {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_due: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn poll(&mut self, now: Instant) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(now + self.interval);
                true
            }
            _ => false,
        }
    }
}
