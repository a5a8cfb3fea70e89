// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer scheduling for the isolate main loop

use fil_core::FileId;
use tokio::time::Instant;

/// A pending timer delivery.
#[derive(Debug, Clone)]
struct TimerEntry {
    fires_at: Instant,
    file: FileId,
}

/// Manages pending file timers.
///
/// A file may have several timers pending at once; all of them fire.
/// Due timers are drained in the order they were scheduled.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<TimerEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a timer delivery for `file` at `fires_at`.
    pub fn set(&mut self, file: FileId, fires_at: Instant) {
        self.timers.push(TimerEntry { fires_at, file });
    }

    /// Drain and return every timer due at `now`, in scheduling order.
    pub fn fired(&mut self, now: Instant) -> Vec<FileId> {
        let mut due = Vec::new();
        self.timers.retain(|t| {
            if t.fires_at <= now {
                due.push(t.file);
                false
            } else {
                true
            }
        });
        due
    }

    /// The earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.fires_at).min()
    }

    pub fn has_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

#[cfg(test)]
#[path = "sched_tests.rs"]
mod tests;
