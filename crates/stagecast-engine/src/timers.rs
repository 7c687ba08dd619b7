//! Deadline queue driving every engine timer.
//!
//! The engine is single-threaded: timers are plain entries ordered by
//! deadline and fired by the run loop. Each entry carries the identity
//! (generation) it was scheduled for, and its owner ignores it when that
//! identity is no longer current.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::warn;

/// Longest delay a timer accepts. Longer delays are clamped to it.
pub const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Handle returned by [`TimerQueue::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// A media load attempt took too long.
    MediaTimeout { generation: u64, attempt: u32 },

    /// Retry delay after a media load error elapsed.
    MediaRetry { generation: u64 },

    /// Check again whether the embed host API is ready.
    EmbedPoll { generation: u64 },

    /// A query to the controller went unanswered.
    QueryTimeout { id: u64 },

    /// Advance the rotating message ticker.
    RotationTick { generation: u64 },

    /// The announcement banner starts fading.
    BannerDwell { generation: u64 },

    /// The announcement banner finished fading.
    BannerFade { generation: u64 },
}

/// Pending timers ordered by deadline, then by scheduling order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    queue: BTreeMap<(Instant, TimerId), TimerKind>,
    deadlines: HashMap<TimerId, Instant>,
}

impl TimerQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `kind` to fire at `deadline`.
    pub fn schedule(&mut self, deadline: Instant, kind: TimerKind) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((deadline, id), kind);
        self.deadlines.insert(id, deadline);
        id
    }

    /// Schedule `kind` to fire `delay` after `now`, at most [`MAX_DELAY`].
    pub fn schedule_after(&mut self, now: Instant, delay: Duration, kind: TimerKind) -> TimerId {
        if delay > MAX_DELAY {
            warn!(?delay, ?kind, "Timer delay clamped to {:?}", MAX_DELAY);
        }
        let deadline = match now.checked_add(delay.min(MAX_DELAY)) {
            Some(deadline) => deadline,
            None => {
                warn!(?kind, "Timer deadline out of range, firing immediately");
                now
            }
        };
        self.schedule(deadline, kind)
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    /// Returns true if the timer is still pending.
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(TimerId, TimerKind)> {
        let key = *self.queue.keys().next()?;
        if key.0 > now {
            return None;
        }
        let kind = self.queue.remove(&key)?;
        self.deadlines.remove(&key.1);
        Some((key.1, kind))
    }

    /// Drop every pending timer.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
