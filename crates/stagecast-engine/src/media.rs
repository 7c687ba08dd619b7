//! Load state machine for local media.
//!
//! ```text
//! idle -> loading -> ready
//!            |  ^
//!            v  | (retry delay)
//!          error(retrying) -- max retries --> error(terminal)
//! loading -- timeout --> error(terminal)
//! ```
//!
//! Every descriptor replacement bumps `generation`. Timers carry the
//! generation they were scheduled for and renderer signals carry the path and
//! attempt they refer to; anything that does not match the current item is
//! stale and dropped.

use std::time::Instant;

use tracing::{debug, info, warn};

use stagecast_ipc::{LoadState, MediaDescriptor};

use crate::config::MediaLoadPolicy;
use crate::error::EngineError;
use crate::timers::{TimerId, TimerKind, TimerQueue};

/// Tracks loading of the current local media item.
#[derive(Debug)]
pub struct MediaLoadController {
    policy: MediaLoadPolicy,
    descriptor: Option<MediaDescriptor>,
    state: LoadState,
    retry_count: u32,
    attempt: u32,
    generation: u64,
    timeout_timer: Option<TimerId>,
    retry_timer: Option<TimerId>,
}

impl MediaLoadController {
    /// Create an idle controller.
    pub fn new(policy: MediaLoadPolicy) -> Self {
        Self {
            policy,
            descriptor: None,
            state: LoadState::Idle,
            retry_count: 0,
            attempt: 0,
            generation: 0,
            timeout_timer: None,
            retry_timer: None,
        }
    }

    /// Replace the current item. `None` (or an empty path) clears media.
    pub fn select(
        &mut self,
        descriptor: Option<MediaDescriptor>,
        timers: &mut TimerQueue,
        now: Instant,
    ) {
        self.reset(timers);

        let Some(descriptor) = descriptor.filter(|d| !d.path.is_empty()) else {
            debug!("Media cleared");
            return;
        };

        info!(path = %descriptor.path, kind = ?descriptor.kind, "Loading media");
        self.descriptor = Some(descriptor);
        self.start_attempt(timers, now);
    }

    /// Cancel pending timers and forget the current item.
    pub fn reset(&mut self, timers: &mut TimerQueue) {
        self.cancel_timers(timers);
        self.generation += 1;
        self.descriptor = None;
        self.state = LoadState::Idle;
        self.retry_count = 0;
        self.attempt = 0;
    }

    /// The renderer finished loading. Returns true if the state changed.
    pub fn on_loaded(&mut self, path: &str, attempt: u32, timers: &mut TimerQueue) -> bool {
        if !self.is_current(path, attempt) {
            debug!(path, attempt, "Ignoring load signal for superseded media");
            return false;
        }
        if !self.state.is_loading() {
            return false;
        }

        if let Some(id) = self.timeout_timer.take() {
            timers.cancel(id);
        }
        self.state = LoadState::Ready;
        debug!(path, attempt, "Media ready");
        true
    }

    /// The renderer failed to load. Returns the terminal error once retries
    /// are exhausted.
    pub fn on_failed(
        &mut self,
        path: &str,
        attempt: u32,
        message: &str,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> Option<EngineError> {
        if !self.is_current(path, attempt) {
            debug!(path, attempt, "Ignoring load error for superseded media");
            return None;
        }
        if !self.state.is_loading() {
            return None;
        }

        if let Some(id) = self.timeout_timer.take() {
            timers.cancel(id);
        }

        if self.policy.should_retry(self.retry_count) {
            self.retry_count += 1;
            warn!(
                path,
                retry = self.retry_count,
                max = self.policy.max_retries,
                "Media load failed, retrying: {}",
                message
            );
            self.state = LoadState::Error {
                message: format!(
                    "Load failed, retrying ({}/{})",
                    self.retry_count, self.policy.max_retries
                ),
                retry_count: self.retry_count,
                retrying: true,
            };
            self.retry_timer = Some(timers.schedule_after(
                now,
                self.policy.retry_delay(),
                TimerKind::MediaRetry {
                    generation: self.generation,
                },
            ));
            return None;
        }

        let error = EngineError::MediaRetriesExhausted {
            path: path.to_string(),
            retries: self.retry_count,
            message: message.to_string(),
        };
        self.fail(&error);
        Some(error)
    }

    /// The load timeout fired. Returns the terminal error if it applied.
    pub fn on_timeout(&mut self, generation: u64, attempt: u32) -> Option<EngineError> {
        if generation != self.generation || attempt != self.attempt {
            return None;
        }
        self.timeout_timer = None;
        if !self.state.is_loading() {
            return None;
        }

        let error = EngineError::MediaLoadTimeout {
            path: self.path().unwrap_or_default().to_string(),
            timeout_secs: self.policy.load_timeout().as_secs_f64(),
        };
        self.fail(&error);
        Some(error)
    }

    /// The retry delay elapsed. Returns true if a new attempt started.
    pub fn on_retry(&mut self, generation: u64, timers: &mut TimerQueue, now: Instant) -> bool {
        if generation != self.generation {
            return false;
        }
        self.retry_timer = None;
        if !matches!(self.state, LoadState::Error { retrying: true, .. }) {
            return false;
        }

        self.attempt += 1;
        self.start_attempt(timers, now);
        true
    }

    fn start_attempt(&mut self, timers: &mut TimerQueue, now: Instant) {
        self.state = LoadState::Loading {
            attempt: self.attempt,
        };
        self.timeout_timer = Some(timers.schedule_after(
            now,
            self.policy.load_timeout(),
            TimerKind::MediaTimeout {
                generation: self.generation,
                attempt: self.attempt,
            },
        ));
        debug!(path = ?self.path(), attempt = self.attempt, "Media load attempt started");
    }

    fn fail(&mut self, error: &EngineError) {
        warn!("{}", error);
        self.state = LoadState::Error {
            message: error.to_string(),
            retry_count: self.retry_count,
            retrying: false,
        };
    }

    fn cancel_timers(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.timeout_timer.take() {
            timers.cancel(id);
        }
        if let Some(id) = self.retry_timer.take() {
            timers.cancel(id);
        }
    }

    fn is_current(&self, path: &str, attempt: u32) -> bool {
        self.path() == Some(path) && attempt == self.attempt
    }

    pub fn descriptor(&self) -> Option<&MediaDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn path(&self) -> Option<&str> {
        self.descriptor.as_ref().map(|d| d.path.as_str())
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Cache-busting attempt number; changes on every retry.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
