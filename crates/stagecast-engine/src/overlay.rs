//! Timers behind the always-on overlays: the rotating message ticker and the
//! announcement banner.

use std::time::{Duration, Instant};

use tracing::debug;

use stagecast_ipc::{AnnouncementTool, BannerPhase, RotatingMessagesTool};

use crate::config::OverlayPolicy;
use crate::layers::{BannerView, TickerView};
use crate::timers::{TimerId, TimerKind, TimerQueue, MAX_DELAY};

/// A tool-supplied duration, bounded to what the timer queue accepts.
fn tool_duration(secs: u64) -> Duration {
    Duration::from_secs(secs).min(MAX_DELAY)
}

/// Rotates through the ticker's message list on a fixed interval.
#[derive(Debug, Default)]
pub struct MessageRotation {
    messages: Vec<String>,
    interval: Duration,
    index: usize,
    active: bool,
    generation: u64,
    timer: Option<TimerId>,
}

impl MessageRotation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a tool update. The timer restarts only when the list or interval
    /// changes, or when the ticker becomes active.
    pub fn update(
        &mut self,
        tool: &RotatingMessagesTool,
        default_interval: Duration,
        timers: &mut TimerQueue,
        now: Instant,
    ) {
        if !tool.is_effectively_active() {
            if self.active {
                debug!("Message rotation stopped");
            }
            self.cancel(timers);
            return;
        }

        let interval = tool
            .interval_secs
            .map(tool_duration)
            .unwrap_or(default_interval)
            .max(Duration::from_millis(10));

        if self.active && self.messages == tool.messages && self.interval == interval {
            return;
        }

        // A new list starts over; an interval change keeps the position.
        let index = if self.active && self.messages == tool.messages {
            self.index
        } else {
            0
        };
        self.cancel(timers);
        self.index = index;
        self.messages = tool.messages.clone();
        self.interval = interval;
        self.active = true;
        debug!(count = self.messages.len(), ?interval, "Message rotation started");
        self.schedule(timers, now);
    }

    /// A rotation tick fired. Returns true if the index advanced.
    pub fn on_tick(&mut self, generation: u64, timers: &mut TimerQueue, now: Instant) -> bool {
        if generation != self.generation || !self.active {
            return false;
        }
        self.timer = None;
        self.index = (self.index + 1) % self.messages.len();
        self.schedule(timers, now);
        true
    }

    fn schedule(&mut self, timers: &mut TimerQueue, now: Instant) {
        if self.messages.len() > 1 {
            self.timer = Some(timers.schedule_after(
                now,
                self.interval,
                TimerKind::RotationTick {
                    generation: self.generation,
                },
            ));
        }
    }

    /// Stop rotating and forget the list.
    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
        self.generation += 1;
        self.active = false;
        self.messages.clear();
        self.index = 0;
    }

    pub fn current(&self) -> Option<TickerView<'_>> {
        if !self.active {
            return None;
        }
        self.messages.get(self.index).map(|message| TickerView {
            message,
            index: self.index,
            count: self.messages.len(),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Visible, fading, hidden cycle of the announcement banner.
#[derive(Debug)]
pub struct AnnouncementBanner {
    text: String,
    phase: BannerPhase,
    generation: u64,
    timer: Option<TimerId>,
}

impl Default for AnnouncementBanner {
    fn default() -> Self {
        Self {
            text: String::new(),
            phase: BannerPhase::Hidden,
            generation: 0,
            timer: None,
        }
    }
}

impl AnnouncementBanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a tool update. Returns true if the phase or text changed.
    pub fn update(
        &mut self,
        tool: &AnnouncementTool,
        policy: &OverlayPolicy,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> bool {
        if tool.active && !tool.text.is_empty() {
            if self.phase == BannerPhase::Visible && self.text == tool.text {
                return false;
            }
            let dwell = tool
                .duration_secs
                .map(tool_duration)
                .unwrap_or_else(|| policy.banner_dwell());
            self.text = tool.text.clone();
            self.enter(BannerPhase::Visible, dwell, timers, now);
            return true;
        }

        // Deactivated before the dwell elapsed: go straight to the fade.
        if self.phase == BannerPhase::Visible {
            self.enter(BannerPhase::Fading, policy.banner_fade(), timers, now);
            return true;
        }
        false
    }

    /// The dwell elapsed. Returns true if the banner started fading.
    pub fn on_dwell(
        &mut self,
        generation: u64,
        policy: &OverlayPolicy,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> bool {
        if generation != self.generation || self.phase != BannerPhase::Visible {
            return false;
        }
        self.timer = None;
        self.enter(BannerPhase::Fading, policy.banner_fade(), timers, now);
        true
    }

    /// The fade finished. Returns true if the banner was hidden.
    pub fn on_fade(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.phase != BannerPhase::Fading {
            return false;
        }
        self.timer = None;
        self.phase = BannerPhase::Hidden;
        debug!("Announcement hidden");
        true
    }

    fn enter(&mut self, phase: BannerPhase, delay: Duration, timers: &mut TimerQueue, now: Instant) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
        self.generation += 1;
        self.phase = phase;

        let kind = match phase {
            BannerPhase::Visible => TimerKind::BannerDwell {
                generation: self.generation,
            },
            BannerPhase::Fading => TimerKind::BannerFade {
                generation: self.generation,
            },
            BannerPhase::Hidden => return,
        };
        debug!(?phase, ?delay, "Announcement phase");
        self.timer = Some(timers.schedule_after(now, delay, kind));
    }

    /// Hide immediately and drop pending timers.
    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
        }
        self.generation += 1;
        self.phase = BannerPhase::Hidden;
    }

    pub fn view(&self) -> Option<BannerView<'_>> {
        (self.phase != BannerPhase::Hidden).then_some(BannerView {
            text: &self.text,
            phase: self.phase,
        })
    }

    pub fn phase(&self) -> BannerPhase {
        self.phase
    }
}
