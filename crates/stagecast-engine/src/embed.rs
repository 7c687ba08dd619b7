//! Lifecycle of the embedded third-party video widget.
//!
//! ```text
//! absent -> creating -> ready -> absent
//! ```
//!
//! At most one widget is alive. Teardown always runs stop, destroy, then
//! clear container, and bumps the generation so callbacks registered for the
//! old widget are ignored when they arrive late.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use stagecast_ipc::WidgetPlayerState;

use crate::config::EmbedPolicy;
use crate::error::EngineError;
use crate::surface::{EmbedHost, WidgetHandle};
use crate::timers::{TimerId, TimerKind, TimerQueue};

/// Lifecycle state of the widget.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedState {
    /// No widget.
    Absent,

    /// Waiting for the host API (`widget` is `None`) or for the widget's
    /// ready callback.
    Creating {
        video_id: String,
        start_time: f64,
        attempts: u32,
        widget: Option<WidgetHandle>,
    },

    /// The widget is usable.
    Ready {
        video_id: String,
        widget: WidgetHandle,
    },
}

impl EmbedState {
    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Absent => "Absent",
            Self::Creating { .. } => "Creating",
            Self::Ready { .. } => "Ready",
        }
    }
}

/// Creates and destroys the embedded widget.
#[derive(Debug)]
pub struct EmbeddedVideoManager {
    policy: EmbedPolicy,
    state: EmbedState,
    generation: u64,
    poll_timer: Option<TimerId>,
}

impl EmbeddedVideoManager {
    pub fn new(policy: EmbedPolicy) -> Self {
        Self {
            policy,
            state: EmbedState::Absent,
            generation: 0,
            poll_timer: None,
        }
    }

    /// Show `video_id`, replacing any existing widget first.
    pub fn load(
        &mut self,
        video_id: &str,
        start_time: f64,
        host: &mut dyn EmbedHost,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> Result<(), EngineError> {
        if self.video_id() == Some(video_id) {
            debug!(video_id, "Embedded video already loaded");
            return Ok(());
        }

        self.teardown(host, timers);

        info!(video_id, "Creating embedded video player");
        self.state = EmbedState::Creating {
            video_id: video_id.to_string(),
            start_time,
            attempts: 0,
            widget: None,
        };
        self.try_create(host, timers, now)
    }

    /// A readiness poll fired.
    pub fn on_poll(
        &mut self,
        generation: u64,
        host: &mut dyn EmbedHost,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> Result<(), EngineError> {
        if generation != self.generation {
            return Ok(());
        }
        self.poll_timer = None;
        if !matches!(self.state, EmbedState::Creating { widget: None, .. }) {
            return Ok(());
        }
        self.try_create(host, timers, now)
    }

    fn try_create(
        &mut self,
        host: &mut dyn EmbedHost,
        timers: &mut TimerQueue,
        now: Instant,
    ) -> Result<(), EngineError> {
        let EmbedState::Creating {
            video_id,
            start_time,
            attempts,
            widget,
        } = &mut self.state
        else {
            return Ok(());
        };

        if host.is_api_ready() {
            return match host.create_widget(video_id, *start_time, self.generation) {
                Ok(handle) => {
                    debug!(video_id = %video_id, ?handle, "Embedded widget created");
                    *widget = Some(handle);
                    Ok(())
                }
                Err(message) => {
                    let error = EngineError::WidgetCreateFailed {
                        video_id: video_id.clone(),
                        message,
                    };
                    error!("{}", error);
                    self.abandon(host);
                    Err(error)
                }
            };
        }

        *attempts += 1;
        if *attempts > self.policy.max_poll_attempts {
            let error = EngineError::WidgetInitFailed {
                video_id: video_id.clone(),
                attempts: self.policy.max_poll_attempts,
            };
            error!("{}", error);
            self.abandon(host);
            return Err(error);
        }

        debug!(attempt = *attempts, "Embed host API not ready, polling");
        self.poll_timer = Some(timers.schedule_after(
            now,
            self.policy.poll_interval(),
            TimerKind::EmbedPoll {
                generation: self.generation,
            },
        ));
        Ok(())
    }

    /// The widget reported ready. Returns its handle so the caller can start
    /// position sync; `None` for a superseded widget.
    pub fn on_ready(&mut self, generation: u64) -> Option<WidgetHandle> {
        if generation != self.generation {
            debug!(generation, "Ignoring ready callback from superseded widget");
            return None;
        }

        match &self.state {
            EmbedState::Creating {
                video_id,
                widget: Some(widget),
                ..
            } => {
                let widget = *widget;
                info!(video_id = %video_id, "Embedded video ready");
                self.state = EmbedState::Ready {
                    video_id: video_id.clone(),
                    widget,
                };
                Some(widget)
            }
            _ => None,
        }
    }

    /// The widget reported an error. The widget is torn down and the error
    /// returned for reporting.
    pub fn on_error(
        &mut self,
        generation: u64,
        code: i32,
        host: &mut dyn EmbedHost,
        timers: &mut TimerQueue,
    ) -> Option<EngineError> {
        if generation != self.generation || matches!(self.state, EmbedState::Absent) {
            return None;
        }

        let error = EngineError::Widget {
            video_id: self.video_id().unwrap_or_default().to_string(),
            code,
        };
        warn!("{}", error);
        self.teardown(host, timers);
        Some(error)
    }

    /// The widget changed playback state. Returns the state if the callback
    /// belongs to the live widget.
    pub fn on_state_change(
        &self,
        generation: u64,
        state: WidgetPlayerState,
    ) -> Option<WidgetPlayerState> {
        if generation != self.generation || matches!(self.state, EmbedState::Absent) {
            return None;
        }
        Some(state)
    }

    /// Stop, destroy and clear the widget, in that order.
    pub fn teardown(&mut self, host: &mut dyn EmbedHost, timers: &mut TimerQueue) {
        if let Some(id) = self.poll_timer.take() {
            timers.cancel(id);
        }
        if matches!(self.state, EmbedState::Absent) {
            return;
        }

        if let Some(widget) = self.widget_handle() {
            host.stop_widget(widget);
            host.destroy_widget(widget);
        }
        host.clear_container();

        debug!(video_id = ?self.video_id(), "Embedded video torn down");
        self.generation += 1;
        self.state = EmbedState::Absent;
    }

    /// Give up on the current request without a live widget.
    fn abandon(&mut self, host: &mut dyn EmbedHost) {
        host.clear_container();
        self.generation += 1;
        self.state = EmbedState::Absent;
    }

    fn widget_handle(&self) -> Option<WidgetHandle> {
        match &self.state {
            EmbedState::Creating { widget, .. } => *widget,
            EmbedState::Ready { widget, .. } => Some(*widget),
            EmbedState::Absent => None,
        }
    }

    /// The widget, once it reported ready.
    pub fn ready_widget(&self) -> Option<WidgetHandle> {
        match &self.state {
            EmbedState::Ready { widget, .. } => Some(*widget),
            _ => None,
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        match &self.state {
            EmbedState::Creating { video_id, .. } | EmbedState::Ready { video_id, .. } => {
                Some(video_id)
            }
            EmbedState::Absent => None,
        }
    }

    pub fn state(&self) -> &EmbedState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::testing::FakeEmbedHost;

    fn manager() -> EmbeddedVideoManager {
        EmbeddedVideoManager::new(EmbedPolicy {
            poll_interval_ms: 100,
            max_poll_attempts: 3,
        })
    }

    #[test]
    fn test_create_and_ready() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::ready();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        assert_eq!(embed.state().name(), "Creating");
        assert_eq!(host.live_count(), 1);
        assert!(embed.ready_widget().is_none());

        let widget = embed.on_ready(embed.generation()).unwrap();
        assert_eq!(embed.ready_widget(), Some(widget));
    }

    #[test]
    fn test_switch_keeps_one_widget_when_old_ready_arrives_late() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::ready();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        let v1_generation = embed.generation();

        embed.load("v2", 0.0, &mut host, &mut timers, now).unwrap();
        assert_eq!(host.live_count(), 1);
        assert_eq!(
            host.log,
            vec!["create v1", "stop 0", "destroy 0", "clear", "create v2"]
        );

        // v1's ready callback arrives after the switch.
        assert!(embed.on_ready(v1_generation).is_none());
        assert_eq!(embed.video_id(), Some("v2"));
        assert_eq!(embed.state().name(), "Creating");
        assert_eq!(host.live_count(), 1);

        assert!(embed.on_ready(embed.generation()).is_some());
        assert_eq!(host.live_count(), 1);
    }

    #[test]
    fn test_switch_after_ready_keeps_one_widget() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::ready();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        embed.on_ready(embed.generation());
        embed.load("v2", 0.0, &mut host, &mut timers, now).unwrap();

        assert_eq!(host.live_count(), 1);
        assert_eq!(host.created.last().map(|(id, _)| id.as_str()), Some("v2"));
    }

    #[test]
    fn test_same_id_is_noop() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::ready();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        assert_eq!(host.created.len(), 1);
    }

    #[test]
    fn test_polls_until_api_ready() {
        let mut now = Instant::now();
        let mut host = FakeEmbedHost::default();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        assert_eq!(host.live_count(), 0);
        assert_eq!(timers.len(), 1);

        host.api_ready = true;
        now += Duration::from_millis(100);
        let (_, kind) = timers.pop_due(now).unwrap();
        let TimerKind::EmbedPoll { generation } = kind else {
            panic!("unexpected timer: {kind:?}");
        };
        embed.on_poll(generation, &mut host, &mut timers, now).unwrap();
        assert_eq!(host.live_count(), 1);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_poll_bound_is_terminal() {
        let mut now = Instant::now();
        let mut host = FakeEmbedHost::default();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();

        let mut result = Ok(());
        while let Some(deadline) = timers.next_deadline() {
            now = deadline;
            let (_, kind) = timers.pop_due(now).unwrap();
            let TimerKind::EmbedPoll { generation } = kind else {
                panic!("unexpected timer: {kind:?}");
            };
            result = embed.on_poll(generation, &mut host, &mut timers, now);
        }

        assert_eq!(
            result,
            Err(EngineError::WidgetInitFailed {
                video_id: "v1".to_string(),
                attempts: 3,
            })
        );
        assert_eq!(embed.state(), &EmbedState::Absent);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_teardown_cancels_poll() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::default();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        let generation = embed.generation();
        embed.teardown(&mut host, &mut timers);
        assert!(timers.is_empty());

        host.api_ready = true;
        embed.on_poll(generation, &mut host, &mut timers, now).unwrap();
        assert_eq!(host.live_count(), 0);
    }

    #[test]
    fn test_widget_error_tears_down() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::ready();
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        embed.load("v1", 0.0, &mut host, &mut timers, now).unwrap();
        let generation = embed.generation();
        embed.on_ready(generation);

        let error = embed.on_error(generation, 150, &mut host, &mut timers).unwrap();
        assert_eq!(
            error,
            EngineError::Widget {
                video_id: "v1".to_string(),
                code: 150,
            }
        );
        assert_eq!(host.live_count(), 0);
        assert!(embed.on_error(generation, 150, &mut host, &mut timers).is_none());
        assert!(embed
            .on_state_change(generation, WidgetPlayerState::Playing)
            .is_none());
    }

    #[test]
    fn test_create_failure_is_reported() {
        let now = Instant::now();
        let mut host = FakeEmbedHost::ready();
        host.fail_create = true;
        let mut timers = TimerQueue::new();
        let mut embed = manager();

        let result = embed.load("v1", 0.0, &mut host, &mut timers, now);
        assert!(matches!(
            result,
            Err(EngineError::WidgetCreateFailed { .. })
        ));
        assert_eq!(embed.state(), &EmbedState::Absent);
    }
}
