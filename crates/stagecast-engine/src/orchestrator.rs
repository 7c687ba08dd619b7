//! Main display engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use stagecast_ipc::{
    DisplayCommand, DisplayEvent, LayerSelection, MediaKind, MediaSignal, PlaybackPosition,
    PlayerSignal, QueryReply, QueryRequest, ToolKind, VideoCommand, WidgetPlayerState,
    WidgetSignal, YoutubeCommand,
};

use crate::config::EngineConfig;
use crate::content::{ContentStore, StoreEffects};
use crate::embed::{EmbedState, EmbeddedVideoManager};
use crate::error::EngineError;
use crate::layers::{resolve, Snapshot};
use crate::media::MediaLoadController;
use crate::overlay::{AnnouncementBanner, MessageRotation};
use crate::surface::{MediaPlayer, Surface};
use crate::sync::{PlayerKind, PositionSync, SyncStep};
use crate::timers::{TimerId, TimerKind, TimerQueue};

/// Longest the run loop blocks when no timer is pending.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// A query sent to the controller and not yet answered.
#[derive(Debug, Clone, Copy)]
struct PendingQuery {
    request: QueryRequest,
    kind: PlayerKind,
    generation: u64,
    timer: TimerId,
}

/// Mute and volume remembered across local videos.
#[derive(Debug, Clone, Copy, PartialEq)]
struct VideoPrefs {
    muted: bool,
    volume: f64,
}

impl Default for VideoPrefs {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 1.0,
        }
    }
}

/// The display synchronization engine.
pub struct DisplayEngine<S: Surface> {
    command_rx: Receiver<DisplayCommand>,
    event_tx: Sender<DisplayEvent>,
    surface: S,
    config: EngineConfig,
    store: ContentStore,
    media: MediaLoadController,
    video_sync: PositionSync,
    embed: EmbeddedVideoManager,
    embed_sync: PositionSync,
    /// Where the next widget starts playing.
    embed_start: f64,
    rotation: MessageRotation,
    banner: AnnouncementBanner,
    timers: TimerQueue,
    queries: HashMap<u64, PendingQuery>,
    next_query_id: u64,
    selection: Arc<RwLock<LayerSelection>>,
    prefs: VideoPrefs,
    stopped: bool,
}

impl<S: Surface> DisplayEngine<S> {
    /// Create a new engine.
    pub fn new(
        command_rx: Receiver<DisplayCommand>,
        event_tx: Sender<DisplayEvent>,
        surface: S,
        config: EngineConfig,
    ) -> Self {
        let config = config.validated();
        Self {
            command_rx,
            event_tx,
            surface,
            store: ContentStore::new(),
            media: MediaLoadController::new(config.media.clone()),
            video_sync: PositionSync::new(PlayerKind::Video, config.sync.video.clone()),
            embed: EmbeddedVideoManager::new(config.embed.clone()),
            embed_sync: PositionSync::new(PlayerKind::Embedded, config.sync.embedded.clone()),
            embed_start: 0.0,
            rotation: MessageRotation::new(),
            banner: AnnouncementBanner::new(),
            timers: TimerQueue::new(),
            queries: HashMap::new(),
            next_query_id: 1,
            selection: Arc::new(RwLock::new(LayerSelection::default())),
            prefs: VideoPrefs::default(),
            stopped: false,
            config,
        }
    }

    /// Shared handle to the latest resolved layers.
    pub fn selection_handle(&self) -> Arc<RwLock<LayerSelection>> {
        Arc::clone(&self.selection)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Run the engine (blocking).
    #[instrument(name = "engine_run", skip(self))]
    pub fn run(&mut self) {
        info!("Display engine starting");
        let initial = self.selection.read().clone();
        self.surface.present(&initial);
        self.send_event(DisplayEvent::Ready);

        loop {
            let now = Instant::now();
            let wait = self
                .timers
                .next_deadline()
                .map(|deadline| deadline.saturating_duration_since(now).min(IDLE_WAIT))
                .unwrap_or(IDLE_WAIT);

            match self.command_rx.recv_timeout(wait) {
                Ok(command) => {
                    if !self.handle_command(command, Instant::now()) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("Command channel disconnected, shutting down");
                    break;
                }
            }

            self.advance(Instant::now());
        }

        self.shutdown();
        info!("Display engine stopped");
    }

    /// Apply one command and re-resolve. Returns false if the engine should
    /// stop.
    #[instrument(name = "handle_command", skip_all, fields(command = command.name()))]
    pub fn handle_command(&mut self, command: DisplayCommand, now: Instant) -> bool {
        debug!(?command, "Handling command");

        let effects = self.store.apply(&command);
        self.apply_effects(effects, now);

        match command {
            DisplayCommand::SlideUpdate(_)
            | DisplayCommand::MediaUpdate(_)
            | DisplayCommand::ThemeUpdate(_)
            | DisplayCommand::ToolUpdate(_) => {}
            DisplayCommand::VideoCommand(command) => self.video_command(command),
            DisplayCommand::YoutubeCommand(command) => self.youtube_command(command),
            DisplayCommand::QueryReply { id, reply } => self.query_reply(id, reply, now),
            DisplayCommand::Media(signal) => self.media_signal(signal, now),
            DisplayCommand::Player(signal) => self.player_signal(signal, now),
            DisplayCommand::Widget(signal) => self.widget_signal(signal, now),
            DisplayCommand::Shutdown => {
                self.shutdown();
                self.send_event(DisplayEvent::Shutdown);
                return false;
            }
        }

        self.refresh(now);
        true
    }

    /// Fire every timer due at `now`, then re-resolve.
    pub fn advance(&mut self, now: Instant) {
        let mut fired = false;
        while let Some((_, kind)) = self.timers.pop_due(now) {
            fired = true;
            self.fire_timer(kind, now);
        }
        if fired {
            self.refresh(now);
        }
    }

    /// Lifecycle follow-up for store mutations.
    fn apply_effects(&mut self, effects: StoreEffects, now: Instant) {
        if effects.embedded_cleared {
            self.embed.teardown(self.surface.embed_host(), &mut self.timers);
            self.embed_sync.reset();
        }

        if effects.media_replaced {
            self.video_sync.reset();
            self.media
                .select(self.store.media().cloned(), &mut self.timers, now);
        }

        match effects.tool_changed {
            Some(ToolKind::RotatingMessages) => self.rotation.update(
                &self.store.tools().rotating_messages,
                self.config.overlay.default_rotation_interval(),
                &mut self.timers,
                now,
            ),
            Some(ToolKind::Announcement) => {
                self.banner.update(
                    &self.store.tools().announcement,
                    &self.config.overlay,
                    &mut self.timers,
                    now,
                );
            }
            _ => {}
        }
    }

    fn video_command(&mut self, command: VideoCommand) {
        match command {
            VideoCommand::Play | VideoCommand::Resume => {
                self.video_sync.set_intent(true);
                if let Some(player) = self.local_video() {
                    player.play();
                }
            }
            VideoCommand::Pause => {
                self.video_sync.set_intent(false);
                if let Some(player) = self.local_video() {
                    player.pause();
                }
            }
            VideoCommand::Seek { time } => {
                if let Some(player) = self.local_video() {
                    player.seek(time.max(0.0));
                }
            }
            // The store already cleared the video.
            VideoCommand::Stop => {}
            VideoCommand::Mute { muted } => {
                self.prefs.muted = muted;
                if let Some(player) = self.local_video() {
                    player.set_muted(muted);
                }
            }
            VideoCommand::Volume { level } => {
                let level = level.clamp(0.0, 1.0);
                self.prefs.volume = level;
                if let Some(player) = self.local_video() {
                    player.set_volume(level);
                }
            }
            VideoCommand::Sync { time, is_playing } => {
                let Some(local_time) = self.local_video().map(|p| p.current_time()) else {
                    return;
                };
                let position = PlaybackPosition { time, is_playing };
                if let Some(correction) = self.video_sync.on_periodic(position, local_time) {
                    if let Some(player) = self.local_video() {
                        correction.apply(player);
                    }
                }
            }
        }
    }

    fn youtube_command(&mut self, command: YoutubeCommand) {
        match command {
            // The widget itself is created by `reconcile_embedded`.
            YoutubeCommand::Load {
                video_id,
                start_time,
                ..
            } => {
                if !video_id.is_empty() && self.embed.video_id() != Some(video_id.as_str()) {
                    self.embed_sync.reset();
                    self.embed_start = start_time.max(0.0);
                }
            }
            // The store already cleared the embedded video.
            YoutubeCommand::Stop => {}
            YoutubeCommand::Play => {
                self.embed_sync.set_intent(true);
                if let Some(player) = self.embedded_player() {
                    player.play();
                }
            }
            YoutubeCommand::Pause => {
                self.embed_sync.set_intent(false);
                if let Some(player) = self.embedded_player() {
                    player.pause();
                }
            }
            YoutubeCommand::Seek { time } => {
                if let Some(player) = self.embedded_player() {
                    player.seek(time.max(0.0));
                }
            }
            YoutubeCommand::Sync { time, is_playing } => {
                let Some(local_time) = self.embedded_player().map(|p| p.current_time()) else {
                    return;
                };
                let position = PlaybackPosition { time, is_playing };
                if let Some(correction) = self.embed_sync.on_periodic(position, local_time) {
                    if let Some(player) = self.embedded_player() {
                        correction.apply(player);
                    }
                }
            }
        }
    }

    fn media_signal(&mut self, signal: MediaSignal, now: Instant) {
        match signal {
            MediaSignal::Loaded { path, attempt } => {
                self.media.on_loaded(&path, attempt, &mut self.timers);
            }
            MediaSignal::Failed {
                path,
                attempt,
                message,
            } => {
                if let Some(e) =
                    self.media
                        .on_failed(&path, attempt, &message, &mut self.timers, now)
                {
                    self.report_error(&e);
                }
            }
        }
    }

    fn player_signal(&mut self, signal: PlayerSignal, now: Instant) {
        if !self.is_local_video() {
            debug!(?signal, "Ignoring player signal without a local video");
            return;
        }

        match signal {
            PlayerSignal::CanPlay { path } => {
                if self.media.path() != Some(path.as_str()) {
                    debug!(path, "Ignoring can-play for superseded video");
                    return;
                }
                let prefs = self.prefs;
                if let Some(player) = self.local_video() {
                    player.set_muted(prefs.muted);
                    player.set_volume(prefs.volume);
                }
                if let Some(request) = self.video_sync.begin() {
                    self.send_query(PlayerKind::Video, request, now);
                }
            }
            PlayerSignal::TimeUpdate { time, duration } => {
                self.send_event(DisplayEvent::VideoTime { time, duration });
            }
            PlayerSignal::Playing => self.send_event(DisplayEvent::VideoPlaying(true)),
            PlayerSignal::Paused => self.send_event(DisplayEvent::VideoPlaying(false)),
            PlayerSignal::Ended => self.send_event(DisplayEvent::VideoEnded),
        }
    }

    fn widget_signal(&mut self, signal: WidgetSignal, now: Instant) {
        match signal {
            WidgetSignal::Ready { generation } => {
                if self.embed.on_ready(generation).is_some() {
                    if let Some(request) = self.embed_sync.begin() {
                        self.send_query(PlayerKind::Embedded, request, now);
                    }
                }
            }
            WidgetSignal::Error { generation, code } => {
                let video_id = self.embed.video_id().map(str::to_string);
                let error =
                    self.embed
                        .on_error(generation, code, self.surface.embed_host(), &mut self.timers);
                if let (Some(e), Some(video_id)) = (error, video_id) {
                    self.abandon_embedded(&video_id, e);
                }
            }
            WidgetSignal::StateChange { generation, state } => {
                match self.embed.on_state_change(generation, state) {
                    Some(WidgetPlayerState::Playing) => {
                        self.send_event(DisplayEvent::VideoPlaying(true))
                    }
                    Some(WidgetPlayerState::Paused) => {
                        self.send_event(DisplayEvent::VideoPlaying(false))
                    }
                    Some(WidgetPlayerState::Ended) => self.send_event(DisplayEvent::VideoEnded),
                    Some(state) => debug!(?state, "Embedded player state"),
                    None => {}
                }
            }
        }
    }

    fn fire_timer(&mut self, kind: TimerKind, now: Instant) {
        match kind {
            TimerKind::MediaTimeout {
                generation,
                attempt,
            } => {
                if let Some(e) = self.media.on_timeout(generation, attempt) {
                    self.report_error(&e);
                }
            }
            TimerKind::MediaRetry { generation } => {
                if self.media.on_retry(generation, &mut self.timers, now) {
                    // The renderer mounts a fresh element for the new attempt.
                    self.video_sync.reset();
                }
            }
            TimerKind::EmbedPoll { generation } => {
                let video_id = self.embed.video_id().map(str::to_string);
                let result =
                    self.embed
                        .on_poll(generation, self.surface.embed_host(), &mut self.timers, now);
                if let (Err(e), Some(video_id)) = (result, video_id) {
                    self.abandon_embedded(&video_id, e);
                }
            }
            TimerKind::QueryTimeout { id } => {
                let Some(pending) = self.queries.remove(&id) else {
                    return;
                };
                let error = EngineError::QueryTimedOut {
                    request: format!("{:?}", pending.request),
                    timeout_secs: self.config.sync.query_timeout().as_secs_f64(),
                };
                let step = self.sync_mut(pending.kind).on_query_failed(pending.generation, error);
                self.apply_sync_step(pending.kind, step, now);
            }
            TimerKind::RotationTick { generation } => {
                self.rotation.on_tick(generation, &mut self.timers, now);
            }
            TimerKind::BannerDwell { generation } => {
                self.banner
                    .on_dwell(generation, &self.config.overlay, &mut self.timers, now);
            }
            TimerKind::BannerFade { generation } => {
                self.banner.on_fade(generation);
            }
        }
    }

    fn send_query(&mut self, kind: PlayerKind, request: QueryRequest, now: Instant) {
        let id = self.next_query_id;
        self.next_query_id += 1;
        let generation = self.sync_mut(kind).generation();

        debug!(id, ?request, "Sending query");
        if let Err(e) = self.event_tx.try_send(DisplayEvent::Query { id, request }) {
            warn!("Failed to send query: {}", e);
            let error = EngineError::QueryUnsent {
                request: format!("{request:?}"),
            };
            let step = self.sync_mut(kind).on_query_failed(generation, error);
            self.apply_sync_step(kind, step, now);
            return;
        }

        let timer = self.timers.schedule_after(
            now,
            self.config.sync.query_timeout(),
            TimerKind::QueryTimeout { id },
        );
        self.queries.insert(
            id,
            PendingQuery {
                request,
                kind,
                generation,
                timer,
            },
        );
    }

    fn query_reply(&mut self, id: u64, reply: QueryReply, now: Instant) {
        let Some(pending) = self.queries.remove(&id) else {
            debug!(id, "Dropping reply for unknown or expired query");
            return;
        };
        self.timers.cancel(pending.timer);

        let local_time = self
            .player(pending.kind)
            .map(|p| p.current_time())
            .unwrap_or(0.0);
        let step = self
            .sync_mut(pending.kind)
            .on_reply(pending.generation, reply, local_time);
        self.apply_sync_step(pending.kind, step, now);
    }

    fn apply_sync_step(&mut self, kind: PlayerKind, step: SyncStep, now: Instant) {
        match step {
            SyncStep::Query(request) => self.send_query(kind, request, now),
            SyncStep::Apply(correction) => {
                if let Some(player) = self.player(kind) {
                    correction.apply(player);
                }
            }
            SyncStep::Fallback { play, error } => {
                self.report_error(&error);
                if play {
                    if let Some(player) = self.player(kind) {
                        if player.is_paused() {
                            player.play();
                        }
                    }
                }
            }
            SyncStep::Idle => {}
        }
    }

    /// Give up on an embedded video: report, tear down, fall back to content.
    fn abandon_embedded(&mut self, video_id: &str, error: EngineError) {
        self.report_error(&error);
        self.embed.teardown(self.surface.embed_host(), &mut self.timers);
        self.embed_sync.reset();
        self.store.abandon_embedded(video_id);
    }

    fn sync_mut(&mut self, kind: PlayerKind) -> &mut PositionSync {
        match kind {
            PlayerKind::Video => &mut self.video_sync,
            PlayerKind::Embedded => &mut self.embed_sync,
        }
    }

    fn player(&mut self, kind: PlayerKind) -> Option<&mut dyn MediaPlayer> {
        match kind {
            PlayerKind::Video => self.local_video(),
            PlayerKind::Embedded => self.embedded_player(),
        }
    }

    fn is_local_video(&self) -> bool {
        self.media
            .descriptor()
            .is_some_and(|d| d.kind == MediaKind::Video)
    }

    fn local_video(&mut self) -> Option<&mut dyn MediaPlayer> {
        if !self.is_local_video() {
            return None;
        }
        self.surface.video_player()
    }

    fn embedded_player(&mut self) -> Option<&mut dyn MediaPlayer> {
        let widget = self.embed.ready_widget()?;
        self.surface.embed_host().widget_player(widget)
    }

    /// Keep a widget alive only while the embedded video can be the base
    /// layer. A takeover tears it down before the takeover is presented, and
    /// the widget is created again, from where it stopped, once the takeover
    /// ends.
    fn reconcile_embedded(&mut self, now: Instant) {
        let wanted = match &self.store.embedded().video_id {
            Some(video_id) if !self.store.tools().any_takeover_active() => Some(video_id.clone()),
            _ => None,
        };

        match wanted {
            Some(video_id) => {
                if self.embed.video_id() == Some(video_id.as_str()) {
                    return;
                }
                let result = self.embed.load(
                    &video_id,
                    self.embed_start,
                    self.surface.embed_host(),
                    &mut self.timers,
                    now,
                );
                if let Err(e) = result {
                    self.abandon_embedded(&video_id, e);
                }
            }
            None => {
                if matches!(self.embed.state(), EmbedState::Absent) {
                    return;
                }
                if let Some(time) = self.embedded_player().map(|p| p.current_time()) {
                    self.embed_start = time;
                }
                info!(video_id = ?self.embed.video_id(), "Suspending embedded video");
                self.embed.teardown(self.surface.embed_host(), &mut self.timers);
                self.embed_sync.reset();
            }
        }
    }

    /// Resolve layers and present them if they changed.
    fn refresh(&mut self, now: Instant) {
        self.reconcile_embedded(now);

        let selection = resolve(&Snapshot {
            store: &self.store,
            media_load: self.media.state(),
            media_attempt: self.media.attempt(),
            ticker: self.rotation.current(),
            banner: self.banner.view(),
        });

        if *self.selection.read() == selection {
            return;
        }

        debug!(
            base = selection.base.name(),
            overlays = selection.overlays.len(),
            "Layers changed"
        );
        self.surface.present(&selection);
        *self.selection.write() = selection.clone();
        self.send_event(DisplayEvent::LayersChanged(Box::new(selection)));
    }

    fn report_error(&self, error: &EngineError) {
        if error.is_recoverable() {
            warn!("{}", error);
        } else {
            error!("{}", error);
        }
        self.send_event(DisplayEvent::Error {
            message: error.to_string(),
        });
    }

    /// Cancel every timer and query and tear down the embedded widget.
    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        self.embed.teardown(self.surface.embed_host(), &mut self.timers);
        self.media.reset(&mut self.timers);
        self.rotation.cancel(&mut self.timers);
        self.banner.cancel(&mut self.timers);
        self.queries.clear();
        self.timers.clear();
        debug!("Engine state torn down");
    }

    fn send_event(&self, event: DisplayEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("Failed to send event: {}", e);
        }
    }
}

impl<S: Surface> Drop for DisplayEngine<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
