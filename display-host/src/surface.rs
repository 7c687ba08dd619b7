//! Headless surface: logs every presented selection and simulates the
//! renderer's players.
//!
//! Unless signals are manual, the simulated renderer acknowledges media loads
//! and widget creation by looping the matching signals back into the engine's
//! command channel, the way a real renderer would report them.

use std::collections::HashMap;
use std::time::Instant;

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use stagecast_engine::{EmbedHost, MediaPlayer, Surface, WidgetHandle};
use stagecast_ipc::{
    BaseLayer, DisplayCommand, LayerSelection, LoadState, MediaSignal, PlayerSignal, WidgetSignal,
};

/// A player whose clock advances while it is playing.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    position: f64,
    resumed_at: Option<Instant>,
    muted: bool,
    volume: f64,
}

impl SimulatedPlayer {
    pub fn new(start_time: f64) -> Self {
        Self {
            position: start_time,
            resumed_at: None,
            muted: false,
            volume: 1.0,
        }
    }
}

impl MediaPlayer for SimulatedPlayer {
    fn current_time(&self) -> f64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.position + running
    }

    fn is_paused(&self) -> bool {
        self.resumed_at.is_none()
    }

    fn seek(&mut self, time: f64) {
        debug!(time, "Player seek");
        self.position = time;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn play(&mut self) {
        if self.resumed_at.is_none() {
            debug!(position = self.position, "Player play");
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if self.resumed_at.is_some() {
            self.position = self.current_time();
            self.resumed_at = None;
            debug!(position = self.position, "Player pause");
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_volume(&mut self, level: f64) {
        self.volume = level;
    }
}

/// Embed host whose player API is always available.
#[derive(Debug, Default)]
pub struct SimulatedEmbedHost {
    loopback: Option<Sender<DisplayCommand>>,
    next_handle: u64,
    widgets: HashMap<WidgetHandle, SimulatedPlayer>,
}

impl EmbedHost for SimulatedEmbedHost {
    fn is_api_ready(&self) -> bool {
        true
    }

    fn create_widget(
        &mut self,
        video_id: &str,
        start_time: f64,
        generation: u64,
    ) -> Result<WidgetHandle, String> {
        let handle = WidgetHandle(self.next_handle);
        self.next_handle += 1;
        self.widgets.insert(handle, SimulatedPlayer::new(start_time));
        info!(video_id, ?handle, "Embedded widget created");

        loop_back(
            &self.loopback,
            DisplayCommand::Widget(WidgetSignal::Ready { generation }),
        );
        Ok(handle)
    }

    fn widget_player(&mut self, handle: WidgetHandle) -> Option<&mut dyn MediaPlayer> {
        self.widgets
            .get_mut(&handle)
            .map(|player| player as &mut dyn MediaPlayer)
    }

    fn stop_widget(&mut self, handle: WidgetHandle) {
        if let Some(player) = self.widgets.get_mut(&handle) {
            player.pause();
        }
    }

    fn destroy_widget(&mut self, handle: WidgetHandle) {
        self.widgets.remove(&handle);
        info!(?handle, "Embedded widget destroyed");
    }

    fn clear_container(&mut self) {
        debug!("Embed container cleared");
    }
}

/// Surface that renders to the log.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    loopback: Option<Sender<DisplayCommand>>,
    video: Option<SimulatedPlayer>,
    video_path: Option<String>,
    acknowledged: Option<(String, u32)>,
    host: SimulatedEmbedHost,
}

impl HeadlessSurface {
    /// `loopback` receives the simulated renderer signals; `None` leaves them
    /// to the controller.
    pub fn new(loopback: Option<Sender<DisplayCommand>>) -> Self {
        Self {
            host: SimulatedEmbedHost {
                loopback: loopback.clone(),
                ..Default::default()
            },
            loopback,
            ..Default::default()
        }
    }

    fn mount_video(&mut self, path: &str) {
        if self.video_path.as_deref() != Some(path) {
            self.video = Some(SimulatedPlayer::new(0.0));
            self.video_path = Some(path.to_string());
        }
    }

    fn unmount_video(&mut self) {
        self.video = None;
        self.video_path = None;
    }

    /// Report a load once per (path, attempt).
    fn acknowledge(&mut self, path: &str, attempt: u32, can_play: bool) {
        let key = (path.to_string(), attempt);
        if self.acknowledged.as_ref() == Some(&key) {
            return;
        }
        self.acknowledged = Some(key);

        loop_back(
            &self.loopback,
            DisplayCommand::Media(MediaSignal::Loaded {
                path: path.to_string(),
                attempt,
            }),
        );
        if can_play {
            loop_back(
                &self.loopback,
                DisplayCommand::Player(PlayerSignal::CanPlay {
                    path: path.to_string(),
                }),
            );
        }
    }
}

impl Surface for HeadlessSurface {
    fn present(&mut self, selection: &LayerSelection) {
        info!(
            base = selection.base.name(),
            overlays = selection.overlays.len(),
            background = selection.background.is_some(),
            "Present"
        );

        match &selection.base {
            BaseLayer::Video {
                path,
                attempt,
                load,
            } => {
                self.mount_video(path);
                if matches!(load, LoadState::Loading { .. }) {
                    self.acknowledge(path, *attempt, true);
                }
            }
            BaseLayer::Image {
                path,
                attempt,
                load,
            } => {
                self.unmount_video();
                if matches!(load, LoadState::Loading { .. }) {
                    self.acknowledge(path, *attempt, false);
                }
            }
            _ => self.unmount_video(),
        }
    }

    fn video_player(&mut self) -> Option<&mut dyn MediaPlayer> {
        self.video
            .as_mut()
            .map(|player| player as &mut dyn MediaPlayer)
    }

    fn embed_host(&mut self) -> &mut dyn EmbedHost {
        &mut self.host
    }
}

fn loop_back(loopback: &Option<Sender<DisplayCommand>>, command: DisplayCommand) {
    if let Some(tx) = loopback {
        if let Err(e) = tx.try_send(command) {
            warn!("Failed to loop back renderer signal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video_layer(path: &str, attempt: u32, load: LoadState) -> LayerSelection {
        LayerSelection {
            base: BaseLayer::Video {
                path: path.to_string(),
                attempt,
                load,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_loading_video_is_acknowledged_once() {
        let (tx, rx) = stagecast_ipc::command_channel();
        let mut surface = HeadlessSurface::new(Some(tx));

        let layer = video_layer("/a.mp4", 0, LoadState::Loading { attempt: 0 });
        surface.present(&layer);
        surface.present(&layer);

        let signals: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            signals,
            vec![
                DisplayCommand::Media(MediaSignal::Loaded {
                    path: "/a.mp4".to_string(),
                    attempt: 0,
                }),
                DisplayCommand::Player(PlayerSignal::CanPlay {
                    path: "/a.mp4".to_string(),
                }),
            ]
        );
        assert!(surface.video_player().is_some());
    }

    #[test]
    fn test_manual_signals_stay_quiet() {
        let mut surface = HeadlessSurface::new(None);
        surface.present(&video_layer("/a.mp4", 0, LoadState::Loading { attempt: 0 }));
        assert!(surface.video_player().is_some());

        surface.present(&LayerSelection::default());
        assert!(surface.video_player().is_none());
    }

    #[test]
    fn test_widget_creation_reports_ready() {
        let (tx, rx) = stagecast_ipc::command_channel();
        let mut surface = HeadlessSurface::new(Some(tx));

        let handle = surface.embed_host().create_widget("abc", 12.0, 4).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            DisplayCommand::Widget(WidgetSignal::Ready { generation: 4 })
        );

        let player = surface.embed_host().widget_player(handle).unwrap();
        assert!(player.is_paused());
        assert_eq!(player.current_time(), 12.0);
    }

    #[test]
    fn test_player_clock() {
        let mut player = SimulatedPlayer::new(3.0);
        player.seek(10.0);
        assert_eq!(player.current_time(), 10.0);
        player.play();
        assert!(!player.is_paused());
        player.pause();
        assert!(player.current_time() >= 10.0);
    }
}
