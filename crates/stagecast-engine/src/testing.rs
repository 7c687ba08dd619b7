//! Recording fakes for the renderer seams.

use std::collections::HashMap;

use stagecast_ipc::LayerSelection;

use crate::surface::{EmbedHost, MediaPlayer, Surface, WidgetHandle};

#[derive(Debug, Clone, Default)]
pub struct FakePlayer {
    pub time: f64,
    pub paused: bool,
    pub seeks: Vec<f64>,
    pub plays: u32,
    pub pauses: u32,
    pub muted: bool,
    pub volume: f64,
}

impl FakePlayer {
    pub fn at(time: f64) -> Self {
        Self {
            time,
            paused: true,
            volume: 1.0,
            ..Default::default()
        }
    }
}

impl MediaPlayer for FakePlayer {
    fn current_time(&self) -> f64 {
        self.time
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn seek(&mut self, time: f64) {
        self.seeks.push(time);
        self.time = time;
    }

    fn play(&mut self) {
        self.plays += 1;
        self.paused = false;
    }

    fn pause(&mut self) {
        self.pauses += 1;
        self.paused = true;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_volume(&mut self, level: f64) {
        self.volume = level;
    }
}

#[derive(Debug, Default)]
pub struct FakeEmbedHost {
    pub api_ready: bool,
    pub fail_create: bool,
    pub next_handle: u64,
    pub live: HashMap<WidgetHandle, FakePlayer>,
    /// Generation passed to each `create_widget` call, in order.
    pub created: Vec<(String, u64)>,
    pub log: Vec<String>,
}

impl FakeEmbedHost {
    pub fn ready() -> Self {
        Self {
            api_ready: true,
            ..Default::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl EmbedHost for FakeEmbedHost {
    fn is_api_ready(&self) -> bool {
        self.api_ready
    }

    fn create_widget(
        &mut self,
        video_id: &str,
        start_time: f64,
        generation: u64,
    ) -> Result<WidgetHandle, String> {
        if self.fail_create {
            return Err("container missing".to_string());
        }
        let handle = WidgetHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle, FakePlayer::at(start_time));
        self.created.push((video_id.to_string(), generation));
        self.log.push(format!("create {video_id}"));
        Ok(handle)
    }

    fn widget_player(&mut self, handle: WidgetHandle) -> Option<&mut dyn MediaPlayer> {
        self.live
            .get_mut(&handle)
            .map(|player| player as &mut dyn MediaPlayer)
    }

    fn stop_widget(&mut self, handle: WidgetHandle) {
        self.log.push(format!("stop {}", handle.0));
    }

    fn destroy_widget(&mut self, handle: WidgetHandle) {
        self.live.remove(&handle);
        self.log.push(format!("destroy {}", handle.0));
    }

    fn clear_container(&mut self) {
        self.log.push("clear".to_string());
    }
}

#[derive(Debug, Default)]
pub struct FakeSurface {
    pub video: Option<FakePlayer>,
    pub host: FakeEmbedHost,
    pub presented: Vec<LayerSelection>,
}

impl FakeSurface {
    pub fn new() -> Self {
        Self {
            host: FakeEmbedHost::ready(),
            ..Default::default()
        }
    }

    pub fn last_presented(&self) -> Option<&LayerSelection> {
        self.presented.last()
    }
}

impl Surface for FakeSurface {
    fn present(&mut self, selection: &LayerSelection) {
        // Shares the host log so tests can check teardown happens first.
        self.host.log.push(format!("present {}", selection.base.name()));
        self.presented.push(selection.clone());
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
