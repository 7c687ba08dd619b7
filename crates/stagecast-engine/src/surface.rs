//! Seams between the engine and the renderer that hosts it.
//!
//! The renderer owns every player object. The engine only borrows them for
//! the duration of one call.

use stagecast_ipc::LayerSelection;

/// A playable media element (local video or the embedded widget).
pub trait MediaPlayer {
    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    /// Returns true if playback is paused.
    fn is_paused(&self) -> bool;

    fn seek(&mut self, time: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn set_muted(&mut self, muted: bool);

    /// Volume between 0.0 and 1.0.
    fn set_volume(&mut self, level: f64);
}

/// Handle to one embedded widget instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetHandle(pub u64);

/// Host API for the embedded third-party video widget.
pub trait EmbedHost {
    /// Returns true once the host's player API has loaded.
    fn is_api_ready(&self) -> bool;

    /// Create a widget in the container. Callbacks for it must be delivered
    /// as `WidgetSignal`s tagged with `generation`.
    fn create_widget(
        &mut self,
        video_id: &str,
        start_time: f64,
        generation: u64,
    ) -> Result<WidgetHandle, String>;

    /// Borrow a live widget as a player.
    fn widget_player(&mut self, handle: WidgetHandle) -> Option<&mut dyn MediaPlayer>;

    fn stop_widget(&mut self, handle: WidgetHandle);

    fn destroy_widget(&mut self, handle: WidgetHandle);

    /// Remove whatever the widget left in its container.
    fn clear_container(&mut self);
}

/// The display surface the engine drives.
pub trait Surface {
    /// Paint a new layer selection.
    fn present(&mut self, selection: &LayerSelection);

    /// The local video element, if one is mounted.
    fn video_player(&mut self) -> Option<&mut dyn MediaPlayer>;

    fn embed_host(&mut self) -> &mut dyn EmbedHost;
}
