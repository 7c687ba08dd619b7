//! Display synchronization engine for stagecast.
//!
//! This crate keeps a display surface consistent with the controller: it
//! stores the latest pushed content, resolves which layer is on screen, drives
//! local media loading with retries, aligns players with the controller's
//! canonical position, manages the embedded video widget and runs the overlay
//! timers.

mod config;
mod content;
mod embed;
mod error;
mod layers;
mod media;
mod orchestrator;
mod overlay;
mod surface;
mod sync;
mod timers;

#[cfg(test)]
mod testing;

pub use config::{
    EmbedPolicy, EngineConfig, MediaLoadPolicy, OverlayPolicy, SyncConfig, SyncPolicy,
};
pub use content::{ContentKind, ContentStore, EmbeddedVideoState, StoreEffects, ToolStates};
pub use embed::{EmbedState, EmbeddedVideoManager};
pub use error::EngineError;
pub use layers::{resolve, BannerView, Snapshot, TickerView};
pub use media::MediaLoadController;
pub use orchestrator::DisplayEngine;
pub use overlay::{AnnouncementBanner, MessageRotation};
pub use surface::{EmbedHost, MediaPlayer, Surface, WidgetHandle};
pub use sync::{reconcile, DriftCorrection, PlayerKind, PositionSync, SyncStep};
pub use timers::{TimerId, TimerKind, TimerQueue};

use crossbeam_channel::{Receiver, Sender};
use stagecast_ipc::{DisplayCommand, DisplayEvent};

/// Create an engine instance with IPC channels.
pub fn create_engine<S: Surface>(
    command_rx: Receiver<DisplayCommand>,
    event_tx: Sender<DisplayEvent>,
    surface: S,
    config: EngineConfig,
) -> DisplayEngine<S> {
    DisplayEngine::new(command_rx, event_tx, surface, config)
}
