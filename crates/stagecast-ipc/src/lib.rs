//! Typed controller<->display messages for stagecast.
//!
//! This crate defines every message exchanged between the controller process
//! and a display surface, plus the layer types the display hands to its
//! renderer.

mod commands;
mod error;
mod events;
mod state;
mod types;

pub use commands::DisplayCommand;
pub use error::IpcError;
pub use events::DisplayEvent;
pub use state::{BannerPhase, BaseLayer, LayerSelection, LoadState, Overlay, TakeoverLayer};
pub use types::{
    AnnouncementTool, Background, ClockTool, CombinedSlides, ContentUpdate, CountdownTool,
    DisplayMode, MediaDescriptor, MediaKind, MediaSignal, PlaybackPosition, PlayerSignal,
    PresentationSlide, QueryReply, QueryRequest, RotatingMessagesTool, SlideContent, SlideData,
    StopwatchTool, ThemeCategory, ThemeUpdate, ToolKind, ToolUpdate, VideoCommand,
    WidgetPlayerState, WidgetSignal, YoutubeCommand,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (controller → display).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (display → controller).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<DisplayCommand>, Receiver<DisplayCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<DisplayEvent>, Receiver<DisplayEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}

/// Decodes one JSON-encoded command.
pub fn decode_command(line: &str) -> Result<DisplayCommand, IpcError> {
    Ok(serde_json::from_str(line)?)
}

/// Encodes an event as a single JSON line.
pub fn encode_event(event: &DisplayEvent) -> Result<String, IpcError> {
    Ok(serde_json::to_string(event)?)
}
