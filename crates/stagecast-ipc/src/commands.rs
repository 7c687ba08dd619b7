//! Commands sent from the controller (and the local renderer) to the display engine.

use serde::{Deserialize, Serialize};

use crate::types::{
    ContentUpdate, MediaDescriptor, MediaSignal, PlayerSignal, QueryReply, ThemeUpdate,
    ToolUpdate, VideoCommand, WidgetSignal, YoutubeCommand,
};

/// Messages the display engine consumes, applied strictly in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayCommand {
    /// Replace the slide/presentation content.
    SlideUpdate(ContentUpdate),

    /// Select a local image or video, or clear it with `None`.
    MediaUpdate(Option<MediaDescriptor>),

    /// Transport command for the local video.
    VideoCommand(VideoCommand),

    /// Transport command for the embedded widget.
    YoutubeCommand(YoutubeCommand),

    /// Theme for one content category.
    ThemeUpdate(ThemeUpdate),

    /// State of one tool kind.
    ToolUpdate(ToolUpdate),

    /// Answer to a query previously emitted as `DisplayEvent::Query`.
    QueryReply { id: u64, reply: QueryReply },

    /// Renderer load signal for the current media element.
    Media(MediaSignal),

    /// Local video player lifecycle signal.
    Player(PlayerSignal),

    /// Embedded widget callback.
    Widget(WidgetSignal),

    /// Shut the engine down.
    Shutdown,
}

impl DisplayCommand {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SlideUpdate(_) => "slideUpdate",
            Self::MediaUpdate(_) => "mediaUpdate",
            Self::VideoCommand(_) => "videoCommand",
            Self::YoutubeCommand(_) => "youtubeCommand",
            Self::ThemeUpdate(_) => "themeUpdate",
            Self::ToolUpdate(_) => "toolUpdate",
            Self::QueryReply { .. } => "queryReply",
            Self::Media(_) => "media",
            Self::Player(_) => "player",
            Self::Widget(_) => "widget",
            Self::Shutdown => "shutdown",
        }
    }
}
