//! Common types used across display IPC messages.
//!
//! Every field that may be missing on the wire carries a serde default, so a
//! partially filled message degrades to an empty value instead of being
//! rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A content update pushed by the controller (`slideUpdate`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    /// What should be shown.
    #[serde(default)]
    pub content: SlideContent,

    /// Background behind slide content.
    #[serde(default)]
    pub background: Option<Background>,

    /// Theme attached to this particular update. Opaque to the engine.
    #[serde(default)]
    pub active_theme: Option<Value>,

    /// Category whose stored theme applies when `active_theme` is absent.
    #[serde(default)]
    pub category: Option<ThemeCategory>,
}

/// The content carried by a [`ContentUpdate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SlideContent {
    /// Nothing on screen.
    #[default]
    Blank,

    /// A song or scripture slide.
    Slide {
        slide: SlideData,

        /// Neighbouring slides shown together with `slide`.
        #[serde(default)]
        combined: Option<CombinedSlides>,

        #[serde(default)]
        mode: DisplayMode,
    },

    /// A free-form presentation slide.
    Presentation { slide: PresentationSlide },

    /// The controller is driving a tool; base content is left untouched.
    ToolPassthrough,
}

/// Text of a single song/scripture slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SlideData {
    /// Slide lines, top to bottom.
    pub lines: Vec<String>,

    /// Section label such as "Verse 1".
    pub label: Option<String>,

    /// Position of the slide within its item.
    pub index: usize,
}

/// Several slides rendered together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedSlides(pub Vec<SlideData>);

/// How slide text is laid out on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// Full-screen text.
    #[default]
    Full,

    /// Text confined to the lower third.
    LowerThird,
}

/// A free-form presentation slide. Its elements are forwarded as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PresentationSlide {
    pub id: String,
    pub elements: Value,
}

/// Background behind slide content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Background {
    Color { value: String },
    Gradient { value: String },
    Image { path: String },
}

/// Kind of local media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A local media item (`mediaUpdate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    #[serde(rename = "type")]
    pub kind: MediaKind,

    #[serde(default)]
    pub path: String,
}

impl MediaDescriptor {
    /// Create a descriptor for a local image.
    pub fn image(path: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            path: path.into(),
        }
    }

    /// Create a descriptor for a local video.
    pub fn video(path: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            path: path.into(),
        }
    }
}

/// Canonical playback position, owned by the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackPosition {
    /// Position in seconds.
    pub time: f64,

    /// Whether playback should be running.
    pub is_playing: bool,
}

/// Transport command for the local video player (`videoCommand`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VideoCommand {
    Play,
    Pause,
    Resume,
    Seek { time: f64 },
    Stop,
    Mute { muted: bool },
    Volume { level: f64 },

    /// Re-align with the canonical position.
    #[serde(rename_all = "camelCase")]
    Sync { time: f64, is_playing: bool },
}

/// Transport command for the embedded video widget (`youtubeCommand`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum YoutubeCommand {
    /// Show a new embedded video.
    #[serde(rename_all = "camelCase")]
    Load {
        video_id: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        start_time: f64,
    },
    Stop,
    Play,
    Pause,
    Seek { time: f64 },

    /// Periodic drift correction pushed by the controller.
    #[serde(rename_all = "camelCase")]
    Sync { time: f64, is_playing: bool },
}

/// Content category a theme applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThemeCategory {
    #[default]
    Songs,
    Scripture,
    Presentation,
}

/// A theme pushed by the controller (`themeUpdate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeUpdate {
    #[serde(default)]
    pub category: ThemeCategory,

    /// Theme payload. `null` clears the theme for the category.
    #[serde(default)]
    pub theme: Value,
}

/// Tool kinds known to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolKind {
    Countdown,
    Announcement,
    RotatingMessages,
    Clock,
    Stopwatch,
}

impl ToolKind {
    /// Whether this tool owns the full screen while active.
    pub fn is_takeover(self) -> bool {
        matches!(self, Self::Countdown | Self::Clock | Self::Stopwatch)
    }
}

/// State of one tool kind (`toolUpdate`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum ToolUpdate {
    Countdown(CountdownTool),
    Announcement(AnnouncementTool),
    RotatingMessages(RotatingMessagesTool),
    Clock(ClockTool),
    Stopwatch(StopwatchTool),
}

impl ToolUpdate {
    /// Returns the kind of tool this update is for.
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::Countdown(_) => ToolKind::Countdown,
            Self::Announcement(_) => ToolKind::Announcement,
            Self::RotatingMessages(_) => ToolKind::RotatingMessages,
            Self::Clock(_) => ToolKind::Clock,
            Self::Stopwatch(_) => ToolKind::Stopwatch,
        }
    }
}

/// Countdown to a target time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CountdownTool {
    pub active: bool,

    /// Target as milliseconds since the Unix epoch.
    pub end_time_ms: Option<u64>,

    /// Caption shown with the countdown.
    pub message: String,
}

/// Banner announcement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnnouncementTool {
    pub active: bool,
    pub text: String,

    /// How long the banner stays before fading. Falls back to the engine
    /// configuration when absent.
    pub duration_secs: Option<u64>,
}

/// Ticker of rotating messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RotatingMessagesTool {
    pub active: bool,
    pub messages: Vec<String>,

    /// Seconds between messages.
    pub interval_secs: Option<u64>,
}

impl RotatingMessagesTool {
    /// An update without messages counts as inactive.
    pub fn is_effectively_active(&self) -> bool {
        self.active && !self.messages.is_empty()
    }
}

/// Full-screen clock.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClockTool {
    pub active: bool,
    pub format_24h: bool,
    pub show_date: bool,
}

/// Full-screen stopwatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StopwatchTool {
    pub active: bool,
    pub running: bool,

    /// Elapsed time accumulated before `started_at_ms`.
    pub elapsed_ms: u64,

    /// When the current run started, milliseconds since the Unix epoch.
    pub started_at_ms: Option<u64>,
}

/// Request sent over the query channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryRequest {
    /// `getVideoPosition`.
    VideoPosition,

    /// `getYoutubePosition`.
    YoutubePosition,

    /// `signalVideoReady`.
    VideoReady,
}

/// Answer to a [`QueryRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryReply {
    Position(PlaybackPosition),

    /// Whether the controller initiated playback itself.
    #[serde(rename_all = "camelCase")]
    VideoReady { controller_started: bool },

    Failed { message: String },
}

/// Load signal from the renderer for the current local media element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaSignal {
    Loaded {
        path: String,
        attempt: u32,
    },
    Failed {
        path: String,
        attempt: u32,
        #[serde(default)]
        message: String,
    },
}

/// Lifecycle signal from the local video player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlayerSignal {
    /// The player buffered enough to start.
    CanPlay { path: String },

    TimeUpdate { time: f64, duration: f64 },
    Playing,
    Paused,
    Ended,
}

/// Playback state reported by the embedded widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetPlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

/// Callback from the embedded widget host. `generation` identifies the widget
/// instance the callback was registered for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WidgetSignal {
    Ready {
        generation: u64,
    },
    Error {
        generation: u64,
        code: i32,
    },
    StateChange {
        generation: u64,
        state: WidgetPlayerState,
    },
}
