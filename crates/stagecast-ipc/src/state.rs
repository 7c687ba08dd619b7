//! Display state types shared with the renderer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{
    Background, ClockTool, CombinedSlides, CountdownTool, DisplayMode, PresentationSlide,
    SlideData, StopwatchTool,
};

/// Load state of a local media item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LoadState {
    /// No media selected.
    #[default]
    Idle,

    /// Waiting for the renderer to load `attempt`.
    Loading { attempt: u32 },

    /// Media is displayable.
    Ready,

    /// Load failed.
    #[serde(rename_all = "camelCase")]
    Error {
        message: String,
        retry_count: u32,

        /// A retry is scheduled. When false the error is terminal.
        retrying: bool,
    },
}

impl LoadState {
    /// Returns true while a load attempt is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    /// Returns true if the media is displayable.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns true for an error that will not be retried.
    pub fn is_terminal_error(&self) -> bool {
        matches!(self, Self::Error { retrying: false, .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading { .. } => "Loading",
            Self::Ready => "Ready",
            Self::Error { retrying: true, .. } => "Retrying",
            Self::Error { .. } => "Error",
        }
    }
}

/// A takeover tool shown as the base layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "camelCase")]
pub enum TakeoverLayer {
    Countdown(CountdownTool),
    Clock(ClockTool),
    Stopwatch(StopwatchTool),
}

/// The single exclusive full-screen layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "camelCase")]
pub enum BaseLayer {
    /// Nothing but the background.
    #[default]
    Blank,

    Takeover(TakeoverLayer),

    #[serde(rename_all = "camelCase")]
    EmbeddedVideo { video_id: String, title: String },

    /// Local video. `attempt` changes on every retry so the renderer reloads.
    Video {
        path: String,
        attempt: u32,
        load: LoadState,
    },

    Image {
        path: String,
        attempt: u32,
        load: LoadState,
    },

    Slide {
        slide: SlideData,
        combined: Option<CombinedSlides>,
        mode: DisplayMode,
    },

    Presentation { slide: PresentationSlide },
}

impl BaseLayer {
    /// Returns a simple string representation of the layer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Blank => "Blank",
            Self::Takeover(TakeoverLayer::Countdown(_)) => "Countdown",
            Self::Takeover(TakeoverLayer::Clock(_)) => "Clock",
            Self::Takeover(TakeoverLayer::Stopwatch(_)) => "Stopwatch",
            Self::EmbeddedVideo { .. } => "EmbeddedVideo",
            Self::Video { .. } => "Video",
            Self::Image { .. } => "Image",
            Self::Slide { .. } => "Slide",
            Self::Presentation { .. } => "Presentation",
        }
    }

    /// Returns true if this is a takeover tool.
    pub fn is_takeover(&self) -> bool {
        matches!(self, Self::Takeover(_))
    }
}

/// Visibility phase of the announcement banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BannerPhase {
    #[default]
    Hidden,
    Visible,
    Fading,
}

/// An always-on overlay drawn above the base layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "overlay", rename_all = "camelCase")]
pub enum Overlay {
    /// Rotating message ticker.
    Ticker {
        message: String,
        index: usize,
        count: usize,
    },

    /// Announcement banner.
    Announcement { text: String, phase: BannerPhase },
}

/// Everything the renderer needs to paint one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSelection {
    pub base: BaseLayer,

    /// Overlays, bottom to top.
    pub overlays: Vec<Overlay>,

    pub background: Option<Background>,

    /// Theme for the active content. Opaque to the engine.
    pub theme: Option<Value>,
}
