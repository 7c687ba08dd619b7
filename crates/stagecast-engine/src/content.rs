//! Content store: the latest state pushed by the controller.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use stagecast_ipc::{
    AnnouncementTool, Background, ClockTool, ContentUpdate, CountdownTool, DisplayCommand,
    MediaDescriptor, MediaKind, RotatingMessagesTool, SlideContent, StopwatchTool, ThemeCategory,
    ToolKind, ToolUpdate, VideoCommand, YoutubeCommand,
};

/// Logical content kind currently populated in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Blank,
    Slide,
    Presentation,
    Media,
    EmbeddedVideo,
    Tool,
}

/// The embedded video slice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedVideoState {
    pub video_id: Option<String>,
    pub title: String,
}

/// Latest state of every tool kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolStates {
    pub countdown: CountdownTool,
    pub announcement: AnnouncementTool,
    pub rotating_messages: RotatingMessagesTool,
    pub clock: ClockTool,
    pub stopwatch: StopwatchTool,
}

impl ToolStates {
    /// Replace the state of the tool the update is for.
    pub fn apply(&mut self, update: ToolUpdate) {
        match update {
            ToolUpdate::Countdown(tool) => self.countdown = tool,
            ToolUpdate::Announcement(tool) => self.announcement = tool,
            ToolUpdate::RotatingMessages(tool) => self.rotating_messages = tool,
            ToolUpdate::Clock(tool) => self.clock = tool,
            ToolUpdate::Stopwatch(tool) => self.stopwatch = tool,
        }
    }

    /// Returns whether the given tool is active.
    pub fn is_active(&self, kind: ToolKind) -> bool {
        match kind {
            ToolKind::Countdown => self.countdown.active,
            ToolKind::Announcement => self.announcement.active,
            ToolKind::RotatingMessages => self.rotating_messages.is_effectively_active(),
            ToolKind::Clock => self.clock.active,
            ToolKind::Stopwatch => self.stopwatch.active,
        }
    }

    /// Returns true if any takeover tool is active.
    pub fn any_takeover_active(&self) -> bool {
        self.countdown.active || self.clock.active || self.stopwatch.active
    }
}

/// Which slices a store mutation touched, so the engine can follow up with
/// lifecycle work (teardown, reload) before the next resolve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreEffects {
    /// The media descriptor was replaced (possibly by nothing).
    pub media_replaced: bool,

    /// A previously set embedded video id was cleared or replaced.
    pub embedded_cleared: bool,

    /// A tool state changed.
    pub tool_changed: Option<ToolKind>,
}

/// Holds the latest content, media, embedded video, theme and tool state.
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    content: SlideContent,
    background: Option<Background>,
    active_theme: Option<Value>,
    category: Option<ThemeCategory>,
    tool_passthrough: bool,
    media: Option<MediaDescriptor>,
    embedded: EmbeddedVideoState,
    themes: HashMap<ThemeCategory, Value>,
    tools: ToolStates,
}

impl ContentStore {
    /// Create an empty (blank) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one controller message. Messages that do not carry store state
    /// leave it untouched.
    pub fn apply(&mut self, command: &DisplayCommand) -> StoreEffects {
        match command {
            DisplayCommand::SlideUpdate(update) => self.apply_content(update.clone()),
            DisplayCommand::MediaUpdate(media) => self.set_media(media.clone()),
            DisplayCommand::VideoCommand(VideoCommand::Stop) => self.stop_local_video(),
            DisplayCommand::YoutubeCommand(YoutubeCommand::Load {
                video_id, title, ..
            }) => self.load_embedded(video_id, title),
            DisplayCommand::YoutubeCommand(YoutubeCommand::Stop) => StoreEffects {
                embedded_cleared: self.clear_embedded(),
                ..Default::default()
            },
            DisplayCommand::ThemeUpdate(update) => {
                if update.theme.is_null() {
                    self.themes.remove(&update.category);
                } else {
                    self.themes.insert(update.category, update.theme.clone());
                }
                StoreEffects::default()
            }
            DisplayCommand::ToolUpdate(update) => {
                let kind = update.kind();
                self.tools.apply(update.clone());
                StoreEffects {
                    tool_changed: Some(kind),
                    ..Default::default()
                }
            }
            _ => StoreEffects::default(),
        }
    }

    fn apply_content(&mut self, update: ContentUpdate) -> StoreEffects {
        let mut effects = StoreEffects::default();

        self.background = update.background;
        self.active_theme = update.active_theme;
        self.category = update.category;

        match update.content {
            SlideContent::ToolPassthrough => {
                self.tool_passthrough = true;
            }
            content => {
                debug!(?content, "Content replaced");
                // Slide, presentation and blank all take the base layer away
                // from media and embedded video.
                self.tool_passthrough = false;
                self.content = content;
                effects.media_replaced = self.media.take().is_some();
                effects.embedded_cleared = self.clear_embedded();
            }
        }

        effects
    }

    fn set_media(&mut self, media: Option<MediaDescriptor>) -> StoreEffects {
        let media = media.filter(|m| !m.path.is_empty());
        if media.is_some() {
            self.tool_passthrough = false;
        }
        // Re-pushing the current item is not a replacement.
        if media == self.media {
            return StoreEffects::default();
        }

        let mut effects = StoreEffects {
            media_replaced: true,
            ..Default::default()
        };

        if media.is_some() {
            effects.embedded_cleared = self.clear_embedded();
        }
        self.media = media;
        effects
    }

    fn stop_local_video(&mut self) -> StoreEffects {
        let is_video = matches!(&self.media, Some(m) if m.kind == MediaKind::Video);
        if !is_video {
            return StoreEffects::default();
        }
        self.media = None;
        StoreEffects {
            media_replaced: true,
            ..Default::default()
        }
    }

    fn load_embedded(&mut self, video_id: &str, title: &str) -> StoreEffects {
        if video_id.is_empty() {
            return StoreEffects {
                embedded_cleared: self.clear_embedded(),
                ..Default::default()
            };
        }

        self.tool_passthrough = false;
        let replaced = self
            .embedded
            .video_id
            .as_deref()
            .is_some_and(|current| current != video_id);

        self.embedded = EmbeddedVideoState {
            video_id: Some(video_id.to_string()),
            title: title.to_string(),
        };

        StoreEffects {
            media_replaced: self.media.take().is_some(),
            embedded_cleared: replaced,
            tool_changed: None,
        }
    }

    /// Clears the embedded video slice. Returns true if one was set.
    fn clear_embedded(&mut self) -> bool {
        let had = self.embedded.video_id.is_some();
        self.embedded = EmbeddedVideoState::default();
        had
    }

    /// Drop an embedded video request whose widget could not be created, so
    /// the base layer falls back to the underlying content.
    pub fn abandon_embedded(&mut self, video_id: &str) -> bool {
        if self.embedded.video_id.as_deref() != Some(video_id) {
            return false;
        }
        self.clear_embedded()
    }

    /// Derive the logical content kind from the populated slices.
    pub fn active_kind(&self) -> ContentKind {
        if self.embedded.video_id.is_some() {
            ContentKind::EmbeddedVideo
        } else if self.media.is_some() {
            ContentKind::Media
        } else if self.tool_passthrough {
            ContentKind::Tool
        } else {
            match self.content {
                SlideContent::Slide { .. } => ContentKind::Slide,
                SlideContent::Presentation { .. } => ContentKind::Presentation,
                SlideContent::Blank | SlideContent::ToolPassthrough => ContentKind::Blank,
            }
        }
    }

    /// Theme for the current content: the update's own theme, else the
    /// stored theme for its category.
    pub fn theme(&self) -> Option<&Value> {
        if let Some(theme) = &self.active_theme {
            return Some(theme);
        }
        let category = self.category.unwrap_or(match self.content {
            SlideContent::Presentation { .. } => ThemeCategory::Presentation,
            _ => ThemeCategory::Songs,
        });
        self.themes.get(&category)
    }

    pub fn content(&self) -> &SlideContent {
        &self.content
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn media(&self) -> Option<&MediaDescriptor> {
        self.media.as_ref()
    }

    pub fn embedded(&self) -> &EmbeddedVideoState {
        &self.embedded
    }

    pub fn tools(&self) -> &ToolStates {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stagecast_ipc::{PresentationSlide, SlideData, ThemeUpdate};

    fn slide(text: &str) -> DisplayCommand {
        DisplayCommand::SlideUpdate(ContentUpdate {
            content: SlideContent::Slide {
                slide: SlideData {
                    lines: vec![text.to_string()],
                    ..Default::default()
                },
                combined: None,
                mode: Default::default(),
            },
            ..Default::default()
        })
    }

    fn youtube(id: &str) -> DisplayCommand {
        DisplayCommand::YoutubeCommand(YoutubeCommand::Load {
            video_id: id.to_string(),
            title: format!("title {id}"),
            start_time: 0.0,
        })
    }

    #[test]
    fn test_slide_clears_media_and_embedded() {
        let mut store = ContentStore::new();
        store.apply(&youtube("v1"));
        assert_eq!(store.active_kind(), ContentKind::EmbeddedVideo);

        let effects = store.apply(&slide("hello"));
        assert!(effects.embedded_cleared);
        assert!(store.embedded().video_id.is_none());
        assert_eq!(store.active_kind(), ContentKind::Slide);

        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::image("/bg.png"))));
        let effects = store.apply(&slide("again"));
        assert!(effects.media_replaced);
        assert!(store.media().is_none());
    }

    #[test]
    fn test_presentation_replaces_slide() {
        let mut store = ContentStore::new();
        store.apply(&slide("hello"));
        store.apply(&DisplayCommand::SlideUpdate(ContentUpdate {
            content: SlideContent::Presentation {
                slide: PresentationSlide {
                    id: "p1".to_string(),
                    elements: json!([]),
                },
            },
            ..Default::default()
        }));

        assert!(matches!(store.content(), SlideContent::Presentation { .. }));
        assert_eq!(store.active_kind(), ContentKind::Presentation);
    }

    #[test]
    fn test_blank_keeps_tools() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::ToolUpdate(ToolUpdate::Clock(ClockTool {
            active: true,
            ..Default::default()
        })));
        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/a.mp4"))));

        let effects = store.apply(&DisplayCommand::SlideUpdate(ContentUpdate::default()));
        assert!(effects.media_replaced);
        assert_eq!(store.active_kind(), ContentKind::Blank);
        assert!(store.tools().clock.active);
    }

    #[test]
    fn test_media_clears_embedded_and_null_clears_media() {
        let mut store = ContentStore::new();
        store.apply(&youtube("v1"));

        let effects =
            store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/a.mp4"))));
        assert!(effects.media_replaced);
        assert!(effects.embedded_cleared);
        assert_eq!(store.active_kind(), ContentKind::Media);

        let effects = store.apply(&DisplayCommand::MediaUpdate(None));
        assert!(effects.media_replaced);
        assert!(store.media().is_none());
    }

    #[test]
    fn test_same_media_is_not_a_replacement() {
        let mut store = ContentStore::new();
        let effects =
            store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/a.mp4"))));
        assert!(effects.media_replaced);

        let effects =
            store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/a.mp4"))));
        assert_eq!(effects, StoreEffects::default());

        let effects =
            store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::image("/a.mp4"))));
        assert!(effects.media_replaced);
    }

    #[test]
    fn test_media_ends_tool_passthrough() {
        let mut store = ContentStore::new();
        store.apply(&slide("hello"));
        store.apply(&DisplayCommand::SlideUpdate(ContentUpdate {
            content: SlideContent::ToolPassthrough,
            ..Default::default()
        }));
        assert_eq!(store.active_kind(), ContentKind::Tool);

        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::image("/a.png"))));
        store.apply(&DisplayCommand::MediaUpdate(None));
        assert_eq!(store.active_kind(), ContentKind::Slide);

        store.apply(&DisplayCommand::SlideUpdate(ContentUpdate {
            content: SlideContent::ToolPassthrough,
            ..Default::default()
        }));
        store.apply(&youtube("v1"));
        store.apply(&DisplayCommand::YoutubeCommand(YoutubeCommand::Stop));
        assert_eq!(store.active_kind(), ContentKind::Slide);
    }

    #[test]
    fn test_empty_media_path_clears_media() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/a.mp4"))));
        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video(""))));
        assert!(store.media().is_none());
    }

    #[test]
    fn test_video_stop_only_clears_video() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::image("/a.png"))));
        let effects = store.apply(&DisplayCommand::VideoCommand(VideoCommand::Stop));
        assert!(!effects.media_replaced);
        assert!(store.media().is_some());

        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/a.mp4"))));
        let effects = store.apply(&DisplayCommand::VideoCommand(VideoCommand::Stop));
        assert!(effects.media_replaced);
        assert!(store.media().is_none());
    }

    #[test]
    fn test_youtube_switch_reports_replacement() {
        let mut store = ContentStore::new();
        assert!(!store.apply(&youtube("v1")).embedded_cleared);
        assert!(!store.apply(&youtube("v1")).embedded_cleared);
        assert!(store.apply(&youtube("v2")).embedded_cleared);
        assert_eq!(store.embedded().video_id.as_deref(), Some("v2"));

        assert!(store
            .apply(&DisplayCommand::YoutubeCommand(YoutubeCommand::Stop))
            .embedded_cleared);
        assert_eq!(store.active_kind(), ContentKind::Blank);
    }

    #[test]
    fn test_tool_passthrough_keeps_base_content() {
        let mut store = ContentStore::new();
        store.apply(&slide("hello"));
        store.apply(&DisplayCommand::SlideUpdate(ContentUpdate {
            content: SlideContent::ToolPassthrough,
            ..Default::default()
        }));

        assert!(matches!(store.content(), SlideContent::Slide { .. }));
        assert_eq!(store.active_kind(), ContentKind::Tool);
    }

    #[test]
    fn test_theme_selection() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::ThemeUpdate(ThemeUpdate {
            category: ThemeCategory::Songs,
            theme: json!({"font": "A"}),
        }));
        store.apply(&DisplayCommand::ThemeUpdate(ThemeUpdate {
            category: ThemeCategory::Scripture,
            theme: json!({"font": "B"}),
        }));
        store.apply(&slide("hello"));
        assert_eq!(store.theme(), Some(&json!({"font": "A"})));

        store.apply(&DisplayCommand::SlideUpdate(ContentUpdate {
            category: Some(ThemeCategory::Scripture),
            ..Default::default()
        }));
        assert_eq!(store.theme(), Some(&json!({"font": "B"})));

        store.apply(&DisplayCommand::SlideUpdate(ContentUpdate {
            active_theme: Some(json!({"font": "C"})),
            category: Some(ThemeCategory::Scripture),
            ..Default::default()
        }));
        assert_eq!(store.theme(), Some(&json!({"font": "C"})));
    }

    #[test]
    fn test_malformed_rotating_messages_inactive() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::ToolUpdate(ToolUpdate::RotatingMessages(
            RotatingMessagesTool {
                active: true,
                messages: Vec::new(),
                interval_secs: None,
            },
        )));
        assert!(!store.tools().is_active(ToolKind::RotatingMessages));
    }
}
