//! Layer resolution.
//!
//! [`resolve`] is the single place where layer precedence lives. It is a pure
//! function of the snapshot it is given.
//!
//! Base layer precedence, highest first:
//!
//! | Rank | Layer                                         |
//! |------|-----------------------------------------------|
//! | 1    | countdown, clock, stopwatch (first active)    |
//! | 2    | embedded video                                |
//! | 3    | local video                                   |
//! | 4    | local image                                   |
//! | 5    | slide / presentation                          |
//! | 6    | blank                                         |
//!
//! The ticker and the announcement banner sit above the base layer unless a
//! takeover tool is active.

use stagecast_ipc::{
    BannerPhase, BaseLayer, LayerSelection, LoadState, MediaKind, Overlay, SlideContent,
    TakeoverLayer,
};

use crate::content::{ContentStore, ToolStates};

/// Current ticker message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerView<'a> {
    pub message: &'a str,
    pub index: usize,
    pub count: usize,
}

/// Current banner text and phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BannerView<'a> {
    pub text: &'a str,
    pub phase: BannerPhase,
}

/// Everything the resolver reads.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub store: &'a ContentStore,
    pub media_load: &'a LoadState,
    pub media_attempt: u32,
    pub ticker: Option<TickerView<'a>>,
    pub banner: Option<BannerView<'a>>,
}

/// Select the base layer and overlays for a snapshot.
pub fn resolve(snapshot: &Snapshot<'_>) -> LayerSelection {
    let store = snapshot.store;
    let takeover = takeover_layer(store.tools());

    let base = match takeover {
        Some(layer) => BaseLayer::Takeover(layer),
        None => content_layer(snapshot),
    };

    let mut overlays = Vec::new();
    if !base.is_takeover() {
        if let Some(ticker) = snapshot.ticker {
            overlays.push(Overlay::Ticker {
                message: ticker.message.to_string(),
                index: ticker.index,
                count: ticker.count,
            });
        }
        if let Some(banner) = snapshot.banner.filter(|b| b.phase != BannerPhase::Hidden) {
            overlays.push(Overlay::Announcement {
                text: banner.text.to_string(),
                phase: banner.phase,
            });
        }
    }

    LayerSelection {
        base,
        overlays,
        background: store.background().cloned(),
        theme: store.theme().cloned(),
    }
}

/// First active takeover tool in fixed order.
fn takeover_layer(tools: &ToolStates) -> Option<TakeoverLayer> {
    if tools.countdown.active {
        Some(TakeoverLayer::Countdown(tools.countdown.clone()))
    } else if tools.clock.active {
        Some(TakeoverLayer::Clock(tools.clock.clone()))
    } else if tools.stopwatch.active {
        Some(TakeoverLayer::Stopwatch(tools.stopwatch.clone()))
    } else {
        None
    }
}

fn content_layer(snapshot: &Snapshot<'_>) -> BaseLayer {
    let store = snapshot.store;

    if let Some(video_id) = &store.embedded().video_id {
        return BaseLayer::EmbeddedVideo {
            video_id: video_id.clone(),
            title: store.embedded().title.clone(),
        };
    }

    if let Some(media) = store.media() {
        let path = media.path.clone();
        let attempt = snapshot.media_attempt;
        let load = snapshot.media_load.clone();
        return match media.kind {
            MediaKind::Video => BaseLayer::Video {
                path,
                attempt,
                load,
            },
            MediaKind::Image => BaseLayer::Image {
                path,
                attempt,
                load,
            },
        };
    }

    match store.content() {
        SlideContent::Slide {
            slide,
            combined,
            mode,
        } => BaseLayer::Slide {
            slide: slide.clone(),
            combined: combined.clone(),
            mode: *mode,
        },
        SlideContent::Presentation { slide } => BaseLayer::Presentation {
            slide: slide.clone(),
        },
        SlideContent::Blank | SlideContent::ToolPassthrough => BaseLayer::Blank,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagecast_ipc::{
        ClockTool, ContentUpdate, CountdownTool, DisplayCommand, MediaDescriptor, SlideData,
        StopwatchTool, ToolUpdate, YoutubeCommand,
    };

    static IDLE: LoadState = LoadState::Idle;

    fn snapshot(store: &ContentStore) -> Snapshot<'_> {
        Snapshot {
            store,
            media_load: &IDLE,
            media_attempt: 0,
            ticker: None,
            banner: None,
        }
    }

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

    fn commands() -> Vec<DisplayCommand> {
        vec![
            slide("one"),
            DisplayCommand::MediaUpdate(Some(MediaDescriptor::image("/bg.png"))),
            DisplayCommand::ToolUpdate(ToolUpdate::Stopwatch(StopwatchTool {
                active: true,
                ..Default::default()
            })),
            DisplayCommand::YoutubeCommand(YoutubeCommand::Load {
                video_id: "abc".to_string(),
                title: "Song".to_string(),
                start_time: 0.0,
            }),
            slide("two"),
            DisplayCommand::ToolUpdate(ToolUpdate::Stopwatch(StopwatchTool::default())),
            DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/v.mp4"))),
        ]
    }

    #[test]
    fn test_incremental_and_batch_resolution_agree() {
        let mut incremental = ContentStore::new();
        let mut last = LayerSelection::default();
        for command in commands() {
            incremental.apply(&command);
            last = resolve(&snapshot(&incremental));
        }

        let mut batch = ContentStore::new();
        for command in commands() {
            batch.apply(&command);
        }

        assert_eq!(last, resolve(&snapshot(&batch)));
        assert_eq!(last.base.name(), "Video");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut store = ContentStore::new();
        for command in commands() {
            store.apply(&command);
        }
        let snap = snapshot(&store);
        assert_eq!(resolve(&snap), resolve(&snap));
    }

    #[test]
    fn test_takeover_beats_media_and_embedded_and_suppresses_overlays() {
        let clock = DisplayCommand::ToolUpdate(ToolUpdate::Clock(ClockTool {
            active: true,
            ..Default::default()
        }));

        let mut with_embedded = ContentStore::new();
        with_embedded.apply(&DisplayCommand::YoutubeCommand(YoutubeCommand::Load {
            video_id: "abc".to_string(),
            title: String::new(),
            start_time: 0.0,
        }));
        with_embedded.apply(&clock);

        let mut with_media = ContentStore::new();
        with_media.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/v.mp4"))));
        with_media.apply(&clock);

        for store in [&with_embedded, &with_media] {
            let snap = Snapshot {
                ticker: Some(TickerView {
                    message: "hello",
                    index: 0,
                    count: 2,
                }),
                banner: Some(BannerView {
                    text: "notice",
                    phase: BannerPhase::Visible,
                }),
                ..snapshot(store)
            };

            let selection = resolve(&snap);
            assert!(matches!(
                selection.base,
                BaseLayer::Takeover(TakeoverLayer::Clock(_))
            ));
            assert!(selection.overlays.is_empty());
        }

        with_media.apply(&DisplayCommand::ToolUpdate(ToolUpdate::Countdown(CountdownTool {
            active: true,
            ..Default::default()
        })));
        assert!(matches!(
            resolve(&snapshot(&with_media)).base,
            BaseLayer::Takeover(TakeoverLayer::Countdown(_))
        ));
    }

    #[test]
    fn test_takeover_fixed_order() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::ToolUpdate(ToolUpdate::Stopwatch(StopwatchTool {
            active: true,
            ..Default::default()
        })));
        store.apply(&DisplayCommand::ToolUpdate(ToolUpdate::Clock(ClockTool {
            active: true,
            ..Default::default()
        })));
        assert_eq!(resolve(&snapshot(&store)).base.name(), "Clock");

        store.apply(&DisplayCommand::ToolUpdate(ToolUpdate::Countdown(CountdownTool {
            active: true,
            ..Default::default()
        })));
        assert_eq!(resolve(&snapshot(&store)).base.name(), "Countdown");
    }

    #[test]
    fn test_overlays_above_content() {
        let mut store = ContentStore::new();
        store.apply(&slide("hello"));

        let snap = Snapshot {
            ticker: Some(TickerView {
                message: "welcome",
                index: 1,
                count: 3,
            }),
            banner: Some(BannerView {
                text: "parking",
                phase: BannerPhase::Fading,
            }),
            ..snapshot(&store)
        };

        let selection = resolve(&snap);
        assert_eq!(selection.base.name(), "Slide");
        assert_eq!(
            selection.overlays,
            vec![
                Overlay::Ticker {
                    message: "welcome".to_string(),
                    index: 1,
                    count: 3,
                },
                Overlay::Announcement {
                    text: "parking".to_string(),
                    phase: BannerPhase::Fading,
                },
            ]
        );
    }

    #[test]
    fn test_hidden_banner_not_drawn() {
        let store = ContentStore::new();
        let snap = Snapshot {
            banner: Some(BannerView {
                text: "gone",
                phase: BannerPhase::Hidden,
            }),
            ..snapshot(&store)
        };
        assert!(resolve(&snap).overlays.is_empty());
    }

    #[test]
    fn test_media_layer_carries_load_state() {
        let mut store = ContentStore::new();
        store.apply(&DisplayCommand::MediaUpdate(Some(MediaDescriptor::video("/v.mp4"))));
        let load = LoadState::Error {
            message: "timed out".to_string(),
            retry_count: 0,
            retrying: false,
        };
        let snap = Snapshot {
            media_load: &load,
            media_attempt: 2,
            ..snapshot(&store)
        };

        match resolve(&snap).base {
            BaseLayer::Video {
                path,
                attempt,
                load,
            } => {
                assert_eq!(path, "/v.mp4");
                assert_eq!(attempt, 2);
                assert!(load.is_terminal_error());
            }
            other => panic!("unexpected base: {other:?}"),
        }
    }
}
