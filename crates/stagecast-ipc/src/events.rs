//! Events sent from the display engine to the controller.

use serde::{Deserialize, Serialize};

use crate::state::LayerSelection;
use crate::types::QueryRequest;

/// Events that the display engine can send to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayEvent {
    /// All listeners are registered (`reportReady`). Sent once.
    Ready,

    /// One-shot request; answered with `DisplayCommand::QueryReply`.
    Query { id: u64, request: QueryRequest },

    /// `reportError`.
    Error {
        /// Error message.
        message: String,
    },

    /// `reportVideoTime`.
    VideoTime { time: f64, duration: f64 },

    /// `reportVideoEnded`.
    VideoEnded,

    /// `reportVideoPlaying`.
    VideoPlaying(bool),

    /// The resolved layers changed.
    LayersChanged(Box<LayerSelection>),

    /// Engine has shut down.
    Shutdown,
}
