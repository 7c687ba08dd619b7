//! Error types for the display engine.
//!
//! The `Display` text of an [`EngineError`] is what the controller receives
//! through `reportError`.

use thiserror::Error;

/// Errors that can occur inside the display engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Media did not load within the configured timeout.
    #[error("Media load timed out after {timeout_secs:.1}s: {path}")]
    MediaLoadTimeout { path: String, timeout_secs: f64 },

    /// Media kept failing after every automatic retry.
    #[error("Failed to load media after {retries} retries: {path} ({message})")]
    MediaRetriesExhausted {
        path: String,
        retries: u32,
        message: String,
    },

    /// The embedded player API never became available.
    #[error("Embedded video player failed to initialize after {attempts} attempts ({video_id})")]
    WidgetInitFailed { video_id: String, attempts: u32 },

    /// The host refused to create the embedded widget.
    #[error("Failed to create embedded video player for {video_id}: {message}")]
    WidgetCreateFailed { video_id: String, message: String },

    /// The embedded widget reported an error.
    #[error("Embedded video error {code} ({video_id})")]
    Widget { video_id: String, code: i32 },

    /// The controller answered a query with an error.
    #[error("Query {request} failed: {message}")]
    QueryFailed { request: String, message: String },

    /// The controller did not answer a query in time.
    #[error("Query {request} timed out after {timeout_secs:.1}s")]
    QueryTimedOut { request: String, timeout_secs: f64 },

    /// Query could not be sent.
    #[error("Query {request} could not be sent: channel unavailable")]
    QueryUnsent { request: String },

    /// Configuration could not be read or parsed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// Returns true for errors recovered locally by falling back to
    /// best-effort playback.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::QueryFailed { .. } | Self::QueryTimedOut { .. } | Self::QueryUnsent { .. }
        )
    }
}
