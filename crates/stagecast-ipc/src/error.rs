//! Error types for the IPC crate.

use thiserror::Error;

/// Errors that can occur while moving messages across the channel.
#[derive(Debug, Error)]
pub enum IpcError {
    /// A message could not be decoded or encoded.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The other side of the channel is gone.
    #[error("Channel disconnected")]
    ChannelDisconnected,
}
