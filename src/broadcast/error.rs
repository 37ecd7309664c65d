//! Errors local to the live feed. None of these reach the forwarder or store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    /// The HTTP connection could not be upgraded to a websocket.
    #[error("websocket upgrade failed: {0}")]
    Upgrade(String),

    /// A message could not be serialized; it is skipped.
    #[error("failed to encode message: {0}")]
    Encoding(#[from] serde_json::Error),
}
