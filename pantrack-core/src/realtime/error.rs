//! Realtime channel error types.

use thiserror::Error;

/// Errors that can occur while opening a change channel.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Failed to reach the realtime endpoint
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Failed to encode message: {0}")]
    Encode(String),

    /// The join request was answered with an error status
    #[error("Channel join rejected: {0}")]
    JoinRejected(String),

    #[error("Channel join timed out")]
    JoinTimeout,

    /// The socket closed before the channel was joined
    #[error("Connection closed before the channel was joined")]
    Closed,
}
