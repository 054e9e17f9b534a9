//! Client error types.

use thiserror::Error;

/// Errors from establishing a session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket connection could not be established.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect {
        /// The endpoint locator that was dialed.
        endpoint: String,
        /// Why the connection failed.
        reason: String,
    },
}

/// Errors returned from a send on a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// The session is not in the `Open` state.
    #[error("session is not connected")]
    NotConnected,

    /// The outbound queue is full; the frame was not enqueued.
    #[error("outbound queue is full")]
    QueueFull,
}

/// Transport-level failures reported by a transport implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Writing a frame to the connection failed.
    #[error("transport send failed: {0}")]
    Send(String),
}
