//! Error types for the transport boundary.

use thiserror::Error;

/// Failure to turn an inbound frame into a [`crate::ServerEvent`].
///
/// Decode failures are expected steady-state noise on a real connection:
/// callers log them and drop the frame, they never tear down the session.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame name does not belong to the event contract.
    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    /// The frame name was recognised but its payload did not parse.
    #[error("malformed payload for '{event}': {source}")]
    Payload {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by [`crate::Transport`] implementations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,

    #[error("failed to encode outbound payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to send: {reason}")]
    Send { reason: String },
}
