//! Error types for the chat core.

use thiserror::Error;

/// Result type for chat-core operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Errors returned by locally initiated chat operations.
///
/// Everything arriving from the network is terminal-state data (a failed
/// message stays cached as `Failed`), never an error through this type.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("transport error: {0}")]
    Transport(#[from] duet_transport::TransportError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by [`crate::MessageStore`] implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend failure: {reason}")]
    Backend { reason: String },
}
