//! Error types for call signaling.

use thiserror::Error;

use duet_transport::CallId;

/// Result type for call-core operations.
pub type CallResult<T> = Result<T, CallError>;

/// User-action errors raised synchronously when an operation's precondition
/// fails. Everything that originates from the network (a rejection, a
/// timeout) is a terminal state on the event stream, not an error.
#[derive(Debug, Error)]
pub enum CallError {
    /// A call is already active or an invitation already occupies its slot.
    #[error("busy: a call or invitation is already active")]
    Busy,

    /// The referenced invitation is not the active one.
    #[error("no active invitation matching call {call_id}")]
    NoActiveInvitation { call_id: CallId },

    /// The media-token provider refused the request; the invitation was
    /// never put on the wire.
    #[error("media token request failed: {reason}")]
    Token { reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] duet_transport::TransportError),
}
