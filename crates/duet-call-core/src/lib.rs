//! Call-invitation signaling for the duet realtime core.
//!
//! A call invitation lives for at most thirty seconds: it is either accepted,
//! rejected, cancelled, or it times out. This crate owns that lifecycle:
//!
//! - **Coordinator** - the single owner of the session's call state
//!   ([`CallCoordinator`]): one outgoing slot, one incoming slot, the
//!   in-call flag, and the missed-call log
//! - **Timers** - one armed timeout per active invitation, authoritative
//!   even when the remote side never answers, aborted on any terminal
//!   transition and swept on teardown
//! - **Presence gate** - the availability toggle that, combined with the
//!   in-call flag, decides whether an inbound invitation rings or is
//!   auto-rejected as `busy`
//! - **Token port** - the media-token provider consulted before an
//!   invitation is ever put on the wire ([`TokenProvider`])
//!
//! Status transitions are monotonic: once an invitation reaches a terminal
//! status, every later trigger - a late remote event or a racing local timer -
//! is a logged no-op, never a double transition.

mod coordinator;
mod error;
mod events;
mod token;
mod types;

pub use coordinator::CallCoordinator;
pub use error::{CallError, CallResult};
pub use events::{CallDirection, CallEvent};
pub use token::{MediaToken, StaticTokenProvider, TokenError, TokenProvider, TokenRole};
pub use types::{CallConfig, CallInvitation, CallSessionSnapshot, CallStatus};
