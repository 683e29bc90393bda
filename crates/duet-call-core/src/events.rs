//! Call state-change notifications consumed by the presentation layer.

use duet_transport::CallId;

use crate::types::{CallInvitation, CallStatus};

/// Which side of the session an invitation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

/// Events published on the coordinator's broadcast stream.
///
/// A busy auto-rejection publishes nothing: an interrupted user must not be
/// notified at all, which is why there is no "silently declined" variant.
#[derive(Debug, Clone, PartialEq)]
pub enum CallEvent {
    /// An inbound invitation passed the presence gate and is ringing.
    IncomingCall(CallInvitation),
    /// An invitation changed status.
    StateChanged {
        call_id: CallId,
        direction: CallDirection,
        status: CallStatus,
        reason: Option<String>,
    },
    /// An inbound invitation expired unanswered and was recorded.
    ///
    /// Outbound timeouts are "unanswered", a caller-side concept, and are
    /// deliberately not recorded here.
    MissedCall(CallInvitation),
    /// The active call ended and both invitation slots were cleared.
    CallEnded { call_id: CallId },
}
