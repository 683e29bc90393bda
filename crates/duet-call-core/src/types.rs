//! Call-side domain types.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duet_transport::{CallId, CallInvite, CallType, ConversationId, UserId};

/// Lifecycle status of a call invitation.
///
/// `Pending` is the only non-terminal status; transitions out of a terminal
/// status are never applied.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Pending,
    Accepted,
    Rejected,
    Timeout,
    Cancelled,
}

impl CallStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallStatus::Pending)
    }
}

/// One call attempt, outgoing or incoming.
#[derive(Debug, Clone, PartialEq)]
pub struct CallInvitation {
    pub call_id: CallId,
    pub caller_id: UserId,
    pub recipient_id: UserId,
    pub call_type: CallType,
    pub status: CallStatus,
    pub conversation_id: Option<ConversationId>,
    pub group_id: Option<String>,
    /// Media-session routing token name.
    pub channel_name: String,
    pub rtc_token: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Always `created_at` plus the invitation window. The local timer is
    /// authoritative; this timestamp is informational for remote peers.
    pub expires_at: DateTime<Utc>,
}

impl CallInvitation {
    /// Build the local view of an inbound invitation, starting `Pending`.
    pub fn from_invite(invite: CallInvite) -> Self {
        Self {
            call_id: invite.call_id,
            caller_id: invite.caller_id,
            recipient_id: invite.recipient_id,
            call_type: invite.call_type,
            status: CallStatus::Pending,
            conversation_id: invite.conversation_id,
            group_id: invite.group_id,
            channel_name: invite.channel_name,
            rtc_token: invite.rtc_token,
            metadata: invite.metadata,
            created_at: invite.created_at,
            expires_at: invite.expires_at,
        }
    }

    /// Wire payload for this invitation.
    pub fn to_invite(&self) -> CallInvite {
        CallInvite {
            call_id: self.call_id.clone(),
            caller_id: self.caller_id.clone(),
            recipient_id: self.recipient_id.clone(),
            call_type: self.call_type,
            channel_name: self.channel_name.clone(),
            rtc_token: self.rtc_token.clone(),
            conversation_id: self.conversation_id.clone(),
            group_id: self.group_id.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct CallConfig {
    /// Window between an invitation's creation and its automatic expiry.
    pub invite_timeout: Duration,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            invite_timeout: Duration::from_secs(30),
        }
    }
}

/// Read-only snapshot of the session's call state.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSessionSnapshot {
    pub outgoing: Option<CallInvitation>,
    pub incoming: Option<CallInvitation>,
    pub is_in_call: bool,
    pub is_available: bool,
    pub missed_calls: Vec<CallInvitation>,
}
