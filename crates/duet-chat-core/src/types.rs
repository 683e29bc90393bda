//! Chat-side domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use duet_transport::{ConversationId, TempId, UserId};

/// Lifecycle status of a chat message as seen locally.
///
/// `Sending` is the optimistic state; `Sent` means the server confirmed the
/// message; `Delivered`/`Read` track receipts; `Failed` is terminal but the
/// message is retained so the caller can offer a retry.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Whether the optimistic send has reached an outcome.
    pub fn is_settled(&self) -> bool {
        !matches!(self, MessageStatus::Sending)
    }
}

/// A locally originated message awaiting server confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub temp_id: TempId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    pub kind: String,
    pub metadata: Option<serde_json::Value>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}
