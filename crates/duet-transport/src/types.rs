//! Identifier newtypes and wire payload shapes shared across the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call identifier, caller-generated and globally unique.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CallId(pub String);

impl CallId {
    /// Generate a fresh caller-side call ID.
    pub fn new() -> Self {
        Self(format!("call-{}", uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Client-generated temporary message identifier, valid until the server
/// confirms the message and assigns a [`MessageId`].
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct TempId(pub String);

impl TempId {
    pub fn new() -> Self {
        Self(format!("tmp-{}", uuid::Uuid::new_v4()))
    }
}

impl std::fmt::Display for TempId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TempId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Server-assigned message identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque user identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Conversation identifier used for room scoping and message routing.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Media kind of a call.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Audio,
    Video,
}

/// Wire payload of a call invitation.
///
/// Carried outbound in `send_call_invitation` and inbound in
/// `call_invitation`. The invitation's lifecycle status is not part of the
/// wire shape; the call core tracks it locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallInvite {
    pub call_id: CallId,
    pub caller_id: UserId,
    pub recipient_id: UserId,
    pub call_type: CallType,
    /// Media-session routing token name.
    pub channel_name: String,
    /// Media access token resolved by the caller; inbound invitations may
    /// omit it when the recipient is expected to fetch its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtc_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A server-confirmed chat message as it appears on the wire.
///
/// Arrives inside the nested `messageReceived` envelope or as the `data`
/// field of a `messageConfirmed` event. A populated `temp_id` marks a
/// message that originated locally and needs reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_id: Option<TempId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

/// Delivery-receipt status carried by `messageDelivered`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Sent,
    Delivered,
    Read,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_invite_round_trips_camel_case() {
        let invite = CallInvite {
            call_id: CallId::from("c1"),
            caller_id: UserId::from("u1"),
            recipient_id: UserId::from("u2"),
            call_type: CallType::Video,
            channel_name: "ch-1".to_string(),
            rtc_token: Some("tok".to_string()),
            conversation_id: None,
            group_id: None,
            metadata: None,
            created_at: Utc::now(),
            expires_at: Utc::now(),
        };
        let value = serde_json::to_value(&invite).unwrap();
        assert_eq!(value["callId"], "c1");
        assert_eq!(value["callType"], "video");
        assert!(value.get("conversationId").is_none());
        let back: CallInvite = serde_json::from_value(value).unwrap();
        assert_eq!(back, invite);
    }

    #[test]
    fn wire_message_defaults_created_at() {
        let msg: WireMessage = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "conversationId": "conv1",
            "senderId": "u2",
            "content": "hi",
            "type": "text",
        }))
        .unwrap();
        assert_eq!(msg.id, MessageId::from("m1"));
        assert!(msg.temp_id.is_none());
    }
}
