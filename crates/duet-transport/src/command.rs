//! Outbound events emitted by the coordination cores.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{CallId, CallInvite, ConversationId, TempId};

/// Payload of an outbound `send_message` event.
///
/// The `temp_id` travels with the message so the server can echo it back in
/// the confirmation, closing the optimistic-send loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub conversation_id: ConversationId,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub temp_id: TempId,
}

/// The closed set of events this core emits to the transport.
///
/// Each variant maps to exactly one wire event name; [`ClientCommand::name`]
/// and [`ClientCommand::payload`] produce the frame an implementation puts on
/// the socket.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    SendCallInvitation(CallInvite),
    AcceptCall { call_id: CallId },
    RejectCall { call_id: CallId, reason: String },
    CancelCall { call_id: CallId },
    SendMessage(OutboundMessage),
    TypingStart { conversation_id: ConversationId },
    TypingStop { conversation_id: ConversationId },
}

impl ClientCommand {
    /// Wire event name for this command.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::SendCallInvitation(_) => "send_call_invitation",
            ClientCommand::AcceptCall { .. } => "accept_call",
            ClientCommand::RejectCall { .. } => "reject_call",
            ClientCommand::CancelCall { .. } => "cancel_call",
            ClientCommand::SendMessage(_) => "send_message",
            ClientCommand::TypingStart { .. } => "typing_start",
            ClientCommand::TypingStop { .. } => "typing_stop",
        }
    }

    /// Wire payload for this command.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            ClientCommand::SendCallInvitation(invite) => serde_json::to_value(invite),
            ClientCommand::AcceptCall { call_id } => Ok(json!({ "callId": call_id })),
            ClientCommand::RejectCall { call_id, reason } => {
                Ok(json!({ "callId": call_id, "reason": reason }))
            }
            ClientCommand::CancelCall { call_id } => Ok(json!({ "callId": call_id })),
            ClientCommand::SendMessage(message) => serde_json::to_value(message),
            ClientCommand::TypingStart { conversation_id }
            | ClientCommand::TypingStop { conversation_id } => {
                Ok(json!({ "conversationId": conversation_id }))
            }
        }
    }
}
