//! Chat state-change notifications consumed by the presentation layer.

use chrono::{DateTime, Utc};

use duet_transport::{DeliveryState, MessageId, TempId, WireMessage};

use crate::types::PendingMessage;

/// How a delivery receipt is addressed after normalization.
///
/// The reconciler re-targets receipts so a subscriber still showing the
/// optimistic entry is addressed by the temp ID it knows, while receipts for
/// messages it only ever saw confirmed are addressed by server ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageRef {
    Temp(TempId),
    Server(MessageId),
}

impl std::fmt::Display for MessageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRef::Temp(temp_id) => write!(f, "{temp_id}"),
            MessageRef::Server(message_id) => write!(f, "{message_id}"),
        }
    }
}

/// Events published on the reconciler's broadcast stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A message was sent optimistically and is awaiting confirmation.
    MessagePending(PendingMessage),
    /// The server confirmed an optimistic send; the carried message is the
    /// authoritative server echo (its content may differ from what was typed).
    MessageReconciled {
        temp_id: TempId,
        message: WireMessage,
    },
    /// A genuinely new remote message arrived for a joined conversation.
    MessageReceived(WireMessage),
    /// The server rejected an optimistic send. The pending message is
    /// retained with `Failed` status so the caller can offer a retry.
    MessageFailed { temp_id: TempId, error: String },
    /// A delivery receipt, normalized to the ID space the subscriber knows.
    DeliveryUpdated {
        message_ref: MessageRef,
        status: DeliveryState,
        timestamp: Option<DateTime<Utc>>,
    },
}
