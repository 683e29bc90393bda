//! The message delivery reconciler.
//!
//! Owns the pending-message cache and the correlation table, emits outbound
//! send/typing events, and folds the server's asynchronous answers back into
//! a single coherent stream of [`ChatEvent`]s.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use duet_transport::{
    ClientCommand, ConversationId, DeliveryState, MessageId, OutboundMessage, TempId, Transport,
    UserId, WireMessage,
};

use crate::correlation::CorrelationTable;
use crate::error::ChatResult;
use crate::events::{ChatEvent, MessageRef};
use crate::store::MessageStore;
use crate::types::{MessageStatus, PendingMessage};

const EVENT_CHANNEL_CAPACITY: usize = 128;

/// Coordinates optimistic sends with server-confirmed delivery.
///
/// All mutation happens through the methods below; the session router is the
/// only caller of the `handle_*` methods, which keeps event processing
/// serialized per the arrival order the transport guarantees.
#[derive(Clone)]
pub struct MessageReconciler {
    transport: Arc<dyn Transport>,
    store: Arc<dyn MessageStore>,
    local_user: UserId,
    correlation: Arc<CorrelationTable>,
    pending: Arc<DashMap<TempId, PendingMessage>>,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl MessageReconciler {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn MessageStore>,
        local_user: UserId,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            transport,
            store,
            local_user,
            correlation: Arc::new(CorrelationTable::new()),
            pending: Arc::new(DashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to the reconciled event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// The correlation table shared with observers of this session.
    pub fn correlation(&self) -> &CorrelationTable {
        &self.correlation
    }

    /// Send a message optimistically.
    ///
    /// Generates a temp ID, emits the outbound `send_message` event carrying
    /// it, caches a `Sending` record, and returns that record immediately.
    /// If the transport refuses the emit, nothing is cached and the error
    /// propagates to the caller.
    pub async fn send_message(
        &self,
        conversation_id: ConversationId,
        kind: impl Into<String>,
        content: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) -> ChatResult<PendingMessage> {
        let temp_id = TempId::new();
        let content = content.into();
        let kind = kind.into();

        self.transport
            .emit(ClientCommand::SendMessage(OutboundMessage {
                conversation_id: conversation_id.clone(),
                content: content.clone(),
                kind: kind.clone(),
                metadata: metadata.clone(),
                temp_id: temp_id.clone(),
            }))
            .await?;

        let pending = PendingMessage {
            temp_id: temp_id.clone(),
            conversation_id,
            sender_id: self.local_user.clone(),
            content,
            kind,
            metadata,
            status: MessageStatus::Sending,
            created_at: Utc::now(),
        };

        self.correlation.insert_pending(&temp_id);
        self.pending.insert(temp_id, pending.clone());
        let _ = self.event_tx.send(ChatEvent::MessagePending(pending.clone()));

        Ok(pending)
    }

    /// Apply a `messageConfirmed` event.
    ///
    /// The server echo is authoritative: the cached optimistic record is
    /// discarded in its favor (server-applied moderation may have altered the
    /// content). Re-delivered confirmations for an already-resolved temp ID
    /// are suppressed, so subscribers see exactly one reconciled message.
    pub async fn handle_confirmation(&self, temp_id: TempId, message: WireMessage) {
        if self.correlation.is_resolved(&temp_id) {
            debug!(%temp_id, "duplicate confirmation, dropping");
            return;
        }
        if !self.pending.contains_key(&temp_id) {
            debug!(%temp_id, "confirmation for unknown temp id, dropping");
            return;
        }

        self.correlation.put(&temp_id, message.id.clone());
        self.pending.remove(&temp_id);

        if let Err(error) = self.store.replace_optimistic(&temp_id, &message).await {
            warn!(%temp_id, %error, "failed to persist confirmed message");
        }

        debug!(%temp_id, real_id = %message.id, "message reconciled");
        let _ = self
            .event_tx
            .send(ChatEvent::MessageReconciled { temp_id, message });
    }

    /// Apply a `messageReceived` event.
    ///
    /// A populated inner temp ID means the socket path delivered our own
    /// message before (or instead of) the confirmation path; both race for
    /// the same reconciliation, which `handle_confirmation` makes idempotent.
    /// Messages without a temp ID are genuinely remote and pass straight
    /// through.
    pub async fn handle_incoming(&self, message: WireMessage) {
        if let Some(temp_id) = message.temp_id.clone() {
            if self.correlation.contains(&temp_id) {
                self.handle_confirmation(temp_id, message).await;
                return;
            }
            debug!(%temp_id, "inbound message carries a temp id we never issued");
        }

        if let Err(error) = self.store.save_message(&message).await {
            warn!(message_id = %message.id, %error, "failed to persist inbound message");
        }
        let _ = self.event_tx.send(ChatEvent::MessageReceived(message));
    }

    /// Apply a `messageFailed` event.
    ///
    /// The pending record is marked `Failed` and retained for a UI-level
    /// retry; its correlation entry is evicted. Retransmitted failures for an
    /// already-failed message are suppressed, so subscribers see exactly one
    /// failure per send.
    pub async fn handle_failure(&self, temp_id: TempId, error: String) {
        let Some(mut pending) = self.pending.get_mut(&temp_id) else {
            debug!(%temp_id, "failure for unknown temp id, dropping");
            return;
        };
        if pending.status == MessageStatus::Failed {
            debug!(%temp_id, "duplicate failure, dropping");
            return;
        }
        pending.status = MessageStatus::Failed;
        drop(pending);

        self.correlation.remove(&temp_id);
        debug!(%temp_id, %error, "message send failed");
        let _ = self
            .event_tx
            .send(ChatEvent::MessageFailed { temp_id, error });
    }

    /// Apply a `messageDelivered` receipt.
    ///
    /// The receipt may be addressed by temp ID or by server ID depending on
    /// which path won the confirmation race. It is normalized to whichever
    /// reference the subscriber side knows - preferring the temp ID when one
    /// maps to the given server ID - and is never dropped merely for arriving
    /// in the "other" ID space.
    pub async fn handle_delivery(
        &self,
        message_id: String,
        status: DeliveryState,
        timestamp: Option<DateTime<Utc>>,
    ) {
        let as_temp = TempId(message_id.clone());
        let message_ref = if self.correlation.contains(&as_temp) || self.pending.contains_key(&as_temp)
        {
            MessageRef::Temp(as_temp)
        } else {
            match self.correlation.reverse_lookup(&MessageId(message_id.clone())) {
                Some(temp_id) => MessageRef::Temp(temp_id),
                None => MessageRef::Server(MessageId(message_id)),
            }
        };

        if let MessageRef::Temp(temp_id) = &message_ref {
            if let Some(mut pending) = self.pending.get_mut(temp_id) {
                pending.status = match status {
                    DeliveryState::Sent => MessageStatus::Sent,
                    DeliveryState::Delivered => MessageStatus::Delivered,
                    DeliveryState::Read => MessageStatus::Read,
                };
            }
        }

        let _ = self.event_tx.send(ChatEvent::DeliveryUpdated {
            message_ref,
            status,
            timestamp,
        });
    }

    /// Emit a typing indicator for a conversation.
    pub async fn send_typing(&self, conversation_id: ConversationId, typing: bool) -> ChatResult<()> {
        let command = if typing {
            ClientCommand::TypingStart { conversation_id }
        } else {
            ClientCommand::TypingStop { conversation_id }
        };
        self.transport.emit(command).await?;
        Ok(())
    }

    /// Join a conversation room. Must be called before `messageReceived`
    /// events for that conversation are delivered.
    pub async fn join_conversation(&self, conversation_id: &ConversationId) -> ChatResult<()> {
        self.transport.join_room(conversation_id).await?;
        Ok(())
    }

    /// Leave a conversation room.
    pub async fn leave_conversation(&self, conversation_id: &ConversationId) -> ChatResult<()> {
        self.transport.leave_room(conversation_id).await?;
        Ok(())
    }

    /// Fetch a page of persisted messages for a conversation.
    pub async fn messages(
        &self,
        conversation_id: &ConversationId,
        cursor: Option<MessageId>,
        limit: usize,
    ) -> ChatResult<Vec<WireMessage>> {
        Ok(self.store.get_messages(conversation_id, cursor, limit).await?)
    }

    /// Snapshot of one pending message.
    pub fn pending(&self, temp_id: &TempId) -> Option<PendingMessage> {
        self.pending.get(temp_id).map(|entry| entry.clone())
    }

    /// All still-cached pending messages for a conversation (including
    /// `Failed` ones retained for retry).
    pub fn pending_messages(&self, conversation_id: &ConversationId) -> Vec<PendingMessage> {
        self.pending
            .iter()
            .filter(|entry| &entry.conversation_id == conversation_id)
            .map(|entry| entry.clone())
            .collect()
    }
}

impl std::fmt::Debug for MessageReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageReconciler")
            .field("local_user", &self.local_user)
            .field("pending", &self.pending.len())
            .field("correlation", &self.correlation.len())
            .finish()
    }
}
