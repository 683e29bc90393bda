//! Local persistence port for confirmed message state.
//!
//! Durability is an offline-continuity concern only; in-memory reconciliation
//! is correct without it, so store failures are logged by the reconciler and
//! never abort event handling.

use async_trait::async_trait;
use dashmap::DashMap;

use duet_transport::{ConversationId, MessageId, TempId, WireMessage};

use crate::error::StoreError;

/// Storage collaborator consumed by the reconciler.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a confirmed message.
    async fn save_message(&self, message: &WireMessage) -> Result<(), StoreError>;

    /// Page through a conversation's messages, newest last. `cursor` returns
    /// messages older than the given server ID.
    async fn get_messages(
        &self,
        conversation_id: &ConversationId,
        cursor: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<WireMessage>, StoreError>;

    /// Replace a locally persisted optimistic record with the server echo.
    async fn replace_optimistic(
        &self,
        temp_id: &TempId,
        message: &WireMessage,
    ) -> Result<(), StoreError>;
}

/// Per-conversation in-memory store used in tests and as a default.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    conversations: DashMap<ConversationId, Vec<WireMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_count(&self, conversation_id: &ConversationId) -> usize {
        self.conversations
            .get(conversation_id)
            .map(|messages| messages.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save_message(&self, message: &WireMessage) -> Result<(), StoreError> {
        let mut messages = self
            .conversations
            .entry(message.conversation_id.clone())
            .or_default();
        // Duplicate delivery of the same server ID is a no-op.
        if !messages.iter().any(|existing| existing.id == message.id) {
            messages.push(message.clone());
        }
        Ok(())
    }

    async fn get_messages(
        &self,
        conversation_id: &ConversationId,
        cursor: Option<MessageId>,
        limit: usize,
    ) -> Result<Vec<WireMessage>, StoreError> {
        let messages = match self.conversations.get(conversation_id) {
            Some(messages) => messages,
            None => return Ok(Vec::new()),
        };
        let end = match cursor {
            Some(cursor) => messages
                .iter()
                .position(|message| message.id == cursor)
                .unwrap_or(messages.len()),
            None => messages.len(),
        };
        let start = end.saturating_sub(limit);
        Ok(messages[start..end].to_vec())
    }

    async fn replace_optimistic(
        &self,
        temp_id: &TempId,
        message: &WireMessage,
    ) -> Result<(), StoreError> {
        let mut messages = self
            .conversations
            .entry(message.conversation_id.clone())
            .or_default();
        if let Some(slot) = messages
            .iter_mut()
            .find(|existing| existing.temp_id.as_ref() == Some(temp_id))
        {
            *slot = message.clone();
        } else if !messages.iter().any(|existing| existing.id == message.id) {
            messages.push(message.clone());
        }
        Ok(())
    }
}
