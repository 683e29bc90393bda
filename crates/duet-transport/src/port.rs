//! The transport port consumed by the coordination cores.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::command::ClientCommand;
use crate::error::TransportError;
use crate::types::ConversationId;

/// Connection lifecycle of the underlying channel.
///
/// Reconnection and redelivery are entirely the transport implementation's
/// responsibility; the cores only observe the status to expose it upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Abstract full-duplex event channel.
///
/// Implementations own the socket, the reconnect policy, and the delivery of
/// inbound frames to the session's dispatcher. Emitting is fire-and-forget:
/// `emit` returns once the frame is handed to the channel, it never waits for
/// a remote acknowledgment.
///
/// Room semantics: conversation-scoped events (`messageReceived` and friends)
/// are only delivered for conversations whose room has been joined.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Emit one outbound event.
    async fn emit(&self, command: ClientCommand) -> Result<(), TransportError>;

    /// Join a conversation room, scoping delivery of its events to us.
    async fn join_room(&self, conversation_id: &ConversationId) -> Result<(), TransportError>;

    /// Leave a conversation room.
    async fn leave_room(&self, conversation_id: &ConversationId) -> Result<(), TransportError>;

    /// Establish the connection.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Tear the connection down.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Observable connection status.
    fn status(&self) -> watch::Receiver<ConnectionStatus>;
}
