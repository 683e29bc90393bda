//! In-memory [`Transport`] double used throughout the workspace's tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::command::ClientCommand;
use crate::error::TransportError;
use crate::port::{ConnectionStatus, Transport};
use crate::types::ConversationId;

/// Records every command and room operation instead of sending anything.
pub struct MockTransport {
    emitted: Mutex<Vec<ClientCommand>>,
    joined: Mutex<Vec<ConversationId>>,
    left: Mutex<Vec<ConversationId>>,
    fail_sends: Mutex<bool>,
    status_tx: watch::Sender<ConnectionStatus>,
    status_rx: watch::Receiver<ConnectionStatus>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connected);
        Self {
            emitted: Mutex::new(Vec::new()),
            joined: Mutex::new(Vec::new()),
            left: Mutex::new(Vec::new()),
            fail_sends: Mutex::new(false),
            status_tx,
            status_rx,
        }
    }

    /// Snapshot of every command emitted so far, in order.
    pub fn emitted(&self) -> Vec<ClientCommand> {
        self.emitted.lock().clone()
    }

    /// Drain the recorded commands.
    pub fn take_emitted(&self) -> Vec<ClientCommand> {
        std::mem::take(&mut *self.emitted.lock())
    }

    pub fn joined_rooms(&self) -> Vec<ConversationId> {
        self.joined.lock().clone()
    }

    pub fn left_rooms(&self) -> Vec<ConversationId> {
        self.left.lock().clone()
    }

    /// Make subsequent `emit` calls fail with a send error.
    pub fn fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    pub fn set_status(&self, status: ConnectionStatus) {
        let _ = self.status_tx.send(status);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn emit(&self, command: ClientCommand) -> Result<(), TransportError> {
        if *self.fail_sends.lock() {
            return Err(TransportError::Send {
                reason: "mock transport configured to fail".to_string(),
            });
        }
        self.emitted.lock().push(command);
        Ok(())
    }

    async fn join_room(&self, conversation_id: &ConversationId) -> Result<(), TransportError> {
        self.joined.lock().push(conversation_id.clone());
        Ok(())
    }

    async fn leave_room(&self, conversation_id: &ConversationId) -> Result<(), TransportError> {
        self.left.lock().push(conversation_id.clone());
        Ok(())
    }

    async fn connect(&self) -> Result<(), TransportError> {
        let _ = self.status_tx.send(ConnectionStatus::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let _ = self.status_tx.send(ConnectionStatus::Disconnected);
        Ok(())
    }

    fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }
}
