//! The session context owning both coordination cores.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::warn;

use duet_call_core::{CallConfig, CallCoordinator, TokenProvider};
use duet_chat_core::{InMemoryMessageStore, MessageReconciler, MessageStore};
use duet_transport::{ConnectionStatus, ServerEvent, Transport, UserId};

/// A session could not be constructed.
#[derive(Debug, Error)]
pub enum SessionBuildError {
    #[error("missing required collaborator: {field}")]
    Missing { field: &'static str },
}

/// One user's realtime session: the call coordinator and the message
/// reconciler bound to a shared transport.
///
/// The session is the single inbound entry point: the socket layer decodes
/// frames into [`ServerEvent`]s (or hands raw frames to
/// [`dispatch_frame`](RtcSession::dispatch_frame)) and this context routes
/// them. Routing is an exhaustive match, so adding a wire event without a
/// handler fails to compile instead of silently matching nothing.
pub struct RtcSession {
    transport: Arc<dyn Transport>,
    call: CallCoordinator,
    chat: MessageReconciler,
}

impl RtcSession {
    pub fn builder() -> RtcSessionBuilder {
        RtcSessionBuilder::new()
    }

    /// Call-signaling operations and event stream.
    pub fn call(&self) -> &CallCoordinator {
        &self.call
    }

    /// Messaging operations and event stream.
    pub fn chat(&self) -> &MessageReconciler {
        &self.chat
    }

    /// Observable connection status of the underlying transport.
    pub fn connection_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.transport.status()
    }

    /// Route one decoded inbound event to its core.
    pub async fn dispatch(&self, event: ServerEvent) {
        match event {
            ServerEvent::CallInvitation(invite) => self.call.handle_invitation(invite).await,
            ServerEvent::CallAccepted { call_id } => {
                self.call.handle_remote_accepted(call_id).await
            }
            ServerEvent::CallRejected { call_id, reason } => {
                self.call.handle_remote_rejected(call_id, reason).await
            }
            ServerEvent::CallTimeout { call_id } => self.call.apply_timeout(call_id).await,
            ServerEvent::CallCancelled { call_id } => {
                self.call.handle_remote_cancelled(call_id).await
            }
            ServerEvent::MessageReceived(message) => self.chat.handle_incoming(message).await,
            ServerEvent::MessageConfirmed { temp_id, message } => {
                self.chat.handle_confirmation(temp_id, message).await
            }
            ServerEvent::MessageFailed { temp_id, error } => {
                self.chat.handle_failure(temp_id, error).await
            }
            ServerEvent::MessageDelivered {
                message_id,
                status,
                timestamp,
            } => self.chat.handle_delivery(message_id, status, timestamp).await,
        }
    }

    /// Decode one raw frame and route it.
    ///
    /// Undecodable frames are logged and dropped without touching any state:
    /// parse first, mutate only on success.
    pub async fn dispatch_frame(&self, name: &str, payload: serde_json::Value) {
        match ServerEvent::decode(name, payload) {
            Ok(event) => self.dispatch(event).await,
            Err(error) => warn!(event = name, %error, "dropping undecodable frame"),
        }
    }

    /// Tear the session down: sweep every armed invitation timer and
    /// disconnect the transport.
    pub async fn shutdown(&self) {
        self.call.teardown();
        if let Err(error) = self.transport.disconnect().await {
            warn!(%error, "transport disconnect failed during shutdown");
        }
    }
}

impl std::fmt::Debug for RtcSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtcSession")
            .field("call", &self.call)
            .field("chat", &self.chat)
            .finish()
    }
}

/// Builder for [`RtcSession`].
///
/// Transport, token provider, and local user are required; the message store
/// defaults to an in-memory one (durability is an offline-continuity concern,
/// not a correctness one).
pub struct RtcSessionBuilder {
    transport: Option<Arc<dyn Transport>>,
    tokens: Option<Arc<dyn TokenProvider>>,
    store: Option<Arc<dyn MessageStore>>,
    local_user: Option<UserId>,
    call_config: CallConfig,
}

impl RtcSessionBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            tokens: None,
            store: None,
            local_user: None,
            call_config: CallConfig::default(),
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn message_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn local_user(mut self, local_user: UserId) -> Self {
        self.local_user = Some(local_user);
        self
    }

    pub fn call_config(mut self, call_config: CallConfig) -> Self {
        self.call_config = call_config;
        self
    }

    pub fn build(self) -> Result<RtcSession, SessionBuildError> {
        let transport = self
            .transport
            .ok_or(SessionBuildError::Missing { field: "transport" })?;
        let tokens = self.tokens.ok_or(SessionBuildError::Missing {
            field: "token_provider",
        })?;
        let local_user = self.local_user.ok_or(SessionBuildError::Missing {
            field: "local_user",
        })?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryMessageStore::new()));

        let call = CallCoordinator::new(
            transport.clone(),
            tokens,
            local_user.clone(),
            self.call_config,
        );
        let chat = MessageReconciler::new(transport.clone(), store, local_user);

        Ok(RtcSession {
            transport,
            call,
            chat,
        })
    }
}

impl Default for RtcSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
