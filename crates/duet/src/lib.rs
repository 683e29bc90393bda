//! # duet
//!
//! The realtime coordination core of a mobile messaging/calling client:
//! call-invitation signaling and optimistic message delivery over one
//! abstract full-duplex transport.
//!
//! The crate wires the two cores together behind a single session context:
//!
//! - [`RtcSession`] owns one [`CallCoordinator`] and one
//!   [`MessageReconciler`] bound to a shared [`Transport`], and routes every
//!   decoded inbound [`ServerEvent`] to the right core by exhaustive match
//! - [`RtcSessionBuilder`] constructs a session from its collaborator ports
//!   (transport, media-token provider, message store)
//!
//! Sessions are explicitly constructed values, not process-wide singletons:
//! build as many as a test (or a multi-account client) needs.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use duet::{RtcSession, StaticTokenProvider, UserId};
//! use duet_transport::mock::MockTransport;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = RtcSession::builder()
//!     .transport(Arc::new(MockTransport::new()))
//!     .token_provider(Arc::new(StaticTokenProvider::new("tok")))
//!     .local_user(UserId::from("u1"))
//!     .build()?;
//!
//! let mut calls = session.call().subscribe();
//! let mut chat = session.chat().subscribe();
//! // Feed decoded frames from the socket layer:
//! session.dispatch_frame("call_timeout", serde_json::json!("c1")).await;
//! # Ok(())
//! # }
//! ```

mod session;

pub use session::{RtcSession, RtcSessionBuilder, SessionBuildError};

// Re-export the public surface of the member crates.
pub use duet_call_core::{
    CallConfig, CallCoordinator, CallDirection, CallError, CallEvent, CallInvitation,
    CallSessionSnapshot, CallStatus, MediaToken, StaticTokenProvider, TokenError, TokenProvider,
    TokenRole,
};
pub use duet_chat_core::{
    ChatError, ChatEvent, CorrelationTable, InMemoryMessageStore, MessageReconciler, MessageRef,
    MessageStatus, MessageStore, PendingMessage, StoreError,
};
pub use duet_transport::{
    CallId, CallInvite, CallType, ClientCommand, ConnectionStatus, ConversationId, DecodeError,
    DeliveryState, MessageId, OutboundMessage, ServerEvent, TempId, Transport, TransportError,
    UserId, WireMessage,
};
