//! Transport layer contract for the duet realtime core.
//!
//! This crate defines everything the coordination cores need from the
//! underlying full-duplex connection without implementing any I/O:
//!
//! - **Identifiers** - newtype wrappers for the two ID spaces (client-generated
//!   temp IDs vs. server-assigned IDs) and the routing identifiers
//! - **Wire events** - the closed set of inbound events ([`ServerEvent`]),
//!   decoded exactly once at the transport boundary
//! - **Commands** - the outbound events ([`ClientCommand`]) with their
//!   on-the-wire names and payload shapes
//! - **Port** - the [`Transport`] trait an actual socket implementation
//!   (or a test double) provides
//!
//! The event names and payload field names are an internal contract with the
//! paired backend; they are not a published protocol. Payloads use camelCase
//! keys on the wire.
//!
//! # Decoding inbound frames
//!
//! ```rust
//! use duet_transport::ServerEvent;
//! use serde_json::json;
//!
//! let event = ServerEvent::decode("call_accepted", json!({"callId": "c1"})).unwrap();
//! assert!(matches!(event, ServerEvent::CallAccepted { .. }));
//! ```

mod command;
mod error;
mod event;
pub mod mock;
mod port;
mod types;

pub use command::{ClientCommand, OutboundMessage};
pub use error::{DecodeError, TransportError};
pub use event::ServerEvent;
pub use port::{ConnectionStatus, Transport};
pub use types::{
    CallId, CallInvite, CallType, ConversationId, DeliveryState, MessageId, TempId, UserId,
    WireMessage,
};
