//! Optimistic message delivery for the duet realtime core.
//!
//! A locally sent chat message is inserted into application state before the
//! server has seen it, identified by a client-generated temp ID. This crate
//! owns everything needed to keep that optimistic state honest:
//!
//! - **Correlation table** - the bridge between the temp-ID and
//!   server-ID spaces ([`CorrelationTable`])
//! - **Reconciler** - creates pending messages, merges server confirmations,
//!   marks failures, and re-targets delivery receipts that arrive addressed
//!   by the "other" ID space ([`MessageReconciler`])
//! - **Store port** - optional durability for confirmed state
//!   ([`MessageStore`], with [`InMemoryMessageStore`] for tests)
//!
//! The reconciler performs no network I/O itself; it emits commands through
//! the [`duet_transport::Transport`] port and reacts to decoded
//! [`duet_transport::ServerEvent`]s handed to it by the session router.

mod correlation;
mod error;
mod events;
mod reconciler;
mod store;
mod types;

pub use correlation::CorrelationTable;
pub use error::{ChatError, ChatResult, StoreError};
pub use events::{ChatEvent, MessageRef};
pub use reconciler::MessageReconciler;
pub use store::{InMemoryMessageStore, MessageStore};
pub use types::{MessageStatus, PendingMessage};
