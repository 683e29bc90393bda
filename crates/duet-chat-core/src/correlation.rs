//! The temp-ID to server-ID correlation table.

use dashmap::DashMap;

use duet_transport::{MessageId, TempId};

/// In-memory mapping from client-generated temp IDs to server-assigned IDs.
///
/// An entry exists from the moment a message is sent optimistically; it
/// resolves to a [`MessageId`] once the server confirms. Unresolved entries
/// are stored as an explicit `None` rather than the historical self-mapping
/// sentinel, so a server ID can never collide with a temp ID string - but
/// [`resolve`](CorrelationTable::resolve) preserves the observable contract:
/// an unresolved (or unknown) temp ID resolves to itself, and callers must
/// treat that as "still pending", not as an error.
///
/// The table is session-scoped and never persisted; unresolved optimistic
/// state does not survive a restart, so rebuilding fresh is correct.
#[derive(Debug, Default)]
pub struct CorrelationTable {
    entries: DashMap<TempId, Option<MessageId>>,
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register a temp ID with no server counterpart yet.
    pub fn insert_pending(&self, temp_id: &TempId) {
        self.entries.entry(temp_id.clone()).or_insert(None);
    }

    /// Record (or overwrite) the server ID for a temp ID. Idempotent.
    pub fn put(&self, temp_id: &TempId, real_id: MessageId) {
        self.entries.insert(temp_id.clone(), Some(real_id));
    }

    /// Resolve a temp ID to the ID the server knows, or to itself while the
    /// confirmation is still outstanding.
    pub fn resolve(&self, temp_id: &TempId) -> String {
        match self.entries.get(temp_id) {
            Some(entry) => match entry.value() {
                Some(real_id) => real_id.0.clone(),
                None => temp_id.0.clone(),
            },
            None => temp_id.0.clone(),
        }
    }

    /// Whether a confirmation has already been applied for this temp ID.
    pub fn is_resolved(&self, temp_id: &TempId) -> bool {
        self.entries
            .get(temp_id)
            .map(|entry| entry.value().is_some())
            .unwrap_or(false)
    }

    /// Whether the temp ID is known at all (pending or resolved).
    pub fn contains(&self, temp_id: &TempId) -> bool {
        self.entries.contains_key(temp_id)
    }

    /// Find the temp ID whose mapping resolved to `real_id`, if any.
    ///
    /// Used to re-target a delivery receipt addressed by server ID back to
    /// the temp ID the UI may still be keyed on.
    pub fn reverse_lookup(&self, real_id: &MessageId) -> Option<TempId> {
        self.entries.iter().find_map(|entry| {
            if entry.value().as_ref() == Some(real_id) {
                Some(entry.key().clone())
            } else {
                None
            }
        })
    }

    /// Evict an entry (on failure or explicit cleanup).
    pub fn remove(&self, temp_id: &TempId) {
        self.entries.remove(temp_id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
