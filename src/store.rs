//! Message store abstraction
//!
//! Append-only, key-ordered record of one room's chat messages, used to
//! replay history to newly joined connections. The backend is pluggable;
//! the in-memory implementation is the default.
//!
//! Keys are `msg_{timestamp:013}_{seq:06}`: ordering-preserving strings
//! derived from the server timestamp, with a per-store monotonic counter
//! so that two appends within the same millisecond still get distinct,
//! correctly ordered keys.

use std::collections::BTreeMap;

use crate::error::StoreError;
use crate::message::ChatMessage;

/// Opaque, ordering-preserving storage key
pub type StoreKey = String;

/// Ordered append-only storage for one room
///
/// Contract for any backend substitution: insertion-order iteration,
/// retrieval of the complete set, and survival across actor restarts
/// scoped to the room's lifetime.
pub trait MessageStore {
    /// Persist one message, returning its assigned key
    fn append(&mut self, message: &ChatMessage) -> Result<StoreKey, StoreError>;

    /// All stored messages in ascending insertion order
    ///
    /// Full materialization; history is bounded at current scale and
    /// pagination is deliberately out of scope.
    fn list_all(&self) -> Result<Vec<ChatMessage>, StoreError>;

    /// Number of stored messages
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory message store backed by a BTreeMap
///
/// Key order equals insertion order because assigned timestamps never
/// decrease and the sequence counter breaks same-millisecond ties.
#[derive(Debug, Default)]
pub struct MemoryStore {
    messages: BTreeMap<StoreKey, ChatMessage>,
    last_timestamp: u64,
    sequence: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_key(&mut self, timestamp: u64) -> StoreKey {
        if timestamp <= self.last_timestamp {
            self.sequence += 1;
        } else {
            self.last_timestamp = timestamp;
            self.sequence = 0;
        }
        format!("msg_{:013}_{:06}", self.last_timestamp, self.sequence)
    }
}

impl MessageStore for MemoryStore {
    fn append(&mut self, message: &ChatMessage) -> Result<StoreKey, StoreError> {
        // Presence events are never given timestamps; the actor only
        // persists user chat, but guard here as well.
        let timestamp = message
            .timestamp
            .ok_or_else(|| StoreError::Backend("message without timestamp".to_string()))?;
        let key = self.next_key(timestamp);
        self.messages.insert(key.clone(), message.clone());
        Ok(key)
    }

    fn list_all(&self) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self.messages.values().cloned().collect())
    }

    fn len(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_list_in_order() {
        let mut store = MemoryStore::new();
        let m1 = ChatMessage::chat("first", "alice", 100);
        let m2 = ChatMessage::chat("second", "bob", 200);
        store.append(&m1).unwrap();
        store.append(&m2).unwrap();

        assert_eq!(store.list_all().unwrap(), vec![m1, m2]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_same_millisecond_keys_are_unique_and_ordered() {
        let mut store = MemoryStore::new();
        let k1 = store.append(&ChatMessage::chat("a", "alice", 100)).unwrap();
        let k2 = store.append(&ChatMessage::chat("b", "alice", 100)).unwrap();
        let k3 = store.append(&ChatMessage::chat("c", "alice", 100)).unwrap();

        assert_ne!(k1, k2);
        assert_ne!(k2, k3);
        assert!(k1 < k2 && k2 < k3);

        let texts: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clock_regression_keeps_key_order() {
        let mut store = MemoryStore::new();
        let k1 = store.append(&ChatMessage::chat("a", "alice", 200)).unwrap();
        // Wall clock stepped backwards; key order must still follow
        // insertion order.
        let k2 = store.append(&ChatMessage::chat("b", "alice", 100)).unwrap();

        assert!(k1 < k2);
        let texts: Vec<String> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn test_key_format() {
        let mut store = MemoryStore::new();
        let key = store.append(&ChatMessage::chat("a", "alice", 42)).unwrap();
        assert_eq!(key, "msg_0000000000042_000000");
    }

    #[test]
    fn test_append_without_timestamp_is_an_error() {
        let mut store = MemoryStore::new();
        assert!(store.append(&ChatMessage::joined("alice")).is_err());
        assert!(store.is_empty());
    }
}
