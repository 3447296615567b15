//! Connection registry
//!
//! Tracks the live set of connections for one room along with the display
//! name each connection was bound to at connect time. Owned and mutated
//! only by the room actor, so no locking is needed.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::message::ChatMessage;
use crate::types::ConnectionId;

/// One registered connection: bound identity plus outbound channel
#[derive(Debug)]
struct Peer {
    author: String,
    sender: mpsc::Sender<ChatMessage>,
}

/// Live connections for one room
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    peers: HashMap<ConnectionId, Peer>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection
    ///
    /// The identity is immutable for the lifetime of the connection.
    pub fn add(&mut self, id: ConnectionId, author: String, sender: mpsc::Sender<ChatMessage>) {
        self.peers.insert(id, Peer { author, sender });
    }

    /// Remove a connection, returning its bound identity
    ///
    /// Idempotent: removing an absent connection returns None and is not
    /// an error.
    pub fn remove(&mut self, id: ConnectionId) -> Option<String> {
        self.peers.remove(&id).map(|peer| peer.author)
    }

    /// Look up the identity bound to a connection
    pub fn author(&self, id: ConnectionId) -> Option<&str> {
        self.peers.get(&id).map(|peer| peer.author.as_str())
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Send one message point-to-point (the replay path)
    ///
    /// A failed send is logged and absorbed; the caller keeps going.
    pub async fn send_to(&self, id: ConnectionId, message: ChatMessage) -> bool {
        let Some(peer) = self.peers.get(&id) else {
            debug!("send_to: connection {} not registered", id);
            return false;
        };
        if peer.sender.send(message).await.is_err() {
            warn!("send_to: connection {} is closed", id);
            return false;
        }
        true
    }

    /// Fan out one message to every connection except `excluding`
    ///
    /// Each send is isolated: a half-closed peer never aborts delivery to
    /// the rest. Returns the number of failed sends.
    pub async fn broadcast(&self, message: &ChatMessage, excluding: Option<ConnectionId>) -> usize {
        let mut failures = 0;
        for (id, peer) in &self.peers {
            if Some(*id) == excluding {
                continue;
            }
            if peer.sender.send(message.clone()).await.is_err() {
                warn!("broadcast: dropping send to closed connection {}", id);
                failures += 1;
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn peer() -> (ConnectionId, mpsc::Sender<ChatMessage>, mpsc::Receiver<ChatMessage>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionId::new(), tx, rx)
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let mut registry = ConnectionRegistry::new();
        let (alice, alice_tx, mut alice_rx) = peer();
        let (bob, bob_tx, mut bob_rx) = peer();
        registry.add(alice, "alice".to_string(), alice_tx);
        registry.add(bob, "bob".to_string(), bob_tx);

        let msg = ChatMessage::chat("hi", "alice", 1);
        let failures = registry.broadcast(&msg, Some(alice)).await;
        assert_eq!(failures, 0);

        assert_eq!(bob_rx.recv().await.unwrap(), msg);
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_isolates_closed_peer() {
        let mut registry = ConnectionRegistry::new();
        let (alice, alice_tx, alice_rx) = peer();
        let (bob, bob_tx, mut bob_rx) = peer();
        registry.add(alice, "alice".to_string(), alice_tx);
        registry.add(bob, "bob".to_string(), bob_tx);

        // Alice's receiver is gone; delivery to bob must still happen.
        drop(alice_rx);

        let msg = ChatMessage::joined("carol");
        let failures = registry.broadcast(&msg, None).await;
        assert_eq!(failures, 1);
        let received = bob_rx.recv().await.unwrap();
        assert_eq!(received.kind, MessageKind::Joined);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let mut registry = ConnectionRegistry::new();
        let (alice, alice_tx, _alice_rx) = peer();
        registry.add(alice, "alice".to_string(), alice_tx);

        assert_eq!(registry.remove(alice), Some("alice".to_string()));
        assert_eq!(registry.remove(alice), None);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection() {
        let registry = ConnectionRegistry::new();
        let delivered = registry
            .send_to(ConnectionId::new(), ChatMessage::chat("hi", "alice", 1))
            .await;
        assert!(!delivered);
    }
}
