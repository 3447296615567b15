//! Room resolver
//!
//! Maps a room identifier to the singleton actor handle for that room,
//! spawning the actor lazily on first request. All connections for the
//! same name are routed to the same actor; different names get fully
//! independent actors with no shared mutable state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::info;

use crate::config::{RelayConfig, COMMAND_BUFFER_SIZE};
use crate::room::{RoomActor, RoomHandle};
use crate::store::MemoryStore;
use crate::types::RoomId;

/// Keyed-singleton registry of room actors
///
/// Handles are strong and never evicted: a room's store outlives its
/// connections, so a later join still replays history.
#[derive(Debug, Clone)]
pub struct RoomResolver {
    rooms: Arc<RwLock<HashMap<RoomId, RoomHandle>>>,
    config: RelayConfig,
}

impl RoomResolver {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Resolve a room name to its actor handle, spawning the actor on
    /// first request
    pub async fn resolve(&self, room_id: RoomId) -> RoomHandle {
        if let Some(handle) = self.rooms.read().await.get(&room_id) {
            return handle.clone();
        }

        let mut rooms = self.rooms.write().await;
        // Double check: another task may have created it while we waited
        // for the write lock.
        if let Some(handle) = rooms.get(&room_id) {
            return handle.clone();
        }

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let actor = RoomActor::new(
            room_id.clone(),
            Box::new(MemoryStore::new()),
            rx,
            self.config.max_text_len,
        );
        tokio::spawn(actor.run());

        info!("room {} created", room_id);

        let handle = RoomHandle::new(tx);
        rooms.insert(room_id, handle.clone());
        handle
    }

    /// Number of rooms created so far
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
