//! Room actor implementation
//!
//! One actor task per room, owning that room's connection registry and
//! message store. Uses the Actor pattern with mpsc channels for message
//! passing: the platform contract is that at most one event is processed
//! at a time per room, so no locking is needed inside.

use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::message::{ChatMessage, ParsedInbound};
use crate::registry::ConnectionRegistry;
use crate::store::MessageStore;
use crate::types::{ConnectionId, RoomId};

/// Commands sent from connection handlers to a room actor
#[derive(Debug)]
pub enum RoomCommand {
    /// New connection accepted, identity already extracted from the
    /// join request
    Connect {
        connection_id: ConnectionId,
        author: String,
        sender: mpsc::Sender<ChatMessage>,
    },
    /// Raw text frame received from a connection
    Inbound {
        connection_id: ConnectionId,
        raw: String,
    },
    /// Connection closed (clean or not)
    Disconnect { connection_id: ConnectionId },
    /// Transport-level error on a connection; removal arrives via the
    /// subsequent Disconnect
    SocketError {
        connection_id: ConnectionId,
        error: String,
    },
}

/// Cloneable handle to one room actor
#[derive(Debug, Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn new(sender: mpsc::Sender<RoomCommand>) -> Self {
        Self { sender }
    }

    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        author: String,
        sender: mpsc::Sender<ChatMessage>,
    ) -> Result<(), AppError> {
        self.send(RoomCommand::Connect {
            connection_id,
            author,
            sender,
        })
        .await
    }

    pub async fn inbound(&self, connection_id: ConnectionId, raw: String) -> Result<(), AppError> {
        self.send(RoomCommand::Inbound { connection_id, raw }).await
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), AppError> {
        self.send(RoomCommand::Disconnect { connection_id }).await
    }

    pub async fn socket_error(
        &self,
        connection_id: ConnectionId,
        error: String,
    ) -> Result<(), AppError> {
        self.send(RoomCommand::SocketError {
            connection_id,
            error,
        })
        .await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), AppError> {
        self.sender.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }
}

/// The per-room actor
///
/// Owns the registry and store for exactly one room and processes commands
/// strictly in arrival order. Nothing in here propagates an error upward:
/// one misbehaving client or one flaky storage write never disrupts the
/// room for others.
pub struct RoomActor {
    room_id: RoomId,
    registry: ConnectionRegistry,
    store: Box<dyn MessageStore + Send>,
    receiver: mpsc::Receiver<RoomCommand>,
    /// Last assigned timestamp; assignments are clamped so persisted
    /// timestamps never decrease even if the wall clock steps backwards
    last_timestamp: u64,
    max_text_len: usize,
}

impl RoomActor {
    pub fn new(
        room_id: RoomId,
        store: Box<dyn MessageStore + Send>,
        receiver: mpsc::Receiver<RoomCommand>,
        max_text_len: usize,
    ) -> Self {
        Self {
            room_id,
            registry: ConnectionRegistry::new(),
            store,
            receiver,
            last_timestamp: 0,
            max_text_len,
        }
    }

    /// Run the room event loop
    ///
    /// Continuously receives and processes commands until all handles are
    /// dropped.
    pub async fn run(mut self) {
        info!("room {} started", self.room_id);

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("room {} shutting down", self.room_id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Connect {
                connection_id,
                author,
                sender,
            } => {
                self.handle_connect(connection_id, author, sender).await;
            }
            RoomCommand::Inbound { connection_id, raw } => {
                self.handle_inbound(connection_id, &raw).await;
            }
            RoomCommand::Disconnect { connection_id } => {
                self.handle_disconnect(connection_id).await;
            }
            RoomCommand::SocketError {
                connection_id,
                error,
            } => {
                self.handle_socket_error(connection_id, &error);
            }
        }
    }

    /// Handle a new connection: join notice to the others, then replay
    /// the full history point-to-point to the new socket
    async fn handle_connect(
        &mut self,
        connection_id: ConnectionId,
        author: String,
        sender: mpsc::Sender<ChatMessage>,
    ) {
        info!(
            "room {}: connection {} joined as '{}'",
            self.room_id, connection_id, author
        );

        self.registry.add(connection_id, author.clone(), sender);

        // The new connection does not receive its own join notice; it is
        // about to receive the full history instead.
        self.registry
            .broadcast(&ChatMessage::joined(author), Some(connection_id))
            .await;

        let history = match self.store.list_all() {
            Ok(history) => history,
            Err(e) => {
                warn!(
                    "room {}: history replay failed for {}: {}",
                    self.room_id, connection_id, e
                );
                Vec::new()
            }
        };
        for message in history {
            self.registry.send_to(connection_id, message).await;
        }

        debug!(
            "room {}: {} connections, {} stored messages",
            self.room_id,
            self.registry.len(),
            self.store.len()
        );
    }

    /// Handle one raw frame: validate, persist best-effort, fan out
    async fn handle_inbound(&mut self, connection_id: ConnectionId, raw: &str) {
        let ParsedInbound::Text(incoming) = ParsedInbound::parse(raw, self.max_text_len) else {
            debug!(
                "room {}: dropping malformed payload from {}",
                self.room_id, connection_id
            );
            return;
        };

        // Identity comes from the registry, never from the payload.
        let Some(author) = self.registry.author(connection_id) else {
            debug!(
                "room {}: inbound from unregistered connection {}",
                self.room_id, connection_id
            );
            return;
        };
        let author = author.to_string();

        let timestamp = self.next_timestamp();
        let message = ChatMessage::chat(incoming.text, author, timestamp);

        // Persist and broadcast are independent effects of this event: a
        // storage failure is logged but the live delivery still happens.
        if let Err(e) = self.store.append(&message) {
            warn!("room {}: append failed: {}", self.room_id, e);
        }

        self.registry
            .broadcast(&message, Some(connection_id))
            .await;
    }

    /// Handle a closed connection: idempotent removal plus a leave notice
    /// to whoever remains
    async fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        let Some(author) = self.registry.remove(connection_id) else {
            // Already removed; no duplicate leave notice.
            debug!(
                "room {}: disconnect for unknown connection {}",
                self.room_id, connection_id
            );
            return;
        };

        info!(
            "room {}: connection {} ('{}') left",
            self.room_id, connection_id, author
        );

        self.registry
            .broadcast(&ChatMessage::left(author), Some(connection_id))
            .await;
    }

    /// Transport errors are logged only; the transport still delivers a
    /// Disconnect afterwards, which does the removal
    fn handle_socket_error(&self, connection_id: ConnectionId, error: &str) {
        warn!(
            "room {}: socket error on {}: {}",
            self.room_id, connection_id, error
        );
    }

    /// Milliseconds since epoch, clamped to be non-decreasing across
    /// assignments within this room
    fn next_timestamp(&mut self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.last_timestamp = now.max(self.last_timestamp);
        self.last_timestamp
    }
}
