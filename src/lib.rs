//! Multi-tenant WebSocket chat relay library
//!
//! Clients connect over WebSocket to a named room, exchange text
//! messages, and receive a replay of the room's prior messages on join.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - One `RoomActor` task per room, owning that room's connection
//!   registry and message store
//! - The `RoomResolver` routes every connection for a name to the same
//!   actor; distinct names get fully independent actors
//! - Each connection has a handler with read/write tasks bridging the
//!   socket and the room
//! - No locks inside a room - all state access goes through message
//!   passing
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use room_relay::{handle_connection, RelayConfig, RoomResolver};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RelayConfig::default();
//!     let listener = TcpListener::bind(&config.bind_addr).await.unwrap();
//!     let resolver = RoomResolver::new(config);
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         tokio::spawn(handle_connection(stream, resolver.clone()));
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod resolver;
pub mod room;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use config::RelayConfig;
pub use error::{AppError, StoreError};
pub use handler::{handle_connection, JoinRequest};
pub use message::{ChatMessage, IncomingText, MessageKind, ParsedInbound};
pub use registry::ConnectionRegistry;
pub use resolver::RoomResolver;
pub use room::{RoomActor, RoomCommand, RoomHandle};
pub use store::{MemoryStore, MessageStore, StoreKey};
pub use types::{ConnectionId, RoomId};
