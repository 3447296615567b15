//! Error types for the relay
//!
//! Defines transport-boundary errors and storage errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Transport-boundary errors
///
/// These surface from the connection handler; nothing inside a room actor
/// propagates an error that would tear the actor down.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal for the connection)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Channel send error (room actor gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Request was not a recognized upgrade request
    #[error("Not a join request")]
    NotAJoinRequest,
}

/// Message store errors
///
/// Append and replay failures are logged and absorbed by the room actor;
/// they never abort the triggering event.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The storage backend rejected or lost the operation
    #[error("storage backend error: {0}")]
    Backend(String),
}
