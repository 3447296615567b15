//! WebSocket connection handler
//!
//! Handles individual client connections: upgrade-request validation,
//! join-parameter extraction, and bidirectional bridging between the
//! socket and the room actor.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{StatusCode, Uri};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::config::OUTBOUND_BUFFER_SIZE;
use crate::error::AppError;
use crate::resolver::RoomResolver;
use crate::types::{ConnectionId, RoomId};

/// The one path the relay serves
const WS_PATH: &str = "/ws";

/// Display name used when the join request carries none
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Parameters extracted once from the upgrade request
///
/// Both are consumed at connect time and immutable thereafter; a
/// reconnecting client gets a fresh pair from its new request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub room: RoomId,
    pub author: String,
}

impl JoinRequest {
    /// Parse the request URI: path must be `/ws`, query must carry a
    /// non-blank `room`; `name` is optional and defaults to Anonymous
    pub fn from_uri(uri: &Uri) -> Option<Self> {
        if uri.path() != WS_PATH {
            return None;
        }
        let query = uri.query().unwrap_or("");
        let room = query_param(query, "room")?;
        let room = room.trim();
        if room.is_empty() {
            return None;
        }
        let author = query_param(query, "name")
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string());
        Some(Self {
            room: RoomId::new(room),
            author,
        })
    }
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake (rejecting anything that is not a
/// join request with a 404), registers with the room actor, and runs the
/// read/write task pair until the connection ends.
pub async fn handle_connection(stream: TcpStream, resolver: RoomResolver) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // Validate the upgrade request and capture the join parameters in
    // one pass; anything unrecognized gets a generic not-found response.
    let mut join: Option<JoinRequest> = None;
    let callback = |req: &Request, resp: Response| match JoinRequest::from_uri(req.uri()) {
        Some(parsed) => {
            join = Some(parsed);
            Ok(resp)
        }
        None => {
            debug!("Rejecting non-join request for {}", req.uri());
            Err(not_found())
        }
    };
    let ws_stream = tokio_tungstenite::accept_hdr_async(stream, callback).await?;
    let join = join.ok_or(AppError::NotAJoinRequest)?;

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = ConnectionId::new();
    info!(
        "Connection {} from {} joining room {} as '{}'",
        connection_id, peer_addr, join.room, join.author
    );

    // Channel for room -> connection messages
    let (msg_tx, mut msg_rx) = mpsc::channel(OUTBOUND_BUFFER_SIZE);

    let room = resolver.resolve(join.room).await;
    room.connect(connection_id, join.author, msg_tx).await?;

    // Clone the handle for the read task
    let room_read = room.clone();

    // Read task (WebSocket -> RoomCommand)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    if room_read.inbound(connection_id, text.to_string()).await.is_err() {
                        debug!("Room closed, ending read task for {}", connection_id);
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Connection {} sent close frame", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", connection_id);
                }
                Ok(Message::Pong(_)) => {
                    debug!("Pong from {}", connection_id);
                }
                Ok(_) => {
                    // Binary or other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", connection_id, e);
                    // Log-only event; removal happens via the Disconnect
                    // sent after the loop.
                    let _ = room_read
                        .socket_error(connection_id, e.to_string())
                        .await;
                    break;
                }
            }
        }
        debug!("Read task ended for {}", connection_id);
    });

    // Write task (ChatMessage -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to serialize message: {}", e);
                    // Continue - don't break on serialization errors
                }
            }
        }
        debug!("Write task ended for {}", connection_id);

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", connection_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", connection_id);
        }
    }

    // Idempotent on the room side if the transport delivers it twice
    let _ = room.disconnect(connection_id).await;

    info!("Connection {} closed", connection_id);

    Ok(())
}

/// Generic not-found response for anything that is not a join request
fn not_found() -> ErrorResponse {
    let mut resp = ErrorResponse::new(None);
    *resp.status_mut() = StatusCode::NOT_FOUND;
    resp
}

/// Extract one query parameter, percent-decoded
fn query_param(query: &str, key: &str) -> Option<String> {
    for pair in query.split('&') {
        let mut parts = pair.splitn(2, '=');
        if parts.next().unwrap_or("") == key {
            return Some(percent_decode(parts.next().unwrap_or("")));
        }
    }
    None
}

/// Minimal percent-decoding: `%XX` escapes and `+` as space
///
/// Malformed escapes pass through literally; invalid UTF-8 is replaced.
fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi * 16 + lo);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
