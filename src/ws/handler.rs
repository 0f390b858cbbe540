//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::room::{RoomEvent, RoomHandle};
use crate::util::rate_limit::SessionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Capacity of a participant's outbound queue
const OUTBOUND_BUFFER: usize = 64;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Room code the connection wants to join
    pub code: String,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    // Resolve the room before upgrading
    match state.rooms.get(&query.code) {
        Ok(room) => {
            info!(room = %query.code, "WebSocket upgrade for room");
            ws.on_upgrade(move |socket| handle_socket(socket, room))
        }
        Err(e) => {
            warn!(room = %query.code, error = %e, "WebSocket join refused");
            Response::builder()
                .status(404)
                .body("Room not found".into())
                .unwrap()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, room: RoomHandle) {
    // The session token is the participant's identity for the room's lifetime
    let session_id = Uuid::new_v4();
    info!(room = %room.code, session = %session_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
    };
    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session = %session_id, error = %e, "Failed to send welcome");
        return;
    }

    // Register with the room task
    let (tx, mut rx) = mpsc::channel::<ServerMsg>(OUTBOUND_BUFFER);
    if room
        .event_tx
        .send(RoomEvent::Join { session_id, tx })
        .await
        .is_err()
    {
        // Room task already gone (destroyed between lookup and join)
        warn!(room = %room.code, session = %session_id, "Room closed before join");
        return;
    }

    // Writer task: room broadcasts -> WebSocket
    let writer_session = session_id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(session = %writer_session, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> room task
    let rate_limiter = SessionRateLimiter::new();
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_event() {
                    warn!(session = %session_id, "Rate limited event");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if room
                            .event_tx
                            .send(RoomEvent::Message { session_id, msg })
                            .await
                            .is_err()
                        {
                            debug!(session = %session_id, "Room event channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session = %session_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Disconnection removes the participant; the room decides whether this
    // destroys it
    let _ = room.event_tx.send(RoomEvent::Leave { session_id }).await;
    writer_handle.abort();

    info!(room = %room.code, session = %session_id, "WebSocket connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
