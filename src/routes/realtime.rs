//! Realtime websocket: table change feed.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade (session cookie required) → register with the hub → send
//!    `session:connected` with `client_id`
//! 2. Client sends `realtime:subscribe` / `realtime:unsubscribe` frames →
//!    hub replies done or error
//! 3. Hub pushes `<table>:<event>` frames as writes land
//! 4. Close → unregister

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::frame::{Data, Frame, Status};
use crate::services::realtime::{CLIENT_CHANNEL_CAPACITY, RealtimeHub};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

/// `GET /api/realtime`
pub async fn handle_ws(State(state): State<AppState>, auth: AuthUser, ws: WebSocketUpgrade) -> Response {
    let user_id = auth.user.id;
    let is_admin = auth.is_admin();
    ws.on_upgrade(move |socket| run_ws(socket, state.realtime, user_id, is_admin))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, hub: RealtimeHub, user_id: Uuid, is_admin: bool) {
    let client_id = Uuid::new_v4();
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(CLIENT_CHANNEL_CAPACITY);
    hub.connect(client_id, user_id, is_admin, client_tx).await;

    let welcome = Frame::request("session:connected", Data::new())
        .with_data("client_id", client_id.to_string())
        .with_data("user_id", user_id.to_string());
    if send_frame(&mut socket, &welcome).await.is_ok() {
        let clients = hub.client_count().await;
        info!(%client_id, %user_id, is_admin, clients, "realtime: client connected");

        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(Ok(msg)) = msg else { break };
                    match msg {
                        Message::Text(text) => {
                            let reply = process_inbound_text(&hub, client_id, &text).await;
                            if send_frame(&mut socket, &reply).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                Some(frame) = client_rx.recv() => {
                    if send_frame(&mut socket, &frame).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    hub.disconnect(client_id).await;
    info!(%client_id, "realtime: client disconnected");
}

/// Parse one inbound text frame and return the reply for the sender.
async fn process_inbound_text(hub: &RealtimeHub, client_id: Uuid, text: &str) -> Frame {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "realtime: invalid inbound frame");
            return Frame::request("gateway:error", Data::new()).with_data("message", format!("invalid json: {e}"));
        }
    };
    info!(%client_id, id = %req.id, syscall = %req.syscall, "realtime: recv frame");
    hub.handle_frame(client_id, &req).await
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "realtime: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let message = frame
            .data
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, message, "realtime: send error frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}
