//! `/ws` and `/ws/status` (§4.5, §6) — the LiveSyncHub's transport layer.
//! Everything that decides *what* to broadcast lives in [`crate::hub`];
//! this module only moves bytes between an axum socket and a client's
//! [`crate::hub::ClientSink`].

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth_core::{AuthContext, WsAuthFailure};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

const CLOSE_EXPIRED: u16 = 4001;
const CLOSE_INVALID: u16 = 4002;

pub async fn upgrade(
    State(state): State<AppState>,
    Query(q): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> axum::response::Response {
    match state.auth.validate_token_for_ws(&q.token) {
        Ok(ctx) => ws.on_upgrade(move |socket| handle_socket(state, socket, ctx)),
        Err(WsAuthFailure::Expired) => close_immediately(ws, CLOSE_EXPIRED, "token expired"),
        Err(WsAuthFailure::Invalid) => close_immediately(ws, CLOSE_INVALID, "invalid token"),
    }
}

/// A token that fails validation never reaches [`handle_socket`] — the
/// upgrade itself completes (the HTTP handshake already happened), then
/// the socket is closed immediately with the code the client needs to
/// distinguish "log in again" from "get a fresh token".
fn close_immediately(ws: WebSocketUpgrade, code: u16, reason: &'static str) -> axum::response::Response {
    ws.on_upgrade(move |mut socket| async move {
        let _ = socket
            .send(Message::Close(Some(CloseFrame { code, reason: reason.into() })))
            .await;
    })
}

async fn handle_socket(state: AppState, socket: WebSocket, ctx: AuthContext) {
    let client_id = uuid::Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();

    state.hub.attach(&client_id, &ctx.user.username, &ctx.session.session_id, tx);

    let writer = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_client_message(&state, &client_id, &ctx, &text),
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.hub.detach(&client_id);
    writer.abort();
}

/// Client-initiated messages: `{"type": "ping", "timestamp": ...}`,
/// `{"type": "get_users"}`, `{"type": "message", "body": ...}`. Anything
/// else is ignored — this channel is push-only for domain data.
fn handle_client_message(state: &AppState, client_id: &str, ctx: &AuthContext, text: &str) {
    let Ok(value) = serde_json::from_str::<Value>(text) else { return };
    match value.get("type").and_then(Value::as_str) {
        Some("ping") => state.hub.reply_pong(client_id, value.get("timestamp").cloned()),
        Some("get_users") => state.hub.reply_connected_users(client_id),
        Some("message") => {
            let body = value.get("body").cloned().unwrap_or(json!(null));
            state.hub.publish_user_message(client_id, &ctx.user.username, body);
        }
        _ => {}
    }
}

pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "connected_clients": state.hub.size() }))
}
