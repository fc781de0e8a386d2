use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ErrorPayload;
use crate::state::AppState;

const REPLY_BUFFER: usize = 64;

/// A request when `id` is present, an event otherwise.
#[derive(Debug, Deserialize)]
pub struct Packet {
    #[serde(default)]
    pub id: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Serialize)]
pub struct Reply {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<ErrorPayload>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<Reply>(REPLY_BUFFER);

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(reply) = reply_rx.recv().await {
            let json = match serde_json::to_string(&reply) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, reply_id = %reply.id, "failed to serialize reply for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };

            let packet: Packet = match serde_json::from_str(&text) {
                Ok(packet) => packet,
                Err(err) => {
                    warn!(error = %err, "dropping malformed ws packet");
                    continue;
                }
            };

            // each packet is handled on its own so a slow query does not stall the socket
            let state = state.clone();
            let reply_tx = reply_tx.clone();
            tokio::spawn(async move { handle_packet(&state, packet, &reply_tx).await });
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

pub async fn handle_packet(state: &AppState, packet: Packet, replies: &mpsc::Sender<Reply>) {
    let Some(id) = packet.id else {
        state.dispatcher.emit(&packet.pattern, packet.data).await;
        return;
    };

    let reply = match state.dispatcher.handle(&packet.pattern, packet.data).await {
        Ok(response) => Reply {
            id,
            response: Some(response),
            err: None,
        },
        Err(err) => Reply {
            id,
            response: None,
            err: Some(err.payload()),
        },
    };

    if replies.send(reply).await.is_err() {
        debug!("websocket closed before reply was sent");
    }
}
