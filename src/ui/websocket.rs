//! WebSocket feed of meter frames
//!
//! Each connection polls the shared reading at the configured rate and pushes
//! one JSON [`MeterFrame`] per tick. Clients may switch the display mode over
//! the same socket.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

use crate::display::DisplayMode;
use crate::ui::server::{apply_display_mode, AppState};

/// Messages accepted from clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    SetDisplayMode { mode: DisplayMode },
    Ping,
}

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let poll_state = state.clone();
    let mut send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_state.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let frame = poll_state.frame();
            if let Ok(json) = serde_json::to_string(&frame) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => handle_client_message(message, &state).await,
                    Err(e) => tracing::debug!("Ignoring malformed client message: {}", e),
                },
                Message::Close(_) => break,
                _ => {
                    // Pings are answered by axum; binary is not used
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }
}

async fn handle_client_message(message: ClientMessage, state: &Arc<AppState>) {
    match message {
        ClientMessage::SetDisplayMode { mode } => {
            if let Err(e) = apply_display_mode(state.clone(), mode).await {
                tracing::warn!("Failed to persist display mode: {}", e);
            }
        }
        ClientMessage::Ping => {}
    }
}
