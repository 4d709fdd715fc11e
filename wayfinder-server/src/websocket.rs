// WebSocket feed of scene reports

use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// WebSocket upgrade handler
pub async fn stream_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Push every new report to the client until either side goes away.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let mut reports = state.subscribe();
    let (mut sender, mut receiver) = socket.split();
    info!("Stream client connected");

    if let Some(latest) = state.latest() {
        if let Ok(json) = serde_json::to_string(&latest.report) {
            if sender.send(Message::Text(json)).await.is_err() {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            report = reports.recv() => match report {
                Ok(report) => {
                    let json = match serde_json::to_string(&report) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!("Failed to serialize scene report: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(json)).await {
                        debug!("Stream client went away: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Stream client lagging, skipped {} reports", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Stream receive error: {}", e);
                    break;
                }
            },
        }
    }
    info!("Stream client disconnected");
}
