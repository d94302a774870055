//! WebSocket endpoint bridging one socket to the channel hub.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::state::AppState;

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Pump hub messages out and client frames in until either side closes. The connection guard
/// purges this socket's subscriptions when the loop ends.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut outbound) = state.hub.connect();
    info!(connection = %conn.id(), "websocket client connected");

    loop {
        tokio::select! {
            msg = outbound.recv() => {
                let Some(text) = msg else { break };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = state.hub.handle_client_text(conn.id(), &text) {
                            if sender.send(Message::Text(reply.to_json())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(other)) => debug!(connection = %conn.id(), ?other, "ignoring frame"),
                    Some(Err(e)) => {
                        warn!(connection = %conn.id(), error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    info!(connection = %conn.id(), "websocket client disconnected");
}
