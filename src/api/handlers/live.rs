// Copyright (c) Quill Team
// SPDX-License-Identifier: Apache-2.0

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::api::AppState;
use crate::broadcast::Broadcaster;
use crate::metrics;

/// The fixed frame pushed on every broadcast. Clients re-fetch whatever
/// they care about; the frame carries no payload.
const UPDATE_FRAME: &str = r#"{"update": true}"#;

/// Live-update channel. No authentication is tied to the connection:
/// every subscriber receives every signal.
pub async fn live_updates(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.broadcaster))
}

async fn handle_socket(socket: WebSocket, broadcaster: Broadcaster) {
    let (id, mut signals) = broadcaster.subscribe().await;
    metrics::LIVE_SUBSCRIBERS.set(broadcaster.subscriber_count().await as i64);

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Some(_) => {
                    if sink.send(Message::Text(UPDATE_FRAME.to_string())).await.is_err() {
                        break;
                    }
                }
                // Channel closed: the broadcaster already evicted us.
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Inbound frames carry nothing we act on.
                Some(Ok(_)) => {}
            },
        }
    }

    broadcaster.unsubscribe(id).await;
    metrics::LIVE_SUBSCRIBERS.set(broadcaster.subscriber_count().await as i64);
    debug!("Live connection {} closed", id);
}
