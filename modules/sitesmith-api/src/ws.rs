use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::SplitSink, stream::StreamExt};
use tracing::debug;
use uuid::Uuid;

use sitesmith_common::Job;

use crate::AppState;

/// Idle period before a keep-alive ping frame is sent.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Live job updates: the current snapshot is delivered on connect, then
/// one snapshot per state change until the client disconnects. Idle
/// periods receive `{"type":"ping"}` keep-alives.
pub async fn ws_job_updates(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let Ok(job_id) = Uuid::parse_str(&id) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    ws.on_upgrade(move |socket| handle_job_socket(state, job_id, socket))
        .into_response()
}

async fn send_snapshot(sender: &mut SplitSink<WebSocket, Message>, job: &Job) -> bool {
    match serde_json::to_string(job) {
        Ok(payload) => sender.send(Message::Text(payload.into())).await.is_ok(),
        Err(_) => false,
    }
}

async fn handle_job_socket(state: Arc<AppState>, job_id: Uuid, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (subscription, mut updates) = state.hub.subscribe(job_id).await;

    // Current snapshot first, if the job exists.
    if let Some(job) = state.store.get(&job_id).await {
        if !send_snapshot(&mut sender, &job).await {
            state.hub.unsubscribe(job_id, subscription).await;
            return;
        }
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(job) => {
                        if !send_snapshot(&mut sender, &job).await {
                            break;
                        }
                    }
                    // Hub dropped this subscriber (e.g. backpressure).
                    None => break,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Client chatter just confirms liveness.
                    Some(Ok(_)) => {}
                }
            }
            _ = tokio::time::sleep(KEEP_ALIVE_INTERVAL) => {
                let ping = r#"{"type":"ping"}"#;
                if sender.send(Message::Text(ping.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.unsubscribe(job_id, subscription).await;
    debug!(%job_id, "WebSocket closed");
}
