//! `GET /ws`: pushes refresh events to one browser.

use crate::dashboard::registry::RefreshEvent;
use crate::state::AppState;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use tokio::sync::broadcast::error::RecvError;

pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| forward_events(socket, state))
}

async fn forward_events(stream: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = stream.split();
    let mut events = state.refresh.subscribe();
    debug!("event=ws_connect module=dashboard status=ok");

    loop {
        tokio::select! {
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    // A slow browser missed events; resynchronize everything.
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("event=ws_lagged module=dashboard status=retry skipped={skipped}");
                        RefreshEvent::Dashboard
                    }
                    Err(RecvError::Closed) => break,
                };
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if sender.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    debug!("event=ws_disconnect module=dashboard status=ok");
}
