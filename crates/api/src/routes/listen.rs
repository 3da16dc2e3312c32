use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use kb_core::events::DocumentChanged;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::state::AppState;

/// Live `DocumentChanged` stream over a websocket.
pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/listen", get(listen))
}

async fn listen(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let events = state.service().events().subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, events))
}

async fn stream_events(mut socket: WebSocket, mut events: broadcast::Receiver<DocumentChanged>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::error!(error = %err, "failed to serialize document event");
                        continue;
                    }
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "listener lagged behind the event bus");
            }
            Err(RecvError::Closed) => break,
        }
    }
    tracing::debug!("listener disconnected");
}
