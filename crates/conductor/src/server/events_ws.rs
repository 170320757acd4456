//! `GET /api/v1/events`: a websocket stream of every [`Event`] matching an
//! optional query-param [`EventFilter`]. No `Subscribe`/`Unsubscribe`
//! in-band requests: the filter is fixed for the connection's lifetime,
//! set once from the query string.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use iotronic_common::events::EventFilter;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tracing::error;

use crate::state::GlobalState;

pub async fn event_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GlobalState>>,
    Query(filter): Query<EventFilter>,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state, filter))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<GlobalState>, filter: EventFilter) {
    let mut events = state.events.subscribe();

    loop {
        select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => continue,
                }
            }

            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "event websocket fell behind, dropping missed events");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !filter.matches(&event) {
                    continue;
                }
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("failed to serialize event for websocket: {e}");
                        break;
                    }
                };
                if let Err(e) = socket.send(Message::Text(json)).await {
                    error!("failed to send event to websocket: {e}");
                    break;
                }
            }
        }
    }
}
