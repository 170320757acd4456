//! The ingress API and bus transport entrypoint: one axum `Router` layering
//! request-stamp/log-request middleware over a nested `/api/v1` route table
//! plus the bus agent websocket route.

pub mod api;
pub mod events_ws;
pub mod rpc;
pub mod websocket;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Router};

use crate::error::StartError;
use crate::logging::{log_request, req_stamp};
use crate::state::GlobalState;

pub async fn start(state: Arc<GlobalState>, socket_addr: SocketAddr) -> Result<(), StartError> {
    let app = Router::new()
        .route("/bus", get(websocket::bus_ws_handler))
        .nest("/api/v1", api::routes())
        .with_state(Arc::clone(&state))
        .layer(middleware::map_response(log_request))
        .layer(middleware::from_fn(req_stamp));

    let listener = tokio::net::TcpListener::bind(socket_addr)
        .await
        .map_err(StartError::TcpBind)?;

    axum::serve(listener, app).await.map_err(StartError::Serve)?;

    Ok(())
}
