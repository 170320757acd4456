//! The bus agent websocket endpoint (`GET /bus`). One connection multiplexes
//! [`ConductorBusService`] (served here) and [`BoardBusService`] (served by
//! the connecting agent) over a single socket. A bus agent re-announces
//! itself on every connect via [`Handshake`] rather than presenting a
//! signed reconnect token.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::StreamExt;
use iotronic_common::rpc::bus::{BoardBusServiceClient, ConductorBusService as _, Handshake};
use iotronic_common::rpc::codec;
use iotronic_common::rpc::RpcTransport;
use iotronic_common::state::BusAgent;
use tarpc::server::Channel;
use tokio::select;
use tracing::{error, info, warn};

use super::rpc::{ConductorRpcServer, MuxedMessageIncoming, MuxedMessageOutgoing};
use crate::state::{session_manager, GlobalState};

pub async fn bus_ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<GlobalState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state)).into_response()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<GlobalState>) {
    let handshake: Handshake = match socket.recv().await {
        Some(Ok(Message::Binary(bin))) => match codec::decode(&bin) {
            Ok(h) => h,
            Err(e) => {
                warn!("bus agent sent a malformed handshake: {e}");
                let _ = socket.send(Message::Close(None)).await;
                return;
            }
        },
        _ => {
            warn!("bus agent disconnected before sending a handshake");
            return;
        }
    };

    let hostname = iotronic_common::ids::BusAgentHostname::new(handshake.hostname.clone());
    let Ok(wsurl) = handshake.wsurl.parse() else {
        warn!(agent = %hostname, "bus agent reported an invalid wsurl");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let row = BusAgent::new(hostname.clone(), wsurl, handshake.ragent, Utc::now());
    if let Err(e) = state.agents.register(row.clone()) {
        warn!(agent = %hostname, "rejected bus agent connection: {e}");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    if let Err(e) = state.db.bus_agents.insert(&hostname, &row) {
        error!(agent = %hostname, "failed to persist bus agent row: {e}");
    }

    let (client_response_in, client_transport, mut client_request_out) = RpcTransport::new();
    let (server_request_in, server_transport, mut server_response_out) = RpcTransport::new();

    let client = BoardBusServiceClient::new(tarpc::client::Config::default(), client_transport).spawn();
    state.agents.attach_client(hostname.clone(), client);

    let server = tarpc::server::BaseChannel::with_defaults(server_transport);
    let server_handle = tokio::spawn(
        server
            .execute(
                ConductorRpcServer {
                    state: Arc::clone(&state),
                    agent: hostname.clone(),
                }
                .serve(),
            )
            .for_each(|r| async move {
                tokio::spawn(r);
            }),
    );

    info!(agent = %hostname, ragent = handshake.ragent, "bus agent connected");

    loop {
        select! {
            msg = socket.recv() => {
                match msg {
                    Some(Err(e)) => {
                        error!(agent = %hostname, "failed to receive a bus message: {e}");
                        break;
                    }
                    None => break,
                    Some(Ok(Message::Binary(bin))) => {
                        let msg: MuxedMessageIncoming = match codec::decode(&bin) {
                            Ok(msg) => msg,
                            Err(e) => {
                                error!(agent = %hostname, "failed to decode a bus message: {e}");
                                break;
                            }
                        };
                        match msg {
                            iotronic_common::rpc::MuxMessage::Parent(msg) => {
                                if let Err(e) = server_request_in.send(msg) {
                                    error!(agent = %hostname, "internal RPC channel closed: {e}");
                                    break;
                                }
                            }
                            iotronic_common::rpc::MuxMessage::Child(msg) => {
                                if let Err(e) = client_response_in.send(msg) {
                                    error!(agent = %hostname, "internal RPC channel closed: {e}");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break,
                    _ => (),
                }
            }

            msg = client_request_out.recv() => {
                let Some(msg) = msg else {
                    error!(agent = %hostname, "outgoing RPC channel closed");
                    break;
                };
                let bin = match codec::encode(&MuxedMessageOutgoing::Child(msg)) {
                    Ok(bin) => bin,
                    Err(e) => {
                        error!(agent = %hostname, "failed to encode a dispatch request: {e}");
                        break;
                    }
                };
                if let Err(e) = socket.send(Message::Binary(bin)).await {
                    error!(agent = %hostname, "failed to send a dispatch request: {e}");
                    break;
                }
            }

            msg = server_response_out.recv() => {
                let Some(msg) = msg else {
                    error!(agent = %hostname, "outgoing RPC channel closed");
                    break;
                };
                let bin = match codec::encode(&MuxedMessageOutgoing::Parent(msg)) {
                    Ok(bin) => bin,
                    Err(e) => {
                        error!(agent = %hostname, "failed to encode a response: {e}");
                        break;
                    }
                };
                if let Err(e) = socket.send(Message::Binary(bin)).await {
                    error!(agent = %hostname, "failed to send a response: {e}");
                    break;
                }
            }
        }
    }

    server_handle.abort();
    state.agents.unregister(&hostname);
    if let Some(mut row) = state.db.bus_agents.get(&hostname).unwrap_or(None) {
        row.online = false;
        row.updated_at = Utc::now();
        if let Err(e) = state.db.bus_agents.insert(&hostname, &row) {
            error!(agent = %hostname, "failed to persist bus agent disconnect: {e}");
        }
    }

    // No session on this agent survives its disconnect: an empty live-id set
    // invalidates every valid session still attributed to it.
    if let Err(e) = session_manager::reconcile(&state.db, &[], &hostname, Utc::now()) {
        error!(agent = %hostname, "failed to reconcile sessions on disconnect: {e}");
    }

    info!(agent = %hostname, "bus agent disconnected");
}
