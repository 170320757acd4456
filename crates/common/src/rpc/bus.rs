//! The two services multiplexed over one bus-agent websocket connection.
//!
//! `ConductorBusService` is served by the conductor; a connected bus agent
//! calls it to report board connections, relay device results, and forward
//! session join/leave events. `BoardBusService` is served by the bus agent;
//! the conductor calls it to dispatch a device-facing procedure to a board,
//! or to drive an agent-facing proxy/network operation on the agent itself.

use serde::{Deserialize, Serialize};

use super::error::{DispatchError, ProtocolError, RegistrationError};
use crate::ids::{BoardUuid, RequestUuid, SessionId};
use crate::state::ResultValue;

/// First message a bus agent sends after the websocket connects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    pub hostname: String,
    pub wsurl: String,
    pub ragent: bool,
}

/// Connection metadata merged into a `Board` on a fresh `connection` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub lr_version: Option<String>,
    pub mac_addr: Option<String>,
    pub connectivity_type: Option<String>,
}

/// The device-originated `notify_result(board_uuid, wamp_message)` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WampResult {
    pub req_id: RequestUuid,
    pub result: ResultValue,
    pub message: Option<String>,
}

/// Service the conductor serves on the bus connection; called by the
/// connected bus agent.
#[tarpc::service]
pub trait ConductorBusService {
    /// A board announced itself on this agent's session.
    async fn connection(
        board_uuid: BoardUuid,
        session_id: SessionId,
        info: ConnectionInfo,
    ) -> Result<(), ProtocolError>;

    /// A device delivered the result of a previously dispatched request.
    async fn notify_result(board_uuid: BoardUuid, result: WampResult) -> Result<(), ProtocolError>;

    /// The broker reports a new live session on this agent.
    async fn session_on_join(session_id: SessionId);

    /// The broker reports a session has gone away.
    async fn session_on_leave(session_id: SessionId);

    /// The registration agent relays a first-contact `register` call.
    async fn register(
        code: String,
        session_id: SessionId,
    ) -> Result<serde_json::Value, RegistrationError>;
}

/// The bus agent's synchronous reply to a dispatched call: either the
/// device answered inline (a terminal `ResultValue`), or it only
/// acknowledged receipt and the real outcome will arrive later through
/// `ConductorBusService::notify_result` keyed by `req_id` (`ResultValue::Running`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub result: ResultValue,
    pub message: Option<String>,
}

/// Service a connected bus agent serves; called by the conductor.
#[tarpc::service]
pub trait BoardBusService {
    /// Dispatch a short device-facing procedure name (e.g. `ServiceEnable`)
    /// to `board_uuid`'s current session at the fully-qualified URI
    /// `iotronic.<session_id>.<board_uuid>.<call>` (constructed by the
    /// Device Dispatcher, passed here as its already-joined components).
    async fn dispatch(
        session_id: SessionId,
        board_uuid: BoardUuid,
        req_id: RequestUuid,
        call: String,
        params: serde_json::Value,
    ) -> Result<DispatchOutcome, DispatchError>;

    /// Create a TAP network interface for a board's VIF attachment.
    async fn create_tap_interface(board_uuid: BoardUuid, tcp_port: u16) -> Result<(), DispatchError>;

    /// Add `(board_uuid, port)` to the agent's allowlist file.
    async fn addin_allowlist(board_uuid: BoardUuid, port: u16) -> Result<(), DispatchError>;

    /// Remove `(board_uuid, port)` from the agent's allowlist file.
    async fn remove_from_allowlist(board_uuid: BoardUuid, port: u16) -> Result<(), DispatchError>;

    /// Write the reverse-proxy map/upstream/server files for a board's dns.
    async fn enable_webservice(
        board_uuid: BoardUuid,
        zone: String,
        fqdn: String,
        http_port: u16,
        https_port: u16,
    ) -> Result<(), DispatchError>;

    /// Remove the reverse-proxy files written by `enable_webservice`.
    async fn disable_webservice(board_uuid: BoardUuid) -> Result<(), DispatchError>;

    /// Insert a redirect line into a board's server block.
    async fn add_redirect(board_uuid: BoardUuid, host: String) -> Result<(), DispatchError>;

    /// Remove a previously inserted redirect line.
    async fn remove_redirect(board_uuid: BoardUuid, host: String) -> Result<(), DispatchError>;

    /// Ask the proxy process to reload its configuration.
    async fn reload_proxy() -> Result<(), DispatchError>;
}
