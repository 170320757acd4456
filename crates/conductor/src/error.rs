//! Process-level errors: startup failures and the domain-wide error enum
//! every repository/workflow operation returns.

use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use iotronic_common::db::DatabaseError;
use iotronic_common::rpc::error::DispatchError;
use iotronic_common::state::InvalidAction;
use iotronic_common::{impl_into_status_code, impl_into_type_str};
use serde::{ser::SerializeStruct, Serialize, Serializer};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::state::agent_registry::AgentRegistryError;
use crate::state::port_allocator::PortAllocatorError;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to open database: {0}")]
    Database(#[from] DatabaseError),
    #[error("failed to bind to tcp: {0}")]
    TcpBind(#[source] std::io::Error),
    #[error("failed to serve: {0}")]
    Serve(#[source] std::io::Error),
    #[error("failed to read configuration: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// The one error enum every repository/workflow/dispatcher operation
/// returns. Rendered through the ingress API via `impl_into_status_code!`
/// for the HTTP status, `impl_into_type_str!` for the machine-readable
/// `type` field, and a hand-written `Serialize` that always emits
/// `{"type": ..., "error": ...}`.
#[derive(Debug, Error, strum_macros::AsRefStr)]
pub enum ConductorError {
    #[error("board not found: {0}")]
    BoardNotFound(String),
    #[error("plugin not found: {0}")]
    PluginNotFound(String),
    #[error("service not found: {0}")]
    ServiceNotFound(String),
    #[error("exposed service not found: {0}")]
    ExposedServiceNotFound(String),
    #[error("webservice not found: {0}")]
    WebserviceNotFound(String),
    #[error("fleet not found: {0}")]
    FleetNotFound(String),
    #[error("request not found: {0}")]
    RequestNotFound(String),
    #[error("port not found: {0}")]
    PortNotFound(String),
    #[error("`{0}` is neither a uuid nor a recognized identity")]
    InvalidIdentity(String),
    #[error("a board with code {0} already exists")]
    DuplicateCode(String),
    #[error("a board with name {0} already exists")]
    DuplicateName(String),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("board {0} is not connected")]
    BoardNotConnected(String),
    #[error("board {0} has no current agent")]
    BoardInvalidStatus(String),
    #[error("no registration agent is online")]
    NoRegistrationAgent,
    #[error("no bus agents are online")]
    NoAgents,
    #[error("no free port remains for this service")]
    NotEnoughPortForService,
    #[error("service is already exposed on this board")]
    ServiceAlreadyExposed,
    #[error("a webservice is already enabled on this board")]
    EnabledWebserviceAlreadyExists,
    #[error("DNS already exists!")]
    DnsWebserviceAlreadyExists { parent_request: String },
    #[error("no enabled webservice on this board")]
    EnabledWebserviceNotFound,
    #[error("device reported an error executing `{call}` on board {board}: {error}")]
    ErrorExecutionOnBoard {
        call: String,
        board: String,
        error: String,
    },
    #[error(transparent)]
    InvalidAction(#[from] InvalidAction),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    AgentRegistry(#[from] AgentRegistryError),
    #[error(transparent)]
    PortAllocator(#[from] PortAllocatorError),
}

impl_into_status_code!(ConductorError, |value| match value {
    BoardNotFound(_)
    | PluginNotFound(_)
    | ServiceNotFound(_)
    | ExposedServiceNotFound(_)
    | WebserviceNotFound(_)
    | FleetNotFound(_)
    | RequestNotFound(_)
    | PortNotFound(_)
    | EnabledWebserviceNotFound => StatusCode::NOT_FOUND,
    InvalidIdentity(_) | InvalidAction(_) => StatusCode::BAD_REQUEST,
    DuplicateCode(_)
    | DuplicateName(_)
    | AlreadyExists(_)
    | ServiceAlreadyExposed
    | EnabledWebserviceAlreadyExists
    | DnsWebserviceAlreadyExists { .. } => StatusCode::CONFLICT,
    BoardNotConnected(_) | BoardInvalidStatus(_) => StatusCode::SERVICE_UNAVAILABLE,
    NoRegistrationAgent | NoAgents | NotEnoughPortForService => StatusCode::SERVICE_UNAVAILABLE,
    ErrorExecutionOnBoard { .. } => StatusCode::BAD_GATEWAY,
    Database(_) | Dispatch(_) | Gateway(_) | AgentRegistry(_) | PortAllocator(_) =>
        StatusCode::INTERNAL_SERVER_ERROR,
});

impl_into_type_str!(ConductorError);

impl Serialize for ConductorError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Error", 2)?;
        state.serialize_field("type", &String::from(self))?;
        state.serialize_field("error", &self.to_string())?;
        state.end()
    }
}

impl IntoResponse for ConductorError {
    fn into_response(self) -> Response {
        let body = json!(self);
        let mut res = (StatusCode::from(&self), Json(&body)).into_response();
        res.extensions_mut().insert(body);
        res
    }
}
