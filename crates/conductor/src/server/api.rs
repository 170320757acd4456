//! The `/api/v1` route table: one handler function per route, with
//! `unwrap_or_not_found!`/`unwrap_or_bad_request!` macros to turn an
//! `Option` miss into the right error response inline instead of threading
//! it through `?`.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use iotronic_common::ids::{
    BoardUuid, FleetUuid, PluginUuid, PortUuid, RequestUuid, ServiceUuid, WebserviceUuid,
};
use iotronic_common::state::{Board, BoardAction, Fleet, Plugin, PluginAction, Service, ServiceAction, ServiceProtocol};
use serde::Deserialize;
use serde_json::{json, Value as Json_};
use tracing_subscriber::EnvFilter;

use super::events_ws;
use crate::error::ConductorError;
use crate::state::GlobalState;
use crate::workflow::{board, plugin, port, service, webservice};

#[macro_export]
macro_rules! unwrap_or_not_found {
    ($s:expr, $e:expr) => {
        match $e {
            Some(v) => v,
            None => return ConductorError::from($s).into_response(),
        }
    };
}

#[macro_export]
macro_rules! unwrap_or_bad_request {
    ($s:expr, $e:expr) => {
        match $e {
            Some(v) => v,
            None => return ConductorError::InvalidIdentity($s.to_owned()).into_response(),
        }
    };
}

pub(super) fn routes() -> Router<Arc<GlobalState>> {
    Router::new()
        .route("/events", get(events_ws::event_ws_handler))
        .route("/log/:level", post(set_log_level))
        .route("/boards", get(list_boards).post(create_board))
        .route("/boards/:id", get(get_board).delete(destroy_board))
        .route("/boards/:id/action/:action", post(action_board))
        .route("/boards/:id/restore_services", post(restore_services))
        .route("/plugins", get(list_plugins).post(create_plugin))
        .route("/plugins/:id", patch(update_plugin).delete(destroy_plugin))
        .route("/boards/:id/plugins/:plugin_id/inject", post(inject_plugin))
        .route("/boards/:id/plugins/:plugin_id", delete(remove_plugin))
        .route(
            "/boards/:id/plugins/:plugin_id/action/:action",
            post(action_plugin),
        )
        .route("/services", get(list_services).post(create_service))
        .route("/services/:id", patch(update_service).delete(destroy_service))
        .route(
            "/boards/:id/services/:service_id/action/:action",
            post(action_service),
        )
        .route("/boards/:id/ports", post(create_port))
        .route("/ports/:id", delete(destroy_port))
        .route(
            "/boards/:id/webservice",
            post(enable_webservice).delete(disable_webservice),
        )
        .route("/boards/:id/webservice/renew", post(renew_webservice))
        .route(
            "/boards/:id/webservice/expose",
            post(create_exposed_webservice),
        )
        .route(
            "/boards/:id/webservice/expose/:webservice_id",
            delete(destroy_exposed_webservice),
        )
        .route("/fleets", get(list_fleets).post(create_fleet))
        .route("/requests/:id", get(get_request))
        .route("/results/:id", get(get_result))
}

impl From<&str> for ConductorError {
    fn from(s: &str) -> Self {
        ConductorError::InvalidIdentity(s.to_string())
    }
}

fn ok_json(value: impl serde::Serialize) -> Response {
    Json(value).into_response()
}

// ---- boards ----

#[derive(Debug, Deserialize)]
struct CreateBoardBody {
    name: String,
    code: String,
}

async fn create_board(state: State<Arc<GlobalState>>, Json(body): Json<CreateBoardBody>) -> Response {
    match board::create_board(&state, &body.name, &body.code).await {
        Ok(b) => ok_json(b),
        Err(e) => e.into_response(),
    }
}

async fn list_boards(state: State<Arc<GlobalState>>) -> Response {
    let boards: Vec<Board> = state.db.boards.read_all().map(|(_, b)| b).collect();
    ok_json(boards)
}

async fn get_board(state: State<Arc<GlobalState>>, Path(id): Path<BoardUuid>) -> Response {
    match state.db.boards.get(&id) {
        Ok(Some(b)) => ok_json(b),
        Ok(None) => ConductorError::BoardNotFound(id.to_string()).into_response(),
        Err(e) => ConductorError::from(e).into_response(),
    }
}

async fn destroy_board(state: State<Arc<GlobalState>>, Path(id): Path<BoardUuid>) -> Response {
    match board::destroy_board(&state, id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

async fn action_board(state: State<Arc<GlobalState>>, Path((id, action)): Path<(BoardUuid, String)>) -> Response {
    let action = unwrap_or_bad_request!("unknown board action", BoardAction::from_str(&action).ok());
    match board::action_board(&state, id, action).await {
        Ok(outcome) => ok_json(outcome),
        Err(e) => e.into_response(),
    }
}

async fn restore_services(state: State<Arc<GlobalState>>, Path(id): Path<BoardUuid>) -> Response {
    match service::restore_services_on_board(&state, id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

// ---- plugins ----

#[derive(Debug, Deserialize)]
struct CreatePluginBody {
    name: String,
    owner: String,
    code: Vec<u8>,
    public: bool,
    callable: bool,
    #[serde(default)]
    parameters: Json_,
}

async fn create_plugin(state: State<Arc<GlobalState>>, Json(body): Json<CreatePluginBody>) -> Response {
    match plugin::create_plugin(
        &state,
        &body.name,
        &body.owner,
        body.code,
        body.public,
        body.callable,
        body.parameters,
    )
    .await
    {
        Ok(p) => ok_json(p),
        Err(e) => e.into_response(),
    }
}

async fn list_plugins(state: State<Arc<GlobalState>>) -> Response {
    let plugins: Vec<Plugin> = state.db.plugins.read_all().map(|(_, p)| p).collect();
    ok_json(plugins)
}

#[derive(Debug, Default, Deserialize)]
struct UpdatePluginBody {
    code: Option<Vec<u8>>,
    public: Option<bool>,
    callable: Option<bool>,
    parameters: Option<Json_>,
}

async fn update_plugin(
    state: State<Arc<GlobalState>>,
    Path(id): Path<PluginUuid>,
    Json(body): Json<UpdatePluginBody>,
) -> Response {
    match plugin::update_plugin(&state, id, body.code, body.public, body.callable, body.parameters).await {
        Ok(p) => ok_json(p),
        Err(e) => e.into_response(),
    }
}

async fn destroy_plugin(state: State<Arc<GlobalState>>, Path(id): Path<PluginUuid>) -> Response {
    match plugin::destroy_plugin(&state, id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct InjectBody {
    onboot: bool,
}

async fn inject_plugin(
    state: State<Arc<GlobalState>>,
    Path((id, plugin_id)): Path<(BoardUuid, PluginUuid)>,
    Json(body): Json<InjectBody>,
) -> Response {
    match plugin::inject(&state, id, plugin_id, body.onboot).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

async fn remove_plugin(state: State<Arc<GlobalState>>, Path((id, plugin_id)): Path<(BoardUuid, PluginUuid)>) -> Response {
    match plugin::remove(&state, id, plugin_id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

async fn action_plugin(
    state: State<Arc<GlobalState>>,
    Path((id, plugin_id, action)): Path<(BoardUuid, PluginUuid, String)>,
) -> Response {
    let action = unwrap_or_bad_request!("unknown plugin action", PluginAction::from_str(&action).ok());
    match plugin::action(&state, id, plugin_id, action).await {
        Ok(outcome) => ok_json(outcome),
        Err(e) => e.into_response(),
    }
}

// ---- services ----

#[derive(Debug, Deserialize)]
struct CreateServiceBody {
    name: String,
    protocol: ServiceProtocol,
    port: u16,
}

async fn create_service(state: State<Arc<GlobalState>>, Json(body): Json<CreateServiceBody>) -> Response {
    match service::create_service(&state, &body.name, body.protocol, body.port).await {
        Ok(s) => ok_json(s),
        Err(e) => e.into_response(),
    }
}

async fn list_services(state: State<Arc<GlobalState>>) -> Response {
    let services: Vec<Service> = state.db.services.read_all().map(|(_, s)| s).collect();
    ok_json(services)
}

#[derive(Debug, Default, Deserialize)]
struct UpdateServiceBody {
    name: Option<String>,
    port: Option<u16>,
}

async fn update_service(
    state: State<Arc<GlobalState>>,
    Path(id): Path<ServiceUuid>,
    Json(body): Json<UpdateServiceBody>,
) -> Response {
    match service::update_service(&state, id, body.name, body.port).await {
        Ok(s) => ok_json(s),
        Err(e) => e.into_response(),
    }
}

async fn destroy_service(state: State<Arc<GlobalState>>, Path(id): Path<ServiceUuid>) -> Response {
    match service::destroy_service(&state, id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

async fn action_service(
    state: State<Arc<GlobalState>>,
    Path((id, service_id, action)): Path<(BoardUuid, ServiceUuid, String)>,
) -> Response {
    let action = unwrap_or_bad_request!("unknown service action", ServiceAction::from_str(&action).ok());
    match service::action_service(&state, id, service_id, action).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

// ---- ports ----

#[derive(Debug, Deserialize)]
struct CreatePortBody {
    vif_name: String,
    mac: String,
    ip: std::net::IpAddr,
    network: String,
    cidr_prefix_len: u8,
}

async fn create_port(state: State<Arc<GlobalState>>, Path(id): Path<BoardUuid>, Json(body): Json<CreatePortBody>) -> Response {
    match port::create_port_on_board(
        &state,
        id,
        &body.vif_name,
        &body.mac,
        body.ip,
        &body.network,
        body.cidr_prefix_len,
    )
    .await
    {
        Ok(p) => ok_json(p),
        Err(e) => e.into_response(),
    }
}

async fn destroy_port(state: State<Arc<GlobalState>>, Path(id): Path<PortUuid>) -> Response {
    match port::remove_vif_from_board(&state, id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

// ---- webservices ----

#[derive(Debug, Deserialize)]
struct EnableWebserviceBody {
    dns: String,
    zone: String,
    email: String,
}

async fn enable_webservice(
    state: State<Arc<GlobalState>>,
    Path(id): Path<BoardUuid>,
    Json(body): Json<EnableWebserviceBody>,
) -> Response {
    match webservice::enable_webservice(&state, state.dns.as_ref(), id, &body.dns, &body.zone, &body.email).await {
        Ok(w) => ok_json(w),
        Err(e) => e.into_response(),
    }
}

async fn disable_webservice(state: State<Arc<GlobalState>>, Path(id): Path<BoardUuid>) -> Response {
    match webservice::disable_webservice(&state, state.dns.as_ref(), id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

async fn renew_webservice(state: State<Arc<GlobalState>>, Path(id): Path<BoardUuid>) -> Response {
    match webservice::renew_webservice(&state, id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct CreateWebserviceBody {
    name: String,
    port: u16,
    secure: bool,
}

async fn create_exposed_webservice(
    state: State<Arc<GlobalState>>,
    Path(id): Path<BoardUuid>,
    Json(body): Json<CreateWebserviceBody>,
) -> Response {
    match webservice::create_webservice(&state, state.dns.as_ref(), id, &body.name, body.port, body.secure).await {
        Ok(w) => ok_json(w),
        Err(e) => e.into_response(),
    }
}

async fn destroy_exposed_webservice(
    state: State<Arc<GlobalState>>,
    Path((id, webservice_id)): Path<(BoardUuid, WebserviceUuid)>,
) -> Response {
    match webservice::destroy_webservice(&state, state.dns.as_ref(), id, webservice_id).await {
        Ok(()) => ok_json(json!({})),
        Err(e) => e.into_response(),
    }
}

// ---- fleets ----

#[derive(Debug, Deserialize)]
struct CreateFleetBody {
    name: String,
    project: String,
}

async fn create_fleet(state: State<Arc<GlobalState>>, Json(body): Json<CreateFleetBody>) -> Response {
    let fleet = Fleet {
        uuid: FleetUuid::new(),
        name: body.name,
        project: body.project,
    };
    match state.db.fleets.insert(&fleet.uuid, &fleet) {
        Ok(()) => ok_json(fleet),
        Err(e) => ConductorError::from(e).into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListFleetsQuery {
    project: Option<String>,
}

async fn list_fleets(state: State<Arc<GlobalState>>, axum::extract::Query(q): axum::extract::Query<ListFleetsQuery>) -> Response {
    let fleets: Vec<Fleet> = state
        .db
        .fleets
        .read_all()
        .map(|(_, f)| f)
        .filter(|f| q.project.as_deref().is_none_or(|p| p == f.project))
        .collect();
    ok_json(fleets)
}

// ---- requests/results ----

async fn get_request(state: State<Arc<GlobalState>>, Path(id): Path<RequestUuid>) -> Response {
    match state.db.requests.get(&id) {
        Ok(Some(r)) => ok_json(r),
        Ok(None) => ConductorError::RequestNotFound(id.to_string()).into_response(),
        Err(e) => ConductorError::from(e).into_response(),
    }
}

async fn get_result(state: State<Arc<GlobalState>>, Path(id): Path<RequestUuid>) -> Response {
    match state.db.results.get(&id) {
        Ok(Some(r)) => ok_json(r),
        Ok(None) => ConductorError::RequestNotFound(id.to_string()).into_response(),
        Err(e) => ConductorError::from(e).into_response(),
    }
}

// ---- log level ----

async fn set_log_level(state: State<Arc<GlobalState>>, Path(level): Path<String>) -> Response {
    let filter = unwrap_or_bad_request!("invalid log level", EnvFilter::try_new(&level).ok());
    match state.log_level_handler.reload(filter) {
        Ok(()) => ok_json(json!({})),
        Err(e) => {
            tracing::error!("failed to reload log level: {e}");
            ConductorError::InvalidIdentity(level).into_response()
        }
    }
}
