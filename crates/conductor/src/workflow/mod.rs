//! The Workflow Coordinator: composes Device Dispatcher and repository
//! operations into the fleet-management operations the ingress API
//! exposes, sitting between the HTTP surface and the lower-level dispatch
//! primitives for board/plugin/service/webservice/port operations.

pub mod board;
pub mod plugin;
pub mod port;
pub mod service;
pub mod webservice;

use iotronic_common::ids::{BoardUuid, RequestUuid};
use iotronic_common::rpc::bus::BoardBusServiceClient;
use iotronic_common::state::{Board, Request, RequestStatus, RequestType, ResultRow, ResultValue};

use crate::error::ConductorError;
use crate::state::GlobalState;

/// Loads a board and fails `BoardNotConnected` unless it is online; used by
/// every workflow with an online precondition.
pub(crate) fn require_online(state: &GlobalState, board_uuid: BoardUuid) -> Result<Board, ConductorError> {
    let board = state
        .db
        .boards
        .get(&board_uuid)?
        .ok_or_else(|| ConductorError::BoardNotFound(board_uuid.to_string()))?;
    if !board.is_online() {
        return Err(ConductorError::BoardNotConnected(board_uuid.to_string()));
    }
    Ok(board)
}

/// The tarpc client for a board's current agent, or `BoardInvalidStatus`
/// when the board has no agent on file and `BoardNotConnected` when the
/// agent it names isn't presently connected.
pub(crate) fn board_client(state: &GlobalState, board: &Board) -> Result<BoardBusServiceClient, ConductorError> {
    let hostname = board
        .agent
        .clone()
        .ok_or_else(|| ConductorError::BoardInvalidStatus(board.uuid.to_string()))?;
    state
        .agents
        .client(&hostname)
        .ok_or_else(|| ConductorError::BoardNotConnected(board.uuid.to_string()))
}

/// Persists a parent Request with `pending_requests` preset to the number
/// of child dispatcher calls the caller is about to make. A parent never
/// gets a device-facing Result of its own; its completion is purely the
/// child counter reaching zero.
pub(crate) fn new_parent_request(
    state: &GlobalState,
    board_uuid: BoardUuid,
    action: &str,
    pending_requests: u32,
) -> Result<RequestUuid, ConductorError> {
    let uuid = RequestUuid::new();
    let mut request = Request::new_root(uuid, board_uuid, RequestType::Board, action);
    request.pending_requests = pending_requests;
    if pending_requests == 0 {
        request.status = RequestStatus::Completed;
    }
    state.db.requests.insert(&uuid, &request)?;
    Ok(uuid)
}

/// Writes a zero-pending parent Request plus a `WARNING` Result on that same
/// request uuid, used by the "already exists" scenarios that must record a
/// Result as well as raise a typed error.
pub(crate) fn warning_parent(
    state: &GlobalState,
    board_uuid: BoardUuid,
    action: &str,
    message: impl Into<String>,
) -> Result<RequestUuid, ConductorError> {
    let parent = new_parent_request(state, board_uuid, action, 0)?;
    state.db.results.insert(
        &parent,
        &ResultRow {
            request_uuid: parent,
            board_uuid,
            result: ResultValue::Warning,
            message: Some(message.into()),
        },
    )?;
    Ok(parent)
}
