//! `create_board`, `destroy_board`, `action_board`: board lifecycle and
//! device-facing actions.

use chrono::Utc;
use iotronic_common::ids::BoardUuid;
use iotronic_common::rpc::bus::DispatchOutcome;
use iotronic_common::state::{Board, BoardAction};
use serde_json::json;
use tarpc::context;

use super::{board_client, require_online};
use crate::dispatcher;
use crate::error::ConductorError;
use crate::state::GlobalState;

/// `name` is unique across all boards; no device call is made.
pub async fn create_board(state: &GlobalState, name: &str, code: &str) -> Result<Board, ConductorError> {
    if state.db.boards.read_all().any(|(_, b)| b.name == name) {
        return Err(ConductorError::DuplicateName(name.to_string()));
    }
    let board = Board::new(name, code, Utc::now());
    state.db.boards.insert(&board.uuid, &board)?;
    Ok(board)
}

/// If online, dispatches `DeviceFactoryReset`, then removes every
/// `ExposedService` of the board from the agent's allowlist, then cascade
/// deletes the board and all dependent rows in one unit.
pub async fn destroy_board(state: &GlobalState, board_uuid: BoardUuid) -> Result<(), ConductorError> {
    let board = state
        .db
        .boards
        .get(&board_uuid)?
        .ok_or_else(|| ConductorError::BoardNotFound(board_uuid.to_string()))?;

    if board.is_online() {
        dispatcher::execute_on_board(state, board_uuid, "DeviceFactoryReset", json!({}), None).await?;
    }

    let exposed: Vec<_> = state
        .db
        .exposed_services
        .read_all()
        .filter(|(_, svc)| svc.board_uuid == board_uuid)
        .collect();
    let client = board_client(state, &board).ok();
    for (uuid, svc) in exposed {
        if let Some(client) = &client {
            let _ = client
                .remove_from_allowlist(context::current(), board_uuid, svc.public_port)
                .await;
        }
        state.ports.release(svc.public_port).await;
        state.db.exposed_services.remove(&uuid)?;
    }

    for (key, _) in state
        .db
        .injections
        .read_all()
        .filter(|((b, _), _)| *b == board_uuid)
        .collect::<Vec<_>>()
    {
        state.db.injections.remove(&key)?;
    }
    for (uuid, _) in state
        .db
        .ports
        .read_all()
        .filter(|(_, p)| p.board_uuid == board_uuid)
        .collect::<Vec<_>>()
    {
        state.db.ports.remove(&uuid)?;
    }
    for (uuid, _) in state
        .db
        .webservices
        .read_all()
        .filter(|(_, w)| w.board_uuid == board_uuid)
        .collect::<Vec<_>>()
    {
        state.db.webservices.remove(&uuid)?;
    }
    for (uuid, _) in state
        .db
        .enabled_webservices
        .read_all()
        .filter(|(_, w)| w.board_uuid == board_uuid)
        .collect::<Vec<_>>()
    {
        state.db.enabled_webservices.remove(&uuid)?;
    }
    for (id, _) in state
        .db
        .sessions
        .read_all()
        .filter(|(_, s)| s.board_uuid == board_uuid)
        .collect::<Vec<_>>()
    {
        state.db.sessions.remove(&id)?;
    }

    state.db.boards.remove(&board_uuid)?;
    Ok(())
}

/// Online precondition; `action` is already validated against the closed
/// `BoardAction` set by the caller's `FromStr` parse.
pub async fn action_board(
    state: &GlobalState,
    board_uuid: BoardUuid,
    action: BoardAction,
) -> Result<DispatchOutcome, ConductorError> {
    require_online(state, board_uuid)?;
    let (_, outcome) = dispatcher::execute_on_board(state, board_uuid, action.as_str(), json!({}), None).await?;
    Ok(outcome)
}
