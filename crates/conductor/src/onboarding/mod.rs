//! The Onboarding Service: the registration handshake published by the
//! registration agent over the message bus, consumed once per physical
//! board boot.
//!
//! `register` is deliberately a free function taking `&GlobalState` rather
//! than a `BoardBusService` RPC method: it is invoked from the bus
//! transport's `registration-agent` realm handler, which has no board
//! session of its own to dispatch through.

pub mod config;

use iotronic_common::ids::SessionId;
use iotronic_common::rpc::error::RegistrationError;
use iotronic_common::state::{Board, BoardStatus, Session};
use serde_json::Value as Json;
use tracing::info;

use self::config::{build_config, AgentEndpoint};
use crate::state::session_manager::invalidate_current_session;
use crate::state::GlobalState;

fn find_by_code(state: &GlobalState, code: &str) -> Option<Board> {
    state.db.boards.read_all().find(|(_, b)| b.code == code).map(|(_, b)| b)
}

fn internal(e: impl std::fmt::Display) -> RegistrationError {
    RegistrationError::Internal(e.to_string())
}

/// Handles `register(code, session_id)`. Returns the config blob to send
/// back to the device: the freshly assembled one on first registration, or
/// the board's existing one on every call after.
pub async fn register(state: &GlobalState, code: &str, session_id: SessionId) -> Result<Json, RegistrationError> {
    let Some(board) = find_by_code(state, code) else {
        return Err(RegistrationError::UnknownCode);
    };

    let lock = state.board_lock(board.uuid);
    let _guard = lock.lock().await;

    // Re-fetch under the lock: the row above may be stale if another
    // registration for the same board landed while we waited for it.
    let mut board = find_by_code(state, code).ok_or(RegistrationError::UnknownCode)?;

    invalidate_current_session(&state.db, board.uuid).map_err(internal)?;
    state
        .db
        .sessions
        .insert(&session_id, &Session::new(session_id, board.uuid))
        .map_err(internal)?;

    if board.status != BoardStatus::Registered {
        board.status = BoardStatus::Offline;
        state.db.boards.insert(&board.uuid, &board).map_err(internal)?;
        info!(board = %board.uuid, "board re-registered, returning its existing config");
        return Ok(board.config.clone());
    }

    let registration_agent = state.agents.registration_agent().ok_or(RegistrationError::Internal(
        "no registration agent is online".to_string(),
    ))?;
    let main_agent = state.agents.best_agent().map_err(internal)?;

    let config = build_config(
        &board,
        &AgentEndpoint {
            url: registration_agent.wsurl.clone(),
            realm: state.config.wamp.wamp_realm.clone(),
        },
        &AgentEndpoint {
            url: main_agent.wsurl.clone(),
            realm: state.config.wamp.wamp_realm.clone(),
        },
    );

    board.agent = Some(main_agent.hostname.clone());
    board.status = BoardStatus::Offline;
    board.config = config.clone();
    state.db.boards.insert(&board.uuid, &board).map_err(internal)?;

    info!(board = %board.uuid, agent = %main_agent.hostname, "board registered for the first time");
    Ok(config)
}
