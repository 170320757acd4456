//! The Device Dispatcher: dispatches a short device-facing procedure to a
//! board's current session and correlates the asynchronous result.
//! Transport is the tarpc `BoardBusService` client for the board's resolved
//! bus agent, with a 120s per-call deadline and no retry.

use std::time::Duration;

use iotronic_common::ids::{BoardUuid, RequestUuid};
use iotronic_common::rpc::bus::{DispatchOutcome, WampResult};
use iotronic_common::state::{Board, Request, RequestType, ResultRow, ResultValue};
use iotronic_common::version;
use serde_json::json;
use tarpc::context;
use tracing::{info, warn};

use crate::error::ConductorError;
use crate::state::GlobalState;

const DISPATCH_DEADLINE: Duration = Duration::from_secs(120);

/// `execute_on_board(board_uuid, call, args, main_request_uuid?)`.
pub async fn execute_on_board(
    state: &GlobalState,
    board_uuid: BoardUuid,
    call: &str,
    args: serde_json::Value,
    main_request_uuid: Option<RequestUuid>,
) -> Result<(RequestUuid, DispatchOutcome), ConductorError> {
    let lock = state.board_lock(board_uuid);
    let _guard = lock.lock().await;

    let board: Board = state
        .db
        .boards
        .get(&board_uuid)?
        .ok_or_else(|| ConductorError::BoardNotFound(board_uuid.to_string()))?;

    if !board.is_online() {
        return Err(ConductorError::BoardNotConnected(board_uuid.to_string()));
    }
    let agent_host = board
        .agent
        .clone()
        .ok_or_else(|| ConductorError::BoardInvalidStatus(board_uuid.to_string()))?;
    let session_id = current_session(state, board_uuid)?
        .ok_or_else(|| ConductorError::BoardNotConnected(board_uuid.to_string()))?;

    let request_uuid = RequestUuid::new();
    let request = match main_request_uuid {
        Some(parent) => Request::new_child(request_uuid, board_uuid, parent, call),
        None => Request::new_root(request_uuid, board_uuid, RequestType::Board, call),
    };
    state.db.requests.insert(&request_uuid, &request)?;
    state
        .db
        .results
        .insert(&request_uuid, &ResultRow::new_running(request_uuid, board_uuid))?;

    // The WAMP URI is iotronic.<session_id>.<board_uuid>.<call>; logged here
    // since this is where the dispatcher constructs it, even though the
    // agent reconstructs the same string to publish on the bus.
    let uri = format!("iotronic.{session_id}.{board_uuid}.{call}");
    info!(%uri, "dispatching call to board");

    let params = if version::at_least(
        board.lr_version.as_deref().unwrap_or(""),
        version::REQUEST_OBJECT_MIN_VERSION,
    ) {
        json!({ "request": &request, "args": args })
    } else {
        json!({ "call": call, "args": args })
    };

    let Some(client) = state.agents.client(&agent_host) else {
        return Err(ConductorError::BoardNotConnected(board_uuid.to_string()));
    };

    let mut ctx = context::current();
    ctx.deadline = std::time::SystemTime::now() + DISPATCH_DEADLINE;

    let outcome = client
        .dispatch(ctx, session_id, board_uuid, request_uuid, call.to_string(), params)
        .await
        .map_err(|e| ConductorError::Dispatch(iotronic_common::rpc::error::DispatchError::Transport(e.to_string())))??;

    if outcome.result.is_terminal() {
        manage_result(state, request_uuid, board_uuid, outcome.result, outcome.message.clone()).await?;
    }

    Ok((request_uuid, outcome))
}

fn current_session(
    state: &GlobalState,
    board_uuid: BoardUuid,
) -> Result<Option<iotronic_common::ids::SessionId>, ConductorError> {
    for (id, session) in state.db.sessions.read_all() {
        if session.board_uuid == board_uuid && session.valid {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

/// Inbound `notify_result(board_uuid, wamp_message)`. Idempotent: a second
/// arrival for an already-terminal `(request_uuid, board_uuid)` Result is a
/// no-op success.
pub async fn notify_result(
    state: &GlobalState,
    board_uuid: BoardUuid,
    message: WampResult,
) -> Result<(), ConductorError> {
    let lock = state.request_lock(message.req_id);
    let _guard = lock.lock().await;

    let Some(mut result) = state.db.results.get(&message.req_id)? else {
        return Ok(());
    };
    if result.result.is_terminal() {
        // Already settled; idempotent no-op.
        return Ok(());
    }

    result.result = message.result;
    result.message = message.message.clone();
    state.db.results.insert(&message.req_id, &result)?;

    manage_result(state, message.req_id, board_uuid, message.result, message.message).await
}

/// Flips the request to `COMPLETED` once no `RUNNING` results remain for
/// it, cascading a pending-counter decrement to its parent. Applies the
/// `manage_result` error mapping:
/// `SUCCESS`/`WARNING` return normally (`WARNING` is logged), `ERROR` is
/// always raised.
async fn manage_result(
    state: &GlobalState,
    request_uuid: RequestUuid,
    _board_uuid: BoardUuid,
    result: ResultValue,
    message: Option<String>,
) -> Result<(), ConductorError> {
    let Some(mut request) = state.db.requests.get(&request_uuid)? else {
        return Ok(());
    };

    if !matches!(request.status, iotronic_common::state::RequestStatus::Completed) {
        request.status = iotronic_common::state::RequestStatus::Completed;
        state.db.requests.insert(&request_uuid, &request)?;

        if let Some(parent_uuid) = request.main_request_uuid {
            complete_child_of(state, parent_uuid).await?;
        }
    }

    match result {
        ResultValue::Success => Ok(()),
        ResultValue::Warning => {
            warn!(%request_uuid, message = message.as_deref().unwrap_or_default(), "device returned a warning");
            Ok(())
        }
        ResultValue::Error => Err(ConductorError::ErrorExecutionOnBoard {
            call: request.action.clone(),
            board: request.destination_uuid.to_string(),
            error: message.unwrap_or_default(),
        }),
        ResultValue::Running => Ok(()),
    }
}

async fn complete_child_of(state: &GlobalState, parent_uuid: RequestUuid) -> Result<(), ConductorError> {
    let lock = state.request_lock(parent_uuid);
    // `manage_result` already holds the child's request lock; the parent's
    // lock is distinct (keyed by parent_uuid) so this does not self-deadlock.
    let _guard = lock.lock().await;

    let Some(mut parent) = state.db.requests.get(&parent_uuid)? else {
        return Ok(());
    };
    parent.pending_requests = parent.pending_requests.saturating_sub(1);
    if parent.pending_requests == 0 {
        parent.status = iotronic_common::state::RequestStatus::Completed;
    }
    state.db.requests.insert(&parent_uuid, &parent)?;
    Ok(())
}
