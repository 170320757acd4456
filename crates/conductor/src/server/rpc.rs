//! The `MuxedMessageIncoming`/`MuxedMessageOutgoing` wire types for the bus
//! websocket, plus [`ConductorRpcServer`]: the `ConductorBusService` the
//! conductor serves to a connected bus agent.

use iotronic_common::define_rpc_mux;
use iotronic_common::ids::{BoardUuid, BusAgentHostname, SessionId};
use iotronic_common::rpc::bus::{
    BoardBusServiceRequest, BoardBusServiceResponse, ConductorBusService,
    ConductorBusServiceRequest, ConductorBusServiceResponse, ConnectionInfo, WampResult,
};
use iotronic_common::events::{Event, EventKind};
use iotronic_common::rpc::error::{ProtocolError, RegistrationError};
use iotronic_common::state::Board;
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::dispatcher;
use crate::state::{session_manager, GlobalState};

define_rpc_mux!(
    parent;
    ConductorBusServiceRequest => ConductorBusServiceResponse;
    BoardBusServiceRequest => BoardBusServiceResponse;
);

#[derive(Clone)]
pub struct ConductorRpcServer {
    pub state: Arc<GlobalState>,
    pub agent: BusAgentHostname,
}

impl ConductorBusService for ConductorRpcServer {
    async fn connection(
        self,
        _: tarpc::context::Context,
        board_uuid: BoardUuid,
        session_id: SessionId,
        info: ConnectionInfo,
    ) -> Result<(), ProtocolError> {
        let lock = self.state.board_lock(board_uuid);
        let _guard = lock.lock().await;

        let mut board: Board = self
            .state
            .db
            .boards
            .get(&board_uuid)
            .map_err(|e| ProtocolError::Internal(e.to_string()))?
            .ok_or_else(|| ProtocolError::UnknownBoard(board_uuid.to_string()))?;

        session_manager::on_connection(
            &self.state.db,
            &mut board,
            session_id,
            self.agent.clone(),
            info,
            chrono::Utc::now(),
        )
        .map_err(|e| ProtocolError::Internal(e.to_string()))?;

        self.state
            .events
            .emit(Event::new(chrono::Utc::now(), EventKind::BoardOnline).with_board(board_uuid));
        Ok(())
    }

    async fn notify_result(
        self,
        _: tarpc::context::Context,
        board_uuid: BoardUuid,
        result: WampResult,
    ) -> Result<(), ProtocolError> {
        dispatcher::notify_result(&self.state, board_uuid, result)
            .await
            .map_err(|e| ProtocolError::Internal(e.to_string()))
    }

    /// The broker reports a session as joined; the session row itself is
    /// created by [`connection`](Self::connection), so this is informational
    /// only.
    async fn session_on_join(self, _: tarpc::context::Context, session_id: SessionId) {
        info!(%session_id, agent = %self.agent, "session joined");
    }

    async fn session_on_leave(self, _: tarpc::context::Context, session_id: SessionId) {
        if let Err(e) = session_manager::on_leave(&self.state.db, session_id, chrono::Utc::now()) {
            warn!(%session_id, "failed to record session departure: {e}");
        }
    }

    async fn register(
        self,
        _: tarpc::context::Context,
        code: String,
        session_id: SessionId,
    ) -> Result<Json, RegistrationError> {
        crate::onboarding::register(&self.state, &code, session_id).await
    }
}
