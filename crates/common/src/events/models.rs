use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{BoardUuid, BusAgentHostname, RequestUuid};
use crate::state::ResultValue;

/// One event on the conductor's bus. `board`/`request` are carried as plain
/// fields (rather than nested per-kind) so [`super::EventFilter`] can match
/// on them uniformly regardless of `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub at: DateTime<Utc>,
    pub board: Option<BoardUuid>,
    pub request: Option<RequestUuid>,
    pub agent: Option<BusAgentHostname>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    BoardRegistered,
    BoardOnline,
    BoardOffline,
    BoardDestroyed,
    BusAgentRegistered,
    BusAgentUnregistered,
    RequestCreated { action: String },
    RequestCompleted { result: ResultValue },
    WorkflowStepCompleted { action: String, result: ResultValue },
}

impl Event {
    pub fn new(at: DateTime<Utc>, kind: EventKind) -> Self {
        Self {
            at,
            board: None,
            request: None,
            agent: None,
            kind,
        }
    }

    pub fn with_board(mut self, board: BoardUuid) -> Self {
        self.board = Some(board);
        self
    }

    pub fn with_request(mut self, request: RequestUuid) -> Self {
        self.request = Some(request);
        self
    }

    pub fn with_agent(mut self, agent: BusAgentHostname) -> Self {
        self.agent = Some(agent);
        self
    }
}
