use serde::{Deserialize, Serialize};

use crate::ids::{BoardUuid, SessionId};

/// Session. Invariant: at most one session per board has
/// `valid = true`; creating a new session for a board atomically
/// invalidates any prior valid one (enforced by the Session Manager, see
/// `iotronic-conductor::state::session_manager`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub board_uuid: BoardUuid,
    pub valid: bool,
}

impl Session {
    pub fn new(session_id: SessionId, board_uuid: BoardUuid) -> Self {
        Self {
            session_id,
            board_uuid,
            valid: true,
        }
    }
}
