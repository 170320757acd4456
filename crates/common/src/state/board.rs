use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::ids::{BoardUuid, FleetUuid};
use crate::state::bus_agent::BusAgentHostname;

/// Board.status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
pub enum BoardStatus {
    Registered,
    Offline,
    Online,
}

/// Connectivity descriptor merged in from a board's `connection` handshake.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connectivity {
    pub mac_addr: Option<String>,
    pub kind: Option<String>,
    pub extra: Json,
}

/// Board.
///
/// `name` and `code` are unique across all boards (enforced by the
/// repository, not here); `status == Online` implies a valid [`Session`]
/// references this board (enforced by the session manager, not stored
/// redundantly on this struct).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub uuid: BoardUuid,
    pub name: String,
    /// One-time registration code, consumed by onboarding.
    pub code: String,
    pub status: BoardStatus,
    /// Hostname of the bus agent currently carrying this board's session.
    /// `None` while offline.
    pub agent: Option<BusAgentHostname>,
    pub fleet: Option<FleetUuid>,
    pub config: Json,
    pub extra: Json,
    pub lr_version: Option<String>,
    pub connectivity: Connectivity,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    pub fn new(name: impl Into<String>, code: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            uuid: BoardUuid::new(),
            name: name.into(),
            code: code.into(),
            status: BoardStatus::Registered,
            agent: None,
            fleet: None,
            config: Json::Null,
            extra: Json::Null,
            lr_version: None,
            connectivity: Connectivity::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self.status, BoardStatus::Online)
    }
}
