use serde::{Deserialize, Serialize};

use crate::ids::{BoardUuid, EnabledWebserviceUuid, WebserviceUuid};

/// EnabledWebservice: the single HTTP(S) exposure of a board's
/// web UI through the reverse proxy + DNS. At most one per board; `dns` is
/// globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnabledWebservice {
    pub uuid: EnabledWebserviceUuid,
    pub board_uuid: BoardUuid,
    pub http_port: u16,
    pub https_port: u16,
    pub dns: String,
    pub zone: String,
}

impl EnabledWebservice {
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.dns, self.zone)
    }
}

/// Webservice: a named HTTP endpoint on a board, projected under
/// `<name>.<dns>.<zone>`. Unique per `(board_uuid, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webservice {
    pub uuid: WebserviceUuid,
    pub board_uuid: BoardUuid,
    pub name: String,
    pub port: u16,
    pub secure: bool,
}
