use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::ids::{BoardUuid, PortUuid};

/// Port: a virtual network interface attached to a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub uuid: PortUuid,
    pub vif_name: String,
    pub mac: String,
    pub ip: IpAddr,
    pub network: String,
    pub board_uuid: BoardUuid,
}
