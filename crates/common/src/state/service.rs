use serde::{Deserialize, Serialize};

use crate::ids::{BoardUuid, ExposedServiceUuid, ServiceUuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProtocol {
    Tcp,
    Udp,
}

/// Service: a logical description of a remote TCP/UDP service
/// exposed by a board, in terms of the board-local port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub uuid: ServiceUuid,
    pub name: String,
    pub protocol: ServiceProtocol,
    /// The device-local port.
    pub port: u16,
}

/// A `Service` exposed publicly on a board. `public_port` is unique across
/// all rows, globally rather than per-board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposedService {
    pub uuid: ExposedServiceUuid,
    pub board_uuid: BoardUuid,
    pub service_uuid: ServiceUuid,
    pub public_port: u16,
}
