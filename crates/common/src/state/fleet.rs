use serde::{Deserialize, Serialize};

use crate::ids::FleetUuid;

/// Fleet: a grouping container for boards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fleet {
    pub uuid: FleetUuid,
    pub name: String,
    pub project: String,
}
