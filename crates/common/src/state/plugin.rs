use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::ids::{BoardUuid, PluginUuid};

/// Plugin. `code` is the byte-serialized plugin payload (base64
/// over the wire; stored raw on disk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    pub uuid: PluginUuid,
    pub name: String,
    pub owner: String,
    pub code: Vec<u8>,
    pub public: bool,
    pub callable: bool,
    pub parameters: Json,
}

/// InjectionPlugin.status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "lowercase")]
pub enum InjectionStatus {
    Injected,
    Updated,
}

/// InjectionPlugin. Unique per `(board_uuid, plugin_uuid)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionPlugin {
    pub board_uuid: BoardUuid,
    pub plugin_uuid: PluginUuid,
    pub onboot: bool,
    pub status: InjectionStatus,
}
