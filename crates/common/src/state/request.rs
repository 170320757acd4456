use serde::{Deserialize, Serialize};

use crate::ids::{BoardUuid, RequestUuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestType {
    Board,
    Float,
}

/// A request with `main_request_uuid` set is a child of that parent;
/// `pending_requests` on the parent equals the count of direct children
/// whose [`crate::state::ResultValue`] is still `Running`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub uuid: RequestUuid,
    pub destination_uuid: BoardUuid,
    pub main_request_uuid: Option<RequestUuid>,
    pub pending_requests: u32,
    pub status: RequestStatus,
    pub ty: RequestType,
    /// The dispatched call name (e.g. `"ServiceEnable"`), recorded for
    /// operator inspection; not validated against a closed set here (the
    /// closed per-domain action sets in this module gate which workflow
    /// can be invoked in the first place).
    pub action: String,
}

impl Request {
    pub fn new_root(
        uuid: RequestUuid,
        destination_uuid: BoardUuid,
        ty: RequestType,
        action: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            destination_uuid,
            main_request_uuid: None,
            pending_requests: 0,
            status: RequestStatus::Pending,
            ty,
            action: action.into(),
        }
    }

    pub fn new_child(
        uuid: RequestUuid,
        destination_uuid: BoardUuid,
        main_request_uuid: RequestUuid,
        action: impl Into<String>,
    ) -> Self {
        Self {
            uuid,
            destination_uuid,
            main_request_uuid: Some(main_request_uuid),
            pending_requests: 0,
            status: RequestStatus::Pending,
            ty: RequestType::Board,
            action: action.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultValue {
    Running,
    Success,
    Warning,
    Error,
}

impl ResultValue {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultValue::Running)
    }
}

/// Result. Unique per `(request_uuid, board_uuid)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub request_uuid: RequestUuid,
    pub board_uuid: BoardUuid,
    pub result: ResultValue,
    pub message: Option<String>,
}

impl ResultRow {
    pub fn new_running(request_uuid: RequestUuid, board_uuid: BoardUuid) -> Self {
        Self {
            request_uuid,
            board_uuid,
            result: ResultValue::Running,
            message: None,
        }
    }
}

macro_rules! closed_action_enum {
    ($name:ident, $err:literal, { $($variant:ident => $str:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::AsRefStr)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $str),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidAction;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok(Self::$variant),)+
                    other => Err(InvalidAction {
                        domain: $err,
                        action: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid {domain} action `{action}`")]
pub struct InvalidAction {
    pub domain: &'static str,
    pub action: String,
}

closed_action_enum!(BoardAction, "board", {
    Reboot => "Reboot",
    PowerOff => "PowerOff",
    Update => "Update",
});

closed_action_enum!(ServiceAction, "service", {
    ServiceEnable => "ServiceEnable",
    ServiceDisable => "ServiceDisable",
    ServiceRestore => "ServiceRestore",
});

closed_action_enum!(PluginAction, "plugin", {
    Start => "Start",
    Stop => "Stop",
    Restart => "Restart",
});

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn service_action_rejects_unknown_strings() {
        assert!(ServiceAction::from_str("ServiceEnable").is_ok());
        assert!(ServiceAction::from_str("ServiceNuke").is_err());
    }
}
