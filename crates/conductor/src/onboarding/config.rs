//! The board configuration blob: opaque to the device but a stable layout,
//! assembled once at first-time registration and returned verbatim on
//! every re-registration afterward.

use chrono::{DateTime, Utc};
use iotronic_common::state::Board;
use serde_json::{json, Value as Json};
use url::Url;

/// `register_agent`/`main_agent` carry the WAMP realm alongside the url so
/// the blob can name both without a second lookup at read time.
pub struct AgentEndpoint {
    pub url: Url,
    pub realm: String,
}

/// Builds the full config blob: `wamp.registration-agent`, `wamp.main-agent`,
/// `node` (the board's scalar identity fields plus `type: "yun"`), `extra`.
pub fn build_config(board: &Board, registration_agent: &AgentEndpoint, main_agent: &AgentEndpoint) -> Json {
    json!({
        "iotronic": {
            "wamp": {
                "registration-agent": { "url": registration_agent.url.as_str(), "realm": registration_agent.realm },
                "main-agent": { "url": main_agent.url.as_str(), "realm": main_agent.realm },
            },
            "node": node_fields(board),
            "extra": {},
        }
    })
}

/// The `conf_clean` variant: omits `main-agent`, replaces `node.code` with
/// the literal registration-token placeholder.
pub fn build_config_clean(board: &Board, registration_agent: &AgentEndpoint) -> Json {
    let mut node = node_fields(board);
    node["token"] = Json::String("<REGISTRATION-TOKEN>".to_string());

    json!({
        "iotronic": {
            "wamp": {
                "registration-agent": { "url": registration_agent.url.as_str(), "realm": registration_agent.realm },
            },
            "node": node,
            "extra": {},
        }
    })
}

fn node_fields(board: &Board) -> Json {
    json!({
        "uuid": board.uuid,
        "name": board.name,
        "code": board.code,
        "type": "yun",
        "created_at": fmt_time(board.created_at),
        "updated_at": fmt_time(board.updated_at),
    })
}

fn fmt_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339()
}
