use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

pub use crate::ids::BusAgentHostname;

/// A message-bus-facing relay process that proxies device traffic between
/// the bus and one or more boards. Named `BusAgent` rather than plain
/// `Agent` to stay unambiguous next to board/device vocabulary.
///
/// Invariant: at most one online agent has `ragent = true` (enforced by
/// [`crate::rpc`]-consuming callers, specifically the Agent Registry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusAgent {
    pub hostname: BusAgentHostname,
    pub wsurl: Url,
    pub online: bool,
    pub ragent: bool,
    pub updated_at: DateTime<Utc>,
}

impl BusAgent {
    pub fn new(hostname: BusAgentHostname, wsurl: Url, ragent: bool, now: DateTime<Utc>) -> Self {
        Self {
            hostname,
            wsurl,
            online: true,
            ragent,
            updated_at: now,
        }
    }
}
