//! Tracks liveness of message-bus agents and picks the registration agent
//! and a "best" agent for newly onboarded boards.

use dashmap::DashMap;
use iotronic_common::ids::BusAgentHostname;
use iotronic_common::rpc::bus::BoardBusServiceClient;
use iotronic_common::state::BusAgent;
use rand::seq::IteratorRandom;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentRegistryError {
    #[error("another online agent is already registered as the registration agent")]
    RegistrationAgentConflict,
    #[error("no online bus agent is available")]
    NoAgentAvailable,
}

/// An in-memory mirror of the `bus_agents` tree plus the live tarpc client
/// for each connected agent. Loaded from the database at startup into a
/// `DashMap`.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    rows: DashMap<BusAgentHostname, BusAgent>,
    clients: DashMap<BusAgentHostname, BoardBusServiceClient>,
}

impl AgentRegistry {
    pub fn load(rows: impl Iterator<Item = (BusAgentHostname, BusAgent)>) -> Self {
        Self {
            rows: rows.collect(),
            clients: DashMap::new(),
        }
    }

    pub fn get(&self, hostname: &BusAgentHostname) -> Option<BusAgent> {
        self.rows.get(hostname).map(|r| r.clone())
    }

    pub fn client(&self, hostname: &BusAgentHostname) -> Option<BoardBusServiceClient> {
        self.clients.get(hostname).map(|c| c.clone())
    }

    pub fn attach_client(&self, hostname: BusAgentHostname, client: BoardBusServiceClient) {
        self.clients.insert(hostname, client);
    }

    pub fn detach_client(&self, hostname: &BusAgentHostname) {
        self.clients.remove(hostname);
    }

    /// Upserts an agent row. Fails if `ragent` is requested and a different
    /// online agent already holds it.
    pub fn register(&self, agent: BusAgent) -> Result<(), AgentRegistryError> {
        if agent.ragent {
            let conflict = self.rows.iter().any(|r| {
                r.key() != &agent.hostname && r.ragent && r.online
            });
            if conflict {
                return Err(AgentRegistryError::RegistrationAgentConflict);
            }
        }
        self.rows.insert(agent.hostname.clone(), agent);
        Ok(())
    }

    pub fn unregister(&self, hostname: &BusAgentHostname) {
        if let Some(mut row) = self.rows.get_mut(hostname) {
            row.online = false;
        }
        self.clients.remove(hostname);
    }

    pub fn registration_agent(&self) -> Option<BusAgent> {
        self.rows
            .iter()
            .find(|r| r.ragent && r.online)
            .map(|r| r.clone())
    }

    /// Picks a "best" agent for a newly onboarded board: a uniformly random
    /// choice among online, connected agents other than the registration
    /// agent (spreading load evenly across the fleet), falling back to the
    /// registration agent itself if it is the only one online.
    pub fn best_agent(&self) -> Result<BusAgent, AgentRegistryError> {
        self.rows
            .iter()
            .filter(|r| r.online && !r.ragent)
            .map(|r| r.clone())
            .choose(&mut rand::thread_rng())
            .or_else(|| self.registration_agent())
            .ok_or(AgentRegistryError::NoAgentAvailable)
    }

    pub fn all(&self) -> Vec<BusAgent> {
        self.rows.iter().map(|r| r.clone()).collect()
    }
}
