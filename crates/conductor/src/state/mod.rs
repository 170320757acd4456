//! The conductor's global state: one `Arc<GlobalState>` shared across the
//! ingress API, the bus server, and the background reconciliation tasks.

pub mod agent_registry;
pub mod port_allocator;
pub mod session_manager;

use std::sync::Arc;

use dashmap::DashMap;
use iotronic_common::ids::{BoardUuid, PortUuid, RequestUuid};
use tokio::sync::Mutex;
use tracing_subscriber::{reload, EnvFilter};

use crate::cli::Config;
use crate::db::Database;
use crate::error::StartError;
use crate::gateway::DnsGateway;
use agent_registry::AgentRegistry;
use port_allocator::PortAllocator;

pub type ReloadHandler = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// The global state for the conductor.
pub struct GlobalState {
    pub config: Config,
    pub db: Database,
    pub events: iotronic_common::events::Events,
    pub agents: AgentRegistry,
    pub ports: PortAllocator,
    /// The socat port pool used by VIF attachment, `[10000, 20000]`, kept
    /// as a literal range. Distinct from `ports` (which pools public
    /// service-exposure ports): the two are never fungible with each other.
    pub socat_ports: PortAllocator,
    /// The socat port assigned to each live `Port` row. `Port` itself has
    /// no `tcp_port` field, so this in-memory map is the only record of
    /// the assignment; `remove_vif_from_board` consults it to release the
    /// right port.
    socat_assignments: DashMap<PortUuid, u16>,
    /// DNS record lifecycle for webservice fqdns. The DNS provider itself
    /// is an external collaborator out of scope for this crate; the
    /// default wiring in [`GlobalState::load`] is the in-memory
    /// implementation, which still enforces the uniqueness invariant
    /// `create_webservice`/`enable_webservice` depend on.
    pub dns: Arc<dyn DnsGateway>,
    pub log_level_handler: ReloadHandler,

    /// Per-board locks guarding the "at most one valid session" and
    /// board-mutation invariants.
    board_locks: DashMap<BoardUuid, Arc<Mutex<()>>>,
    /// Per-request locks guarding parent/child pending-counter bookkeeping.
    request_locks: DashMap<RequestUuid, Arc<Mutex<()>>>,
}

/// `[10000, 20000]` inclusive.
pub const SOCAT_PORT_MIN: u16 = 10_000;
pub const SOCAT_PORT_MAX: u16 = 20_000;

impl GlobalState {
    pub fn load(
        config: Config,
        db: Database,
        dns: Arc<dyn DnsGateway>,
        log_level_handler: ReloadHandler,
    ) -> Result<Arc<Self>, StartError> {
        let agents = AgentRegistry::load(db.bus_agents.read_all());

        let in_use_ports = db
            .exposed_services
            .read_all()
            .map(|(_, svc)| svc.public_port);
        let ports = PortAllocator::seeded(
            (config.conductor.service_port_min + 1)..=(config.conductor.service_port_max - 1),
            in_use_ports,
        );

        Ok(Arc::new(Self {
            config,
            db,
            events: iotronic_common::events::Events::default(),
            agents,
            ports,
            socat_ports: PortAllocator::new(SOCAT_PORT_MIN..=SOCAT_PORT_MAX),
            socat_assignments: DashMap::new(),
            dns,
            log_level_handler,
            board_locks: DashMap::new(),
            request_locks: DashMap::new(),
        }))
    }

    pub fn socat_assignment(&self, port_uuid: PortUuid) -> Option<u16> {
        self.socat_assignments.get(&port_uuid).map(|v| *v)
    }

    pub fn set_socat_assignment(&self, port_uuid: PortUuid, tcp_port: u16) {
        self.socat_assignments.insert(port_uuid, tcp_port);
    }

    pub fn clear_socat_assignment(&self, port_uuid: PortUuid) -> Option<u16> {
        self.socat_assignments.remove(&port_uuid).map(|(_, v)| v)
    }

    pub fn board_lock(&self, board_uuid: BoardUuid) -> Arc<Mutex<()>> {
        Arc::clone(
            self.board_locks
                .entry(board_uuid)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    pub fn request_lock(&self, request_uuid: RequestUuid) -> Arc<Mutex<()>> {
        Arc::clone(
            self.request_locks
                .entry(request_uuid)
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}
