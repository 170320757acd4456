//! The conductor's on-disk store: one [`DbTree`] per entity, opened once at
//! startup from `cli.path`.

use std::path::Path;

use iotronic_common::db::{DatabaseError, DbTree};
use iotronic_common::ids::{
    BoardUuid, BusAgentHostname, EnabledWebserviceUuid, ExposedServiceUuid, FleetUuid, PluginUuid,
    PortUuid, RequestUuid, ServiceUuid, SessionId, WebserviceUuid,
};
use iotronic_common::state::{
    Board, BusAgent, EnabledWebservice, ExposedService, Fleet, InjectionPlugin, Plugin, Port,
    ResultRow, Service, Session, Webservice,
};

#[derive(Debug, Clone)]
pub struct Database {
    inner: sled::Db,
    pub boards: DbTree<BoardUuid, Board>,
    pub sessions: DbTree<SessionId, Session>,
    pub bus_agents: DbTree<BusAgentHostname, BusAgent>,
    pub plugins: DbTree<PluginUuid, Plugin>,
    pub injections: DbTree<(BoardUuid, PluginUuid), InjectionPlugin>,
    pub services: DbTree<ServiceUuid, Service>,
    pub exposed_services: DbTree<ExposedServiceUuid, ExposedService>,
    pub webservices: DbTree<WebserviceUuid, Webservice>,
    pub enabled_webservices: DbTree<EnabledWebserviceUuid, EnabledWebservice>,
    pub ports: DbTree<PortUuid, Port>,
    pub fleets: DbTree<FleetUuid, Fleet>,
    pub requests: DbTree<RequestUuid, iotronic_common::state::Request>,
    pub results: DbTree<RequestUuid, ResultRow>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let db = sled::open(path).map_err(|source| DatabaseError::Open {
            path: path.display().to_string(),
            source,
        })?;

        macro_rules! tree {
            ($name:literal) => {
                DbTree::new(db.open_tree($name)?)
            };
        }

        Ok(Self {
            boards: tree!("boards"),
            sessions: tree!("sessions"),
            bus_agents: tree!("bus_agents"),
            plugins: tree!("plugins"),
            injections: tree!("injections"),
            services: tree!("services"),
            exposed_services: tree!("exposed_services"),
            webservices: tree!("webservices"),
            enabled_webservices: tree!("enabled_webservices"),
            ports: tree!("ports"),
            fleets: tree!("fleets"),
            requests: tree!("requests"),
            results: tree!("results"),
            inner: db,
        })
    }

    /// Flushes all trees to disk. Called on clean shutdown.
    pub async fn flush(&self) -> Result<(), DatabaseError> {
        self.inner.flush_async().await?;
        Ok(())
    }
}
