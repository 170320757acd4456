//! Production [`super::ProxyGateway`]: every operation is relayed as a bus
//! RPC to the board's currently connected agent. The reverse-proxy files
//! are written *by the agent process*, not the conductor — the conductor
//! only instructs it.

use async_trait::async_trait;
use iotronic_common::ids::BoardUuid;
use iotronic_common::state::Board;
use tarpc::context;

use super::{GatewayError, ProxyGateway};
use crate::db::Database;
use crate::state::agent_registry::AgentRegistry;

pub struct BusProxyGateway<'a> {
    db: &'a Database,
    agents: &'a AgentRegistry,
}

impl<'a> BusProxyGateway<'a> {
    pub fn new(db: &'a Database, agents: &'a AgentRegistry) -> Self {
        Self { db, agents }
    }

    fn board_client(
        &self,
        board_uuid: BoardUuid,
    ) -> Result<iotronic_common::rpc::bus::BoardBusServiceClient, GatewayError> {
        let board: Board = self
            .db
            .boards
            .get(&board_uuid)
            .map_err(|e| GatewayError::Dispatch(
                iotronic_common::rpc::error::DispatchError::Transport(e.to_string()),
            ))?
            .ok_or(GatewayError::AgentUnavailable(board_uuid))?;
        let agent = board.agent.ok_or(GatewayError::AgentUnavailable(board_uuid))?;
        self.agents
            .client(&agent)
            .ok_or(GatewayError::AgentUnavailable(board_uuid))
    }
}

#[async_trait]
impl<'a> ProxyGateway for BusProxyGateway<'a> {
    async fn enable_webservice(
        &self,
        board: BoardUuid,
        zone: &str,
        fqdn: &str,
        http_port: u16,
        https_port: u16,
        _endpoint: &str,
    ) -> Result<(), GatewayError> {
        let client = self.board_client(board)?;
        client
            .enable_webservice(
                context::current(),
                board,
                zone.to_string(),
                fqdn.to_string(),
                http_port,
                https_port,
            )
            .await
            .map_err(|e| GatewayError::Dispatch(iotronic_common::rpc::error::DispatchError::Transport(e.to_string())))??;
        Ok(())
    }

    async fn disable_webservice(&self, board: BoardUuid) -> Result<(), GatewayError> {
        let client = self.board_client(board)?;
        client
            .disable_webservice(context::current(), board)
            .await
            .map_err(|e| GatewayError::Dispatch(iotronic_common::rpc::error::DispatchError::Transport(e.to_string())))??;
        Ok(())
    }

    async fn add_redirect(&self, board: BoardUuid, host: &str) -> Result<(), GatewayError> {
        let client = self.board_client(board)?;
        client
            .add_redirect(context::current(), board, host.to_string())
            .await
            .map_err(|e| GatewayError::Dispatch(iotronic_common::rpc::error::DispatchError::Transport(e.to_string())))??;
        Ok(())
    }

    async fn remove_redirect(&self, board: BoardUuid, host: &str) -> Result<(), GatewayError> {
        let client = self.board_client(board)?;
        client
            .remove_redirect(context::current(), board, host.to_string())
            .await
            .map_err(|e| GatewayError::Dispatch(iotronic_common::rpc::error::DispatchError::Transport(e.to_string())))??;
        Ok(())
    }

    async fn reload_proxy(&self) -> Result<(), GatewayError> {
        // Any connected agent can reload its own proxy process; broadcast
        // to all of them rather than resolving a specific board.
        for agent in self.agents.all() {
            if let Some(client) = self.agents.client(&agent.hostname) {
                client
                    .reload_proxy(context::current())
                    .await
                    .map_err(|e| GatewayError::Dispatch(iotronic_common::rpc::error::DispatchError::Transport(e.to_string())))??;
            }
        }
        Ok(())
    }
}
