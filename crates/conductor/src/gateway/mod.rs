//! Narrow trait boundaries between the Workflow Coordinator and the two
//! external systems it must drive: the reverse-proxy/allowlist files
//! written by a board's bus agent, and DNS record management. The workflow
//! layer calls a trait method, never a raw filesystem or HTTP call
//! directly.

pub mod dns;
pub mod proxy_bus;
pub mod proxy_fs;

use async_trait::async_trait;
use iotronic_common::ids::BoardUuid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bus agent for board {0} is not connected")]
    AgentUnavailable(BoardUuid),
    #[error("proxy dispatch failed: {0}")]
    Dispatch(#[from] iotronic_common::rpc::error::DispatchError),
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("dns error: {0}")]
    Dns(String),
}

/// Reverse-proxy operations the Workflow Coordinator drives when enabling or
/// disabling a board's web exposure. One production implementation relays
/// these as bus RPCs to the board's current agent ([`proxy_bus::BusProxyGateway`]);
/// a second, filesystem implementation ([`proxy_fs::FilesystemProxyGateway`])
/// writes the literal reverse-proxy file contracts directly, so the
/// contractual file shapes are covered by ordinary assertions in tests.
#[async_trait]
pub trait ProxyGateway: Send + Sync {
    async fn enable_webservice(
        &self,
        board: BoardUuid,
        zone: &str,
        fqdn: &str,
        http_port: u16,
        https_port: u16,
        endpoint: &str,
    ) -> Result<(), GatewayError>;

    async fn disable_webservice(&self, board: BoardUuid) -> Result<(), GatewayError>;

    async fn add_redirect(&self, board: BoardUuid, host: &str) -> Result<(), GatewayError>;

    async fn remove_redirect(&self, board: BoardUuid, host: &str) -> Result<(), GatewayError>;

    async fn reload_proxy(&self) -> Result<(), GatewayError>;
}

/// DNS record lifecycle for a board's webservice `fqdn`.
#[async_trait]
pub trait DnsGateway: Send + Sync {
    async fn create_record(&self, name: &str, target: &str) -> Result<(), GatewayError>;
    async fn delete_record(&self, name: &str) -> Result<(), GatewayError>;
}
