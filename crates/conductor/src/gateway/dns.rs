//! DNS record lifecycle, kept behind a minimal [`DnsClient`] trait so the
//! production [`super::DnsGateway`] impl doesn't hardcode one provider's
//! API, plus an in-memory implementation for tests.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use super::{DnsGateway, GatewayError};

#[derive(Debug, Error)]
pub enum DnsClientError {
    #[error("record already exists: {0}")]
    AlreadyExists(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// The minimal operation set a concrete DNS provider client must implement.
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn create_record(&self, name: &str, target: &str) -> Result<(), DnsClientError>;
    async fn delete_record(&self, name: &str) -> Result<(), DnsClientError>;
}

pub struct ClientDnsGateway<C> {
    client: C,
}

impl<C: DnsClient> ClientDnsGateway<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: DnsClient> DnsGateway for ClientDnsGateway<C> {
    async fn create_record(&self, name: &str, target: &str) -> Result<(), GatewayError> {
        self.client
            .create_record(name, target)
            .await
            .map_err(|e| GatewayError::Dns(e.to_string()))
    }

    async fn delete_record(&self, name: &str) -> Result<(), GatewayError> {
        self.client
            .delete_record(name)
            .await
            .map_err(|e| GatewayError::Dns(e.to_string()))
    }
}

/// An in-memory `DnsGateway` for tests: records collisions the same way a
/// real provider would.
#[derive(Debug, Default)]
pub struct InMemoryDnsGateway {
    records: DashMap<String, String>,
}

#[async_trait]
impl DnsGateway for InMemoryDnsGateway {
    async fn create_record(&self, name: &str, target: &str) -> Result<(), GatewayError> {
        if self.records.contains_key(name) {
            return Err(GatewayError::Dns("DNS already exists!".to_string()));
        }
        self.records.insert(name.to_string(), target.to_string());
        Ok(())
    }

    async fn delete_record(&self, name: &str) -> Result<(), GatewayError> {
        self.records.remove(name);
        Ok(())
    }
}

impl InMemoryDnsGateway {
    pub fn exists(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn rejects_a_colliding_record_and_frees_the_name_on_delete() {
        let gateway = InMemoryDnsGateway::default();
        gateway.create_record("board1.example.com", "board-1").await.unwrap();
        assert!(gateway.exists("board1.example.com"));

        let err = gateway
            .create_record("board1.example.com", "board-2")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Dns(_)));

        gateway.delete_record("board1.example.com").await.unwrap();
        assert!(!gateway.exists("board1.example.com"));
        gateway
            .create_record("board1.example.com", "board-2")
            .await
            .unwrap();
    }
}
