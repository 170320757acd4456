//! A pooled-resource actor for exposed-service public ports: a
//! `tokio::sync::Mutex`-guarded set of ports currently in use, bounded by
//! the `[conductor]` config's `service_port_min`/`service_port_max` range.

use std::collections::HashSet;
use std::ops::RangeInclusive;

use rand::seq::IteratorRandom;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum PortAllocatorError {
    #[error("no free port remains in the configured range")]
    PoolExhausted,
    #[error("port {0} is already allocated")]
    AlreadyAllocated(u16),
}

pub struct PortAllocator {
    range: RangeInclusive<u16>,
    in_use: Mutex<HashSet<u16>>,
}

impl PortAllocator {
    pub fn new(range: RangeInclusive<u16>) -> Self {
        Self::seeded(range, std::iter::empty())
    }

    /// Builds the allocator with an initial set of ports already recorded
    /// as in use (e.g. from existing `ExposedService` rows loaded at
    /// startup). The set is built before the `Mutex` exists, so no lock
    /// acquisition is needed to seed it.
    pub fn seeded(range: RangeInclusive<u16>, initial: impl IntoIterator<Item = u16>) -> Self {
        Self {
            range,
            in_use: Mutex::new(initial.into_iter().collect()),
        }
    }

    pub async fn allocate(&self) -> Result<u16, PortAllocatorError> {
        let mut guard = self.in_use.lock().await;
        let port = self
            .range
            .clone()
            .filter(|p| !guard.contains(p))
            .choose(&mut rand::thread_rng())
            .ok_or(PortAllocatorError::PoolExhausted)?;
        guard.insert(port);
        Ok(port)
    }

    pub async fn release(&self, port: u16) {
        self.in_use.lock().await.remove(&port);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn allocates_distinct_ports_within_range() {
        let pool = PortAllocator::new(10000..=10001);
        let a = pool.allocate().await.unwrap();
        let b = pool.allocate().await.unwrap();
        assert_ne!(a, b);
        assert!(pool.allocate().await.is_err());
        pool.release(a).await;
        assert_eq!(pool.allocate().await.unwrap(), a);
    }
}
