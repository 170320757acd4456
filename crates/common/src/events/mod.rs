//! The conductor's event model: every mutating repository/dispatcher/
//! workflow operation emits an [`Event`], consumed by the ingress API's
//! WebSocket stream (`GET /api/v1/events`).
//!
//! [`EventFilter`] is a flat struct with optional per-field equality
//! constraints, covering the operator need of subscribing to one board, one
//! request, or everything, without a full boolean expression language.

mod filter;
mod models;

pub use filter::*;
pub use models::*;

use tokio::sync::broadcast;

/// Default broadcast channel capacity; slow subscribers fall behind and
/// receive a `Lagged` error rather than back-pressuring event producers.
const CHANNEL_CAPACITY: usize = 1024;

/// A process-wide event bus. Cheap to clone (holds only a `Sender`).
#[derive(Debug, Clone)]
pub struct Events {
    tx: broadcast::Sender<Event>,
}

impl Default for Events {
    fn default() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl Events {
    pub fn emit(&self, event: Event) {
        // No subscribers is not an error: events are fire-and-forget.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
