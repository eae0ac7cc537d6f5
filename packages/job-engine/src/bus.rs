//! In-memory, at-most-once broadcast bus for [`EventEnvelope`]s.
//!
//! Durability lives in the job store, not here: a dependency machine that
//! misses an event because it subscribed late simply re-derives its state
//! the next time it polls `IngestionJob` status, the way the rest of this
//! crate expects consumers to behave.

use tokio::sync::broadcast;

use crate::core::{CorrelationId, Event, EventEnvelope};

const DEFAULT_CAPACITY: usize = 4096;

/// Broadcast channel for [`EventEnvelope`]s, cheaply cloneable.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit with a fresh, uncorrelated id. Returns the subscriber count.
    pub fn emit<E: Event>(&self, event: E) -> usize {
        self.sender.send(EventEnvelope::new_random(event)).unwrap_or(0)
    }

    /// Emit tagged with the correlation id of the job that triggered it.
    pub fn emit_with_correlation<E: Event>(&self, event: E, cid: CorrelationId) -> usize {
        self.sender.send(EventEnvelope::new(cid, event)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
