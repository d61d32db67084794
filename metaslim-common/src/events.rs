//! Event types for the MetaSlim event system
//!
//! Components communicate through a broadcast `EventBus`: the stores emit
//! dataset-change notifications after every successful mutation, and the
//! ingest orchestrator emits per-document lifecycle events that the SSE
//! endpoint forwards to connected clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// MetaSlim event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MetaslimEvent {
    /// The study dataset changed (insert, update or delete).
    /// Subscribers should re-read their snapshot.
    StudiesChanged {
        timestamp: DateTime<Utc>,
    },

    /// Processing of one submitted document began
    DocumentStarted {
        batch_id: Uuid,
        document: String,
        timestamp: DateTime<Utc>,
    },

    /// Progress update for one document (extraction, reconciliation, saving)
    DocumentProgress {
        batch_id: Uuid,
        document: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// One document fully reconciled; message is the batch summary
    DocumentCompleted {
        batch_id: Uuid,
        document: String,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// One document failed. Later documents in the same submission still run.
    DocumentFailed {
        batch_id: Uuid,
        document: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl MetaslimEvent {
    /// Event type name for SSE event routing
    pub fn event_type(&self) -> &'static str {
        match self {
            MetaslimEvent::StudiesChanged { .. } => "StudiesChanged",
            MetaslimEvent::DocumentStarted { .. } => "DocumentStarted",
            MetaslimEvent::DocumentProgress { .. } => "DocumentProgress",
            MetaslimEvent::DocumentCompleted { .. } => "DocumentCompleted",
            MetaslimEvent::DocumentFailed { .. } => "DocumentFailed",
        }
    }
}

/// Broadcast bus distributing `MetaslimEvent`s to all subscribers.
///
/// Cloning is cheap; all clones share the same channel. Slow subscribers that
/// fall more than `capacity` events behind start losing the oldest events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MetaslimEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MetaslimEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` if no subscriber is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MetaslimEvent,
    ) -> Result<usize, broadcast::error::SendError<MetaslimEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening.
    ///
    /// Used for non-critical notifications (progress updates, change pings)
    /// where an empty audience is normal.
    pub fn emit_lossy(&self, event: MetaslimEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event emitted with no subscribers");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(MetaslimEvent::StudiesChanged {
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "StudiesChanged");
    }

    #[test]
    fn emit_lossy_without_subscribers_is_silent() {
        let bus = EventBus::new(4);
        bus.emit_lossy(MetaslimEvent::StudiesChanged {
            timestamp: Utc::now(),
        });
    }
}
