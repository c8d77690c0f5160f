use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::dto::events::SyncEvent;

/// Fan-out hub broadcasting committed room transitions.
///
/// This is the boundary with real transports: the engine publishes
/// `(room id, event name, payload)` triples fire-and-forget, and whatever
/// moves them to remote participants subscribes here. Delivery failures are
/// ignored and never roll back or block a local state change.
pub struct SyncHub {
    sender: broadcast::Sender<SyncEvent>,
}

impl SyncHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`, convenient for transport adapters.
    pub fn stream(&self) -> BroadcastStream<SyncEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn publish(&self, event: SyncEvent) {
        let _ = self.sender.send(event);
    }
}
