//! Tokio broadcast event bus for todo change notifications.

use crate::models::TodoEvent;
use tokio::sync::broadcast;

/// Default buffered events per subscriber.
pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 256;

/// Broadcasts [`TodoEvent`]s to any number of subscribers.
///
/// Publishing never blocks and never fails the caller; events sent while
/// nobody listens are dropped.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TodoEvent>,
}

impl EventBus {
    /// Creates a new event bus with the given buffer capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers (best effort).
    pub fn publish(&self, event: TodoEvent) {
        metrics::counter!("event_bus_publish_total", "event" => event.event_type()).increment(1);
        if self.sender.send(event).is_err() {
            metrics::counter!("event_bus_publish_unobserved_total").increment(1);
        }
    }

    /// Subscribes to all events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TodoEvent> {
        metrics::counter!("event_bus_subscriptions_total").increment(1);
        self.sender.subscribe()
    }

    /// Returns the number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}
