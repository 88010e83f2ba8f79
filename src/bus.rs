//! Event bus abstraction
//!
//! The recorder consumes an external publish/subscribe bus owned by the host
//! application. The bus has no wildcard subscription; callers subscribe to
//! each event type explicitly. `InMemoryBus` is a minimal implementation for
//! hosts without their own bus and for tests.

use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Payload carried by a bus event
pub type EventPayload = serde_json::Value;

/// Handler invoked for each published event of a subscribed type
pub type EventHandler = Arc<dyn Fn(&str, &EventPayload) + Send + Sync>;

/// Opaque handle identifying one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Publish/subscribe bus consumed by the event recorder
pub trait EventBus: Send + Sync {
    /// Subscribe a handler to one event type
    fn subscribe(&self, event_type: &str, handler: EventHandler) -> SubscriptionId;

    /// Remove a subscription; returns false if the id is unknown
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Publish a payload under an event type
    fn publish(&self, event_type: &str, payload: &EventPayload) -> Result<()>;
}

/// In-memory event bus with per-type handler registries
#[derive(Default)]
pub struct InMemoryBus {
    /// Handlers registered per event type
    handlers: RwLock<HashMap<String, Vec<(SubscriptionId, EventHandler)>>>,
    /// Monotonic subscription id counter
    next_id: AtomicU64,
}

impl InMemoryBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions across all event types
    pub fn subscription_count(&self) -> usize {
        self.handlers.read().values().map(Vec::len).sum()
    }
}

impl EventBus for InMemoryBus {
    fn subscribe(&self, event_type: &str, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(event_type.to_string())
            .or_default()
            .push((id, handler));
        debug!("Subscribed {:?} to event type: {}", id, event_type);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        for registry in handlers.values_mut() {
            if let Some(pos) = registry.iter().position(|(sub_id, _)| *sub_id == id) {
                registry.remove(pos);
                return true;
            }
        }
        false
    }

    fn publish(&self, event_type: &str, payload: &EventPayload) -> Result<()> {
        // Snapshot the handler list so handlers may subscribe/unsubscribe
        // from within their own callback.
        let subscribers: Vec<EventHandler> = {
            let handlers = self.handlers.read();
            handlers
                .get(event_type)
                .map(|registry| registry.iter().map(|(_, h)| h.clone()).collect())
                .unwrap_or_default()
        };

        for handler in subscribers {
            handler(event_type, payload);
        }
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_subscribe_and_publish() {
        let bus = InMemoryBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        bus.subscribe(
            "thought:created",
            Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        bus.publish("thought:created", &serde_json::json!({"id": 1}))
            .unwrap();
        bus.publish("unrelated", &serde_json::json!({})).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = InMemoryBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let id = bus.subscribe(
            "tick",
            Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));

        bus.publish("tick", &serde_json::json!({})).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(bus.subscription_count(), 0);
    }

    #[test]
    fn test_multiple_subscribers_same_type() {
        let bus = InMemoryBus::new();
        let seen = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let counter = seen.clone();
            bus.subscribe(
                "tick",
                Arc::new(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        bus.publish("tick", &serde_json::json!({})).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }
}
