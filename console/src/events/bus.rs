//! In-process event bus
//!
//! Handlers are invoked synchronously on the publishing task, in registration
//! order. The subscriber list is snapshotted before delivery so handlers may
//! subscribe or unsubscribe freely while an event is being delivered.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tracing::trace;

use crate::events::Payload;

/// An event as seen by a single handler
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    /// Context value supplied at subscription time
    pub context: Option<Value>,
    pub payload: Arc<Payload>,
}

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Wrap a closure as a bus handler
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    handler: Handler,
    context: Option<Value>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<String, Vec<Registration>>,
}

impl Registry {
    fn insert(&mut self, topic: &str, handler: Handler, context: Option<Value>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.topics
            .entry(topic.to_string())
            .or_default()
            .push(Registration { id, handler, context });
        id
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    fn remove_id(&mut self, topic: &str, id: SubscriptionId) -> bool {
        let Some(list) = self.topics.get_mut(topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }
}

/// Topic-keyed publish/subscribe registry. Cloning shares the registry.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("EventBus")
            .field("topics", &registry.topics.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. The same handler may be registered more than once;
    /// each registration is invoked once per publish.
    pub fn subscribe(
        &self,
        topic: &str,
        handler: Handler,
        context: Option<Value>,
    ) -> SubscriptionId {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry.insert(topic, handler, context)
    }

    /// Register a handler that runs at most once, then removes itself
    pub fn subscribe_once(
        &self,
        topic: &str,
        handler: Handler,
        context: Option<Value>,
    ) -> SubscriptionId {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = registry.next_id();

        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.inner);
        let owned_topic = topic.to_string();
        let fired = AtomicBool::new(false);
        let wrapper: Handler = Arc::new(move |event: &Event| {
            if fired.swap(true, Ordering::SeqCst) {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                let mut registry = inner.lock().unwrap_or_else(|e| e.into_inner());
                registry.remove_id(&owned_topic, id);
            }
            handler(event);
        });

        registry
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(Registration {
                id,
                handler: wrapper,
                context,
            });
        id
    }

    /// Remove every registration of `handler` on `topic`. Returns how many were removed.
    pub fn unsubscribe(&self, topic: &str, handler: &Handler) -> usize {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = registry.topics.get_mut(topic) else {
            return 0;
        };
        let before = list.len();
        list.retain(|r| !Arc::ptr_eq(&r.handler, handler));
        let removed = before - list.len();
        if list.is_empty() {
            registry.topics.remove(topic);
        }
        removed
    }

    /// Remove a single registration
    pub fn unsubscribe_id(&self, topic: &str, id: SubscriptionId) -> bool {
        let mut registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry.remove_id(topic, id)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        registry.topics.get(topic).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every handler registered on `topic`
    pub fn publish(&self, topic: &str, payload: Payload) {
        let snapshot: Vec<Registration> = {
            let registry = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            match registry.topics.get(topic) {
                Some(list) => list.clone(),
                None => Vec::new(),
            }
        };

        trace!("Publishing {} to {} subscriber(s)", topic, snapshot.len());
        if snapshot.is_empty() {
            return;
        }

        let payload = Arc::new(payload);
        for registration in snapshot {
            let event = Event {
                topic: topic.to_string(),
                context: registration.context,
                payload: payload.clone(),
            };
            (registration.handler)(&event);
        }
    }
}
