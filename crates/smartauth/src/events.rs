//! Lifecycle events.
//!
//! Subscribers register per [`EventKind`] (or for every kind) and are called
//! synchronously, in registration order, on the emitting task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use smartauth_core::Address;

/// A session or flow lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connected {
        credential_id: Option<String>,
        contract: Address,
    },
    Disconnected {
        contract: Address,
    },
    /// An entry received its signature map.
    EntrySigned {
        address: Address,
        nonce: i64,
        signers: usize,
    },
    Submitted {
        hash: String,
        success: bool,
    },
    SessionExpired {
        contract: Address,
    },
}

/// Variant tag of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    EntrySigned,
    Submitted,
    SessionExpired,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::EntrySigned { .. } => EventKind::EntrySigned,
            Self::Submitted { .. } => EventKind::Submitted,
            Self::SessionExpired { .. } => EventKind::SessionExpired,
        }
    }
}

/// Handle returned by subscribe calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<(SubscriptionId, Handler)>>,
    all: Vec<(SubscriptionId, Handler)>,
}

/// Synchronous event dispatch.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.allocate();
        registry
            .by_kind
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Call `handler` for every event.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let mut registry = self.lock();
        let id = registry.allocate();
        registry.all.push((id, Arc::new(handler)));
        id
    }

    /// Remove a subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.lock();
        let before = registry.len();
        registry.all.retain(|(sid, _)| *sid != id);
        for handlers in registry.by_kind.values_mut() {
            handlers.retain(|(sid, _)| *sid != id);
        }
        registry.len() < before
    }

    /// Dispatch `event` to kind subscribers, then catch-all subscribers.
    pub fn emit(&self, event: Event) {
        // Handlers run outside the lock so they may subscribe or emit.
        let handlers: Vec<Handler> = {
            let registry = self.lock();
            registry
                .by_kind
                .get(&event.kind())
                .into_iter()
                .flatten()
                .chain(registry.all.iter())
                .map(|(_, h)| Arc::clone(h))
                .collect()
        };
        tracing::trace!(kind = ?event.kind(), subscribers = handlers.len(), "emit");
        for handler in handlers {
            handler(&event);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.lock().len())
            .finish()
    }
}

impl Registry {
    fn allocate(&mut self) -> SubscriptionId {
        self.next_id += 1;
        SubscriptionId(self.next_id)
    }

    fn len(&self) -> usize {
        self.all.len() + self.by_kind.values().map(Vec::len).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus, kind: Option<EventKind>) -> (SubscriptionId, Arc<Mutex<Vec<Event>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |e: &Event| sink.lock().unwrap().push(e.clone());
        let id = match kind {
            Some(kind) => bus.subscribe(kind, handler),
            None => bus.subscribe_all(handler),
        };
        (id, seen)
    }

    #[test]
    fn test_dispatch_by_kind() {
        let bus = EventBus::new();
        let (_, submitted) = recorder(&bus, Some(EventKind::Submitted));
        let (_, all) = recorder(&bus, None);

        bus.emit(Event::Disconnected {
            contract: Address::Contract([1; 32]),
        });
        bus.emit(Event::Submitted {
            hash: "ab".into(),
            success: true,
        });

        assert_eq!(submitted.lock().unwrap().len(), 1);
        assert_eq!(all.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let (id, seen) = recorder(&bus, Some(EventKind::Submitted));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(Event::Submitted {
            hash: "ab".into(),
            success: true,
        });
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_handler_may_reenter_bus() {
        let bus = Arc::new(EventBus::new());
        let inner = Arc::clone(&bus);
        bus.subscribe(EventKind::Connected, move |_| {
            inner.subscribe_all(|_| {});
        });
        bus.emit(Event::Connected {
            credential_id: None,
            contract: Address::Contract([1; 32]),
        });
        assert_eq!(bus.lock().len(), 2);
    }
}
