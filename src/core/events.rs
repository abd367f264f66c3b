//! Typed publish/subscribe event bus.
//!
//! Handlers are registered per event type and invoked synchronously on
//! `publish`. The bus carries field notifications (cuts, viewer movement)
//! to whatever cares without coupling the producers to the consumers.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use glam::Vec3;

/// Published after a cut dispatch is submitted.
#[derive(Clone, Copy, Debug)]
pub struct BladeCutEvent {
    /// World-space cut center.
    pub position: Vec3,
    /// Cut sphere radius.
    pub radius: f32,
    /// Analytic estimate of affected blades, not a GPU readback count.
    pub estimated_blades: u32,
}

/// Published when the viewer position changes.
#[derive(Clone, Copy, Debug)]
pub struct ViewerMovedEvent {
    pub position: Vec3,
    pub previous: Vec3,
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: u64,
    handler: Box<dyn Fn(&dyn Any)>,
}

/// Synchronous event dispatcher keyed by event type.
#[derive(Default)]
pub struct EventBus {
    subscribers: HashMap<TypeId, Vec<Subscriber>>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events of type `E`.
    pub fn subscribe<E: Any>(&mut self, handler: impl Fn(&E) + 'static) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;

        let erased: Box<dyn Fn(&dyn Any)> = Box::new(move |event| {
            if let Some(event) = event.downcast_ref::<E>() {
                handler(event);
            }
        });

        self.subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Subscriber { id, handler: erased });
        SubscriptionId(id)
    }

    /// Remove a previously registered handler. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        for subs in self.subscribers.values_mut() {
            subs.retain(|s| s.id != id.0);
        }
    }

    /// Deliver `event` to every handler registered for its type.
    pub fn publish<E: Any>(&self, event: &E) {
        if let Some(subs) = self.subscribers.get(&TypeId::of::<E>()) {
            for sub in subs {
                (sub.handler)(event);
            }
        }
    }

    /// Number of handlers registered for `E`.
    pub fn subscriber_count<E: Any>(&self) -> usize {
        self.subscribers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_publish_reaches_subscriber() {
        let mut bus = EventBus::new();
        let seen = Rc::new(Cell::new(0u32));

        let seen_clone = seen.clone();
        bus.subscribe::<BladeCutEvent>(move |e| {
            seen_clone.set(e.estimated_blades);
        });

        bus.publish(&BladeCutEvent {
            position: Vec3::ZERO,
            radius: 1.0,
            estimated_blades: 42,
        });
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.publish(&ViewerMovedEvent {
            position: Vec3::ONE,
            previous: Vec3::ZERO,
        });
    }

    #[test]
    fn test_events_routed_by_type() {
        let mut bus = EventBus::new();
        let cuts = Rc::new(Cell::new(0u32));
        let moves = Rc::new(Cell::new(0u32));

        let c = cuts.clone();
        bus.subscribe::<BladeCutEvent>(move |_| c.set(c.get() + 1));
        let m = moves.clone();
        bus.subscribe::<ViewerMovedEvent>(move |_| m.set(m.get() + 1));

        bus.publish(&ViewerMovedEvent {
            position: Vec3::ZERO,
            previous: Vec3::ZERO,
        });

        assert_eq!(cuts.get(), 0);
        assert_eq!(moves.get(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));

        let c = count.clone();
        let id = bus.subscribe::<BladeCutEvent>(move |_| c.set(c.get() + 1));

        let event = BladeCutEvent {
            position: Vec3::ZERO,
            radius: 1.0,
            estimated_blades: 0,
        };
        bus.publish(&event);
        assert_eq!(count.get(), 1);

        bus.unsubscribe(id);
        bus.publish(&event);
        assert_eq!(count.get(), 1);
        assert_eq!(bus.subscriber_count::<BladeCutEvent>(), 0);
    }

    #[test]
    fn test_multiple_subscribers_all_notified() {
        let mut bus = EventBus::new();
        let count = Rc::new(Cell::new(0u32));

        for _ in 0..3 {
            let c = count.clone();
            bus.subscribe::<ViewerMovedEvent>(move |_| c.set(c.get() + 1));
        }

        bus.publish(&ViewerMovedEvent {
            position: Vec3::ZERO,
            previous: Vec3::ZERO,
        });
        assert_eq!(count.get(), 3);
    }
}
