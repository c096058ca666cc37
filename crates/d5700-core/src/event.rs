//! In-process publish/subscribe coupling between the CPU and its peripherals.
//!
//! Delivery is synchronous: [`EventBus::publish`] returns only after every
//! subscriber registered at the time of the call has seen the event. Dispatch
//! iterates a snapshot of the subscriber list, so a subscriber may subscribe
//! or unsubscribe (itself included) while handling an event.

use std::sync::{Arc, Mutex};

use crate::sync::lock_unpoisoned;

/// Domain events raised by instructions and the timer clock.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum EmulatorEvent {
    /// Terminal signal raised by the `0x0000` instruction word.
    Halt {
        /// Diagnostic text naming the halting program counter.
        message: String,
    },
    /// Data-memory bank flag flip.
    SwitchMemory,
    /// Timer register loaded by `SET_T`.
    TimerSet(u8),
    /// Timer register changed; carries the new value.
    TimerTick(u8),
    /// Display cell update; `x` is the row, `y` the column.
    DrawPixel {
        /// Row, `0..8`.
        x: u8,
        /// Column, `0..8`.
        y: u8,
        /// ASCII value to show.
        value: u8,
    },
    /// Request to re-render the display.
    Refresh,
}

/// Receiver of published events.
///
/// Handlers run on the publishing clock thread and must be quick; a handler
/// must not publish to a bus that would deliver back to itself.
pub trait EventSubscriber: Send {
    /// Handles one event.
    fn on_event(&mut self, event: &EmulatorEvent);
}

/// Subscriber handle stored by the bus.
pub type SharedSubscriber = Arc<Mutex<dyn EventSubscriber>>;

/// Registration token returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: Vec<(SubscriberId, SharedSubscriber)>,
}

/// Cloneable handle to one shared subscriber registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` for every subsequent event.
    pub fn subscribe(&self, subscriber: SharedSubscriber) -> SubscriberId {
        let mut registry = lock_unpoisoned(&self.registry);
        let id = SubscriberId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push((id, subscriber));
        id
    }

    /// Removes a subscriber; returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut registry = lock_unpoisoned(&self.registry);
        let before = registry.subscribers.len();
        registry.subscribers.retain(|(existing, _)| *existing != id);
        registry.subscribers.len() != before
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.registry).subscribers.len()
    }

    /// Returns `true` when nobody is subscribed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every current subscriber, in registration order.
    pub fn publish(&self, event: &EmulatorEvent) {
        let snapshot: Vec<SharedSubscriber> = lock_unpoisoned(&self.registry)
            .subscribers
            .iter()
            .map(|(_, subscriber)| Arc::clone(subscriber))
            .collect();

        tracing::trace!(?event, subscribers = snapshot.len(), "publish");
        for subscriber in snapshot {
            lock_unpoisoned(&subscriber).on_event(event);
        }
    }
}
