//! # Event bus for lifecycle events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. The orchestrator, the drain and
//! health-gated commands publish; the orchestrator's listener forwards
//! everything to the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ```text
//!   init phase  ──┐
//!   start tasks ──┼──► Bus ──► subscriber_listener ──► SubscriberSet ──► Subscribe::on_event
//!   drain       ──┤
//!   Command     ──┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One shared ring buffer of `capacity` events; lagging receivers skip the oldest.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for lifecycle events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding at most `capacity` (min 1) undelivered events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver observing events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn receivers_see_events_published_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::Starting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::Exited).with_component("a"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::Exited);
        assert_eq!(ev.component.as_deref(), Some("a"));
    }
}
