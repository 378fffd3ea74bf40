//! # Lifecycle events emitted by the orchestrator.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata
//! (component name, registration index, reason, attempt, delay).
//!
//! ## Ordering guarantees
//! Every event gets a globally unique, monotonically increasing `seq`. Events
//! of one component are published in lifecycle order
//! (`Initializing → Initialized → Starting → … → Stopping → Stopped`), but
//! events of different components interleave freely while running.
//!
//! ## Example
//! ```rust
//! use compvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::StartFailed)
//!     .with_component("http")
//!     .with_index(2)
//!     .with_reason("bind: address in use");
//!
//! assert_eq!(ev.kind, EventKind::StartFailed);
//! assert_eq!(ev.component.as_deref(), Some("http"));
//! assert_eq!(ev.index, Some(2));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Init phase ===
    /// `init` is about to run. Sets `component`, `index`.
    Initializing,
    /// `init` returned `Ok`. Sets `component`, `index`.
    Initialized,
    /// `init` failed; the run aborts. Sets `component`, `index`, `reason`.
    InitFailed,

    // === Running phase ===
    /// `start` was launched. Sets `component`, `index`.
    Starting,
    /// `start` returned `Ok` or `Canceled`. Sets `component`, `index`.
    Exited,
    /// `start` returned an error or panicked. Sets `component`, `index`, `reason`.
    StartFailed,
    /// The drain was triggered. Sets `reason` (`signal`, `canceled`, `failure`).
    ShutdownRequested,

    // === Drain phase ===
    /// `stop` is about to run. Sets `component`, `index`.
    Stopping,
    /// `stop` returned `Ok`. Sets `component`, `index`.
    Stopped,
    /// `stop` failed, panicked, timed out, or `start` had to be aborted.
    /// Sets `component`, `index`, `reason`.
    StopFailed,
    /// Every launched unit went through `stop`. Sets `reason` with the
    /// aggregated shutdown errors, if any.
    DrainCompleted,

    // === Health gate ===
    /// A health-gated command found an unhealthy dependency and will poll again.
    /// Sets `component`, `attempt`, `delay_ms`, `reason`.
    HealthPending,

    // === Subscriber events ===
    /// A subscriber queue was full or closed. Sets `component` (subscriber name), `reason`.
    SubscriberOverflow,
    /// A subscriber panicked in `on_event`. Sets `component` (subscriber name), `reason`.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Component (or subscriber) name, if applicable.
    pub component: Option<Arc<str>>,
    /// Registration index of the component.
    pub index: Option<usize>,
    /// Human-readable reason (errors, trigger cause, aggregated messages).
    pub reason: Option<Arc<str>>,
    /// Health poll attempt (1-based).
    pub attempt: Option<u32>,
    /// Delay before the next health poll, in milliseconds.
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates an event of the given kind with the current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            index: None,
            reason: None,
            attempt: None,
            delay_ms: None,
        }
    }

    /// Attaches a component name.
    #[inline]
    pub fn with_component(mut self, name: impl Into<Arc<str>>) -> Self {
        self.component = Some(name.into());
        self
    }

    /// Attaches a registration index.
    #[inline]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a health poll attempt.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    /// Creates a subscriber overflow event.
    pub(crate) fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub(crate) fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }

    /// Returns `true` for events about subscribers themselves.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}
