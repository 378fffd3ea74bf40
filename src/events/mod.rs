//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Publishers
//! `Orchestrator` (init/start/trigger), `drain` (stop), `Command` (health
//! polls) and `SubscriberSet` workers (overflow/panic).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
