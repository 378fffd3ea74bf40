//! # Event subscribers.
//!
//! ```text
//!   Bus ──► Orchestrator listener ──► SubscriberSet ──┬──► LogWriter
//!                                                     ├──► metrics / alerts
//!                                                     └──► custom Subscribe impls
//! ```
//!
//! - [`Subscribe`]: the trait to implement.
//! - [`SubscriberSet`]: per-subscriber queues, panic isolation.
//! - [`LogWriter`]: renders every event through `tracing`.

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
