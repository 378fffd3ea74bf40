//! Retry pacing for the health gate.
//!
//! ## Contents
//! - [`BackoffPolicy`] how the delay between health polls grows (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization applied on top of the computed delay
//!
//! ## Wiring
//! ```text
//! HealthGate { backoff: BackoffPolicy, max_tries }
//!      └─► Command::start polls the health aggregator, sleeping backoff.next(attempt) between polls
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=2.0, max=30s, jitter=None.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
