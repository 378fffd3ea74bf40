//! # The component contract.
//!
//! A [`Component`] is the unit of orchestration: a listener, a consumer, a
//! scheduler, a one-shot command. The orchestrator drives it through
//! `init → start → stop` and never looks inside.
//!
//! ## Lifecycle
//! ```text
//! created by caller ──► init(&Host)      once, sequential, registration order
//!                   ──► start(ctx)       once, concurrent with every other unit
//!                   ──► stop(stop_ctx)   at most once, only if start was launched,
//!                                        reverse registration order
//! ```
//!
//! `start` should block until its work is done, it fails, or `ctx` is
//! cancelled. Returning `Err(ComponentError::Canceled)` after observing
//! cancellation is a clean exit.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use tokio_util::sync::CancellationToken;
//! use compvisor::{Component, ComponentError, HealthCheck, HealthError, HealthFlag, HealthRef};
//!
//! struct Listener {
//!     ready: HealthFlag,
//! }
//!
//! impl HealthCheck for Listener {
//!     fn check_health(&self) -> Result<(), HealthError> {
//!         self.ready.check_health()
//!     }
//! }
//!
//! #[async_trait]
//! impl Component for Listener {
//!     fn name(&self) -> &str { "listener" }
//!
//!     async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
//!         self.ready.set_healthy(true);
//!         ctx.cancelled().await;
//!         Ok(())
//!     }
//!
//!     fn health_check(self: Arc<Self>) -> Option<HealthRef> {
//!         Some(self)
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::Host;
use crate::error::ComponentError;
use crate::health::HealthRef;

/// # Named unit with an `init` / `start` / `stop` lifecycle.
#[async_trait]
pub trait Component: Send + Sync + 'static {
    /// Name used in logs and events. Not required to be unique.
    fn name(&self) -> &str;

    /// One-time setup. Runs sequentially before any `start`; an error aborts
    /// the whole run before anything is started.
    async fn init(&self, _host: &Host) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Runs the component until done, failed, or `ctx` is cancelled.
    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError>;

    /// Best-effort teardown. `ctx` is cancelled when the close timeout elapses;
    /// implementations should give up promptly after that.
    async fn stop(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Optional health capability. Return `Some(self)` to take part in the
    /// health aggregator.
    fn health_check(self: Arc<Self>) -> Option<HealthRef> {
        None
    }
}

/// Shared handle to a component.
pub type ComponentRef = Arc<dyn Component>;
