//! # Host: services the orchestrator hands to components during `init`.
//!
//! ```text
//! Host (clone = shared handle)
//!   ├── meta()             name / id / version
//!   ├── logger(component)  tracing span carrying the identity fields
//!   ├── context()          child of the root cancellation token
//!   ├── health_check_fn()  live view of registered health checkers
//!   └── shutdown()         cancel the root token → graceful drain
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::Meta;
use crate::events::Bus;
use crate::health::{HealthCheckFn, HealthRegistry};

struct HostInner {
    meta: Meta,
    root: CancellationToken,
    health: HealthRegistry,
    bus: Bus,
}

/// Shared handle to orchestrator services. Cheap to clone.
#[derive(Clone)]
pub struct Host {
    inner: Arc<HostInner>,
}

impl Host {
    pub(crate) fn new(meta: Meta, root: CancellationToken, health: HealthRegistry, bus: Bus) -> Self {
        Self {
            inner: Arc::new(HostInner {
                meta,
                root,
                health,
                bus,
            }),
        }
    }

    /// Application identity.
    pub fn meta(&self) -> &Meta {
        &self.inner.meta
    }

    /// Application name.
    pub fn name(&self) -> &str {
        &self.inner.meta.name
    }

    /// Instance id.
    pub fn id(&self) -> &str {
        &self.inner.meta.id
    }

    /// Application version.
    pub fn version(&self) -> &str {
        &self.inner.meta.version
    }

    /// A token cancelled when the drain starts.
    pub fn context(&self) -> CancellationToken {
        self.inner.root.child_token()
    }

    /// Requests a graceful shutdown. Idempotent.
    pub fn shutdown(&self) {
        self.inner.root.cancel();
    }

    /// Returns `true` once shutdown was requested.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.root.is_cancelled()
    }

    /// Pull-based view of every health checker registered so far.
    pub fn health_check_fn(&self) -> HealthCheckFn {
        self.inner.health.health_check_fn()
    }

    /// A span labelled with the application identity and `component`.
    ///
    /// ```
    /// # fn demo(host: &compvisor::Host) {
    /// let span = host.logger("http");
    /// let _guard = span.enter();
    /// tracing::info!(port = 8080, "listening");
    /// # }
    /// ```
    pub fn logger(&self, component: &str) -> tracing::Span {
        let meta = &self.inner.meta;
        tracing::info_span!(
            "component",
            app = %meta.name,
            id = %meta.id,
            version = %meta.version,
            component,
        )
    }

    pub(crate) fn bus(&self) -> &Bus {
        &self.inner.bus
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("meta", &self.inner.meta)
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}
