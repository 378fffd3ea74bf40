//! # Registrar: the ordered list of units to run.
//!
//! Registration order is the only ordering the orchestrator knows about:
//! `init` follows it, `stop` walks it backwards. Nothing is de-duplicated or
//! validated; two components may share a name.
//!
//! ```text
//! register(A) register(B) builder(C×2) on_stop(D)
//!      │           │           │            │
//!      ▼           ▼           ▼            ▼
//!   [ A ,        B ,       C#0 , C#1 ,      D ]     init →  /  ← stop
//! ```
//!
//! The orchestrator takes the registrar by value, so nothing can be added
//! once a run has begun.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::components::{Command, Component, ComponentBuilder, ComponentRef, OnStart, OnStop, expand};
use crate::error::ComponentError;
use crate::health::HealthRegistry;

/// Append-only, insertion-ordered set of components.
#[derive(Default)]
pub struct Registrar {
    units: Vec<ComponentRef>,
    health: HealthRegistry,
}

impl Registrar {
    /// Creates an empty registrar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a component. Its health check, if any, joins the aggregator.
    pub fn register(&mut self, unit: ComponentRef) -> &mut Self {
        if let Some(check) = Arc::clone(&unit).health_check() {
            self.health.add(unit.name(), check);
        }
        self.units.push(unit);
        self
    }

    /// Appends every component of `units`, in order.
    pub fn register_all(&mut self, units: impl IntoIterator<Item = ComponentRef>) -> &mut Self {
        for unit in units {
            self.register(unit);
        }
        self
    }

    /// Registers a closure as a component's `start`.
    pub fn on_start<F, Fut>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
    {
        self.register(OnStart::arc(name, f))
    }

    /// Registers a closure as a component's `stop`.
    pub fn on_stop<F, Fut>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
    {
        self.register(OnStop::arc(name, f))
    }

    /// Registers `builder.options().instances` freshly built components.
    pub fn builder(&mut self, builder: &dyn ComponentBuilder) -> &mut Self {
        self.register_all(expand(builder))
    }

    /// Registers a health-gated command.
    pub fn command<F>(&mut self, command: Command<F>) -> &mut Self
    where
        Command<F>: Component,
    {
        self.register(Arc::new(command))
    }

    /// Registered components, in registration order.
    pub fn range(&self) -> &[ComponentRef] {
        &self.units
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Health checkers collected from registered components.
    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub(crate) fn into_parts(self) -> (Vec<ComponentRef>, HealthRegistry) {
        (self.units, self.health)
    }
}

impl std::fmt::Debug for Registrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registrar")
            .field("units", &self.units.iter().map(|u| u.name()).collect::<Vec<_>>())
            .field("health", &self.health)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::components::BuilderFn;
    use crate::health::{HealthCheck, HealthFlag, HealthRef};

    struct Probe {
        flag: HealthFlag,
    }

    impl HealthCheck for Probe {
        fn check_health(&self) -> Result<(), crate::error::HealthError> {
            self.flag.check_health()
        }
    }

    #[async_trait]
    impl Component for Probe {
        fn name(&self) -> &str {
            "probe"
        }
        async fn start(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
            Ok(())
        }
        fn health_check(self: Arc<Self>) -> Option<HealthRef> {
            Some(self)
        }
    }

    async fn noop(_ctx: CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    #[test]
    fn keeps_insertion_order_and_collects_health() {
        let mut reg = Registrar::new();
        reg.on_start("a", noop)
            .register(Arc::new(Probe { flag: HealthFlag::new() }))
            .builder(&BuilderFn::new(2, || -> ComponentRef { OnStop::arc("pool", noop) }))
            .on_stop("z", noop);

        let names: Vec<&str> = reg.range().iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["a", "probe", "pool", "pool", "z"]);
        assert_eq!(reg.health().len(), 1);
        assert_eq!(reg.health().snapshot()[0].name(), "probe");
    }

    #[test]
    fn duplicate_names_are_allowed() {
        let mut reg = Registrar::new();
        reg.on_start("same", noop).on_start("same", noop);
        assert_eq!(reg.len(), 2);
    }
}
