use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    core::{Config, Host, Orchestrator, Registrar},
    error::RuntimeError,
    events::Bus,
    subscribers::Subscribe,
};

/// Builder for constructing an [`Orchestrator`].
pub struct OrchestratorBuilder {
    cfg: Config,
    registrar: Registrar,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the given configuration and no components.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            registrar: Registrar::new(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the components to run. The registrar is consumed; nothing can be
    /// registered once the orchestrator exists.
    pub fn with_registrar(mut self, registrar: Registrar) -> Self {
        self.registrar = registrar;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Validates the configuration and builds the orchestrator.
    ///
    /// Zero values are default-filled first (see [`Config::ensure_defaults`]).
    /// Does not need a running Tokio runtime; subscriber workers are spawned
    /// by [`Orchestrator::run`].
    pub fn build(self) -> Result<Orchestrator, RuntimeError> {
        let mut cfg = self.cfg;
        cfg.ensure_defaults();
        cfg.validate()?;

        let bus = Bus::new(cfg.bus_capacity);
        let root = CancellationToken::new();
        let (units, health) = self.registrar.into_parts();
        let host = Host::new(cfg.meta(), root.clone(), health, bus.clone());

        Ok(Orchestrator::new_internal(
            cfg,
            units,
            host,
            root,
            bus,
            self.subscribers,
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn rejects_invalid_config() {
        let err = OrchestratorBuilder::new(Config::new("x".repeat(70)))
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RuntimeError::Config(ConfigError::NameTooLong { len: 70 })
        ));
    }

    #[test]
    fn fills_defaults_before_validating() {
        let orch = OrchestratorBuilder::new(
            Config::new("").with_close_timeout(Duration::ZERO),
        )
        .build()
        .unwrap();
        assert_eq!(orch.host().name(), Config::DEFAULT_NAME);
        assert!(!orch.host().id().is_empty());
    }
}
