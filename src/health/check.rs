//! Health-check trait, named checker handle and a settable flag.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::HealthError;

/// Readiness probe.
///
/// `Err` means "not ready". Implementations must be cheap and non-blocking;
/// they are called from async code.
pub trait HealthCheck: Send + Sync + 'static {
    /// Reports whether the implementor is ready.
    fn check_health(&self) -> Result<(), HealthError>;
}

/// Shared handle to a health check.
pub type HealthRef = Arc<dyn HealthCheck>;

/// A health check labelled with the component it belongs to.
#[derive(Clone)]
pub struct Checker {
    name: Arc<str>,
    check: HealthRef,
}

impl Checker {
    /// Labels `check` with `name`.
    pub fn new(name: impl Into<Arc<str>>, check: HealthRef) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }

    /// Name of the owning component.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the check; failures always carry this checker's name.
    pub fn check(&self) -> Result<(), HealthError> {
        self.check.check_health().map_err(|e| HealthError {
            checker: Arc::clone(&self.name),
            reason: e.reason,
        })
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker").field("name", &self.name).finish()
    }
}

/// A checker whose state is set from the outside.
///
/// Starts unhealthy. Components typically flip it once their listener is
/// bound or their consumer has joined its group.
///
/// ```
/// use compvisor::{HealthCheck, HealthFlag};
///
/// let flag = HealthFlag::new();
/// assert!(flag.check_health().is_err());
/// flag.set_healthy(true);
/// assert!(flag.check_health().is_ok());
/// ```
#[derive(Debug, Default)]
pub struct HealthFlag {
    healthy: AtomicBool,
}

impl HealthFlag {
    /// Creates an unhealthy flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag with the given initial state.
    pub fn with_state(healthy: bool) -> Self {
        Self {
            healthy: AtomicBool::new(healthy),
        }
    }

    /// Sets the reported state.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Release);
    }

    /// Current state.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }
}

impl HealthCheck for HealthFlag {
    fn check_health(&self) -> Result<(), HealthError> {
        if self.is_healthy() {
            Ok(())
        } else {
            Err(HealthError::unhealthy("unhealthy"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checker_names_failures() {
        let flag = Arc::new(HealthFlag::new());
        let checker = Checker::new("kafka", flag.clone());

        let err = checker.check().unwrap_err();
        assert_eq!(&*err.checker, "kafka");
        assert_eq!(err.to_string(), "kafka: unhealthy");

        flag.set_healthy(true);
        assert!(checker.check().is_ok());
    }
}
