//! Pull-based aggregation of registered health checkers.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::HealthError;
use crate::health::{Checker, HealthRef};

/// Returns the checkers registered so far; call again for a fresh view.
pub type HealthCheckFn = Arc<dyn Fn() -> Vec<Checker> + Send + Sync>;

/// Ordered list of health checkers, shared between the registrar and the host.
///
/// Cloning shares the same underlying list.
#[derive(Clone, Default)]
pub struct HealthRegistry {
    checkers: Arc<RwLock<Vec<Checker>>>,
}

impl HealthRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a checker labelled with `name`.
    pub fn add(&self, name: impl Into<Arc<str>>, check: HealthRef) {
        self.checkers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Checker::new(name, check));
    }

    /// Snapshot of the current checkers, in registration order.
    pub fn snapshot(&self) -> Vec<Checker> {
        self.checkers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of registered checkers.
    pub fn len(&self) -> usize {
        self.checkers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A closure reflecting whatever is registered at call time.
    pub fn health_check_fn(&self) -> HealthCheckFn {
        let me = self.clone();
        Arc::new(move || me.snapshot())
    }

    /// Checks every registered checker; see [`check_all`].
    pub fn check(&self) -> Result<(), HealthError> {
        check_all(&self.snapshot())
    }
}

impl std::fmt::Debug for HealthRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.snapshot()).finish()
    }
}

/// Returns the first failure among `checkers`, in order. An empty slice is healthy.
pub fn check_all(checkers: &[Checker]) -> Result<(), HealthError> {
    checkers.iter().try_for_each(Checker::check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthFlag;

    #[test]
    fn view_is_lazy() {
        let registry = HealthRegistry::new();
        let view = registry.health_check_fn();
        assert!(view().is_empty());

        registry.add("db", Arc::new(HealthFlag::with_state(true)));
        registry.add("cache", Arc::new(HealthFlag::new()));

        let names: Vec<String> = view().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["db", "cache"]);
        assert_eq!(registry.check().unwrap_err().checker.as_ref(), "cache");
    }

    #[test]
    fn empty_set_is_healthy() {
        assert!(check_all(&[]).is_ok());
        assert!(HealthRegistry::new().is_empty());
    }
}
