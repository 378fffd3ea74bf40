//! # Builder fan-out.
//!
//! A [`ComponentBuilder`] describes how to make one component and how many
//! copies the registrar should make. Expansion calls [`ComponentBuilder::build`]
//! once per instance, so every instance is a distinct object that is `init`'d,
//! started and stopped on its own.
//!
//! ```text
//! Registrar::builder(b) ──► expand(b) ──► [b.build(), b.build(), ...]  (options().instances times)
//!                                              │
//!                                              └──► Registrar::register(each)
//! ```
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use compvisor::{BuilderFn, ComponentError, ComponentRef, OnStart, Registrar};
//!
//! let workers = BuilderFn::new(3, || -> ComponentRef {
//!     OnStart::arc("worker", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, ComponentError>(())
//!     })
//! });
//!
//! let mut registrar = Registrar::new();
//! registrar.builder(&workers);
//! assert_eq!(registrar.len(), 3);
//! ```

use serde::Deserialize;

use crate::components::ComponentRef;

/// How many components a builder produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Number of instances; `0` is treated as `1`.
    pub instances: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { instances: 1 }
    }
}

impl BuildOptions {
    /// Options producing `instances` components.
    pub fn new(instances: usize) -> Self {
        Self { instances }
    }

    /// Fills zero values with defaults.
    pub fn ensure_defaults(&mut self) {
        if self.instances == 0 {
            self.instances = 1;
        }
    }
}

/// Factory for one or more identical components.
pub trait ComponentBuilder: Send + Sync {
    /// Creates a fresh component. Called once per instance.
    fn build(&self) -> ComponentRef;

    /// Fan-out options. Defaults to a single instance.
    fn options(&self) -> BuildOptions {
        BuildOptions::default()
    }
}

/// [`ComponentBuilder`] backed by a closure.
pub struct BuilderFn<F> {
    options: BuildOptions,
    f: F,
}

impl<F> BuilderFn<F>
where
    F: Fn() -> ComponentRef + Send + Sync,
{
    /// Builds `instances` components with `f`.
    pub fn new(instances: usize, f: F) -> Self {
        Self {
            options: BuildOptions::new(instances),
            f,
        }
    }
}

impl<F> ComponentBuilder for BuilderFn<F>
where
    F: Fn() -> ComponentRef + Send + Sync,
{
    fn build(&self) -> ComponentRef {
        (self.f)()
    }

    fn options(&self) -> BuildOptions {
        self.options
    }
}

/// Calls `builder.build()` once per requested instance.
pub(crate) fn expand(builder: &dyn ComponentBuilder) -> Vec<ComponentRef> {
    let mut options = builder.options();
    options.ensure_defaults();
    (0..options.instances).map(|_| builder.build()).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::components::OnStart;
    use crate::error::ComponentError;

    fn counting(
        instances: usize,
        calls: Arc<AtomicUsize>,
    ) -> BuilderFn<impl Fn() -> ComponentRef + Send + Sync> {
        BuilderFn::new(instances, move || -> ComponentRef {
            calls.fetch_add(1, Ordering::SeqCst);
            OnStart::arc("unit", |_ctx: CancellationToken| async {
                Ok::<_, ComponentError>(())
            })
        })
    }

    #[test]
    fn builds_each_instance_separately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let units = expand(&counting(3, calls.clone()));

        assert_eq!(units.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!Arc::ptr_eq(&units[0], &units[1]));
    }

    #[test]
    fn zero_instances_means_one() {
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(expand(&counting(0, calls.clone())).len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn options_deserialize_with_default() {
        let opts: BuildOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, BuildOptions::default());
        let opts: BuildOptions = serde_json::from_str(r#"{"instances": 4}"#).unwrap();
        assert_eq!(opts.instances, 4);
    }
}
