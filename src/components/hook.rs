//! # Closure-backed hooks.
//!
//! [`OnStart`] and [`OnStop`] turn a bare async closure into a
//! [`Component`], so lightweight callbacks are ordered and drained exactly
//! like full components:
//!
//! - `OnStart`: `start` runs the closure, `stop` does nothing.
//! - `OnStop`: `start` returns immediately, `stop` runs the closure.
//!
//! Each call produces a fresh future; shared state goes through an explicit
//! `Arc` captured by the closure.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use compvisor::{ComponentError, ComponentRef, OnStop};
//!
//! let flush: ComponentRef = OnStop::arc("flush-metrics", |_ctx: CancellationToken| async move {
//!     // push buffered metrics before exit...
//!     Ok::<_, ComponentError>(())
//! });
//! assert_eq!(flush.name(), "flush-metrics");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::components::Component;
use crate::error::ComponentError;

/// Component whose `start` is the wrapped closure.
#[derive(Debug)]
pub struct OnStart<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> OnStart<F> {
    /// Wraps `f` under `name`.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Wraps `f` and returns a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Component for OnStart<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        (self.f)(ctx).await
    }
}

/// Component whose `stop` is the wrapped closure.
#[derive(Debug)]
pub struct OnStop<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> OnStop<F> {
    /// Wraps `f` under `name`.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Wraps `f` and returns a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Component for OnStop<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
        Ok(())
    }

    async fn stop(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        (self.f)(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn on_start_runs_only_in_start() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let hook = OnStart::new("warmup", move |_ctx: CancellationToken| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        hook.stop(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        hook.start(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn on_stop_runs_only_in_stop_and_propagates_errors() {
        let hook = OnStop::new("close", |_ctx: CancellationToken| async {
            Err(ComponentError::fail("flush failed"))
        });

        assert!(hook.start(CancellationToken::new()).await.is_ok());
        let err = hook.stop(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, ComponentError::fail("flush failed"));
    }
}
