//! # Health-gated one-shot command.
//!
//! [`Command`] runs a function once every registered health checker reports
//! healthy, then asks the host to shut down. It is how a CLI-style program
//! ("migrate the schema once the database pool is ready") lives inside the
//! same lifecycle as long-running services.
//!
//! ```text
//! start(ctx)
//!   loop:
//!     ├─ check_all(host.health_check_fn()()) ── Ok ──► run f(ctx) ──► host.shutdown()
//!     ├─ tries exhausted ──► Err(HealthRetryExhausted)   (f never runs)
//!     └─ publish HealthPending, sleep backoff.next(n) or ctx cancelled ──► Err(Canceled)
//! ```
//!
//! Retry exhaustion is an ordinary `start` error: it triggers the drain and
//! becomes the result of the run.

use std::borrow::Cow;
use std::future::Future;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::components::Component;
use crate::core::Host;
use crate::error::ComponentError;
use crate::events::{Bus, Event, EventKind};
use crate::health::{HealthCheckFn, check_all};
use crate::policies::BackoffPolicy;

/// Polling schedule used while waiting for dependencies.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HealthGate {
    /// Delay between polls.
    pub backoff: BackoffPolicy,
    /// Total number of polls before giving up (min 1).
    pub max_tries: u32,
}

impl Default for HealthGate {
    /// 100ms first delay, doubling up to 30s, 10 tries.
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            max_tries: 10,
        }
    }
}

impl HealthGate {
    /// Polls until every checker in `checkers()` is healthy.
    pub(crate) async fn wait(
        &self,
        component: &str,
        checkers: &HealthCheckFn,
        ctx: &CancellationToken,
        bus: &Bus,
    ) -> Result<(), ComponentError> {
        let max_tries = self.max_tries.max(1);
        let mut tries = 0u32;

        loop {
            let last = match check_all(&checkers()) {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            tries += 1;
            if tries >= max_tries {
                return Err(ComponentError::HealthRetryExhausted {
                    tries,
                    last: last.to_string(),
                });
            }

            let delay = self.backoff.next(tries - 1);
            tracing::debug!(
                component,
                attempt = tries,
                ?delay,
                error = %last,
                "dependencies not healthy yet"
            );
            bus.publish(
                Event::new(EventKind::HealthPending)
                    .with_component(component)
                    .with_attempt(tries)
                    .with_delay(delay)
                    .with_reason(last.to_string()),
            );

            tokio::select! {
                biased;
                _ = ctx.cancelled() => return Err(ComponentError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Component that runs `f` once dependencies are healthy, then shuts the host down.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use compvisor::{Command, ComponentError, Registrar};
///
/// let mut registrar = Registrar::new();
/// registrar.command(Command::new(|_ctx: CancellationToken| async {
///     println!("all dependencies are up");
///     Ok::<_, ComponentError>(())
/// }));
/// assert_eq!(registrar.range()[0].name(), "command");
/// ```
pub struct Command<F> {
    name: Cow<'static, str>,
    gate: HealthGate,
    f: F,
    host: OnceLock<Host>,
}

impl<F> Command<F> {
    /// Wraps `f` with the default name `"command"` and the default gate.
    pub fn new(f: F) -> Self {
        Self {
            name: Cow::Borrowed("command"),
            gate: HealthGate::default(),
            f,
            host: OnceLock::new(),
        }
    }

    /// Overrides the component name.
    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Overrides the polling schedule.
    pub fn with_gate(mut self, gate: HealthGate) -> Self {
        self.gate = gate;
        self
    }
}

#[async_trait]
impl<F, Fut> Component for Command<F>
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ComponentError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, host: &Host) -> Result<(), ComponentError> {
        let _ = self.host.set(host.clone());
        Ok(())
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        let host = self.host.get().ok_or(ComponentError::NotInitialized)?;
        let checkers = host.health_check_fn();

        self.gate.wait(&self.name, &checkers, &ctx, host.bus()).await?;

        let span = host.logger(&self.name);
        span.in_scope(|| tracing::info!("dependencies healthy, running command"));
        (self.f)(ctx).await?;

        span.in_scope(|| tracing::info!("command finished, requesting shutdown"));
        host.shutdown();
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
        if let Some(host) = self.host.get() {
            host.shutdown();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::core::{Config, Host};
    use crate::health::{HealthFlag, HealthRegistry};

    fn host(health: HealthRegistry) -> Host {
        Host::new(
            Config::default().meta(),
            CancellationToken::new(),
            health,
            Bus::new(16),
        )
    }

    fn fast_gate(max_tries: u32) -> HealthGate {
        HealthGate {
            backoff: BackoffPolicy::constant(Duration::from_millis(5)),
            max_tries,
        }
    }

    type Ready = futures::future::Ready<Result<(), ComponentError>>;

    fn counting(calls: Arc<AtomicUsize>) -> impl Fn(CancellationToken) -> Ready + Send + Sync + 'static {
        move |_ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn start_before_init_is_rejected() {
        let cmd = Command::new(counting(Arc::new(AtomicUsize::new(0))));
        let err = cmd.start(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, ComponentError::NotInitialized);
    }

    #[tokio::test]
    async fn runs_once_healthy_then_shuts_host_down() {
        let health = HealthRegistry::new();
        let flag = Arc::new(HealthFlag::new());
        health.add("db", flag.clone());
        let host = host(health);

        let calls = Arc::new(AtomicUsize::new(0));
        let cmd = Command::new(counting(calls.clone())).with_gate(fast_gate(50));
        cmd.init(&host).await.unwrap();

        let setter = {
            let flag = flag.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                flag.set_healthy(true);
            })
        };

        cmd.start(host.context()).await.unwrap();
        setter.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(host.is_shutting_down());
    }

    #[tokio::test]
    async fn exhaustion_never_runs_the_function() {
        let health = HealthRegistry::new();
        health.add("cache", Arc::new(HealthFlag::new()));
        let host = host(health);

        let calls = Arc::new(AtomicUsize::new(0));
        let cmd = Command::new(counting(calls.clone())).with_gate(fast_gate(3));
        cmd.init(&host).await.unwrap();

        let err = cmd.start(host.context()).await.unwrap_err();
        assert_eq!(
            err,
            ComponentError::HealthRetryExhausted {
                tries: 3,
                last: "cache: unhealthy".into()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!host.is_shutting_down());
    }

    #[tokio::test]
    async fn cancellation_while_waiting_is_clean() {
        let health = HealthRegistry::new();
        health.add("cache", Arc::new(HealthFlag::new()));
        let host = host(health);

        let cmd = Command::new(counting(Arc::new(AtomicUsize::new(0))))
            .with_gate(HealthGate {
                backoff: BackoffPolicy::constant(Duration::from_secs(60)),
                max_tries: 10,
            });
        cmd.init(&host).await.unwrap();

        let ctx = host.context();
        ctx.cancel();
        assert_eq!(cmd.start(ctx).await.unwrap_err(), ComponentError::Canceled);
    }

    #[tokio::test]
    async fn stop_closes_the_host() {
        let host = host(HealthRegistry::new());
        let cmd = Command::new(counting(Arc::new(AtomicUsize::new(0))));
        cmd.stop(CancellationToken::new()).await.unwrap();
        assert!(!host.is_shutting_down());

        cmd.init(&host).await.unwrap();
        cmd.stop(CancellationToken::new()).await.unwrap();
        assert!(host.is_shutting_down());
    }
}
