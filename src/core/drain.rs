//! # Drain: bounded, reverse-order teardown.
//!
//! Runs once the root token is cancelled. Everything shares one deadline,
//! `now + close_timeout`:
//!
//! ```text
//! stop_ctx (fresh token) ◄── cancelled by timer at deadline
//!
//! for unit in launched.rev():                       sequential
//!     publish Stopping
//!     timeout_at(deadline, catch_unwind(unit.stop(stop_ctx)))
//!         ├─ Ok         → publish Stopped
//!         ├─ Err / panic → StopError::Failed   ┐
//!         └─ deadline   → StopError::TimedOut  ├─► ShutdownErrors + StopFailed
//!                                              │
//! wait for start tasks until deadline          │
//!     └─ still running → abort, StopError::Abandoned
//!
//! errors? → one aggregated tracing::error!
//! publish DrainCompleted
//! ```
//!
//! Once the deadline has passed, remaining stops are still called but polled
//! only once. Stop errors never change the result of the run.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::components::ComponentRef;
use crate::core::orchestrator::StartSet;
use crate::error::{ComponentError, StopError};
use crate::events::{Bus, Event, EventKind};

/// # Non-fatal errors collected while draining.
///
/// Shared with the caller through
/// [`Orchestrator::shutdown_errors`](crate::Orchestrator::shutdown_errors);
/// inspect it after `run` returns.
///
/// ```
/// use std::time::Duration;
/// use compvisor::{ShutdownErrors, StopError};
///
/// let errors = ShutdownErrors::new();
/// assert!(!errors.has_errors());
///
/// errors.add(StopError::TimedOut { component: "db".into(), timeout: Duration::from_secs(5) });
/// errors.add(StopError::TimedOut { component: "cache".into(), timeout: Duration::from_secs(5) });
/// assert_eq!(errors.len(), 2);
/// assert_eq!(
///     errors.to_string(),
///     "db: stop exceeded close timeout 5s; cache: stop exceeded close timeout 5s",
/// );
/// ```
#[derive(Debug, Default)]
pub struct ShutdownErrors {
    errors: Mutex<Vec<StopError>>,
}

impl ShutdownErrors {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error.
    pub fn add(&self, err: StopError) {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(err);
    }

    /// Returns `true` if anything was collected.
    pub fn has_errors(&self) -> bool {
        !self.is_empty()
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the collected errors, in the order they happened.
    pub fn errors(&self) -> Vec<StopError> {
        self.errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl fmt::Display for ShutdownErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        for (i, err) in errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// One drain pass over the launched units.
pub(crate) struct Drain<'a> {
    pub(crate) units: &'a [ComponentRef],
    pub(crate) bus: &'a Bus,
    pub(crate) errors: &'a ShutdownErrors,
    pub(crate) close_timeout: Duration,
}

impl Drain<'_> {
    pub(crate) async fn run(&self, starts: &mut StartSet) {
        let deadline = Instant::now() + self.close_timeout;
        let stop_ctx = CancellationToken::new();
        let timer = tokio::spawn({
            let stop_ctx = stop_ctx.clone();
            async move {
                time::sleep_until(deadline).await;
                stop_ctx.cancel();
            }
        });

        for &index in starts.launched().iter().rev() {
            self.stop_one(index, &stop_ctx, deadline).await;
        }

        let wound_down = time::timeout_at(deadline, async {
            while let Some((index, res)) = starts.next().await {
                self.late_exit(index, res);
            }
        })
        .await
        .is_ok();

        if !wound_down {
            for index in starts.pending() {
                self.record(
                    index,
                    StopError::Abandoned {
                        component: Arc::from(self.units[index].name()),
                        timeout: self.close_timeout,
                    },
                );
            }
            starts.abort_all();
        }
        timer.abort();

        let mut done = Event::new(EventKind::DrainCompleted);
        if self.errors.has_errors() {
            tracing::error!(
                count = self.errors.len(),
                errors = %self.errors,
                "shutdown completed with errors"
            );
            done = done.with_reason(self.errors.to_string());
        } else {
            tracing::info!("shutdown completed");
        }
        self.bus.publish(done);
    }

    async fn stop_one(&self, index: usize, stop_ctx: &CancellationToken, deadline: Instant) {
        let unit = &self.units[index];
        let component: Arc<str> = Arc::from(unit.name());

        self.bus.publish(
            Event::new(EventKind::Stopping)
                .with_component(Arc::clone(&component))
                .with_index(index),
        );
        tracing::info!(component = %component, "stopping component");

        let stop = AssertUnwindSafe(unit.stop(stop_ctx.clone())).catch_unwind();
        let err = match time::timeout_at(deadline, stop).await {
            Ok(Ok(Ok(()))) => None,
            Ok(Ok(Err(source))) => Some(StopError::Failed {
                component: Arc::clone(&component),
                source,
            }),
            Ok(Err(payload)) => Some(StopError::Failed {
                component: Arc::clone(&component),
                source: ComponentError::from_panic(payload),
            }),
            Err(_) => Some(StopError::TimedOut {
                component: Arc::clone(&component),
                timeout: self.close_timeout,
            }),
        };

        match err {
            None => {
                self.bus.publish(
                    Event::new(EventKind::Stopped)
                        .with_component(component)
                        .with_index(index),
                );
            }
            Some(err) => self.record(index, err),
        }
    }

    fn record(&self, index: usize, err: StopError) {
        tracing::error!(
            component = err.component(),
            label = err.as_label(),
            error = %err,
            "component stop failed"
        );
        self.bus.publish(
            Event::new(EventKind::StopFailed)
                .with_component(err.component())
                .with_index(index)
                .with_reason(err.to_string()),
        );
        self.errors.add(err);
    }

    fn late_exit(&self, index: usize, res: Result<(), ComponentError>) {
        let component = self.units[index].name();
        match res {
            Ok(()) | Err(ComponentError::Canceled) => {
                self.bus.publish(
                    Event::new(EventKind::Exited)
                        .with_component(component)
                        .with_index(index),
                );
            }
            Err(err) => {
                tracing::warn!(component, error = %err, "component failed after shutdown was requested");
                self.bus.publish(
                    Event::new(EventKind::StartFailed)
                        .with_component(component)
                        .with_index(index)
                        .with_reason(err.to_string()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::components::{OnStart, OnStop};

    fn stop_recorder(name: &'static str, log: Arc<StdMutex<Vec<&'static str>>>) -> ComponentRef {
        OnStop::arc(name, move |_ctx: CancellationToken| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(name);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn stops_in_reverse_and_collects_nothing_on_success() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let units: Vec<ComponentRef> = ["a", "b", "c"]
            .into_iter()
            .map(|n| stop_recorder(n, Arc::clone(&log)))
            .collect();
        let bus = Bus::new(64);
        let errors = ShutdownErrors::new();

        let mut starts = StartSet::spawn_all(&units, &CancellationToken::new());
        Drain {
            units: &units,
            bus: &bus,
            errors: &errors,
            close_timeout: Duration::from_secs(1),
        }
        .run(&mut starts)
        .await;

        assert_eq!(*log.lock().unwrap(), vec!["c", "b", "a"]);
        assert!(!errors.has_errors());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn enforces_the_deadline() {
        let units: Vec<ComponentRef> = vec![
            OnStart::arc("stubborn", |_ctx: CancellationToken| async {
                std::future::pending::<()>().await;
                Ok(())
            }),
            OnStop::arc("slow-stop", |_ctx: CancellationToken| async {
                time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }),
            OnStop::arc("broken-stop", |_ctx: CancellationToken| async {
                Err(ComponentError::fail("flush failed"))
            }),
        ];
        let bus = Bus::new(64);
        let errors = ShutdownErrors::new();
        let root = CancellationToken::new();
        let mut starts = StartSet::spawn_all(&units, &root);
        root.cancel();

        Drain {
            units: &units,
            bus: &bus,
            errors: &errors,
            close_timeout: Duration::from_secs(2),
        }
        .run(&mut starts)
        .await;

        let labels: Vec<(&str, String)> = errors
            .errors()
            .iter()
            .map(|e| (e.as_label(), e.component().to_string()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("stop_failed", "broken-stop".to_string()),
                ("stop_timed_out", "slow-stop".to_string()),
                ("start_abandoned", "stubborn".to_string()),
            ]
        );
        assert!(logs_contain("shutdown completed with errors"));
    }
}
