//! # Orchestrator: ordered init, concurrent start, bounded reverse-order drain.
//!
//! The [`Orchestrator`] owns the registered units, the root cancellation
//! token, the event bus and the subscriber set. [`Orchestrator::run`] drives a
//! single pass through the lifecycle and returns the first fatal error.
//!
//! ## High-level architecture
//! ```text
//! Registrar ──► OrchestratorBuilder::build() ──► Orchestrator::run()
//!
//! Initializing:
//!   for unit in registrar (in order):
//!       publish Initializing
//!       unit.init(&host) ── Err/panic ──► publish InitFailed ──► return Err(Init)
//!       publish Initialized                                       (no start, no stop)
//!
//! Running:
//!   SignalListener::register(cfg.exit_signals)
//!   for unit in registrar:
//!       publish Starting
//!       JoinSet.spawn(catch_unwind(unit.start(root.child_token())))
//!
//!   loop select! (biased):
//!       root cancelled            ─► trigger: none            (ShutdownHandle / Host::shutdown)
//!       exit signal               ─► trigger: none
//!       start → Ok | Canceled     ─► publish Exited, keep waiting
//!       start → Err | panic       ─► publish StartFailed, trigger: Err(Start)
//!
//! Draining:
//!   publish ShutdownRequested, root.cancel()
//!   Drain::run()  (reverse registration order, shared deadline)
//!
//! Terminated:
//!   return trigger
//! ```
//!
//! ## Launch is not readiness
//! Registration order decides `init` and `stop` order only. Every `start` is
//! launched concurrently; a unit that depends on another being ready should
//! wait on the health aggregator (see [`Command`](crate::Command)).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use compvisor::{ComponentError, Config, Orchestrator, Registrar};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registrar = Registrar::new();
//!     registrar.on_start("ticker", |ctx: CancellationToken| async move {
//!         while !ctx.is_cancelled() {
//!             tokio::time::sleep(Duration::from_millis(10)).await;
//!         }
//!         Ok::<_, ComponentError>(())
//!     });
//!
//!     let orchestrator = Orchestrator::builder(Config::new("demo"))
//!         .with_registrar(registrar)
//!         .build()?;
//!
//!     let handle = orchestrator.shutdown_handle();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(50)).await;
//!         handle.shutdown();
//!     });
//!
//!     orchestrator.run().await?;
//!     Ok(())
//! }
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::components::ComponentRef;
use crate::core::drain::{Drain, ShutdownErrors};
use crate::core::shutdown::SignalListener;
use crate::core::{Config, Host, OrchestratorBuilder};
use crate::error::{ComponentError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Where a run currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Built, `run` not called yet.
    Idle,
    /// Calling `init` on each unit in order.
    Initializing,
    /// Every `start` launched; waiting for a trigger.
    Running,
    /// Stopping units in reverse order.
    Draining,
    /// `run` is about to return.
    Terminated,
}

/// Requests a graceful shutdown from outside the orchestrator. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    root: CancellationToken,
}

impl ShutdownHandle {
    /// Starts the drain. Idempotent.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Returns `true` once shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Completes when shutdown is requested.
    pub async fn wait(&self) {
        self.root.cancelled().await;
    }
}

pub(crate) type StartOutcome = (usize, Result<(), ComponentError>);

/// Start tasks of the launched units, keyed by registration index.
pub(crate) struct StartSet {
    tasks: JoinSet<StartOutcome>,
    launched: Vec<usize>,
    finished: Vec<bool>,
}

impl StartSet {
    /// Spawns `start` for every unit, each with a child of `root`.
    pub(crate) fn spawn_all(units: &[ComponentRef], root: &CancellationToken) -> Self {
        let mut tasks = JoinSet::new();
        for (index, unit) in units.iter().enumerate() {
            let unit = Arc::clone(unit);
            let ctx = root.child_token();
            tasks.spawn(async move {
                let res = AssertUnwindSafe(unit.start(ctx))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(ComponentError::from_panic(payload)));
                (index, res)
            });
        }
        Self {
            tasks,
            launched: (0..units.len()).collect(),
            finished: vec![false; units.len()],
        }
    }

    /// Next finished start; `None` once all are done.
    pub(crate) async fn next(&mut self) -> Option<StartOutcome> {
        loop {
            match self.tasks.join_next().await? {
                Ok((index, res)) => {
                    self.finished[index] = true;
                    return Some((index, res));
                }
                // Panics are caught inside the task; only aborts end up here.
                Err(_) => continue,
            }
        }
    }

    pub(crate) fn launched(&self) -> &[usize] {
        &self.launched
    }

    /// Launched units whose `start` has not returned.
    pub(crate) fn pending(&self) -> Vec<usize> {
        self.launched
            .iter()
            .copied()
            .filter(|&i| !self.finished[i])
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn abort_all(&mut self) {
        self.tasks.abort_all();
    }
}

/// Drives registered components through `init → start → stop`.
pub struct Orchestrator {
    cfg: Config,
    units: Vec<ComponentRef>,
    host: Host,
    root: CancellationToken,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    errors: Arc<ShutdownErrors>,
    phase: watch::Sender<Phase>,
}

impl Orchestrator {
    /// Starts building an orchestrator with `cfg`.
    pub fn builder(cfg: Config) -> OrchestratorBuilder {
        OrchestratorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        units: Vec<ComponentRef>,
        host: Host,
        root: CancellationToken,
        bus: Bus,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            cfg,
            units,
            host,
            root,
            bus,
            subscribers,
            errors: Arc::new(ShutdownErrors::new()),
            phase,
        }
    }

    /// Handle that triggers a graceful shutdown.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            root: self.root.clone(),
        }
    }

    /// Errors collected while draining. Filled in by `run`.
    pub fn shutdown_errors(&self) -> Arc<ShutdownErrors> {
        Arc::clone(&self.errors)
    }

    /// Observes phase transitions.
    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Services handed to components.
    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Receives every lifecycle event published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Runs every registered component until a trigger fires, then drains.
    ///
    /// Returns:
    /// - `Err(RuntimeError::Init)` if an `init` failed (nothing was started or stopped);
    /// - `Err(RuntimeError::Signal)` if exit signals could not be registered;
    /// - `Err(RuntimeError::Start)` if a `start` failed, after a full drain;
    /// - `Ok(())` on an exit signal or a requested shutdown.
    ///
    /// Stop failures never change the result; see [`Orchestrator::shutdown_errors`].
    pub async fn run(self) -> Result<(), RuntimeError> {
        let listener_stop = CancellationToken::new();
        let listener = self.subscriber_listener(listener_stop.clone());

        let res = self.execute().await;
        self.set_phase(Phase::Terminated);

        listener_stop.cancel();
        let _ = listener.await;

        if let Err(err) = &res {
            tracing::error!(label = err.as_label(), error = %err, "run finished with error");
        }
        res
    }

    async fn execute(&self) -> Result<(), RuntimeError> {
        tracing::info!(
            app = %self.host.name(),
            id = %self.host.id(),
            version = %self.host.version(),
            components = self.units.len(),
            "starting orchestrator"
        );

        self.set_phase(Phase::Initializing);
        self.init_all().await?;

        let mut signals = SignalListener::register(&self.cfg.exit_signals)?;

        self.set_phase(Phase::Running);
        let mut starts = self.start_all();
        let trigger = self.wait_for_trigger(&mut starts, &mut signals).await;

        self.root.cancel();
        self.set_phase(Phase::Draining);
        Drain {
            units: &self.units,
            bus: &self.bus,
            errors: &self.errors,
            close_timeout: self.cfg.close_timeout,
        }
        .run(&mut starts)
        .await;

        trigger.map_or(Ok(()), Err)
    }

    /// Forwards bus events to the subscribers until `stop`, then flushes them.
    fn subscriber_listener(&self, stop: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(ev),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "event listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(ev);
            }
            set.shutdown().await;
        })
    }

    async fn init_all(&self) -> Result<(), RuntimeError> {
        for (index, unit) in self.units.iter().enumerate() {
            let component: Arc<str> = Arc::from(unit.name());
            self.publish(EventKind::Initializing, &component, index);

            let res = AssertUnwindSafe(unit.init(&self.host))
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(ComponentError::from_panic(payload)));

            if let Err(source) = res {
                tracing::error!(component = %component, error = %source, "component init failed");
                self.bus.publish(
                    Event::new(EventKind::InitFailed)
                        .with_component(Arc::clone(&component))
                        .with_index(index)
                        .with_reason(source.to_string()),
                );
                return Err(RuntimeError::Init { component, source });
            }
            tracing::debug!(component = %component, "component initialized");
            self.publish(EventKind::Initialized, &component, index);
        }
        Ok(())
    }

    fn start_all(&self) -> StartSet {
        for (index, unit) in self.units.iter().enumerate() {
            self.publish(EventKind::Starting, unit.name(), index);
        }
        tracing::info!(components = self.units.len(), "starting components");
        StartSet::spawn_all(&self.units, &self.root)
    }

    /// Waits for the first drain trigger. Returns the fatal error, if any.
    async fn wait_for_trigger(
        &self,
        starts: &mut StartSet,
        signals: &mut SignalListener,
    ) -> Option<RuntimeError> {
        loop {
            tokio::select! {
                biased;
                _ = self.root.cancelled() => {
                    self.request_shutdown("canceled");
                    return None;
                }
                sig = signals.recv() => {
                    tracing::info!(signal = ?sig, "received exit signal");
                    self.request_shutdown("signal");
                    return None;
                }
                Some((index, res)) = starts.next(), if !starts.is_empty() => {
                    let unit = &self.units[index];
                    match res {
                        Ok(()) | Err(ComponentError::Canceled) => {
                            tracing::info!(component = unit.name(), "component exited");
                            self.publish(EventKind::Exited, unit.name(), index);
                        }
                        Err(source) => {
                            tracing::error!(component = unit.name(), error = %source, "component failed");
                            self.bus.publish(
                                Event::new(EventKind::StartFailed)
                                    .with_component(unit.name())
                                    .with_index(index)
                                    .with_reason(source.to_string()),
                            );
                            self.request_shutdown("failure");
                            return Some(RuntimeError::Start {
                                component: Arc::from(unit.name()),
                                source,
                            });
                        }
                    }
                }
            }
        }
    }

    fn request_shutdown(&self, reason: &'static str) {
        tracing::info!(reason, "shutdown requested");
        self.bus
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(reason));
    }

    fn publish(&self, kind: EventKind, component: &str, index: usize) {
        self.bus
            .publish(Event::new(kind).with_component(component).with_index(index));
    }

    fn set_phase(&self, phase: Phase) {
        tracing::debug!(?phase, "phase changed");
        self.phase.send_replace(phase);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::components::{OnStart, OnStop};
    use crate::core::Registrar;

    fn config() -> Config {
        Config::new("test")
            .with_id("test-1")
            .with_close_timeout(Duration::from_secs(1))
            .with_exit_signals([])
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn subscribers_see_the_full_lifecycle() {
        let mut reg = Registrar::new();
        reg.on_start("once", |_ctx: CancellationToken| async { Ok(()) });
        reg.on_start("waiter", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(ComponentError::Canceled)
        });

        let recorder = Arc::new(Recorder::default());
        let orch = Orchestrator::builder(config())
            .with_registrar(reg)
            .with_subscribers(vec![recorder.clone()])
            .build()
            .unwrap();
        let handle = orch.shutdown_handle();
        let mut phase = orch.phase();

        let run = tokio::spawn(orch.run());
        phase.wait_for(|p| *p == Phase::Running).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown();
        run.await.unwrap().unwrap();

        let kinds = recorder.0.lock().unwrap().clone();
        assert_eq!(kinds.first(), Some(&EventKind::Initializing));
        assert_eq!(kinds.last(), Some(&EventKind::DrainCompleted));
        assert!(kinds.contains(&EventKind::Exited));
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::Stopped).count(), 2);
    }

    #[tokio::test]
    async fn ok_start_does_not_trigger_drain() {
        let mut reg = Registrar::new();
        reg.on_start("done", |_ctx: CancellationToken| async { Ok(()) });

        let orch = Orchestrator::builder(config())
            .with_registrar(reg)
            .build()
            .unwrap();
        let handle = orch.shutdown_handle();
        let mut phase = orch.phase();
        let run = tokio::spawn(orch.run());

        phase.wait_for(|p| *p == Phase::Running).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*phase.borrow(), Phase::Running);

        handle.shutdown();
        run.await.unwrap().unwrap();
        assert_eq!(*phase.borrow(), Phase::Terminated);
    }

    #[tokio::test]
    async fn start_panic_is_a_start_error() {
        let mut reg = Registrar::new();
        reg.on_start("boom", |_ctx: CancellationToken| async {
            panic!("exploded");
        });

        let err = Orchestrator::builder(config())
            .with_registrar(reg)
            .build()
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert_eq!(err.component(), Some("boom"));
        assert!(matches!(
            err,
            RuntimeError::Start { source: ComponentError::Panicked { .. }, .. }
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn stop_errors_are_logged_not_returned() {
        let mut reg = Registrar::new();
        reg.on_stop("flaky", |_ctx: CancellationToken| async {
            Err(ComponentError::fail("disk full"))
        });
        let orch = Orchestrator::builder(config())
            .with_registrar(reg)
            .build()
            .unwrap();
        let errors = orch.shutdown_errors();
        orch.shutdown_handle().shutdown();

        orch.run().await.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.to_string(), "flaky: stop failed: disk full");
        assert!(logs_contain("shutdown completed with errors"));
    }

    #[tokio::test]
    async fn host_shutdown_from_a_component_drains() {
        struct SelfClosing {
            host: std::sync::OnceLock<Host>,
        }

        #[async_trait]
        impl crate::Component for SelfClosing {
            fn name(&self) -> &str {
                "self-closing"
            }
            async fn init(&self, host: &Host) -> Result<(), ComponentError> {
                let _ = self.host.set(host.clone());
                Ok(())
            }
            async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
                if let Some(host) = self.host.get() {
                    host.shutdown();
                }
                ctx.cancelled().await;
                Ok(())
            }
        }

        let mut reg = Registrar::new();
        reg.register(Arc::new(SelfClosing {
            host: std::sync::OnceLock::new(),
        }));
        reg.register(OnStop::arc("after", |_ctx: CancellationToken| async { Ok(()) }));
        reg.register(OnStart::arc("idle", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Ok(())
        }));

        let orch = Orchestrator::builder(config())
            .with_registrar(reg)
            .build()
            .unwrap();
        let errors = orch.shutdown_errors();
        orch.run().await.unwrap();
        assert!(!errors.has_errors());
    }
}
