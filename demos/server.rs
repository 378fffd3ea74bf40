//! # Example: server with a fanned-out consumer pool
//!
//! An in-memory broker, a publisher standing in for an HTTP server, and three
//! consumers built from one factory. Collaborators are created first; the
//! consumer builder is produced afterwards by an explicit `wire()` step, so no
//! component holds a back-reference to the one that creates it.
//!
//! Registration order (and reverse stop order):
//! ```text
//! broker → publisher → consumer ×3 → goodbye       init / start
//! goodbye → consumer ×3 → publisher → broker       stop
//! ```
//!
//! Run with `cargo run --example server`; stops after two seconds or on Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

use compvisor::{
    BuilderFn, Component, ComponentError, ComponentRef, Config, HealthCheck, HealthError,
    HealthFlag, HealthRef, Host, LogWriter, Orchestrator, Registrar, Subscribe,
    observability::init_tracing,
};

/// Fan-out channel every consumer subscribes to.
struct Broker {
    tx: broadcast::Sender<String>,
    ready: HealthFlag,
}

impl Broker {
    fn new() -> Arc<Self> {
        let (tx, _) = broadcast::channel(64);
        Arc::new(Self {
            tx,
            ready: HealthFlag::new(),
        })
    }

    fn publish(&self, msg: String) {
        let _ = self.tx.send(msg);
    }
}

impl HealthCheck for Broker {
    fn check_health(&self) -> Result<(), HealthError> {
        self.ready.check_health()
    }
}

#[async_trait]
impl Component for Broker {
    fn name(&self) -> &str {
        "broker"
    }

    async fn init(&self, host: &Host) -> Result<(), ComponentError> {
        self.ready.set_healthy(true);
        host.logger(self.name())
            .in_scope(|| tracing::info!("broker ready"));
        Ok(())
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        ctx.cancelled().await;
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
        self.ready.set_healthy(false);
        Ok(())
    }

    fn health_check(self: Arc<Self>) -> Option<HealthRef> {
        Some(self)
    }
}

/// Publishes a message every 200ms; stands in for a request handler.
struct Publisher {
    broker: Arc<Broker>,
}

#[async_trait]
impl Component for Publisher {
    fn name(&self) -> &str {
        "publisher"
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        let mut tick = tokio::time::interval(Duration::from_millis(200));
        let mut n = 0u64;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = tick.tick() => {
                    n += 1;
                    self.broker.publish(format!("hello #{n}"));
                }
            }
        }
    }
}

/// One member of the consumer pool.
struct Consumer {
    broker: Arc<Broker>,
    rx: Mutex<Option<broadcast::Receiver<String>>>,
    span: std::sync::OnceLock<tracing::Span>,
}

#[async_trait]
impl Component for Consumer {
    fn name(&self) -> &str {
        "consumer"
    }

    async fn init(&self, host: &Host) -> Result<(), ComponentError> {
        *self.rx.lock().await = Some(self.broker.tx.subscribe());
        let _ = self.span.set(host.logger(self.name()));
        Ok(())
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        let mut rx = self.rx.lock().await.take().ok_or(ComponentError::NotInitialized)?;
        let span = self.span.get().cloned().unwrap_or_else(tracing::Span::none);
        loop {
            tokio::select! {
                _ = ctx.cancelled() => return Err(ComponentError::Canceled),
                msg = rx.recv() => match msg {
                    Ok(msg) => span.in_scope(|| tracing::info!(%msg, "consumed")),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        span.in_scope(|| tracing::warn!(skipped = n, "consumer lagged"));
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },
            }
        }
    }
}

/// Second wiring phase: the broker exists, now describe its consumers.
fn wire(
    broker: &Arc<Broker>,
    instances: usize,
) -> BuilderFn<impl Fn() -> ComponentRef + Send + Sync> {
    let broker = Arc::clone(broker);
    BuilderFn::new(instances, move || -> ComponentRef {
        Arc::new(Consumer {
            broker: Arc::clone(&broker),
            rx: Mutex::new(None),
            span: std::sync::OnceLock::new(),
        })
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let broker = Broker::new();
    let publisher = Arc::new(Publisher {
        broker: Arc::clone(&broker),
    });

    let mut registrar = Registrar::new();
    registrar
        .register(broker.clone())
        .register(publisher)
        .builder(&wire(&broker, 3))
        .on_stop("goodbye", |_ctx: CancellationToken| async {
            tracing::info!("all consumers are about to stop");
            Ok::<_, ComponentError>(())
        });

    let cfg = Config::new("server-demo")
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_close_timeout(Duration::from_secs(3));
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let orchestrator = Orchestrator::builder(cfg)
        .with_registrar(registrar)
        .with_subscribers(subs)
        .build()?;

    let handle = orchestrator.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.shutdown();
    });

    let errors = orchestrator.shutdown_errors();
    if let Err(err) = orchestrator.run().await {
        eprintln!("server failed: {}", err.as_message());
        std::process::exit(err.exit_code());
    }
    if errors.has_errors() {
        eprintln!("shutdown errors: {errors}");
    }
    Ok(())
}
