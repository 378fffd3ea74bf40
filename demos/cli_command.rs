//! # Example: health-gated command
//!
//! A connection pool becomes healthy after a short warm-up. The command waits
//! for it through the health aggregator, runs once, and ends the process;
//! start and stop hooks bracket the run.
//!
//! Run with `cargo run --example cli_command`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use compvisor::{
    BackoffPolicy, Command, Component, ComponentError, Config, HealthCheck, HealthError,
    HealthFlag, HealthGate, HealthRef, JitterPolicy, Orchestrator, Registrar,
    observability::init_tracing,
};

struct Pool {
    warmup: Duration,
    ready: HealthFlag,
}

impl HealthCheck for Pool {
    fn check_health(&self) -> Result<(), HealthError> {
        self.ready.check_health()
    }
}

#[async_trait]
impl Component for Pool {
    fn name(&self) -> &str {
        "db-pool"
    }

    async fn start(&self, ctx: CancellationToken) -> Result<(), ComponentError> {
        tokio::select! {
            _ = ctx.cancelled() => return Err(ComponentError::Canceled),
            _ = tokio::time::sleep(self.warmup) => {}
        }
        tracing::info!("pool connected");
        self.ready.set_healthy(true);
        ctx.cancelled().await;
        Ok(())
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), ComponentError> {
        self.ready.set_healthy(false);
        tracing::info!("pool closed");
        Ok(())
    }

    fn health_check(self: Arc<Self>) -> Option<HealthRef> {
        Some(self)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let mut registrar = Registrar::new();
    registrar
        .on_start("announce", |_ctx: CancellationToken| async {
            tracing::info!("on start");
            Ok::<_, ComponentError>(())
        })
        .on_stop("farewell", |_ctx: CancellationToken| async {
            tracing::info!("on stop");
            Ok::<_, ComponentError>(())
        })
        .register(Arc::new(Pool {
            warmup: Duration::from_millis(350),
            ready: HealthFlag::new(),
        }))
        .command(
            Command::new(|_ctx: CancellationToken| async {
                tracing::info!("migrations applied");
                Ok::<_, ComponentError>(())
            })
            .with_name("migrate")
            .with_gate(HealthGate {
                backoff: BackoffPolicy {
                    jitter: JitterPolicy::Equal,
                    ..BackoffPolicy::default()
                },
                max_tries: 10,
            }),
        );

    let cfg = Config::new("cli-example").with_version("v0.0.1");
    let res = match Orchestrator::builder(cfg).with_registrar(registrar).build() {
        Ok(orchestrator) => orchestrator.run().await,
        Err(err) => Err(err),
    };
    if let Err(err) = res {
        eprintln!("{}", err.as_message());
        std::process::exit(err.exit_code());
    }
}
