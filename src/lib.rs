//! # compvisor
//!
//! **Compvisor** is a process-wide component lifecycle orchestrator for tokio
//! services.
//!
//! A service is a set of components (listeners, consumers, schedulers,
//! one-shot commands). Compvisor initialises them in registration order, runs
//! them concurrently under one cancellation token, and on the first failure,
//! requested shutdown or OS signal, stops them in strict reverse registration
//! order within a bounded time budget.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  Component   │   │ Builder (×N) │   │   Command    │
//!     │  OnStart/    │   │  BuilderFn   │   │ (health-gated│
//!     │  OnStop      │   │              │   │   one-shot)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registrar (append-only, registration order)                      │
//! │  - units: [ComponentRef]                                          │
//! │  - HealthRegistry (checkers of components that opt in)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Orchestrator                                                     │
//! │  - Host (identity, logger span, root token, health view)          │
//! │  - Bus (broadcast events) ──► SubscriberSet ──► Subscribe impls   │
//! │  - ShutdownErrors (non-fatal drain failures)                      │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   init (sequential)  start (concurrent)  stop (reverse, sequential,
//!                                                shared deadline)
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──► Initializing ──► Running ──► Draining ──► Terminated
//!              │                │
//!              │ init error     │ first of:
//!              ▼                │  - start error / panic      → Err(Start)
//!          Err(Init)            │  - ShutdownHandle / Host    → Ok
//!       (no start, no stop)     │  - configured exit signal   → Ok
//!                               ▼
//!                     stop(stop_ctx) for units in reverse order,
//!                     failures collected in ShutdownErrors
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / traits                           |
//! |-------------------|-----------------------------------------------------------------|----------------------------------------------|
//! | **Components**    | The `init`/`start`/`stop` contract and closure adapters.        | [`Component`], [`OnStart`], [`OnStop`]       |
//! | **Fan-out**       | Register N identical components from one factory.              | [`ComponentBuilder`], [`BuilderFn`]          |
//! | **Health**        | Optional readiness checks, pull-based aggregation.              | [`HealthCheck`], [`HealthFlag`], [`HealthRegistry`] |
//! | **Commands**      | Run once dependencies are healthy, then shut down.              | [`Command`], [`HealthGate`]                  |
//! | **Orchestration** | Ordered init, concurrent start, bounded reverse drain.          | [`Orchestrator`], [`Registrar`], [`Host`]    |
//! | **Events**        | Lifecycle events for logging, metrics, custom subscribers.      | [`Subscribe`], [`Event`], [`LogWriter`]      |
//! | **Errors**        | Typed errors for components, drain and the run itself.          | [`ComponentError`], [`StopError`], [`RuntimeError`] |
//! | **Configuration** | Identity, close timeout, exit signals; `serde`-loadable.        | [`Config`], [`ExitSignal`]                   |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use compvisor::{Command, ComponentError, Config, LogWriter, Orchestrator, Registrar, Subscribe};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registrar = Registrar::new();
//!
//!     // Long-running unit: runs until the drain starts.
//!     registrar.on_start("ticker", |ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, ComponentError>(())
//!     });
//!
//!     // Teardown-only unit: stopped first because it was registered last.
//!     registrar.on_stop("flush", |_ctx: CancellationToken| async {
//!         println!("flushing buffers");
//!         Ok::<_, ComponentError>(())
//!     });
//!
//!     // One-shot: nothing reports unhealthy, so it runs at once and ends the run.
//!     registrar.command(Command::new(|_ctx: CancellationToken| async {
//!         println!("hello from the command");
//!         Ok::<_, ComponentError>(())
//!     }));
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let orchestrator = Orchestrator::builder(Config::new("hello").with_close_timeout(Duration::from_secs(2)))
//!         .with_registrar(registrar)
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     orchestrator.run().await?;
//!     Ok(())
//! }
//! ```
mod components;
mod core;
mod error;
mod events;
mod health;
pub mod observability;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use components::{
    BuildOptions, BuilderFn, Command, Component, ComponentBuilder, ComponentRef, HealthGate,
    OnStart, OnStop,
};
pub use crate::core::{
    Config, ExitSignal, Host, Meta, Orchestrator, OrchestratorBuilder, Phase, Registrar,
    ShutdownErrors, ShutdownHandle,
};
pub use error::{ComponentError, ConfigError, HealthError, RuntimeError, StopError};
pub use events::{Bus, Event, EventKind};
pub use health::{Checker, HealthCheck, HealthCheckFn, HealthFlag, HealthRef, HealthRegistry, check_all};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
