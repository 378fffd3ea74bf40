//! Runtime core: registration, orchestration and drain.
//!
//! The public API from this module is [`Registrar`] (what to run),
//! [`OrchestratorBuilder`] / [`Orchestrator`] (how to run it), [`Host`]
//! (services given to components) and [`Config`].
//!
//! Internal modules:
//! - [`orchestrator`]: init phase, concurrent starts, trigger selection;
//! - [`drain`]: reverse-order stops under a shared deadline, [`ShutdownErrors`];
//! - [`shutdown`]: OS signal registration for the configured exit signals;
//! - [`registrar`]: ordered component list and health collection;
//! - [`host`]: identity, logger span, cancellation and health view.

mod builder;
mod config;
mod drain;
mod host;
mod orchestrator;
mod registrar;
mod shutdown;

pub use builder::OrchestratorBuilder;
pub use config::{Config, ExitSignal, Meta};
pub use drain::ShutdownErrors;
pub use host::Host;
pub use orchestrator::{Orchestrator, Phase, ShutdownHandle};
pub use registrar::Registrar;
