//! Components: the lifecycle contract and its ready-made implementations.
//!
//! ## Contents
//! - [`Component`], [`ComponentRef`] the `init` / `start` / `stop` contract
//! - [`OnStart`], [`OnStop`] closures adapted into components
//! - [`ComponentBuilder`], [`BuildOptions`], [`BuilderFn`] fan-out of identical components
//! - [`Command`], [`HealthGate`] a one-shot function gated on aggregated health

mod builder;
mod command;
mod component;
mod hook;

pub(crate) use builder::expand;
pub use builder::{BuildOptions, BuilderFn, ComponentBuilder};
pub use command::{Command, HealthGate};
pub use component::{Component, ComponentRef};
pub use hook::{OnStart, OnStop};
