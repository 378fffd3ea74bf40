//! # Health: optional readiness capability and its aggregator.
//!
//! A component opts in by returning a checker from
//! [`Component::health_check`](crate::Component::health_check). The
//! [`Registrar`](crate::Registrar) collects those checkers at registration
//! time into a [`HealthRegistry`]; consumers (health endpoints, the
//! health-gated [`Command`](crate::Command)) pull a current view through a
//! [`HealthCheckFn`].
//!
//! ```text
//! Registrar::register(c) ──► c.health_check() ── Some(h) ──► HealthRegistry (append, named)
//!                                                                  │
//!                         Host::health_check_fn() ◄── snapshot ────┘
//! ```
//!
//! Only healthy / unhealthy exists; there is no "degraded".

mod check;
mod registry;

pub use check::{Checker, HealthCheck, HealthFlag, HealthRef};
pub use registry::{HealthCheckFn, HealthRegistry, check_all};
