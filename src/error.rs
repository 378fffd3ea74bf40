//! Error types used by the orchestrator and by components.
//!
//! - [`ComponentError`]: returned by component `init`/`start`/`stop` bodies.
//! - [`HealthError`]: returned by health checks.
//! - [`StopError`]: one non-fatal failure collected while draining.
//! - [`ConfigError`]: invalid [`Config`](crate::Config) values.
//! - [`RuntimeError`]: the result of [`Orchestrator::run`](crate::Orchestrator::run).
//!
//! Every enum carries `as_label` (stable snake_case, for logs/metrics) and
//! `as_message` helpers.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by a component body.
///
/// `Canceled` is special: a `start` that returns it after observing the
/// shared cancellation token is treated as a clean exit, never as a failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    /// The component failed.
    #[error("{error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The component observed cancellation and gave up.
    #[error("context cancelled")]
    Canceled,

    /// The component body panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },

    /// A lifecycle method that needs the host ran before `init`.
    #[error("component not initialized")]
    NotInitialized,

    /// A health gate ran out of attempts before all checkers became healthy.
    #[error("health check retries exhausted after {tries} tries: {last}")]
    HealthRetryExhausted {
        /// Number of checks performed.
        tries: u32,
        /// The last observed health failure.
        last: String,
    },
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Failed`] from anything printable.
    ///
    /// ```
    /// use compvisor::ComponentError;
    ///
    /// let err = ComponentError::fail("listener closed");
    /// assert_eq!(err.to_string(), "listener closed");
    /// ```
    pub fn fail(error: impl Display) -> Self {
        ComponentError::Failed {
            error: error.to_string(),
        }
    }

    /// Returns `true` for [`ComponentError::Canceled`].
    pub fn is_canceled(&self) -> bool {
        matches!(self, ComponentError::Canceled)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ComponentError::Failed { .. } => "component_failed",
            ComponentError::Canceled => "component_canceled",
            ComponentError::Panicked { .. } => "component_panicked",
            ComponentError::NotInitialized => "component_not_initialized",
            ComponentError::HealthRetryExhausted { .. } => "health_retry_exhausted",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ComponentError::Failed { error } => format!("error: {error}"),
            ComponentError::Canceled => "context cancelled".to_string(),
            ComponentError::Panicked { info } => format!("panic: {info}"),
            ComponentError::NotInitialized => "not initialized".to_string(),
            ComponentError::HealthRetryExhausted { tries, last } => {
                format!("unhealthy after {tries} tries; last={last}")
            }
        }
    }

    /// Converts a caught panic payload into [`ComponentError::Panicked`].
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let info = if let Some(msg) = payload.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        ComponentError::Panicked { info }
    }
}

/// A failed health check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{checker}: {reason}")]
pub struct HealthError {
    /// Name of the checker that reported the failure.
    pub checker: Arc<str>,
    /// Why the checker is not ready.
    pub reason: String,
}

impl HealthError {
    /// Creates an error for the given checker name.
    pub fn new(checker: impl Into<Arc<str>>, reason: impl Into<String>) -> Self {
        Self {
            checker: checker.into(),
            reason: reason.into(),
        }
    }

    /// Creates an error whose checker name is filled in by the registry.
    pub fn unhealthy(reason: impl Into<String>) -> Self {
        Self::new("", reason)
    }
}

/// # A non-fatal failure observed while draining.
///
/// Collected into [`ShutdownErrors`](crate::ShutdownErrors); never changes the
/// result of a run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StopError {
    /// `stop` returned an error.
    #[error("{component}: stop failed: {source}")]
    Failed {
        /// Component name.
        component: Arc<str>,
        /// What `stop` returned.
        source: ComponentError,
    },

    /// `stop` was still running when the drain deadline passed.
    #[error("{component}: stop exceeded close timeout {timeout:?}")]
    TimedOut {
        /// Component name.
        component: Arc<str>,
        /// The configured close timeout.
        timeout: Duration,
    },

    /// `start` never returned after cancellation and its task was aborted.
    #[error("{component}: start did not exit within close timeout {timeout:?}; aborted")]
    Abandoned {
        /// Component name.
        component: Arc<str>,
        /// The configured close timeout.
        timeout: Duration,
    },
}

impl StopError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StopError::Failed { .. } => "stop_failed",
            StopError::TimedOut { .. } => "stop_timed_out",
            StopError::Abandoned { .. } => "start_abandoned",
        }
    }

    /// Name of the component the error belongs to.
    pub fn component(&self) -> &str {
        match self {
            StopError::Failed { component, .. }
            | StopError::TimedOut { component, .. }
            | StopError::Abandoned { component, .. } => component,
        }
    }
}

/// # Invalid orchestrator configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Application name longer than [`Config::MAX_NAME_LEN`](crate::Config::MAX_NAME_LEN).
    #[error("name must be at most 63 characters, got {len}")]
    NameTooLong {
        /// Actual length.
        len: usize,
    },

    /// Close timeout below [`Config::MIN_CLOSE_TIMEOUT`](crate::Config::MIN_CLOSE_TIMEOUT).
    #[error("close timeout must be at least 1 second, got {timeout:?}")]
    CloseTimeoutTooSmall {
        /// The rejected value.
        timeout: Duration,
    },

    /// Close timeout above [`Config::MAX_CLOSE_TIMEOUT`](crate::Config::MAX_CLOSE_TIMEOUT).
    #[error("close timeout must be at most 5 minutes, got {timeout:?}")]
    CloseTimeoutTooLarge {
        /// The rejected value.
        timeout: Duration,
    },
}

/// # Errors produced by the orchestrator run.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A component failed to initialise; nothing was started.
    #[error("init {component}: {source}")]
    Init {
        /// Component name.
        component: Arc<str>,
        /// What `init` returned.
        source: ComponentError,
    },

    /// A component's `start` failed; this triggered the drain.
    #[error("start {component}: {source}")]
    Start {
        /// Component name.
        component: Arc<str>,
        /// What `start` returned.
        source: ComponentError,
    },

    /// Registering OS signal listeners failed.
    #[error("failed to register exit signals: {source}")]
    Signal {
        /// Underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration rejected at build time.
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use compvisor::{ComponentError, RuntimeError};
    ///
    /// let err = RuntimeError::Start { component: "http".into(), source: ComponentError::fail("bind") };
    /// assert_eq!(err.as_label(), "runtime_start_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Init { .. } => "runtime_init_failed",
            RuntimeError::Start { .. } => "runtime_start_failed",
            RuntimeError::Signal { .. } => "runtime_signal_failed",
            RuntimeError::Config(_) => "runtime_invalid_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::Init { component, source } => {
                format!("component={component} failed to init: {}", source.as_message())
            }
            RuntimeError::Start { component, source } => {
                format!("component={component} failed: {}", source.as_message())
            }
            RuntimeError::Signal { source } => format!("signal registration: {source}"),
            RuntimeError::Config(e) => format!("config: {e}"),
        }
    }

    /// The failing component, for `Init`/`Start` errors.
    pub fn component(&self) -> Option<&str> {
        match self {
            RuntimeError::Init { component, .. } | RuntimeError::Start { component, .. } => {
                Some(component)
            }
            _ => None,
        }
    }

    /// Process exit code for this error. A successful run exits with `0`.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_are_rendered() {
        let err = ComponentError::from_panic(Box::new("boom"));
        assert_eq!(err, ComponentError::Panicked { info: "boom".into() });

        let err = ComponentError::from_panic(Box::new(String::from("owned boom")));
        assert_eq!(err.to_string(), "panicked: owned boom");

        let err = ComponentError::from_panic(Box::new(42_u8));
        assert_eq!(err.as_label(), "component_panicked");
    }

    #[test]
    fn stop_error_exposes_component() {
        let err = StopError::TimedOut {
            component: "db".into(),
            timeout: Duration::from_secs(5),
        };
        assert_eq!(err.component(), "db");
        assert_eq!(err.as_label(), "stop_timed_out");
    }

    #[test]
    fn runtime_error_keeps_component_source() {
        let err = RuntimeError::Start {
            component: "worker".into(),
            source: ComponentError::fail("boom"),
        };
        assert_eq!(err.component(), Some("worker"));
        assert_eq!(err.to_string(), "start worker: boom");
        assert_eq!(err.exit_code(), 1);
    }
}
