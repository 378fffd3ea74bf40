//! # Orchestrator configuration.
//!
//! [`Config`] carries the application identity exposed to components through
//! [`Host`](crate::Host), the drain budget, the OS signals that trigger a
//! graceful shutdown and the event bus size.
//!
//! Config is built in code (`Config::new("api").with_close_timeout(..)`) or
//! deserialized with `serde`:
//!
//! ```
//! use std::time::Duration;
//! use compvisor::{Config, ExitSignal};
//!
//! let cfg: Config = serde_json::from_str(r#"{
//!     "name": "billing",
//!     "version": "1.4.2",
//!     "close_timeout": "10s",
//!     "exit_signals": ["terminate", "interrupt"]
//! }"#).unwrap();
//!
//! assert_eq!(cfg.close_timeout, Duration::from_secs(10));
//! assert_eq!(cfg.exit_signals, vec![ExitSignal::Terminate, ExitSignal::Interrupt]);
//! assert!(cfg.validate().is_ok());
//! ```
//!
//! ## Sentinel values
//! - `close_timeout = 0s` → [`Config::DEFAULT_CLOSE_TIMEOUT`]
//! - empty `name` / `id` → defaults (see [`Config::ensure_defaults`])
//! - empty `exit_signals` → no OS signal ends the run; only cancellation or a failure does

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// OS signal that starts a graceful shutdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitSignal {
    /// `SIGINT` / Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGQUIT`.
    Quit,
    /// `SIGHUP`.
    Hangup,
    /// `SIGUSR1`.
    User1,
    /// `SIGUSR2`.
    User2,
}

impl ExitSignal {
    /// Signals used when none are configured: terminate, quit, interrupt.
    pub const DEFAULTS: [ExitSignal; 3] = [
        ExitSignal::Terminate,
        ExitSignal::Quit,
        ExitSignal::Interrupt,
    ];
}

/// Application identity, immutable for the lifetime of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Meta {
    /// Application name.
    pub name: Arc<str>,
    /// Instance id (hostname or a random uuid by default).
    pub id: Arc<str>,
    /// Application version; may be empty.
    pub version: Arc<str>,
}

/// Configuration for the orchestrator.
///
/// ## Field semantics
/// - `name`: application name used in logs (`app` field), at most 63 characters
/// - `id`: instance id (`id` field), defaults to `$HOSTNAME` or a random uuid
/// - `version`: free-form, reported in logs
/// - `close_timeout`: total budget for the drain (every `stop` plus the wind-down of `start`s)
/// - `exit_signals`: OS signals that trigger the drain
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name.
    pub name: String,
    /// Instance id.
    pub id: String,
    /// Application version.
    pub version: String,
    /// Shared deadline for the whole drain.
    #[serde(with = "humantime_serde")]
    pub close_timeout: Duration,
    /// Signals that start a graceful shutdown.
    pub exit_signals: Vec<ExitSignal>,
    /// Capacity of the event bus.
    pub bus_capacity: usize,
}

impl Config {
    /// Name used when none is given.
    pub const DEFAULT_NAME: &'static str = "compvisor-app";
    /// Longest accepted application name.
    pub const MAX_NAME_LEN: usize = 63;
    /// Drain budget used when `close_timeout` is zero.
    pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);
    /// Smallest accepted non-zero `close_timeout`.
    pub const MIN_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);
    /// Largest accepted `close_timeout`.
    pub const MAX_CLOSE_TIMEOUT: Duration = Duration::from_secs(300);

    /// Default configuration with the given application name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the instance id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the application version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the drain budget.
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Replaces the set of exit signals.
    pub fn with_exit_signals(mut self, signals: impl IntoIterator<Item = ExitSignal>) -> Self {
        self.exit_signals = signals.into_iter().collect();
        self
    }

    /// Sets the event bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Fills zero values: empty name and id, zero close timeout and bus capacity.
    ///
    /// `exit_signals` is left alone; an explicitly empty list is meaningful.
    pub fn ensure_defaults(&mut self) {
        if self.name.is_empty() {
            self.name = Self::DEFAULT_NAME.to_string();
        }
        if self.id.is_empty() {
            self.id = default_id();
        }
        if self.close_timeout.is_zero() {
            self.close_timeout = Self::DEFAULT_CLOSE_TIMEOUT;
        }
        if self.bus_capacity == 0 {
            self.bus_capacity = 1;
        }
    }

    /// Checks value ranges. A zero `close_timeout` is accepted (it means "default").
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.name.chars().count();
        if len > Self::MAX_NAME_LEN {
            return Err(ConfigError::NameTooLong { len });
        }
        let timeout = self.close_timeout;
        if !timeout.is_zero() {
            if timeout < Self::MIN_CLOSE_TIMEOUT {
                return Err(ConfigError::CloseTimeoutTooSmall { timeout });
            }
            if timeout > Self::MAX_CLOSE_TIMEOUT {
                return Err(ConfigError::CloseTimeoutTooLarge { timeout });
            }
        }
        Ok(())
    }

    /// Identity view handed to components.
    pub fn meta(&self) -> Meta {
        Meta {
            name: Arc::from(self.name.as_str()),
            id: Arc::from(self.id.as_str()),
            version: Arc::from(self.version.as_str()),
        }
    }
}

impl Default for Config {
    /// - `name = "compvisor-app"`
    /// - `id = $HOSTNAME` or a random uuid
    /// - `close_timeout = 5s`
    /// - `exit_signals = [terminate, quit, interrupt]`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            id: default_id(),
            version: String::new(),
            close_timeout: Self::DEFAULT_CLOSE_TIMEOUT,
            exit_signals: ExitSignal::DEFAULTS.to_vec(),
            bus_capacity: 1024,
        }
    }
}

fn default_id() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
