//! Process-wide `tracing` setup for binaries built on compvisor.
//!
//! Libraries never install a subscriber on their own; call [`init_tracing`]
//! from `main` before building the orchestrator.
//!
//! - Filter: `RUST_LOG`, falling back to `info`.
//! - Format: compact text, or JSON lines with `COMPVISOR_LOG_FORMAT=json`.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static TRACING: OnceLock<()> = OnceLock::new();

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "COMPVISOR_LOG_FORMAT";

/// Output format of [`init_tracing`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one line per event.
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Reads [`LOG_FORMAT_ENV`]; anything but `json` means compact.
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Installs the global subscriber once. Later calls are no-ops.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(filter);

        let res = match LogFormat::from_env() {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        };
        if let Err(err) = res {
            eprintln!("tracing already initialised: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing();
        init_tracing();
        tracing::info!("still logging");
    }
}
