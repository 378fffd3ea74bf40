//! # LogWriter: events rendered through `tracing`
//!
//! Every event becomes one `tracing::debug!` line under the `compvisor::events`
//! target, so the full lifecycle trace can be switched on with
//! `RUST_LOG=compvisor::events=debug` without touching the orchestrator's own
//! `info`-level milestones.
//!
//! ## Example output
//! ```text
//! DEBUG compvisor::events: initializing seq=0 component="http" index=0
//! DEBUG compvisor::events: start failed seq=7 component="consumer" index=2 reason="broker gone"
//! DEBUG compvisor::events: health pending seq=9 component="migrate" attempt=1 delay_ms=100
//! DEBUG compvisor::events: drain completed seq=15 reason=None
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs every event at `debug` level.
#[derive(Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn label(kind: EventKind) -> &'static str {
        match kind {
            EventKind::Initializing => "initializing",
            EventKind::Initialized => "initialized",
            EventKind::InitFailed => "init failed",
            EventKind::Starting => "starting",
            EventKind::Exited => "exited",
            EventKind::StartFailed => "start failed",
            EventKind::ShutdownRequested => "shutdown requested",
            EventKind::Stopping => "stopping",
            EventKind::Stopped => "stopped",
            EventKind::StopFailed => "stop failed",
            EventKind::DrainCompleted => "drain completed",
            EventKind::HealthPending => "health pending",
            EventKind::SubscriberOverflow => "subscriber overflow",
            EventKind::SubscriberPanicked => "subscriber panicked",
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        tracing::debug!(
            target: "compvisor::events",
            seq = e.seq,
            component = ?e.component,
            index = ?e.index,
            attempt = ?e.attempt,
            delay_ms = ?e.delay_ms,
            reason = ?e.reason,
            "{}",
            Self::label(e.kind)
        );
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
