//! # OS signal handling.
//!
//! [`SignalListener`] registers one listener per configured [`ExitSignal`]
//! up front, so a registration failure surfaces before any component starts,
//! and then completes on the first signal delivered.
//!
//! **Unix platforms:** every [`ExitSignal`] maps to its `SIGxxx` counterpart.
//!
//! **Other platforms:** only Ctrl-C is available; it is used when
//! [`ExitSignal::Interrupt`] is configured, every other signal is ignored.

use std::io;

use crate::core::ExitSignal;

/// Listens for the configured exit signals.
pub(crate) struct SignalListener {
    #[cfg(unix)]
    streams: Vec<(ExitSignal, tokio::signal::unix::Signal)>,
    #[cfg(not(unix))]
    ctrl_c: bool,
}

#[cfg(unix)]
impl SignalListener {
    /// Installs listeners for `signals`. Duplicates are ignored.
    pub(crate) fn register(signals: &[ExitSignal]) -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut streams = Vec::with_capacity(signals.len());
        for &sig in signals {
            if streams.iter().any(|(s, _)| *s == sig) {
                continue;
            }
            let kind = match sig {
                ExitSignal::Interrupt => SignalKind::interrupt(),
                ExitSignal::Terminate => SignalKind::terminate(),
                ExitSignal::Quit => SignalKind::quit(),
                ExitSignal::Hangup => SignalKind::hangup(),
                ExitSignal::User1 => SignalKind::user_defined1(),
                ExitSignal::User2 => SignalKind::user_defined2(),
            };
            streams.push((sig, signal(kind)?));
        }
        Ok(Self { streams })
    }

    /// Completes with the first delivered signal; never completes without listeners.
    ///
    /// Cancel-safe.
    pub(crate) async fn recv(&mut self) -> ExitSignal {
        if self.streams.is_empty() {
            return std::future::pending().await;
        }
        let waits = self.streams.iter_mut().map(|(sig, stream)| {
            let sig = *sig;
            Box::pin(async move {
                stream.recv().await;
                sig
            })
        });
        let (sig, _, _) = futures::future::select_all(waits).await;
        sig
    }
}

#[cfg(not(unix))]
impl SignalListener {
    /// Enables Ctrl-C handling when [`ExitSignal::Interrupt`] is configured.
    pub(crate) fn register(signals: &[ExitSignal]) -> io::Result<Self> {
        Ok(Self {
            ctrl_c: signals.contains(&ExitSignal::Interrupt),
        })
    }

    /// Completes on Ctrl-C; never completes when it is not configured.
    pub(crate) async fn recv(&mut self) -> ExitSignal {
        if self.ctrl_c && tokio::signal::ctrl_c().await.is_ok() {
            return ExitSignal::Interrupt;
        }
        std::future::pending().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn empty_set_never_fires() {
        let mut listener = SignalListener::register(&[]).unwrap();
        let res = tokio::time::timeout(Duration::from_millis(20), listener.recv()).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn reports_the_delivered_signal() {
        let mut listener =
            SignalListener::register(&[ExitSignal::User2, ExitSignal::User2, ExitSignal::Hangup])
                .unwrap();
        assert_eq!(listener.streams.len(), 2);

        // SAFETY: raising a signal that has a tokio handler installed above.
        unsafe {
            libc::raise(libc::SIGUSR2);
        }
        let sig = tokio::time::timeout(Duration::from_secs(2), listener.recv())
            .await
            .unwrap();
        assert_eq!(sig, ExitSignal::User2);
    }
}
