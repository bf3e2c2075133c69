//! Shutdown signal handling
//!
//! The service wants to know which signal ended it: operators send
//! SIGTERM on redeploys and SIGINT from a terminal, and the drain log
//! line should say which it was.

use std::fmt;

/// Which signal asked the process to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Ctrl+C / SIGINT
    Interrupt,
    /// SIGTERM (Unix only)
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Wait until the process is asked to stop and report the signal.
///
/// ```ignore
/// let signal = oncall_common::shutdown::wait_for_shutdown().await;
/// info!("{} received, draining workers", signal);
/// ```
pub async fn wait_for_shutdown() -> ShutdownSignal {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
        _ = sigterm() => ShutdownSignal::Terminate,
    }
}

/// Resolves when SIGTERM arrives; pends forever where it does not
/// exist or its handler cannot be installed.
#[cfg(unix)]
async fn sigterm() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!("SIGTERM handler unavailable ({}), Ctrl+C only", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn sigterm() {
    std::future::pending::<()>().await;
}
