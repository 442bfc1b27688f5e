//! Shutdown signal handling.
//!
//! On Unix the process listens for SIGINT, SIGTERM and SIGQUIT, with
//! [`tokio::signal::ctrl_c`] awaited as a fallback. Elsewhere only ctrl-c is
//! awaited.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Cancel `cancel` when the process is asked to stop
///
/// The returned task also finishes if the token is cancelled some other way.
pub fn cancel_on_signal(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {}

            result = wait_for_shutdown_signal() => {
                match result {
                    Ok(()) => {
                        tracing::debug!("shutdown signal received");
                        cancel.cancel();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to install signal handlers");
                        cancel.cancelled().await;
                    }
                }
            }
        }
    })
}
