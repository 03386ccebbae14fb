//! Termination signal handling
//!
//! pingz has no drain protocol: in-flight checks are dropped and the
//! process exits once a termination signal arrives.

use tracing::info;

/// Wait for SIGTERM or SIGINT signal
///
/// Returns the signal name that was received.
///
/// # Errors
/// Fails if signal handlers cannot be registered (OS resource exhaustion).
#[cfg(unix)]
pub async fn wait_for_signal() -> Result<&'static str, std::io::Error> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!(signal = name, "Received termination signal");
    Ok(name)
}

/// Wait for Ctrl+C signal (non-unix)
#[cfg(not(unix))]
pub async fn wait_for_signal() -> Result<&'static str, std::io::Error> {
    tokio::signal::ctrl_c().await?;
    info!(signal = "CTRL_C", "Received termination signal");
    Ok("CTRL_C")
}
