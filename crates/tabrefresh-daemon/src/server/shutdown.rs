use tokio_util::sync::CancellationToken;
use tracing::info;

/// Cancel `token` on SIGTERM or SIGINT, or when it is cancelled elsewhere.
///
/// Fails only if the signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal(token: CancellationToken) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!(event = "daemon.server.signal_received", signal = "SIGINT");
        }
        _ = sigterm.recv() => {
            info!(event = "daemon.server.signal_received", signal = "SIGTERM");
        }
        _ = token.cancelled() => return Ok(()),
    }

    token.cancel();
    Ok(())
}
