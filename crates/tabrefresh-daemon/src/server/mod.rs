pub mod bridge;
pub mod connection;
pub mod shutdown;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tabrefresh_config::TabRefreshConfig;
use tabrefresh_core::{
    Coordinator, CoordinatorOptions, HostServices, JsonFileStore, SystemClock,
};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

use crate::errors::DaemonError;
use crate::pid::PidFile;
use crate::types::DaemonConfig;

pub use bridge::HostBridge;

/// Shared by every connection task.
pub struct ServerContext {
    pub coordinator: Coordinator,
    pub bridge: Arc<HostBridge>,
    pub shutdown: CancellationToken,
}

impl ServerContext {
    /// Wire a coordinator to the bridge, backed by the state file.
    pub fn open(config: &DaemonConfig, app_config: &TabRefreshConfig) -> Result<Self, DaemonError> {
        let store = JsonFileStore::open(&config.state_path)?;
        let bridge = Arc::new(HostBridge::default());
        let host = HostServices {
            tabs: bridge.clone(),
            prompter: bridge.clone(),
            notifier: bridge.clone(),
        };
        let coordinator = Coordinator::new(
            host,
            Arc::new(store),
            Arc::new(SystemClock),
            CoordinatorOptions::from_config(app_config),
        );
        Ok(Self {
            coordinator,
            bridge,
            shutdown: CancellationToken::new(),
        })
    }
}

/// Run the daemon server.
///
/// This is the main entrypoint called by `tabrefresh daemon start`. It:
/// 1. Claims the PID file (fails if another daemon is alive)
/// 2. Opens the state file and builds the coordinator
/// 3. Binds the Unix socket
/// 4. Accepts client connections until SIGTERM/SIGINT or `daemon_stop`
/// 5. Disarms every trigger and waits for connections to drain
pub async fn run_server(
    config: DaemonConfig,
    app_config: TabRefreshConfig,
) -> Result<(), DaemonError> {
    let socket_path = config.socket_path.clone();

    let pid_file = PidFile::acquire(&config.pid_path)?;
    let ctx = Arc::new(ServerContext::open(&config, &app_config)?);

    // Clean up stale socket file
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(&socket_path)?;

    info!(
        event = "daemon.server.started",
        pid = std::process::id(),
        socket = %socket_path.display(),
        state = %config.state_path.display(),
    );

    let signal_shutdown = ctx.shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = shutdown::wait_for_shutdown_signal(signal_shutdown).await {
            error!(
                event = "daemon.server.signal_handler_failed",
                error = %e,
                "Signal handler failed; use 'tabrefresh daemon stop' to shut down.",
            );
        }
    });

    let connections = TaskTracker::new();
    let next_connection_id = AtomicU64::new(1);

    loop {
        tokio::select! {
            accept = listener.accept() => {
                match accept {
                    Ok((stream, _addr)) => {
                        let id = next_connection_id.fetch_add(1, Ordering::Relaxed);
                        connections.spawn(connection::handle_connection(stream, ctx.clone(), id));
                    }
                    Err(e) => {
                        error!(event = "daemon.server.accept_failed", error = %e);
                        // Avoid spinning on EMFILE and friends.
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
            _ = ctx.shutdown.cancelled() => {
                info!(event = "daemon.server.shutdown_started");
                break;
            }
        }
    }

    drop(listener);
    ctx.coordinator.shutdown();

    connections.close();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, connections.wait()).await.is_err() {
        warn!(
            event = "daemon.server.drain_timed_out",
            timeout_secs = config.shutdown_timeout_secs,
            remaining = connections.len(),
        );
    }

    remove_socket(&socket_path);
    drop(pid_file);

    info!(event = "daemon.server.shutdown_completed");
    Ok(())
}

fn remove_socket(socket_path: &Path) {
    if socket_path.exists()
        && let Err(e) = std::fs::remove_file(socket_path)
    {
        error!(event = "daemon.server.socket_cleanup_failed", error = %e);
    }
}
