use tabrefresh_config::TabRefreshConfig;
use tracing::{error, info, warn};

fn main() {
    tabrefresh_core::init_logging(false);
    info!(event = "daemon.start_started");

    let exit_code = match run() {
        Ok(()) => {
            info!(event = "daemon.start_completed");
            0
        }
        Err(e) => {
            error!(event = "daemon.start_failed", error = %e);
            eprintln!("tabrefresh-daemon: {}", e);
            1
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!(
        "Starting daemon in foreground (PID: {})...",
        std::process::id()
    );

    let config = tabrefresh_daemon::load_daemon_config()?;
    let app_config = match TabRefreshConfig::load_hierarchy() {
        Ok(app_config) => app_config,
        Err(e) => {
            warn!(event = "daemon.config.load_failed", error = %e);
            TabRefreshConfig::default()
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(tabrefresh_daemon::run_server(config, app_config))?;
    Ok(())
}
