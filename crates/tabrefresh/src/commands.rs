use clap::ArgMatches;
use tracing::{debug, error};

mod config;
mod daemon;
mod helpers;
mod query;
mod refresh;
mod settings;
mod watch;

pub fn run_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    debug!(
        event = "cli.app.startup_completed",
        version = env!("CARGO_PKG_VERSION")
    );

    match matches.subcommand() {
        Some(("start", sub_matches)) => refresh::handle_start_command(sub_matches),
        Some(("stop", sub_matches)) => refresh::handle_stop_command(sub_matches),
        Some(("reset-count", sub_matches)) => refresh::handle_reset_count_command(sub_matches),
        Some(("iterate", sub_matches)) => refresh::handle_iterate_command(sub_matches),
        Some(("live", sub_matches)) => refresh::handle_live_command(sub_matches),
        Some(("rearm", _)) => refresh::handle_rearm_command(),
        Some(("status", sub_matches)) => query::handle_status_command(sub_matches),
        Some(("countdown", sub_matches)) => query::handle_countdown_command(sub_matches),
        Some(("tab", sub_matches)) => query::handle_tab_command(sub_matches),
        Some(("watch", sub_matches)) => watch::handle_watch_command(sub_matches),
        Some(("settings", sub_matches)) => settings::handle_settings_command(sub_matches),
        Some(("config", sub_matches)) => config::handle_config_command(sub_matches),
        Some(("daemon", sub_matches)) => daemon::handle_daemon_command(sub_matches),
        _ => {
            error!(event = "cli.command_unknown");
            Err("Unknown command".into())
        }
    }
}
