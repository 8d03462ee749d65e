use clap::ArgMatches;
use tracing::{error, info};

use tabrefresh_config::{CONFIG_ENV_VAR, TabRefreshConfig};
use tabrefresh_paths::TabRefreshPaths;

use crate::color;

pub(crate) fn handle_config_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("check", _)) => handle_config_check(),
        Some(("path", _)) => handle_config_path(),
        _ => Err("Unknown config subcommand".into()),
    }
}

fn handle_config_check() -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.config.check_started");

    let config = match TabRefreshConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", color::error("Config invalid:"), e);
            error!(event = "cli.config.check_failed", error = %e);
            return Err(e);
        }
    };

    if let Err(e) = tabrefresh_daemon::load_daemon_config() {
        eprintln!("{} {}", color::error("Config invalid:"), e);
        error!(event = "cli.config.check_failed", error = %e);
        return Err(e.into());
    }

    let settings = config.global_settings();
    println!("{} configuration is valid", color::running("OK"));
    println!(
        "  Default interval: {}s, confirm refresh: {}",
        settings.default_interval, settings.confirm_refresh
    );
    info!(event = "cli.config.check_completed");
    Ok(())
}

fn handle_config_path() -> Result<(), Box<dyn std::error::Error>> {
    let paths = TabRefreshPaths::resolve()?;
    println!("{}", paths.user_config().display());
    if let Ok(extra) = std::env::var(CONFIG_ENV_VAR)
        && !extra.trim().is_empty()
    {
        println!("{} (from ${})", extra, CONFIG_ENV_VAR);
    }
    Ok(())
}
