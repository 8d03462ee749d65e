use clap::ArgMatches;
use tracing::{error, info};

use tabrefresh_protocol::{ClientMessage, DaemonMessage, GlobalSettings, IpcError};

use super::helpers::{connect, new_request_id, print_ipc_error};
use crate::color;

pub(crate) fn handle_settings_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let json = matches.get_flag("json");
    let reload = matches.get_flag("reload");
    info!(event = "cli.settings_started", reload = reload);

    let settings = match exchange(matches, reload) {
        Ok(settings) => settings,
        Err(e) => {
            print_ipc_error("update settings", &e);
            error!(event = "cli.settings_failed", error = %e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&settings)?);
    } else {
        print_settings(&settings);
        if reload {
            println!(
                "{}",
                color::muted("Running refreshes saved; they resume when the browser reconnects.")
            );
        }
    }

    info!(event = "cli.settings_completed");
    Ok(())
}

/// Fetch the settings and, when any setter was given, save the edited copy.
fn exchange(matches: &ArgMatches, reload: bool) -> Result<GlobalSettings, IpcError> {
    let mut conn = connect()?;
    let current = match conn.send(&ClientMessage::GetSettings {
        id: new_request_id(),
    })? {
        DaemonMessage::Settings { settings, .. } => settings,
        other => {
            return Err(IpcError::ProtocolError {
                message: format!("unexpected response: {:?}", other),
            });
        }
    };

    let edited = apply_overrides(current.clone(), matches);
    if edited == current && !reload {
        return Ok(current);
    }

    match conn.send(&ClientMessage::SettingsUpdated {
        id: new_request_id(),
        settings: edited,
        reload,
    })? {
        DaemonMessage::Settings { settings, .. } => Ok(settings),
        other => Err(IpcError::ProtocolError {
            message: format!("unexpected response: {:?}", other),
        }),
    }
}

fn apply_overrides(mut settings: GlobalSettings, matches: &ArgMatches) -> GlobalSettings {
    if let Some(interval) = matches.get_one::<u64>("default-interval") {
        settings.default_interval = *interval;
    }
    if let Some(confirm) = matches.get_one::<bool>("confirm-refresh") {
        settings.confirm_refresh = *confirm;
    }
    if let Some(monitoring) = matches.get_one::<bool>("resource-monitoring") {
        settings.enable_resource_monitoring = *monitoring;
    }
    if let Some(notify) = matches.get_one::<bool>("notifications") {
        settings.show_notifications = *notify;
    }
    settings
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn print_settings(s: &GlobalSettings) {
    println!("{}", color::bold("Global settings"));
    println!("  Default interval:    {}s", s.default_interval);
    println!("  Confirm refresh:     {}", on_off(s.confirm_refresh));
    println!(
        "  Resource monitoring: {} (every {}s)",
        on_off(s.enable_resource_monitoring),
        s.resource_check_interval
    );
    println!("  Notifications:       {}", on_off(s.show_notifications));
    println!("  Sound effects:       {}", on_off(s.enable_sound_effects));
    println!("  Ticking sound:       {}", on_off(s.enable_ticking_sound));
    println!("  Resume on startup:   {}", on_off(s.startup_refresh_mode));
    println!("  Language:            {}", s.language);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_matches(args: &[&str]) -> ArgMatches {
        let mut argv = vec!["tabrefresh", "settings"];
        argv.extend_from_slice(args);
        crate::app::build_cli()
            .try_get_matches_from(argv)
            .unwrap()
            .subcommand_matches("settings")
            .unwrap()
            .clone()
    }

    #[test]
    fn test_no_overrides_keeps_settings() {
        let base = GlobalSettings::default();
        let edited = apply_overrides(base.clone(), &settings_matches(&[]));
        assert_eq!(edited, base);
    }

    #[test]
    fn test_overrides_apply() {
        let base = GlobalSettings::default();
        let edited = apply_overrides(
            base.clone(),
            &settings_matches(&[
                "--default-interval",
                "120",
                "--confirm-refresh",
                "true",
                "--resource-monitoring",
                "false",
            ]),
        );
        assert_eq!(edited.default_interval, 120);
        assert!(edited.confirm_refresh);
        assert!(!edited.enable_resource_monitoring);
        assert_eq!(edited.language, base.language);
    }
}
