use clap::ArgMatches;
use tracing::{error, info};

use tabrefresh_protocol::{
    ActiveDays, ClientMessage, ConditionType, DaemonMessage, ErrorCode, IpcError,
    LiveSettingsPatch, RefreshMode, RefreshSettings, TimeUnit,
};

use super::helpers::{
    format_count, new_request_id, print_ipc_error, request, tab_id, unexpected_response,
};
use crate::color;

pub(crate) fn handle_start_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    info!(event = "cli.start_started", tab_id = %tab);

    let default_interval = match matches.get_one::<u64>("interval") {
        Some(_) => None,
        None => Some(saved_default_interval()?),
    };

    let (mode, settings) = match build_settings(matches, default_interval) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{} {}", color::error("Invalid options:"), msg);
            error!(event = "cli.start_failed", tab_id = %tab, error = %msg);
            return Err(msg.into());
        }
    };

    let message = ClientMessage::StartAutoRefresh {
        id: new_request_id(),
        tab_id: tab,
        mode,
        settings: settings.clone(),
    };

    match request(&message) {
        Ok(DaemonMessage::Ack { .. }) => {
            println!(
                "{} tab {} every {} {} ({})",
                color::running("Refreshing"),
                color::tab(&tab.to_string()),
                settings.interval,
                settings.unit,
                mode
            );
            if settings.continue_iteration {
                println!(
                    "  {}",
                    color::muted("The browser will ask before each further refresh.")
                );
            }
            info!(event = "cli.start_completed", tab_id = %tab, mode = %mode);
            Ok(())
        }
        Ok(other) => Err(unexpected_response(&other)),
        Err(e) => {
            print_ipc_error("start refreshing", &e);
            error!(event = "cli.start_failed", tab_id = %tab, error = %e);
            Err(e.into())
        }
    }
}

fn saved_default_interval() -> Result<u64, Box<dyn std::error::Error>> {
    match request(&ClientMessage::GetSettings {
        id: new_request_id(),
    }) {
        Ok(DaemonMessage::Settings { settings, .. }) => Ok(settings.default_interval),
        Ok(other) => Err(unexpected_response(&other)),
        Err(e) => {
            print_ipc_error("read the default interval", &e);
            error!(event = "cli.start_failed", error = %e);
            Err(e.into())
        }
    }
}

/// Turn `start` options into a mode and settings.
///
/// `default_interval` (seconds) applies when `--interval` was not given.
fn build_settings(
    matches: &ArgMatches,
    default_interval: Option<u64>,
) -> Result<(RefreshMode, RefreshSettings), String> {
    let mode = matches
        .get_one::<String>("mode")
        .map(|s| s.parse::<RefreshMode>())
        .transpose()?
        .unwrap_or_default();

    let mut settings = RefreshSettings::default();

    match (matches.get_one::<u64>("interval"), default_interval) {
        (Some(interval), _) => {
            settings.interval = *interval;
            if let Some(unit) = matches.get_one::<String>("unit") {
                settings.unit = unit.parse()?;
            }
        }
        (None, Some(fallback)) => {
            settings.interval = fallback;
            settings.unit = TimeUnit::Seconds;
        }
        (None, None) => {}
    }

    if let Some(condition) = matches.get_one::<String>("condition-type") {
        settings.condition_type = Some(condition.parse::<ConditionType>()?);
    }
    settings.condition_value = matches.get_one::<String>("condition-value").cloned();
    settings.selector = matches.get_one::<String>("selector").cloned();

    if let Some(days) = matches.get_many::<String>("days") {
        settings.active_days = ActiveDays::from_names(days.map(String::as_str))?;
    }
    if let (Some(from), Some(to)) = (
        matches.get_one::<String>("from"),
        matches.get_one::<String>("to"),
    ) {
        settings.time_range_enabled = true;
        settings.start_time = Some(from.clone());
        settings.end_time = Some(to.clone());
    }

    settings.continue_iteration = matches.get_flag("continue-iteration");
    settings.form_protection = matches.get_flag("form-protection");
    if let Some(patterns) = matches.get_many::<String>("monitor") {
        settings.monitored_resources = patterns
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        settings.enable_resource_monitoring = !settings.monitored_resources.is_empty();
    }

    Ok((mode, settings))
}

pub(crate) fn handle_stop_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    info!(event = "cli.stop_started", tab_id = %tab);

    match request(&ClientMessage::StopAutoRefresh {
        id: new_request_id(),
        tab_id: tab,
    }) {
        Ok(_) => {
            println!(
                "{} refreshing tab {}",
                color::paused("Stopped"),
                color::tab(&tab.to_string())
            );
            info!(event = "cli.stop_completed", tab_id = %tab);
            Ok(())
        }
        Err(e) => {
            print_ipc_error("stop refreshing", &e);
            error!(event = "cli.stop_failed", tab_id = %tab, error = %e);
            Err(e.into())
        }
    }
}

pub(crate) fn handle_reset_count_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    info!(event = "cli.reset_count_started", tab_id = %tab);

    match request(&ClientMessage::ResetRefreshCount {
        id: new_request_id(),
        tab_id: tab,
    }) {
        Ok(DaemonMessage::CountReset { count, .. }) => {
            println!(
                "Tab {} counter reset ({})",
                color::tab(&tab.to_string()),
                format_count(count, "refresh", "refreshes")
            );
            info!(event = "cli.reset_count_completed", tab_id = %tab);
            Ok(())
        }
        Ok(other) => Err(unexpected_response(&other)),
        Err(e) => {
            print_ipc_error("reset the counter", &e);
            error!(event = "cli.reset_count_failed", tab_id = %tab, error = %e);
            Err(e.into())
        }
    }
}

pub(crate) fn handle_iterate_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    let enabled = matches.get_flag("on");
    info!(event = "cli.iterate_started", tab_id = %tab, enabled = enabled);

    match request(&ClientMessage::UpdateIterationSetting {
        id: new_request_id(),
        tab_id: tab,
        continue_iteration: enabled,
    }) {
        Ok(_) => {
            let what = if enabled {
                "will ask before each refresh"
            } else {
                "will refresh without asking"
            };
            println!("Tab {} {}", color::tab(&tab.to_string()), what);
            info!(event = "cli.iterate_completed", tab_id = %tab);
            Ok(())
        }
        Err(e) => {
            print_ipc_error("update the iteration setting", &e);
            error!(event = "cli.iterate_failed", tab_id = %tab, error = %e);
            Err(e.into())
        }
    }
}

pub(crate) fn handle_live_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    let patch = live_patch(matches);
    if patch == LiveSettingsPatch::default() {
        eprintln!("{} nothing to change", color::warning("Warning:"));
        eprintln!(
            "  {}",
            color::hint("Pass --form-protection, --resource-monitoring or --monitor.")
        );
        return Err("No settings given".into());
    }
    info!(event = "cli.live_started", tab_id = %tab);

    match request(&ClientMessage::UpdateLiveSettings {
        id: new_request_id(),
        tab_id: tab,
        patch,
    }) {
        Ok(_) => {
            println!("Tab {} settings updated", color::tab(&tab.to_string()));
            info!(event = "cli.live_completed", tab_id = %tab);
            Ok(())
        }
        Err(e) => {
            print_ipc_error("update live settings", &e);
            if let IpcError::DaemonError {
                code: ErrorCode::RestartRequired,
                ..
            } = &e
            {
                eprintln!(
                    "  {}",
                    color::hint("Run 'tabrefresh start' again with the new values.")
                );
            }
            error!(event = "cli.live_failed", tab_id = %tab, error = %e);
            Err(e.into())
        }
    }
}

fn live_patch(matches: &ArgMatches) -> LiveSettingsPatch {
    let monitored_resources = matches.get_many::<String>("monitor").map(|patterns| {
        patterns
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
    });
    LiveSettingsPatch {
        interval: matches.get_one::<u64>("interval").copied(),
        form_protection: matches.get_one::<bool>("form-protection").copied(),
        enable_resource_monitoring: matches.get_one::<bool>("resource-monitoring").copied(),
        monitored_resources,
        ..Default::default()
    }
}

pub(crate) fn handle_rearm_command() -> Result<(), Box<dyn std::error::Error>> {
    info!(event = "cli.rearm_started");

    match request(&ClientMessage::ForceRefreshTimers {
        id: new_request_id(),
    }) {
        Ok(_) => {
            println!("Countdowns restarted");
            info!(event = "cli.rearm_completed");
            Ok(())
        }
        Err(e) => {
            print_ipc_error("restart countdowns", &e);
            error!(event = "cli.rearm_failed", error = %e);
            Err(e.into())
        }
    }
}
