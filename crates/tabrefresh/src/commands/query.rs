use clap::ArgMatches;
use tracing::{error, info};

use tabrefresh_protocol::{
    ClientMessage, ContentScriptState, DaemonMessage, RefreshMode, RefreshStateView, TabId,
    TabInfo, TimerInfo,
};

use super::helpers::{
    connect, format_count, format_seconds, new_request_id, print_ipc_error, request, tab_id,
    unexpected_response,
};
use crate::color;

pub(crate) fn handle_status_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    let json = matches.get_flag("json");
    info!(event = "cli.status_started", tab_id = %tab);

    let state = match request(&ClientMessage::GetRefreshState {
        id: new_request_id(),
        tab_id: tab,
    }) {
        Ok(DaemonMessage::RefreshState { state, .. }) => state,
        Ok(other) => return Err(unexpected_response(&other)),
        Err(e) => {
            print_ipc_error("read refresh state", &e);
            error!(event = "cli.status_failed", tab_id = %tab, error = %e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        for line in render_state(tab, &state) {
            println!("{}", line);
        }
    }

    info!(event = "cli.status_completed", tab_id = %tab, active = state.active);
    Ok(())
}

fn render_state(tab: TabId, state: &RefreshStateView) -> Vec<String> {
    let mut lines = vec![format!(
        "{} {}: {}{}",
        color::bold("Tab"),
        color::tab(&tab.to_string()),
        color::state(state.active),
        state
            .mode
            .map(|m| format!(" ({})", m))
            .unwrap_or_default()
    )];

    lines.push(format!(
        "  Refreshes: {}",
        format_count(state.count, "refresh", "refreshes")
    ));

    if let Some(settings) = &state.settings {
        lines.push(format!(
            "  Interval:  {} {}",
            settings.interval, settings.unit
        ));
        if state.mode == Some(RefreshMode::Conditional)
            && let Some(condition) = settings.condition_type
        {
            let value = settings
                .condition_value
                .as_deref()
                .map(|v| format!(" \"{}\"", v))
                .unwrap_or_default();
            lines.push(format!("  Condition: {}{}", condition, value));
        }
        if state.mode == Some(RefreshMode::Smart) {
            let days = settings.active_days.names().join(",");
            let window = if settings.time_range_enabled {
                format!(
                    " {}-{}",
                    settings.start_time.as_deref().unwrap_or("?"),
                    settings.end_time.as_deref().unwrap_or("?")
                )
            } else {
                String::new()
            };
            lines.push(format!("  Schedule:  {}{}", days, window));
        }
        if settings.continue_iteration {
            lines.push(format!("  {}", color::muted("Asks before each refresh")));
        }
    }

    if state.active {
        lines.push(format!("  Next in:   {}", render_timer(&state.timer_info)));
    }
    lines
}

fn render_timer(timer: &TimerInfo) -> String {
    format!(
        "{} of {} ({}% elapsed)",
        format_seconds(timer.remaining),
        format_seconds(timer.total),
        timer.percentage
    )
}

pub(crate) fn handle_countdown_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    let json = matches.get_flag("json");
    info!(event = "cli.countdown_started", tab_id = %tab);

    let timer = match request(&ClientMessage::GetCountdownInfo {
        id: new_request_id(),
        tab_id: tab,
    }) {
        Ok(DaemonMessage::CountdownInfo { timer_info, .. }) => timer_info,
        Ok(other) => return Err(unexpected_response(&other)),
        Err(e) => {
            print_ipc_error("read the countdown", &e);
            error!(event = "cli.countdown_failed", tab_id = %tab, error = %e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&timer)?);
    } else if timer.total == 0 {
        println!(
            "Tab {}: {}",
            color::tab(&tab.to_string()),
            color::muted("no countdown")
        );
    } else {
        println!(
            "Tab {}: next refresh in {}",
            color::tab(&tab.to_string()),
            render_timer(&timer)
        );
    }

    info!(event = "cli.countdown_completed", tab_id = %tab);
    Ok(())
}

#[derive(serde::Serialize)]
struct TabReport {
    tab: TabInfo,
    content_script: ContentScriptState,
}

pub(crate) fn handle_tab_command(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let tab = tab_id(matches)?;
    let json = matches.get_flag("json");
    info!(event = "cli.tab_started", tab_id = %tab);

    let report = match fetch_tab_report(tab) {
        Ok(report) => report,
        Err(e) => {
            print_ipc_error("read tab info", &e);
            error!(event = "cli.tab_failed", tab_id = %tab, error = %e);
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let info = &report.tab;
        println!(
            "{} {}",
            color::bold("Tab"),
            color::tab(&info.id.to_string())
        );
        println!("  Title:  {}", info.title.as_deref().unwrap_or("-"));
        println!("  URL:    {}", info.url.as_deref().unwrap_or("-"));
        println!("  Status: {}", info.status.as_deref().unwrap_or("-"));
        let page = &report.content_script;
        println!(
            "  Form protection:     {}",
            if page.form_protection { "on" } else { "off" }
        );
        if page.resource_monitoring {
            println!(
                "  Resource monitoring: {}",
                page.monitored_resources.join(", ")
            );
        } else {
            println!("  Resource monitoring: off");
        }
    }

    info!(event = "cli.tab_completed", tab_id = %tab);
    Ok(())
}

fn fetch_tab_report(tab: TabId) -> Result<TabReport, tabrefresh_protocol::IpcError> {
    let mut conn = connect()?;
    let info = match conn.send(&ClientMessage::GetTabInfo {
        id: new_request_id(),
        tab_id: tab,
    })? {
        DaemonMessage::TabInfo { tab, .. } => tab,
        other => return Err(protocol_mismatch(&other)),
    };
    let page = match conn.send(&ClientMessage::GetContentScriptState {
        id: new_request_id(),
        tab_id: tab,
    })? {
        DaemonMessage::ContentScriptState { state, .. } => state,
        other => return Err(protocol_mismatch(&other)),
    };
    Ok(TabReport {
        tab: info,
        content_script: page,
    })
}

fn protocol_mismatch(response: &DaemonMessage) -> tabrefresh_protocol::IpcError {
    tabrefresh_protocol::IpcError::ProtocolError {
        message: format!("unexpected response: {:?}", response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabrefresh_protocol::{ActiveDays, RefreshSettings, TimeUnit};

    #[test]
    fn test_render_inactive_state() {
        let lines = render_state(TabId::new(4), &RefreshStateView::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("inactive"));
        assert!(lines[1].contains("0 refreshes"));
    }

    #[test]
    fn test_render_smart_state() {
        let state = RefreshStateView {
            active: true,
            mode: Some(RefreshMode::Smart),
            count: 1,
            settings: Some(RefreshSettings {
                interval: 2,
                unit: TimeUnit::Minutes,
                active_days: ActiveDays::from_names(["sat", "sun"]).unwrap(),
                time_range_enabled: true,
                start_time: Some("08:00".to_string()),
                end_time: Some("12:00".to_string()),
                ..Default::default()
            }),
            timer_info: TimerInfo {
                remaining: 75,
                total: 120,
                unit: TimeUnit::Minutes,
                percentage: 37,
            },
        };
        let text = render_state(TabId::new(4), &state).join("\n");
        assert!(text.contains("(smart)"));
        assert!(text.contains("1 refresh\n"));
        assert!(text.contains("2 minutes"));
        assert!(text.contains("sat,sun 08:00-12:00"));
        assert!(text.contains("1m 15s of 2m 00s (37% elapsed)"));
    }
}
