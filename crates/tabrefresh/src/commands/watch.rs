use chrono::{DateTime, Local};
use clap::ArgMatches;
use tracing::{error, info};

use tabrefresh_protocol::{ClientMessage, DaemonMessage, IpcError, TabId};

use super::helpers::{connect, format_seconds, new_request_id, print_ipc_error};
use crate::color;

pub(crate) fn handle_watch_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    let only_tab = matches.get_one::<i64>("tab").map(|id| TabId::new(*id));
    let json = matches.get_flag("json");
    info!(event = "cli.watch_started", tab_id = ?only_tab.map(TabId::get));

    let mut conn = match connect().and_then(|mut conn| {
        conn.send(&ClientMessage::Subscribe {
            id: new_request_id(),
        })?;
        conn.set_read_timeout(None)?;
        Ok(conn)
    }) {
        Ok(conn) => conn,
        Err(e) => {
            print_ipc_error("subscribe to events", &e);
            error!(event = "cli.watch_failed", error = %e);
            return Err(e.into());
        }
    };

    if !json {
        eprintln!("{}", color::hint("Watching refresh events (Ctrl-C to stop)"));
    }

    loop {
        let event = match conn.recv() {
            Ok(event) => event,
            // The daemon closes subscribers on shutdown.
            Err(IpcError::ProtocolError { .. }) => {
                if !json {
                    eprintln!("{}", color::hint("Daemon closed the connection"));
                }
                info!(event = "cli.watch_completed");
                return Ok(());
            }
            Err(e) => {
                print_ipc_error("read events", &e);
                error!(event = "cli.watch_failed", error = %e);
                return Err(e.into());
            }
        };

        let Some(tab) = event_tab(&event) else {
            continue;
        };
        if only_tab.is_some_and(|wanted| wanted != tab) {
            continue;
        }

        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else if let Some(line) = render_event(&event) {
            println!(
                "{} tab {} {}",
                color::muted(&Local::now().format("%H:%M:%S").to_string()),
                color::tab(&tab.to_string()),
                line
            );
        }
    }
}

fn event_tab(event: &DaemonMessage) -> Option<TabId> {
    match event {
        DaemonMessage::UpdateRefreshCount { tab_id, .. }
        | DaemonMessage::TimerReset { tab_id, .. }
        | DaemonMessage::AutoRefreshStopped { tab_id }
        | DaemonMessage::ConditionalCheckResult { tab_id, .. }
        | DaemonMessage::SmartScheduleStatus { tab_id, .. } => Some(*tab_id),
        _ => None,
    }
}

fn render_event(event: &DaemonMessage) -> Option<String> {
    let line = match event {
        DaemonMessage::UpdateRefreshCount { count, .. } => {
            format!("{} (#{})", color::running("refreshed"), count)
        }
        DaemonMessage::TimerReset {
            next_refresh,
            timer_info,
            ..
        } => {
            let at = DateTime::from_timestamp_millis(*next_refresh)
                .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "?".to_string());
            format!(
                "next refresh at {} (in {})",
                at,
                format_seconds(timer_info.remaining)
            )
        }
        DaemonMessage::AutoRefreshStopped { .. } => color::paused("stopped"),
        DaemonMessage::ConditionalCheckResult {
            should_refresh,
            reason,
            ..
        } => format!("condition: {} ({})", color::verdict(*should_refresh), reason),
        DaemonMessage::SmartScheduleStatus {
            should_refresh,
            reason,
            ..
        } => format!("schedule: {} ({})", color::verdict(*should_refresh), reason),
        _ => return None,
    };
    Some(line)
}
