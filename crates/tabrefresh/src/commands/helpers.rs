use std::path::PathBuf;

use clap::ArgMatches;
use tracing::warn;

use tabrefresh_daemon::DaemonConfig;
use tabrefresh_protocol::{ClientMessage, DaemonMessage, ErrorCode, IpcConnection, IpcError, TabId};

use crate::color;

/// The daemon's `[daemon]` settings, defaulted when they are invalid.
pub fn daemon_config() -> DaemonConfig {
    match tabrefresh_daemon::load_daemon_config() {
        Ok(config) => config,
        Err(e) => {
            warn!(event = "cli.daemon_config.load_failed", error = %e);
            DaemonConfig::default()
        }
    }
}

pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Positional tab id shared by the per-tab commands.
pub fn tab_id(matches: &ArgMatches) -> Result<TabId, Box<dyn std::error::Error>> {
    let id = matches
        .get_one::<i64>("tab")
        .ok_or("Tab argument is required")?;
    Ok(TabId::new(*id))
}

pub fn connect() -> Result<IpcConnection, IpcError> {
    IpcConnection::connect(&daemon_config().socket_path)
}

/// One request on a fresh connection.
pub fn request(message: &ClientMessage) -> Result<DaemonMessage, IpcError> {
    connect()?.send(message)
}

pub fn ping() -> bool {
    request(&ClientMessage::Ping {
        id: new_request_id(),
    })
    .is_ok()
}

/// Print a failed daemon request to stderr, with a hint where one helps.
pub fn print_ipc_error(action: &str, e: &IpcError) {
    eprintln!("{} {}", color::error(&format!("Failed to {}:", action)), e);
    match e {
        IpcError::NotRunning { .. } => {
            eprintln!("  {}", color::hint("Start it with: tabrefresh daemon start"));
        }
        IpcError::DaemonError {
            code: ErrorCode::NoActiveSession,
            ..
        } => {
            eprintln!(
                "  {}",
                color::hint("Start one with: tabrefresh start <TAB> --interval <N>")
            );
        }
        IpcError::DaemonError {
            code: ErrorCode::HostUnavailable,
            ..
        } => {
            eprintln!(
                "  {}",
                color::hint("No browser is connected to the daemon.")
            );
        }
        _ => {}
    }
}

pub fn unexpected_response(response: &DaemonMessage) -> Box<dyn std::error::Error> {
    format!("Unexpected daemon response: {:?}", response).into()
}

/// Path of a binary installed next to this one.
pub fn find_sibling_binary(binary_name: &str) -> Result<PathBuf, String> {
    let our_binary =
        std::env::current_exe().map_err(|e| format!("could not determine binary path: {}", e))?;
    let bin_dir = our_binary
        .parent()
        .ok_or_else(|| format!("binary has no parent directory: {}", our_binary.display()))?;
    let sibling = bin_dir.join(binary_name);
    if !sibling.exists() {
        return Err(format!(
            "{} binary not found at {}",
            binary_name,
            sibling.display()
        ));
    }
    Ok(sibling)
}

/// `1 refresh` / `3 refreshes`.
pub fn format_count(n: u64, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else {
        format!("{} {}", n, plural)
    }
}

/// Human form of a whole-second duration: `45s`, `2m 05s`, `1h 00m`.
pub fn format_seconds(secs: u64) -> String {
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60),
    }
}
