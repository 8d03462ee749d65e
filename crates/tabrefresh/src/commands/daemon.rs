use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use clap::ArgMatches;
use tracing::{debug, error, info, warn};

use tabrefresh_daemon::pid::{check_daemon_running, read_pid_file};
use tabrefresh_protocol::{ClientMessage, IpcError};

use super::helpers::{
    daemon_config, find_sibling_binary, new_request_id, ping, print_ipc_error, request,
};
use crate::color;

const READY_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub(crate) fn handle_daemon_command(
    matches: &ArgMatches,
) -> Result<(), Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("start", sub)) => handle_daemon_start(sub),
        Some(("stop", sub)) => handle_daemon_stop(sub),
        Some(("status", sub)) => handle_daemon_status(sub),
        _ => Err("Unknown daemon subcommand".into()),
    }
}

fn handle_daemon_start(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let foreground = matches.get_flag("foreground");
    info!(event = "cli.daemon.start_started", foreground = foreground);

    let config = daemon_config();
    if ping() {
        match read_pid_file(&config.pid_path) {
            Some(pid) => println!("Daemon already running (PID: {})", pid),
            None => println!("Daemon already running"),
        }
        return Ok(());
    }

    let daemon_binary = find_sibling_binary("tabrefresh-daemon")?;

    if foreground {
        let status = Command::new(&daemon_binary)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| format!("Failed to start daemon: {}", e))?;

        if !status.success() {
            error!(event = "cli.daemon.start_failed", exit_code = ?status.code());
            return Err(format!("Daemon exited with {}", status).into());
        }
        info!(event = "cli.daemon.start_completed");
        return Ok(());
    }

    let mut child = Command::new(&daemon_binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Failed to start daemon: {}", e))?;
    debug!(event = "cli.daemon.spawn_completed", pid = child.id());

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                error!(event = "cli.daemon.start_failed", reason = "child_exited", status = %status);
                eprintln!(
                    "{} daemon exited with {} before becoming ready",
                    color::error("Error:"),
                    status
                );
                eprintln!(
                    "  {}",
                    color::hint("Try: tabrefresh daemon start --foreground  (to see startup errors)")
                );
                return Err(format!("Daemon exited with {}", status).into());
            }
            Ok(None) => {}
            Err(e) => debug!(event = "cli.daemon.child_status_check_failed", error = %e),
        }

        if config.socket_path.exists() && ping() {
            break;
        }
        if start.elapsed() > READY_TIMEOUT {
            eprintln!(
                "{} daemon started but its socket is not available after 5s",
                color::error("Error:")
            );
            eprintln!(
                "  {}",
                color::hint("Try: tabrefresh daemon start --foreground  (to see startup errors)")
            );
            return Err("Daemon socket not available after 5s".into());
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    match read_pid_file(&config.pid_path) {
        Some(pid) => {
            println!("Daemon started (PID: {})", pid);
            info!(event = "cli.daemon.start_completed", pid = pid);
        }
        None => {
            warn!(event = "cli.daemon.pid_read_failed", path = %config.pid_path.display());
            println!("Daemon started (PID unknown)");
            info!(event = "cli.daemon.start_completed");
        }
    }
    Ok(())
}

fn handle_daemon_stop(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let save_state = matches.get_flag("save-state");
    info!(event = "cli.daemon.stop_started", save_state = save_state);

    let config = daemon_config();
    match request(&ClientMessage::DaemonStop {
        id: new_request_id(),
        save_state,
    }) {
        Ok(_) => {
            let start = Instant::now();
            loop {
                if !config.pid_path.exists() {
                    println!("Daemon stopped");
                    if save_state {
                        println!(
                            "{}",
                            color::muted("Running refreshes saved for the next daemon.")
                        );
                    }
                    info!(event = "cli.daemon.stop_completed");
                    return Ok(());
                }
                if start.elapsed() > READY_TIMEOUT {
                    eprintln!(
                        "{} daemon did not stop gracefully after 5s",
                        color::error("Error:")
                    );
                    error!(event = "cli.daemon.stop_failed", reason = "timeout");
                    return Err("Daemon stop timed out".into());
                }
                std::thread::sleep(POLL_INTERVAL);
            }
        }
        Err(IpcError::NotRunning { .. }) => {
            println!("Daemon is not running");
            Ok(())
        }
        Err(e) => {
            print_ipc_error("stop the daemon", &e);
            error!(event = "cli.daemon.stop_failed", error = %e);
            Err(e.into())
        }
    }
}

fn handle_daemon_status(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let json = matches.get_flag("json");
    info!(event = "cli.daemon.status_started");

    let config = daemon_config();
    let running = ping();
    let pid = if running {
        check_daemon_running(&config.pid_path)
    } else {
        None
    };

    if json {
        let status = if running {
            serde_json::json!({
                "running": true,
                "pid": pid,
                "socket": config.socket_path.display().to_string(),
            })
        } else {
            serde_json::json!({ "running": false })
        };
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if running {
        match pid {
            Some(pid) => println!("Daemon: {} (PID: {})", color::running("running"), pid),
            None => println!("Daemon: {} (PID unknown)", color::running("running")),
        }
        println!("Socket: {}", config.socket_path.display());
    } else {
        println!("Daemon: {}", color::muted("stopped"));
    }

    info!(event = "cli.daemon.status_completed", running = running);
    Ok(())
}
