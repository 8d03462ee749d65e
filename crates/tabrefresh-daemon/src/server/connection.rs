use std::sync::Arc;

use tabrefresh_core::{Coordinator, CoordinatorError, RefreshError};
use tabrefresh_protocol::{ClientMessage, DaemonMessage, ErrorCode, RefreshMode};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::net::unix::OwnedWriteHalf;
use tokio::sync::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ServerContext;
use crate::errors::DaemonError;
use crate::protocol::{read_message, write_message};

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

/// Serve one client until it disconnects or the daemon shuts down.
pub async fn handle_connection(stream: UnixStream, ctx: Arc<ServerContext>, connection_id: u64) {
    info!(event = "daemon.connection.accepted", connection_id = connection_id);

    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let writer: SharedWriter = Arc::new(Mutex::new(write_half));
    // Cancels the forwarding tasks this connection spawns.
    let closed = ctx.shutdown.child_token();
    let mut is_host = false;

    loop {
        let msg: ClientMessage = tokio::select! {
            read = read_message(&mut reader) => match read {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(DaemonError::ProtocolError(message)) => {
                    warn!(
                        event = "daemon.connection.invalid_message",
                        connection_id = connection_id,
                        error = %message,
                    );
                    let reply = DaemonMessage::Error {
                        id: String::new(),
                        code: ErrorCode::ProtocolError,
                        message,
                    };
                    if send(&writer, &reply).await.is_err() {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    debug!(
                        event = "daemon.connection.read_failed",
                        connection_id = connection_id,
                        error = %e,
                    );
                    break;
                }
            },
            _ = closed.cancelled() => break,
        };

        if let ClientMessage::HostReply { call_id, reply } = msg {
            ctx.bridge.resolve(&call_id, reply);
            continue;
        }

        if let ClientMessage::RegisterHost { ref id } = msg {
            let calls = ctx.bridge.register_host(connection_id);
            is_host = true;
            tokio::spawn(forward_host_calls(calls, writer.clone(), closed.clone()));
            let ack = DaemonMessage::Ack { id: id.clone() };
            if send(&writer, &ack).await.is_err() {
                break;
            }
            // Restoring and pruning make host calls, answered on this very connection.
            tokio::spawn(restore_sessions(ctx.coordinator.clone()));
            continue;
        }

        if let ClientMessage::Subscribe { ref id } = msg {
            let pushes = ctx.bridge.subscribe();
            tokio::spawn(forward_pushes(
                pushes,
                writer.clone(),
                closed.clone(),
                connection_id,
            ));
            info!(event = "daemon.connection.subscribed", connection_id = connection_id);
            if send(&writer, &DaemonMessage::Ack { id: id.clone() }).await.is_err() {
                break;
            }
            continue;
        }

        if is_host && waits_on_host(&msg) {
            // The host must keep reading replies while a request waits on it.
            let ctx = ctx.clone();
            let writer = writer.clone();
            tokio::spawn(async move {
                if let Some(response) = dispatch(msg, &ctx, connection_id).await {
                    let _ = send(&writer, &response).await;
                }
            });
        } else if let Some(response) = dispatch(msg, &ctx, connection_id).await
            && send(&writer, &response).await.is_err()
        {
            break;
        }
    }

    closed.cancel();
    if is_host {
        ctx.bridge.unregister_host(connection_id);
    }
    info!(event = "daemon.connection.closed", connection_id = connection_id);
}

/// Requests whose handling makes host calls. On the host connection these
/// run off the read loop; everything else is handled in read order.
fn waits_on_host(msg: &ClientMessage) -> bool {
    matches!(
        msg,
        ClientMessage::UpdateLiveSettings { .. }
            | ClientMessage::SettingsUpdated { .. }
            | ClientMessage::GetTabInfo { .. }
    )
}

async fn send(writer: &SharedWriter, msg: &DaemonMessage) -> Result<(), DaemonError> {
    let mut w = writer.lock().await;
    write_message(&mut *w, msg).await.inspect_err(|e| {
        debug!(event = "daemon.connection.write_failed", error = %e);
    })
}

fn error_response(id: String, err: &dyn RefreshError) -> DaemonMessage {
    DaemonMessage::Error {
        id,
        code: ErrorCode::from_code(err.error_code()),
        message: err.to_string(),
    }
}

fn respond(
    id: String,
    result: Result<DaemonMessage, CoordinatorError>,
    request: &'static str,
) -> DaemonMessage {
    match result {
        Ok(msg) => msg,
        Err(e) => {
            if e.is_user_error() {
                warn!(event = "daemon.connection.request_rejected", request = request, error = %e);
            } else {
                error!(event = "daemon.connection.request_failed", request = request, error = %e);
            }
            error_response(id, &e)
        }
    }
}

/// Route one request to the coordinator. `None` when nothing is sent back.
async fn dispatch(
    msg: ClientMessage,
    ctx: &ServerContext,
    connection_id: u64,
) -> Option<DaemonMessage> {
    let coordinator = &ctx.coordinator;

    let response = match msg {
        ClientMessage::StartAutoRefresh {
            id,
            tab_id,
            mode,
            settings,
        } => {
            let result = coordinator
                .start(tab_id, mode, settings)
                .map(|()| DaemonMessage::Ack { id: id.clone() });
            respond(id, result, "start_auto_refresh")
        }

        ClientMessage::StopAutoRefresh { id, tab_id } => {
            coordinator.stop_auto_refresh(tab_id);
            DaemonMessage::Ack { id }
        }

        ClientMessage::SetRefreshState { id, tab_id, state } => {
            if state.active {
                let mode = state.mode.unwrap_or(RefreshMode::Time);
                let result = coordinator
                    .start(tab_id, mode, state.settings.unwrap_or_default())
                    .map(|()| DaemonMessage::Ack { id: id.clone() });
                respond(id, result, "set_refresh_state")
            } else {
                coordinator.stop_auto_refresh(tab_id);
                DaemonMessage::Ack { id }
            }
        }

        ClientMessage::GetRefreshState { id, tab_id } => DaemonMessage::RefreshState {
            id,
            state: coordinator.query(tab_id),
        },

        ClientMessage::GetCountdownInfo { id, tab_id } => DaemonMessage::CountdownInfo {
            id,
            timer_info: coordinator.countdown_info(tab_id),
        },

        ClientMessage::ResetRefreshCount { id, tab_id } => DaemonMessage::CountReset {
            id,
            tab_id,
            count: coordinator.reset_count(tab_id),
        },

        ClientMessage::UpdateIterationSetting {
            id,
            tab_id,
            continue_iteration,
        } => {
            let result = coordinator
                .update_iteration_setting(tab_id, continue_iteration)
                .map(|()| DaemonMessage::Ack { id: id.clone() });
            respond(id, result, "update_iteration_setting")
        }

        ClientMessage::UpdateLiveSettings { id, tab_id, patch } => {
            let result = coordinator
                .update_live_settings(tab_id, patch)
                .await
                .map(|()| DaemonMessage::Ack { id: id.clone() });
            respond(id, result, "update_live_settings")
        }

        ClientMessage::SettingsUpdated {
            id,
            settings,
            reload,
        } => {
            let result = settings_updated(coordinator, settings, reload)
                .await
                .map(|settings| DaemonMessage::Settings {
                    id: id.clone(),
                    settings,
                });
            respond(id, result, "settings_updated")
        }

        ClientMessage::GetSettings { id } => DaemonMessage::Settings {
            id,
            settings: coordinator.global_settings(),
        },

        ClientMessage::GetContentScriptState { id, tab_id } => {
            DaemonMessage::ContentScriptState {
                id,
                state: coordinator.content_script_state(tab_id),
            }
        }

        ClientMessage::GetTabInfo { id, tab_id } => {
            let result = coordinator
                .tab_info(tab_id)
                .await
                .map(|tab| DaemonMessage::TabInfo { id: id.clone(), tab });
            respond(id, result, "get_tab_info")
        }

        ClientMessage::ForceRefreshTimers { id } => {
            coordinator.force_refresh_timers();
            DaemonMessage::Ack { id }
        }

        ClientMessage::TabUpdated { id, tab_id, status } => {
            coordinator.on_tab_updated(tab_id, status == "complete");
            DaemonMessage::Ack { id }
        }

        ClientMessage::TabRemoved { id, tab_id } => {
            coordinator.on_tab_removed(tab_id);
            DaemonMessage::Ack { id }
        }

        ClientMessage::Ping { id } => DaemonMessage::Ack { id },

        ClientMessage::DaemonStop { id, save_state } => {
            info!(
                event = "daemon.server.stop_requested",
                connection_id = connection_id,
                save_state = save_state,
            );
            if save_state && let Err(e) = coordinator.save_snapshot() {
                error!(event = "daemon.server.snapshot_failed", error = %e);
                return Some(error_response(id, &e));
            }
            ctx.shutdown.cancel();
            DaemonMessage::Ack { id }
        }

        // Handled by the read loop.
        ClientMessage::HostReply { .. }
        | ClientMessage::RegisterHost { .. }
        | ClientMessage::Subscribe { .. } => return None,

        other => {
            let id = other.request_id().unwrap_or_default().to_string();
            warn!(
                event = "daemon.connection.unsupported_request",
                connection_id = connection_id,
                request = ?other,
            );
            DaemonMessage::Error {
                id,
                code: ErrorCode::ProtocolError,
                message: "unsupported request".to_string(),
            }
        }
    };

    Some(response)
}

/// Store new global settings and push them onto running sessions. With
/// `reload`, active sessions are snapshotted so the restarted browser side
/// resumes them when it registers again.
async fn settings_updated(
    coordinator: &Coordinator,
    settings: tabrefresh_protocol::GlobalSettings,
    reload: bool,
) -> Result<tabrefresh_protocol::GlobalSettings, CoordinatorError> {
    let stored = coordinator.update_global_settings(settings, true).await?;
    if reload {
        let saved = coordinator.save_snapshot()?;
        info!(event = "daemon.settings.reload_snapshot_saved", sessions = saved);
    }
    Ok(stored)
}

async fn restore_sessions(coordinator: Coordinator) {
    match coordinator.restore_snapshot().await {
        Ok(0) => {}
        Ok(restored) => info!(event = "daemon.host.restore_completed", restored = restored),
        Err(e) => error!(event = "daemon.host.restore_failed", error = %e),
    }
    coordinator.prune_closed_tabs().await;
}

/// Write host calls to the host connection.
async fn forward_host_calls(
    mut calls: mpsc::UnboundedReceiver<DaemonMessage>,
    writer: SharedWriter,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            call = calls.recv() => match call {
                Some(call) => {
                    if send(&writer, &call).await.is_err() {
                        break;
                    }
                }
                // Replaced by another host.
                None => break,
            },
            _ = closed.cancelled() => break,
        }
    }
}

/// Stream pushes to a subscribed connection.
async fn forward_pushes(
    mut pushes: tokio::sync::broadcast::Receiver<DaemonMessage>,
    writer: SharedWriter,
    closed: CancellationToken,
    connection_id: u64,
) {
    loop {
        tokio::select! {
            push = pushes.recv() => match push {
                Ok(push) => {
                    if send(&writer, &push).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        event = "daemon.connection.pushes_dropped",
                        connection_id = connection_id,
                        skipped = skipped,
                    );
                }
                Err(RecvError::Closed) => break,
            },
            _ = closed.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabrefresh_protocol::{LiveSettingsPatch, TabId};

    #[test]
    fn test_only_host_bound_requests_leave_the_read_loop() {
        let tab_id = TabId::new(3);
        assert!(waits_on_host(&ClientMessage::GetTabInfo {
            id: "1".to_string(),
            tab_id,
        }));
        assert!(waits_on_host(&ClientMessage::UpdateLiveSettings {
            id: "2".to_string(),
            tab_id,
            patch: LiveSettingsPatch::default(),
        }));
        assert!(!waits_on_host(&ClientMessage::TabRemoved {
            id: "3".to_string(),
            tab_id,
        }));
        assert!(!waits_on_host(&ClientMessage::StopAutoRefresh {
            id: "4".to_string(),
            tab_id,
        }));
    }
}
