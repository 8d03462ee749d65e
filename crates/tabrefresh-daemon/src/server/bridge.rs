//! Browser host bridge.
//!
//! One connection registers as the host. Capability calls from the core are
//! written to it as `host_call` messages and resolved when the matching
//! `host_reply` comes back. Pushes fan out to every subscribed connection.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tabrefresh_core::{HostError, Notifier, Prompter, TabHost};
use tabrefresh_protocol::{DaemonMessage, HostCall, HostReply, TabCommand, TabId, TabInfo};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

/// Bound on every host call except the continue prompt, which the
/// coordinator bounds itself.
pub const HOST_CALL_TIMEOUT: Duration = Duration::from_secs(10);

const PUSH_CHANNEL_CAPACITY: usize = 256;

struct HostLink {
    connection_id: u64,
    calls: mpsc::UnboundedSender<DaemonMessage>,
}

pub struct HostBridge {
    host: Mutex<Option<HostLink>>,
    pending: Mutex<HashMap<String, oneshot::Sender<HostReply>>>,
    pushes: broadcast::Sender<DaemonMessage>,
    call_timeout: Duration,
}

impl Default for HostBridge {
    fn default() -> Self {
        Self::new(HOST_CALL_TIMEOUT)
    }
}

impl HostBridge {
    pub fn new(call_timeout: Duration) -> Self {
        let (pushes, _) = broadcast::channel(PUSH_CHANNEL_CAPACITY);
        Self {
            host: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
            pushes,
            call_timeout,
        }
    }

    fn host(&self) -> MutexGuard<'_, Option<HostLink>> {
        self.host.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<HostReply>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `connection_id` the host. Returns the stream of calls to write
    /// to it. A previously registered host is replaced.
    pub fn register_host(&self, connection_id: u64) -> mpsc::UnboundedReceiver<DaemonMessage> {
        let (calls, rx) = mpsc::unbounded_channel();
        let previous = self.host().replace(HostLink {
            connection_id,
            calls,
        });
        if let Some(previous) = previous {
            info!(
                event = "daemon.bridge.host_replaced",
                previous = previous.connection_id,
                connection_id = connection_id
            );
        } else {
            info!(event = "daemon.bridge.host_registered", connection_id = connection_id);
        }
        rx
    }

    /// Forget the host if it is still `connection_id`. In-flight calls fail.
    pub fn unregister_host(&self, connection_id: u64) {
        let mut host = self.host();
        if host.as_ref().map(|h| h.connection_id) != Some(connection_id) {
            return;
        }
        *host = None;
        drop(host);

        let abandoned = {
            let mut pending = self.pending();
            let n = pending.len();
            pending.clear();
            n
        };
        info!(
            event = "daemon.bridge.host_unregistered",
            connection_id = connection_id,
            abandoned_calls = abandoned
        );
    }

    pub fn has_host(&self) -> bool {
        self.host().is_some()
    }

    /// Hand a `host_reply` to the call waiting for it.
    pub fn resolve(&self, call_id: &str, reply: HostReply) {
        let waiter = self.pending().remove(call_id);
        match waiter {
            Some(tx) => {
                if tx.send(reply).is_err() {
                    debug!(event = "daemon.bridge.reply_dropped", call_id = call_id);
                }
            }
            None => debug!(
                event = "daemon.bridge.reply_unmatched",
                call_id = call_id
            ),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DaemonMessage> {
        self.pushes.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.pushes.receiver_count()
    }

    async fn call(&self, call: HostCall, bounded: bool) -> Result<HostReply, HostError> {
        let name = call_name(&call);
        let call_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        {
            let host = self.host();
            let Some(link) = host.as_ref() else {
                return Err(HostError::Unavailable {
                    message: "no browser host registered".to_string(),
                });
            };
            self.pending().insert(call_id.clone(), tx);
            let msg = DaemonMessage::HostCall {
                call_id: call_id.clone(),
                call,
            };
            if link.calls.send(msg).is_err() {
                self.pending().remove(&call_id);
                return Err(HostError::Unavailable {
                    message: "browser host connection closed".to_string(),
                });
            }
        }

        let guard = PendingGuard {
            bridge: self,
            call_id: &call_id,
        };
        debug!(event = "daemon.bridge.call_started", call = name, call_id = %call_id);

        let reply = if bounded {
            match tokio::time::timeout(self.call_timeout, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    warn!(event = "daemon.bridge.call_timed_out", call = name, call_id = %call_id);
                    return Err(HostError::Failed {
                        message: format!(
                            "host did not answer '{}' within {}s",
                            name,
                            self.call_timeout.as_secs()
                        ),
                    });
                }
            }
        } else {
            rx.await
        };
        drop(guard);

        reply.map_err(|_| HostError::Unavailable {
            message: "browser host disconnected".to_string(),
        })
    }
}

/// Removes the pending entry if the waiting call is dropped or times out.
struct PendingGuard<'a> {
    bridge: &'a HostBridge,
    call_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.bridge.pending().remove(self.call_id);
    }
}

fn call_name(call: &HostCall) -> &'static str {
    match call {
        HostCall::GetTab { .. } => "get_tab",
        HostCall::Reload { .. } => "reload",
        HostCall::ReadContent { .. } => "read_content",
        HostCall::SendTabMessage { .. } => "send_tab_message",
        HostCall::PromptContinue { .. } => "prompt_continue",
        HostCall::DismissPrompt { .. } => "dismiss_prompt",
        _ => "host_call",
    }
}

/// Map the replies every call shares. `Ok` for anything call-specific.
fn common_reply(tab_id: TabId, reply: HostReply) -> Result<HostReply, HostError> {
    match reply {
        HostReply::TabGone => Err(HostError::TabGone { tab_id }),
        HostReply::Error { message } => Err(HostError::Failed { message }),
        other => Ok(other),
    }
}

fn unexpected(call: &'static str, reply: HostReply) -> HostError {
    HostError::UnexpectedReply {
        call,
        reply: format!("{:?}", reply),
    }
}

#[async_trait]
impl TabHost for HostBridge {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let reply = self.call(HostCall::GetTab { tab_id }, true).await?;
        match common_reply(tab_id, reply)? {
            HostReply::Tab { tab } => Ok(tab),
            other => Err(unexpected("get_tab", other)),
        }
    }

    async fn reload(&self, tab_id: TabId) -> Result<(), HostError> {
        let reply = self.call(HostCall::Reload { tab_id }, true).await?;
        match common_reply(tab_id, reply)? {
            HostReply::Ok => Ok(()),
            other => Err(unexpected("reload", other)),
        }
    }

    async fn read_content(
        &self,
        tab_id: TabId,
        selector: Option<&str>,
    ) -> Result<Option<String>, HostError> {
        let call = HostCall::ReadContent {
            tab_id,
            selector: selector.map(str::to_string),
        };
        let reply = self.call(call, true).await?;
        match common_reply(tab_id, reply)? {
            HostReply::Content { text } => Ok(text),
            other => Err(unexpected("read_content", other)),
        }
    }

    async fn send_tab_message(
        &self,
        tab_id: TabId,
        command: TabCommand,
    ) -> Result<(), HostError> {
        let reply = self
            .call(HostCall::SendTabMessage { tab_id, command }, true)
            .await?;
        match common_reply(tab_id, reply)? {
            HostReply::Ok => Ok(()),
            other => Err(unexpected("send_tab_message", other)),
        }
    }
}

#[async_trait]
impl Prompter for HostBridge {
    async fn ask(&self, tab_id: TabId) -> Result<bool, HostError> {
        let reply = self.call(HostCall::PromptContinue { tab_id }, false).await?;
        match common_reply(tab_id, reply)? {
            HostReply::Answer { proceed } => Ok(proceed),
            other => Err(unexpected("prompt_continue", other)),
        }
    }

    async fn dismiss(&self, tab_id: TabId) -> Result<(), HostError> {
        let reply = self.call(HostCall::DismissPrompt { tab_id }, true).await?;
        match common_reply(tab_id, reply)? {
            HostReply::Ok => Ok(()),
            other => Err(unexpected("dismiss_prompt", other)),
        }
    }
}

impl Notifier for HostBridge {
    fn publish(&self, message: DaemonMessage) -> Result<(), HostError> {
        if self.pushes.receiver_count() == 0 {
            return Err(HostError::MessagingUnavailable);
        }
        self.pushes
            .send(message)
            .map(|_| ())
            .map_err(|_| HostError::MessagingUnavailable)
    }
}
