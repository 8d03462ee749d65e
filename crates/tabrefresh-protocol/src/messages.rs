use serde::{Deserialize, Serialize};

use crate::types::{
    CheckResult, ContentScriptState, GlobalSettings, LiveSettingsPatch, RefreshMode,
    RefreshSettings, RefreshStateChange, RefreshStateView, TabCommand, TabId, TabInfo, TimerInfo,
};

/// Error codes returned by the daemon in error responses.
///
/// Maps 1:1 with the `error_code()` strings of the core and daemon error
/// types. Unknown codes from future daemon versions deserialize to `Unknown`
/// via `#[serde(other)]`.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidSettings,
    TabGone,
    EvaluationError,
    MessagingUnavailable,
    NoActiveSession,
    RestartRequired,
    HostUnavailable,
    StoreError,
    ConfigInvalid,
    DaemonAlreadyRunning,
    DaemonNotRunning,
    ConnectionFailed,
    ProtocolError,
    IoError,
    SerializationError,
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// Convert a string error code (from `RefreshError::error_code()`) to an `ErrorCode`.
    pub fn from_code(code: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(code.to_string()))
            .unwrap_or(ErrorCode::Unknown)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::InvalidSettings => write!(f, "invalid_settings"),
            ErrorCode::TabGone => write!(f, "tab_gone"),
            ErrorCode::EvaluationError => write!(f, "evaluation_error"),
            ErrorCode::MessagingUnavailable => write!(f, "messaging_unavailable"),
            ErrorCode::NoActiveSession => write!(f, "no_active_session"),
            ErrorCode::RestartRequired => write!(f, "restart_required"),
            ErrorCode::HostUnavailable => write!(f, "host_unavailable"),
            ErrorCode::StoreError => write!(f, "store_error"),
            ErrorCode::ConfigInvalid => write!(f, "config_invalid"),
            ErrorCode::DaemonAlreadyRunning => write!(f, "daemon_already_running"),
            ErrorCode::DaemonNotRunning => write!(f, "daemon_not_running"),
            ErrorCode::ConnectionFailed => write!(f, "connection_failed"),
            ErrorCode::ProtocolError => write!(f, "protocol_error"),
            ErrorCode::IoError => write!(f, "io_error"),
            ErrorCode::SerializationError => write!(f, "serialization_error"),
            ErrorCode::Unknown => write!(f, "unknown"),
        }
    }
}

/// Client -> Daemon request messages.
///
/// Each variant maps to a JSONL message with `"type"` as the tag field.
/// All requests carry an `id` field for response correlation, except
/// `host_reply`, which is correlated by `call_id` and gets no response.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Begin refreshing a tab, replacing any session it already has.
    #[serde(rename = "start_auto_refresh")]
    StartAutoRefresh {
        id: String,
        tab_id: TabId,
        mode: RefreshMode,
        settings: RefreshSettings,
    },

    /// Stop refreshing a tab and clear its countdown.
    #[serde(rename = "stop_auto_refresh")]
    StopAutoRefresh { id: String, tab_id: TabId },

    /// Start or stop a tab depending on `state.active`.
    #[serde(rename = "set_refresh_state")]
    SetRefreshState {
        id: String,
        tab_id: TabId,
        state: RefreshStateChange,
    },

    #[serde(rename = "get_refresh_state")]
    GetRefreshState { id: String, tab_id: TabId },

    #[serde(rename = "get_countdown_info")]
    GetCountdownInfo { id: String, tab_id: TabId },

    #[serde(rename = "reset_refresh_count")]
    ResetRefreshCount { id: String, tab_id: TabId },

    #[serde(rename = "update_iteration_setting")]
    UpdateIterationSetting {
        id: String,
        tab_id: TabId,
        continue_iteration: bool,
    },

    /// Apply non-scheduling settings to an active session.
    #[serde(rename = "update_live_settings")]
    UpdateLiveSettings {
        id: String,
        tab_id: TabId,
        patch: LiveSettingsPatch,
    },

    /// Global settings were saved by the settings page.
    ///
    /// With `reload` set, the daemon snapshots active sessions so they are
    /// restored after the browser side restarts.
    #[serde(rename = "settings_updated")]
    SettingsUpdated {
        id: String,
        settings: GlobalSettings,
        #[serde(default)]
        reload: bool,
    },

    #[serde(rename = "get_settings")]
    GetSettings { id: String },

    #[serde(rename = "get_content_script_state")]
    GetContentScriptState { id: String, tab_id: TabId },

    #[serde(rename = "get_tab_info")]
    GetTabInfo { id: String, tab_id: TabId },

    /// Rearm every countdown from now.
    #[serde(rename = "force_refresh_timers")]
    ForceRefreshTimers { id: String },

    /// Start receiving push notifications on this connection.
    #[serde(rename = "subscribe")]
    Subscribe { id: String },

    #[serde(rename = "ping")]
    Ping { id: String },

    #[serde(rename = "daemon_stop")]
    DaemonStop {
        id: String,
        /// Snapshot active sessions before shutting down.
        #[serde(default)]
        save_state: bool,
    },

    /// Register this connection as the browser host.
    ///
    /// The daemon sends `host_call` messages over it and restores any
    /// persisted session snapshot once the host is available.
    #[serde(rename = "register_host")]
    RegisterHost { id: String },

    #[serde(rename = "host_reply")]
    HostReply { call_id: String, reply: HostReply },

    #[serde(rename = "tab_updated")]
    TabUpdated {
        id: String,
        tab_id: TabId,
        /// Navigation status reported by the browser (`loading`, `complete`).
        status: String,
    },

    #[serde(rename = "tab_removed")]
    TabRemoved { id: String, tab_id: TabId },
}

impl ClientMessage {
    /// Request id for response correlation, if this message expects a response.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientMessage::StartAutoRefresh { id, .. }
            | ClientMessage::StopAutoRefresh { id, .. }
            | ClientMessage::SetRefreshState { id, .. }
            | ClientMessage::GetRefreshState { id, .. }
            | ClientMessage::GetCountdownInfo { id, .. }
            | ClientMessage::ResetRefreshCount { id, .. }
            | ClientMessage::UpdateIterationSetting { id, .. }
            | ClientMessage::UpdateLiveSettings { id, .. }
            | ClientMessage::SettingsUpdated { id, .. }
            | ClientMessage::GetSettings { id }
            | ClientMessage::GetContentScriptState { id, .. }
            | ClientMessage::GetTabInfo { id, .. }
            | ClientMessage::ForceRefreshTimers { id }
            | ClientMessage::Subscribe { id }
            | ClientMessage::Ping { id }
            | ClientMessage::DaemonStop { id, .. }
            | ClientMessage::RegisterHost { id }
            | ClientMessage::TabUpdated { id, .. }
            | ClientMessage::TabRemoved { id, .. } => Some(id),
            ClientMessage::HostReply { .. } => None,
        }
    }
}

/// Capability call from the daemon to the registered browser host.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum HostCall {
    /// Liveness probe. Answered with `tab` or `tab_gone`.
    GetTab { tab_id: TabId },
    Reload { tab_id: TabId },
    /// Visible text of the page, or of the first element matching `selector`.
    ReadContent {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<String>,
    },
    SendTabMessage { tab_id: TabId, command: TabCommand },
    /// Ask the user whether refreshing should continue. Answered with `answer`.
    PromptContinue { tab_id: TabId },
    DismissPrompt { tab_id: TabId },
}

impl HostCall {
    pub fn tab_id(&self) -> TabId {
        match self {
            HostCall::GetTab { tab_id }
            | HostCall::Reload { tab_id }
            | HostCall::ReadContent { tab_id, .. }
            | HostCall::SendTabMessage { tab_id, .. }
            | HostCall::PromptContinue { tab_id }
            | HostCall::DismissPrompt { tab_id } => *tab_id,
        }
    }
}

/// Host answer to a [`HostCall`].
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum HostReply {
    Ok,
    Tab {
        tab: TabInfo,
    },
    /// `text` is absent when the selector matched nothing.
    Content {
        #[serde(default)]
        text: Option<String>,
    },
    Answer {
        proceed: bool,
    },
    TabGone,
    Error {
        message: String,
    },
}

/// Daemon -> Client response and push messages.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DaemonMessage {
    #[serde(rename = "ack")]
    Ack { id: String },

    #[serde(rename = "error")]
    Error {
        id: String,
        code: ErrorCode,
        message: String,
    },

    #[serde(rename = "refresh_state")]
    RefreshState { id: String, state: RefreshStateView },

    #[serde(rename = "countdown_info")]
    CountdownInfo { id: String, timer_info: TimerInfo },

    #[serde(rename = "count_reset")]
    CountReset { id: String, tab_id: TabId, count: u64 },

    #[serde(rename = "settings")]
    Settings { id: String, settings: GlobalSettings },

    #[serde(rename = "content_script_state")]
    ContentScriptState {
        id: String,
        state: ContentScriptState,
    },

    #[serde(rename = "tab_info")]
    TabInfo { id: String, tab: TabInfo },

    /// Capability call to the host connection. No `id`.
    #[serde(rename = "host_call")]
    HostCall { call_id: String, call: HostCall },

    /// A tab was reloaded. No `id`.
    #[serde(rename = "update_refresh_count")]
    UpdateRefreshCount {
        tab_id: TabId,
        count: u64,
        play_sound: bool,
    },

    /// A countdown was rearmed. `next_refresh` is epoch milliseconds. No `id`.
    #[serde(rename = "timer_reset")]
    TimerReset {
        tab_id: TabId,
        next_refresh: i64,
        timer_info: TimerInfo,
    },

    /// A session ended on its own (prompt declined or timed out). No `id`.
    #[serde(rename = "auto_refresh_stopped")]
    AutoRefreshStopped { tab_id: TabId },

    #[serde(rename = "conditional_check_result")]
    ConditionalCheckResult {
        tab_id: TabId,
        should_refresh: bool,
        reason: String,
    },

    #[serde(rename = "smart_schedule_status")]
    SmartScheduleStatus {
        tab_id: TabId,
        should_refresh: bool,
        reason: String,
    },
}

impl DaemonMessage {
    /// Whether this message is an unsolicited push rather than a response.
    pub fn is_push(&self) -> bool {
        matches!(
            self,
            DaemonMessage::UpdateRefreshCount { .. }
                | DaemonMessage::TimerReset { .. }
                | DaemonMessage::AutoRefreshStopped { .. }
                | DaemonMessage::ConditionalCheckResult { .. }
                | DaemonMessage::SmartScheduleStatus { .. }
        )
    }

    pub fn conditional_check(tab_id: TabId, result: CheckResult) -> Self {
        DaemonMessage::ConditionalCheckResult {
            tab_id,
            should_refresh: result.should_refresh,
            reason: result.reason,
        }
    }

    pub fn smart_status(tab_id: TabId, result: CheckResult) -> Self {
        DaemonMessage::SmartScheduleStatus {
            tab_id,
            should_refresh: result.should_refresh,
            reason: result.reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeUnit;

    #[test]
    fn test_start_auto_refresh_roundtrip() {
        let msg = ClientMessage::StartAutoRefresh {
            id: "req-1".to_string(),
            tab_id: TabId::new(12),
            mode: RefreshMode::Time,
            settings: RefreshSettings {
                interval: 5,
                ..Default::default()
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"start_auto_refresh""#));
        assert!(json.contains(r#""tab_id":12"#));
        assert!(json.contains(r#""mode":"time""#));

        let parsed: ClientMessage = serde_json::from_str(&json).unwrap();
        match parsed {
            ClientMessage::StartAutoRefresh {
                id,
                tab_id,
                settings,
                ..
            } => {
                assert_eq!(id, "req-1");
                assert_eq!(tab_id, TabId::new(12));
                assert_eq!(settings.interval, 5);
                assert_eq!(settings.unit, TimeUnit::Seconds);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_set_refresh_state_minimal_stop() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"set_refresh_state","id":"7","tab_id":3,"state":{"active":false}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::SetRefreshState { id, tab_id, state } => {
                assert_eq!(id, "7");
                assert_eq!(tab_id, TabId::new(3));
                assert!(!state.active);
                assert!(state.mode.is_none());
                assert!(state.settings.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_daemon_stop_save_state_defaults_false() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"daemon_stop","id":"1"}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::DaemonStop {
                save_state: false,
                ..
            }
        ));
    }

    #[test]
    fn test_host_reply_has_no_request_id() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"host_reply","call_id":"c-1","reply":{"result":"answer","proceed":true}}"#,
        )
        .unwrap();
        assert!(msg.request_id().is_none());
        match msg {
            ClientMessage::HostReply { call_id, reply } => {
                assert_eq!(call_id, "c-1");
                assert_eq!(reply, HostReply::Answer { proceed: true });
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_host_reply_content_without_text() {
        let reply: HostReply = serde_json::from_str(r#"{"result":"content"}"#).unwrap();
        assert_eq!(reply, HostReply::Content { text: None });
        let reply: HostReply = serde_json::from_str(r#"{"result":"tab_gone"}"#).unwrap();
        assert_eq!(reply, HostReply::TabGone);
    }

    #[test]
    fn test_host_call_wire_shape() {
        let msg = DaemonMessage::HostCall {
            call_id: "c-9".to_string(),
            call: HostCall::ReadContent {
                tab_id: TabId::new(3),
                selector: Some("#status".to_string()),
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""type":"host_call""#));
        assert!(json.contains(r#""call":"read_content""#));
        assert!(json.contains(r##""selector":"#status""##));
        assert!(!msg.is_push());
    }

    #[test]
    fn test_push_messages_carry_no_id() {
        let msg = DaemonMessage::UpdateRefreshCount {
            tab_id: TabId::new(1),
            count: 4,
            play_sound: true,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains(r#""id""#));
        assert!(msg.is_push());

        let msg = DaemonMessage::conditional_check(
            TabId::new(1),
            CheckResult::skip("Target element not found"),
        );
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""should_refresh":false"#));
        assert!(json.contains("Target element not found"));
    }

    #[test]
    fn test_error_code_unknown_fallback() {
        let msg: DaemonMessage = serde_json::from_str(
            r#"{"type":"error","id":"1","code":"brand_new_code","message":"x"}"#,
        )
        .unwrap();
        match msg {
            DaemonMessage::Error { code, .. } => assert_eq!(code, ErrorCode::Unknown),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_error_code_from_code_matches_display() {
        for code in [
            ErrorCode::InvalidSettings,
            ErrorCode::NoActiveSession,
            ErrorCode::RestartRequired,
            ErrorCode::TabGone,
        ] {
            assert_eq!(ErrorCode::from_code(&code.to_string()), code);
        }
        assert_eq!(ErrorCode::from_code("nope"), ErrorCode::Unknown);
    }
}
