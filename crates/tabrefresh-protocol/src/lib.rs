#[cfg(unix)]
pub mod client;
mod messages;
mod types;

#[cfg(unix)]
pub use client::{IpcConnection, IpcError};
pub use messages::{ClientMessage, DaemonMessage, ErrorCode, HostCall, HostReply};
pub use types::{
    ActiveDays, CheckResult, ConditionType, ContentScriptState, GlobalSettings,
    LiveSettingsPatch, RefreshMode, RefreshSettings, RefreshStateChange, RefreshStateView,
    TabCommand, TabId,
    TabInfo, TimeUnit, TimerInfo,
};
