//! Capabilities the scheduler needs from the browser side.

use async_trait::async_trait;
use tabrefresh_protocol::{DaemonMessage, TabCommand, TabId, TabInfo};

use super::errors::HostError;

/// Tab operations performed by the browser.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Liveness probe. Returns `HostError::TabGone` once the tab is closed.
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError>;

    async fn reload(&self, tab_id: TabId) -> Result<(), HostError>;

    /// Visible text of the page, or the text of the first element matching
    /// `selector`. `Ok(None)` means the selector matched nothing.
    async fn read_content(
        &self,
        tab_id: TabId,
        selector: Option<&str>,
    ) -> Result<Option<String>, HostError>;

    /// Deliver a command to the tab's content side.
    async fn send_tab_message(&self, tab_id: TabId, command: TabCommand)
    -> Result<(), HostError>;
}

/// The "continue refreshing?" question shown to the user.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Resolves with the user's answer. The caller bounds the wait.
    async fn ask(&self, tab_id: TabId) -> Result<bool, HostError>;

    /// Withdraw an unanswered prompt.
    async fn dismiss(&self, tab_id: TabId) -> Result<(), HostError>;
}

/// Fire-and-forget pushes to whatever UI is listening.
pub trait Notifier: Send + Sync {
    /// `HostError::MessagingUnavailable` when nobody is listening.
    fn publish(&self, message: DaemonMessage) -> Result<(), HostError>;
}
