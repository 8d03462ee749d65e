use tabrefresh_protocol::TabId;

use crate::errors::RefreshError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("Tab {tab_id} no longer exists")]
    TabGone { tab_id: TabId },

    #[error("Browser host is not available: {message}")]
    Unavailable { message: String },

    #[error("Browser host call failed: {message}")]
    Failed { message: String },

    #[error("Unexpected reply to '{call}': {reply}")]
    UnexpectedReply { call: &'static str, reply: String },

    #[error("No UI is listening for notifications")]
    MessagingUnavailable,
}

impl RefreshError for HostError {
    fn error_code(&self) -> &'static str {
        match self {
            HostError::TabGone { .. } => "tab_gone",
            HostError::Unavailable { .. } => "host_unavailable",
            HostError::Failed { .. } | HostError::UnexpectedReply { .. } => "evaluation_error",
            HostError::MessagingUnavailable => "messaging_unavailable",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, HostError::TabGone { .. })
    }
}
