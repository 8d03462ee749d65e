use tabrefresh_protocol::TabId;

use crate::errors::RefreshError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("Invalid refresh settings: {reason}")]
    InvalidSettings { reason: String },

    #[error("Tab {tab_id} no longer exists")]
    TabGone { tab_id: TabId },

    #[error("Could not evaluate tab {tab_id}: {message}")]
    Evaluation { tab_id: TabId, message: String },
}

impl TriggerError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        TriggerError::InvalidSettings {
            reason: reason.into(),
        }
    }
}

impl RefreshError for TriggerError {
    fn error_code(&self) -> &'static str {
        match self {
            TriggerError::InvalidSettings { .. } => "invalid_settings",
            TriggerError::TabGone { .. } => "tab_gone",
            TriggerError::Evaluation { .. } => "evaluation_error",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(self, TriggerError::InvalidSettings { .. })
    }
}
