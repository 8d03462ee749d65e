use tabrefresh_protocol::TabId;

use crate::errors::RefreshError;
use crate::host::HostError;
use crate::persistence::StoreError;
use crate::trigger::TriggerError;

#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Trigger(#[from] TriggerError),

    #[error("No active refresh")]
    NoActiveSession { tab_id: TabId },

    #[error("Changing {} requires restarting the refresh for tab {tab_id}", fields.join(", "))]
    RestartRequired {
        tab_id: TabId,
        fields: Vec<&'static str>,
    },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Storage operation failed: {source}")]
    Store {
        #[from]
        source: StoreError,
    },
}

impl RefreshError for CoordinatorError {
    fn error_code(&self) -> &'static str {
        match self {
            CoordinatorError::Trigger(e) => e.error_code(),
            CoordinatorError::NoActiveSession { .. } => "no_active_session",
            CoordinatorError::RestartRequired { .. } => "restart_required",
            CoordinatorError::Host(e) => e.error_code(),
            CoordinatorError::Store { .. } => "store_error",
        }
    }

    fn is_user_error(&self) -> bool {
        match self {
            CoordinatorError::Trigger(e) => e.is_user_error(),
            CoordinatorError::Host(e) => e.is_user_error(),
            CoordinatorError::NoActiveSession { .. } | CoordinatorError::RestartRequired { .. } => {
                true
            }
            CoordinatorError::Store { .. } => false,
        }
    }
}
