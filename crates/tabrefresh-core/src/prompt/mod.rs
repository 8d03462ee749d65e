//! The bounded "continue refreshing?" question.

use std::sync::Arc;
use std::time::Duration;

use tabrefresh_protocol::TabId;
use tracing::{debug, info, warn};

use crate::host::Prompter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    Continue,
    Declined,
    TimedOut,
    /// The prompt could not be shown or was closed without an answer.
    Failed,
}

impl PromptOutcome {
    pub fn should_continue(self) -> bool {
        self == PromptOutcome::Continue
    }
}

/// Ask whether refreshing should continue, waiting at most `timeout`.
///
/// Anything but an explicit "yes" counts as "stop". On timeout the prompt
/// is withdrawn, and so is a prompt whose wait is dropped before it settles.
pub async fn ask_to_continue(
    prompter: Arc<dyn Prompter>,
    tab_id: TabId,
    timeout: Duration,
) -> PromptOutcome {
    let mut pending = PendingPrompt {
        prompter: prompter.clone(),
        tab_id,
        open: true,
    };

    let outcome = tokio::select! {
        answer = prompter.ask(tab_id) => match answer {
            Ok(true) => PromptOutcome::Continue,
            Ok(false) => PromptOutcome::Declined,
            Err(e) => {
                warn!(event = "core.prompt.ask_failed", tab_id = %tab_id, error = %e);
                PromptOutcome::Failed
            }
        },
        _ = tokio::time::sleep(timeout) => {
            if let Err(e) = prompter.dismiss(tab_id).await {
                debug!(event = "core.prompt.dismiss_failed", tab_id = %tab_id, error = %e);
            }
            PromptOutcome::TimedOut
        }
    };
    pending.open = false;

    info!(event = "core.prompt.answered", tab_id = %tab_id, outcome = ?outcome);
    outcome
}

/// Withdraws the prompt when the wait is dropped while still open.
struct PendingPrompt {
    prompter: Arc<dyn Prompter>,
    tab_id: TabId,
    open: bool,
}

impl Drop for PendingPrompt {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let prompter = self.prompter.clone();
        let tab_id = self.tab_id;
        debug!(event = "core.prompt.abandoned", tab_id = %tab_id);
        runtime.spawn(async move {
            if let Err(e) = prompter.dismiss(tab_id).await {
                debug!(event = "core.prompt.dismiss_failed", tab_id = %tab_id, error = %e);
            }
        });
    }
}
