//! One trigger tick: probe, evaluate, reload, then the post-reload protocol.
//!
//! Every step after an await re-checks that the session generation is still
//! current, so a stop or restart that lands mid-tick wins.

use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use tabrefresh_protocol::{CheckResult, DaemonMessage, TabId};
use tracing::{debug, info, warn};

use crate::host::HostError;
use crate::prompt;
use crate::trigger::{Condition, Strategy, TickFlow, TriggerError};

use super::Inner;

/// What a tick decided before reloading.
enum Verdict {
    Reload,
    Skip,
    /// The session ended or was replaced while the tick was waiting.
    Stale,
    TabGone,
}

/// Build the job a trigger runs on every tick.
///
/// Holds the coordinator weakly: once it is dropped the job stops.
pub(super) fn tick_job(
    inner: Weak<Inner>,
    tab_id: TabId,
    generation: u64,
) -> impl FnMut() -> BoxFuture<'static, TickFlow> + Send + 'static {
    move || {
        let inner = inner.clone();
        Box::pin(async move {
            match inner.upgrade() {
                Some(inner) => inner.run_tick(tab_id, generation).await,
                None => TickFlow::Stop,
            }
        })
    }
}

impl Inner {
    async fn run_tick(self: Arc<Self>, tab_id: TabId, generation: u64) -> TickFlow {
        debug!(event = "core.trigger.tick_started", tab_id = %tab_id, generation = generation);

        match self.host.tabs.get_tab(tab_id).await {
            Ok(_) => {}
            Err(HostError::TabGone { .. }) => return self.end_tab_gone(tab_id, generation),
            Err(e) => {
                warn!(event = "core.trigger.probe_failed", tab_id = %tab_id, error = %e);
                return self.skip_tick(tab_id, generation);
            }
        }

        let strategy = {
            let state = self.lock();
            match state.sessions.get(tab_id) {
                Some(session) if session.generation == generation => session.strategy().clone(),
                _ => return TickFlow::Stop,
            }
        };

        let verdict = match strategy {
            Strategy::Time => Verdict::Reload,
            Strategy::Conditional(condition) => {
                self.check_condition(tab_id, generation, &condition).await
            }
            Strategy::Smart(schedule) => {
                let result = schedule.evaluate(self.clock.as_ref());
                debug!(
                    event = "core.trigger.schedule_checked",
                    tab_id = %tab_id,
                    should_refresh = result.should_refresh,
                    reason = %result.reason
                );
                let verdict = verdict_for(&result);
                self.publish(DaemonMessage::smart_status(tab_id, result));
                verdict
            }
        };

        match verdict {
            Verdict::Reload => {}
            Verdict::Skip => return self.skip_tick(tab_id, generation),
            Verdict::Stale => return TickFlow::Stop,
            Verdict::TabGone => return self.end_tab_gone(tab_id, generation),
        }

        match self.host.tabs.reload(tab_id).await {
            Ok(()) => {}
            Err(HostError::TabGone { .. }) => return self.end_tab_gone(tab_id, generation),
            Err(e) => {
                warn!(event = "core.trigger.reload_failed", tab_id = %tab_id, error = %e);
                return self.skip_tick(tab_id, generation);
            }
        }

        self.after_reload(tab_id, generation).await
    }

    async fn check_condition(
        &self,
        tab_id: TabId,
        generation: u64,
        condition: &Condition,
    ) -> Verdict {
        let content = match self
            .host
            .tabs
            .read_content(tab_id, condition.selector.as_deref())
            .await
        {
            Ok(content) => content,
            Err(HostError::TabGone { .. }) => return Verdict::TabGone,
            Err(e) => {
                let err = TriggerError::Evaluation {
                    tab_id,
                    message: e.to_string(),
                };
                warn!(event = "core.trigger.evaluation_failed", tab_id = %tab_id, error = %err);
                self.publish(DaemonMessage::conditional_check(
                    tab_id,
                    CheckResult::skip(format!("Error: {}", e)),
                ));
                return Verdict::Skip;
            }
        };

        let result = {
            let mut state = self.lock();
            if !state.sessions.is_current(tab_id, generation) {
                return Verdict::Stale;
            }
            let mut snapshot = state.content_snapshots.remove(&tab_id);
            let result = condition.evaluate(content.as_deref(), &mut snapshot);
            if let Some(text) = snapshot {
                state.content_snapshots.insert(tab_id, text);
            }
            result
        };

        debug!(
            event = "core.trigger.condition_checked",
            tab_id = %tab_id,
            should_refresh = result.should_refresh,
            reason = %result.reason
        );
        let verdict = verdict_for(&result);
        self.publish(DaemonMessage::conditional_check(tab_id, result));
        verdict
    }

    /// Counter, count push, countdown rearm, then the optional prompt.
    async fn after_reload(&self, tab_id: TabId, generation: u64) -> TickFlow {
        let now = self.clock.now_ms();
        let (count, rearmed, continue_iteration) = {
            let mut state = self.lock();
            let Some(continue_iteration) = state
                .sessions
                .get(tab_id)
                .filter(|s| s.generation == generation)
                .map(|s| s.settings.continue_iteration)
            else {
                return TickFlow::Stop;
            };
            let count = state.counters.increment(tab_id);
            let rearmed = state.countdowns.rearm(tab_id, now);
            (count, rearmed, continue_iteration)
        };

        info!(event = "core.trigger.reload_completed", tab_id = %tab_id, count = count);

        self.publish(DaemonMessage::UpdateRefreshCount {
            tab_id,
            count,
            play_sound: true,
        });
        if let Some(rearmed) = rearmed {
            self.publish_timer_reset(tab_id, rearmed);
        }

        if !continue_iteration {
            return TickFlow::Continue;
        }

        let outcome = prompt::ask_to_continue(
            self.host.prompter.clone(),
            tab_id,
            self.options.prompt_timeout,
        )
        .await;
        if outcome.should_continue() {
            return TickFlow::Continue;
        }

        let removed = self.lock().sessions.remove_if_current(tab_id, generation);
        if removed.is_some() {
            info!(
                event = "core.session.stop_completed",
                tab_id = %tab_id,
                reason = "declined",
                outcome = ?outcome
            );
            self.publish(DaemonMessage::AutoRefreshStopped { tab_id });
        }
        TickFlow::Stop
    }

    /// No reload this tick: restart the countdown so the display keeps
    /// tracking the next tick.
    fn skip_tick(&self, tab_id: TabId, generation: u64) -> TickFlow {
        let now = self.clock.now_ms();
        let rearmed = {
            let mut state = self.lock();
            if !state.sessions.is_current(tab_id, generation) {
                return TickFlow::Stop;
            }
            state.countdowns.rearm(tab_id, now)
        };
        if let Some(rearmed) = rearmed {
            self.publish_timer_reset(tab_id, rearmed);
        }
        TickFlow::Continue
    }

    fn end_tab_gone(&self, tab_id: TabId, generation: u64) -> TickFlow {
        let removed = {
            let mut state = self.lock();
            let removed = state.sessions.remove_if_current(tab_id, generation);
            if removed.is_some() {
                state.forget_tab(tab_id);
            }
            removed
        };
        if removed.is_some() {
            info!(
                event = "core.session.stop_completed",
                tab_id = %tab_id,
                reason = "tab_gone"
            );
        }
        TickFlow::Stop
    }
}

fn verdict_for(result: &CheckResult) -> Verdict {
    if result.should_refresh {
        Verdict::Reload
    } else {
        Verdict::Skip
    }
}
