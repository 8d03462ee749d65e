use tabrefresh_protocol::{
    ContentScriptState, RefreshMode, RefreshSettings, RefreshStateView, TabId, TimerInfo,
};

use crate::trigger::{Strategy, TriggerHandle, TriggerPlan};

/// One monitored tab.
///
/// Owns its trigger exclusively: dropping the session disarms the job.
#[derive(Debug)]
pub struct RefreshSession {
    pub tab_id: TabId,
    pub mode: RefreshMode,
    pub settings: RefreshSettings,
    pub plan: TriggerPlan,
    /// Identity of this session. A tick that awaited the host compares it
    /// against the registry before mutating anything.
    pub generation: u64,
    trigger: TriggerHandle,
}

impl RefreshSession {
    pub fn new(
        settings: RefreshSettings,
        plan: TriggerPlan,
        generation: u64,
        trigger: TriggerHandle,
    ) -> Self {
        Self {
            tab_id: trigger.tab_id(),
            mode: plan.strategy.mode(),
            settings,
            plan,
            generation,
            trigger,
        }
    }

    pub fn strategy(&self) -> &Strategy {
        &self.plan.strategy
    }

    pub fn disarm(&self) {
        self.trigger.disarm();
    }

    pub fn is_armed(&self) -> bool {
        self.trigger.is_armed()
    }

    pub fn view(&self, count: u64, timer_info: TimerInfo) -> RefreshStateView {
        RefreshStateView {
            active: true,
            mode: Some(self.mode),
            count,
            settings: Some(self.settings.clone()),
            timer_info,
        }
    }

    pub fn content_script_state(&self) -> ContentScriptState {
        ContentScriptState {
            resource_monitoring: self.settings.enable_resource_monitoring,
            monitored_resources: self.settings.monitored_resources.clone(),
            form_protection: self.settings.form_protection,
        }
    }
}
