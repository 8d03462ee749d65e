//! The refresh coordinator.
//!
//! Owns every per-tab map (sessions, counters, countdowns, content
//! snapshots) behind one lock and routes UI requests, tab lifecycle events
//! and trigger ticks through it. The lock is never held across an await.

mod errors;
mod live;
mod reload;

pub use errors::CoordinatorError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tabrefresh_config::{TabRefreshConfig, sanitize_global_settings};
use tabrefresh_protocol::{
    ContentScriptState, DaemonMessage, GlobalSettings, LiveSettingsPatch, RefreshMode,
    RefreshSettings, RefreshStateView, TabCommand, TabId, TabInfo, TimerInfo,
};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::countdown::{CountdownModel, Rearmed};
use crate::host::{HostError, Notifier, Prompter, TabHost};
use crate::persistence::{self, KeyValueStore, keys};
use crate::sessions::{
    RefreshCounters, RefreshSession, SessionRegistry, SessionSnapshot, SnapshotEntry,
};
use crate::trigger;

/// The browser-side capabilities a coordinator drives.
#[derive(Clone)]
pub struct HostServices {
    pub tabs: Arc<dyn TabHost>,
    pub prompter: Arc<dyn Prompter>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// How long the continue prompt waits for an answer.
    pub prompt_timeout: Duration,
    /// Added to every rearmed countdown.
    pub rearm_buffer_ms: u64,
    /// Global settings used until the UI saves its own.
    pub defaults: GlobalSettings,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            prompt_timeout: Duration::from_secs(tabrefresh_config::DEFAULT_PROMPT_TIMEOUT_SECS),
            rearm_buffer_ms: tabrefresh_config::DEFAULT_REARM_BUFFER_MS,
            defaults: GlobalSettings::default(),
        }
    }
}

impl CoordinatorOptions {
    pub fn from_config(config: &TabRefreshConfig) -> Self {
        Self {
            prompt_timeout: Duration::from_secs(config.scheduler.prompt_timeout_secs()),
            rearm_buffer_ms: config.scheduler.rearm_buffer_ms(),
            defaults: config.global_settings(),
        }
    }
}

struct State {
    sessions: SessionRegistry,
    counters: RefreshCounters,
    countdowns: CountdownModel,
    /// Normalized page text last seen by a `text_changed` check.
    content_snapshots: HashMap<TabId, String>,
    settings: GlobalSettings,
}

impl State {
    /// Drop everything kept for a tab, in memory and in the store.
    fn forget_tab(&mut self, tab_id: TabId) {
        self.counters.delete(tab_id);
        self.countdowns.clear(tab_id);
        self.content_snapshots.remove(&tab_id);
    }
}

struct Inner {
    state: Mutex<State>,
    host: HostServices,
    clock: Arc<dyn Clock>,
    store: Arc<dyn KeyValueStore>,
    options: CoordinatorOptions,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Push to listening UIs. Nobody listening is normal.
    fn publish(&self, message: DaemonMessage) {
        match self.host.notifier.publish(message) {
            Ok(()) => {}
            Err(HostError::MessagingUnavailable) => {
                debug!(event = "core.notify.publish_skipped", reason = "no listener");
            }
            Err(e) => warn!(event = "core.notify.publish_failed", error = %e),
        }
    }

    fn publish_timer_reset(&self, tab_id: TabId, rearmed: Rearmed) {
        self.publish(DaemonMessage::TimerReset {
            tab_id,
            next_refresh: rearmed.next_refresh_ms,
            timer_info: rearmed.timer_info,
        });
    }

    /// Deliver commands to a tab's content side. Failures are expected while
    /// the page is loading and are ignored.
    async fn forward(&self, tab_id: TabId, commands: Vec<TabCommand>) {
        for command in commands {
            if let Err(e) = self.host.tabs.send_tab_message(tab_id, command).await {
                debug!(event = "core.session.forward_failed", tab_id = %tab_id, error = %e);
            }
        }
    }
}

/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Build a coordinator over `store`, hydrating persisted countdowns and
    /// global settings.
    pub fn new(
        host: HostServices,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        options: CoordinatorOptions,
    ) -> Self {
        let mut countdowns = CountdownModel::new(store.clone(), options.rearm_buffer_ms);
        let hydrated = countdowns.hydrate();

        let settings =
            match persistence::load::<GlobalSettings>(store.as_ref(), keys::GLOBAL_SETTINGS) {
                Ok(Some(saved)) => sanitize_global_settings(saved),
                Ok(None) => options.defaults.clone(),
                Err(e) => {
                    warn!(event = "core.settings.load_failed", error = %e);
                    options.defaults.clone()
                }
            };

        info!(
            event = "core.coordinator.init_completed",
            countdowns = hydrated,
            prompt_timeout_secs = options.prompt_timeout.as_secs()
        );

        let state = State {
            sessions: SessionRegistry::new(),
            counters: RefreshCounters::new(store.clone()),
            countdowns,
            content_snapshots: HashMap::new(),
            settings,
        };

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                host,
                clock,
                store,
                options,
            }),
        }
    }

    /// Start refreshing `tab_id`, replacing any session it already has.
    ///
    /// Settings are validated first; on `InvalidSettings` nothing changes.
    /// Must be called from within a tokio runtime.
    pub fn start(
        &self,
        tab_id: TabId,
        mode: RefreshMode,
        settings: RefreshSettings,
    ) -> Result<(), CoordinatorError> {
        info!(event = "core.session.start_started", tab_id = %tab_id, mode = %mode);

        let plan = trigger::plan(mode, &settings).inspect_err(|e| {
            warn!(event = "core.session.start_failed", tab_id = %tab_id, error = %e);
        })?;

        let now = self.inner.clock.now_ms();
        let mut state = self.inner.lock();

        if state.sessions.remove(tab_id).is_some() {
            debug!(event = "core.session.previous_stopped", tab_id = %tab_id);
        }
        state.content_snapshots.remove(&tab_id);
        let count = state.counters.load_if_absent(tab_id);

        let generation = state.sessions.next_generation();
        let handle = trigger::arm(
            tab_id,
            plan.period,
            reload::tick_job(Arc::downgrade(&self.inner), tab_id, generation),
        );
        state
            .countdowns
            .arm(tab_id, plan.period_ms(), settings.unit, now);

        let period_ms = plan.period_ms();
        state
            .sessions
            .insert(RefreshSession::new(settings, plan, generation, handle));

        info!(
            event = "core.session.start_completed",
            tab_id = %tab_id,
            mode = %mode,
            period_ms = period_ms,
            count = count,
            generation = generation
        );
        Ok(())
    }

    /// Disarm and forget the session, keeping its countdown. Returns whether
    /// a session was active. Idempotent.
    pub fn stop(&self, tab_id: TabId) -> bool {
        let removed = {
            let mut state = self.inner.lock();
            state.content_snapshots.remove(&tab_id);
            state.sessions.remove(tab_id)
        };

        match removed {
            Some(session) => {
                info!(
                    event = "core.session.stop_completed",
                    tab_id = %tab_id,
                    generation = session.generation
                );
                true
            }
            None => {
                debug!(event = "core.session.stop_skipped", tab_id = %tab_id, reason = "idle");
                false
            }
        }
    }

    /// UI-facing stop: also clears the countdown.
    pub fn stop_auto_refresh(&self, tab_id: TabId) {
        self.stop(tab_id);
        self.inner.lock().countdowns.clear(tab_id);
    }

    /// Read-only view of a tab. Zeroed for unknown tabs.
    pub fn query(&self, tab_id: TabId) -> RefreshStateView {
        let now = self.inner.clock.now_ms();
        let state = self.inner.lock();
        let timer_info = state.countdowns.query(tab_id, now);
        let count = state.counters.get(tab_id);

        match state.sessions.get(tab_id) {
            Some(session) => session.view(count, timer_info),
            None => RefreshStateView {
                active: false,
                mode: None,
                count,
                settings: None,
                timer_info,
            },
        }
    }

    pub fn countdown_info(&self, tab_id: TabId) -> TimerInfo {
        let now = self.inner.clock.now_ms();
        self.inner.lock().countdowns.query(tab_id, now)
    }

    /// Zero the counter. Returns the new count.
    pub fn reset_count(&self, tab_id: TabId) -> u64 {
        self.inner.lock().counters.reset(tab_id);
        info!(event = "core.counter.reset_completed", tab_id = %tab_id);
        0
    }

    pub fn is_active(&self, tab_id: TabId) -> bool {
        self.inner.lock().sessions.get(tab_id).is_some()
    }

    pub fn active_tabs(&self) -> Vec<TabId> {
        self.inner.lock().sessions.active_tabs()
    }

    pub fn update_iteration_setting(
        &self,
        tab_id: TabId,
        continue_iteration: bool,
    ) -> Result<(), CoordinatorError> {
        let mut state = self.inner.lock();
        let session = state
            .sessions
            .get_mut(tab_id)
            .ok_or(CoordinatorError::NoActiveSession { tab_id })?;
        session.settings.continue_iteration = continue_iteration;

        info!(
            event = "core.session.iteration_updated",
            tab_id = %tab_id,
            continue_iteration = continue_iteration
        );
        Ok(())
    }

    /// Apply non-scheduling settings to a running session without touching
    /// its trigger, then forward changed toggles to the tab.
    ///
    /// # Errors
    ///
    /// `RestartRequired` when the patch names a scheduling field,
    /// `NoActiveSession` when the tab is idle.
    pub async fn update_live_settings(
        &self,
        tab_id: TabId,
        patch: LiveSettingsPatch,
    ) -> Result<(), CoordinatorError> {
        let fields = patch.scheduling_fields();
        if !fields.is_empty() {
            warn!(
                event = "core.session.live_update_rejected",
                tab_id = %tab_id,
                fields = ?fields
            );
            return Err(CoordinatorError::RestartRequired { tab_id, fields });
        }

        let commands = {
            let mut state = self.inner.lock();
            let session = state
                .sessions
                .get_mut(tab_id)
                .ok_or(CoordinatorError::NoActiveSession { tab_id })?;
            live::apply_patch(&mut session.settings, &patch)
        };

        info!(
            event = "core.session.live_update_completed",
            tab_id = %tab_id,
            commands = commands.len()
        );
        self.inner.forward(tab_id, commands).await;
        Ok(())
    }

    /// Push the live-changeable part of `globals` onto every active session.
    pub async fn apply_global_settings(&self, globals: &GlobalSettings) {
        let patch = live::patch_from_globals(globals);
        let pending: Vec<(TabId, Vec<TabCommand>)> = {
            let mut state = self.inner.lock();
            let tabs = state.sessions.active_tabs();
            tabs.into_iter()
                .filter_map(|tab_id| {
                    let session = state.sessions.get_mut(tab_id)?;
                    Some((tab_id, live::apply_patch(&mut session.settings, &patch)))
                })
                .collect()
        };

        info!(
            event = "core.settings.apply_completed",
            sessions = pending.len()
        );

        let inner = &self.inner;
        futures::future::join_all(
            pending
                .into_iter()
                .map(|(tab_id, commands)| inner.forward(tab_id, commands)),
        )
        .await;
    }

    /// Store new global settings (sanitized) and optionally apply them to
    /// active sessions. Returns the settings as stored.
    pub async fn update_global_settings(
        &self,
        settings: GlobalSettings,
        apply: bool,
    ) -> Result<GlobalSettings, CoordinatorError> {
        let settings = sanitize_global_settings(settings);
        {
            let mut state = self.inner.lock();
            persistence::save(self.inner.store.as_ref(), keys::GLOBAL_SETTINGS, &settings)?;
            state.settings = settings.clone();
        }
        info!(event = "core.settings.update_completed", apply = apply);

        if apply {
            self.apply_global_settings(&settings).await;
        }
        Ok(settings)
    }

    pub fn global_settings(&self) -> GlobalSettings {
        self.inner.lock().settings.clone()
    }

    /// Tab closed: stop and forget everything about it. Unknown tabs are fine.
    pub fn on_tab_removed(&self, tab_id: TabId) {
        let was_active = {
            let mut state = self.inner.lock();
            let removed = state.sessions.remove(tab_id);
            state.forget_tab(tab_id);
            removed.is_some()
        };
        info!(
            event = "core.tab.removed_completed",
            tab_id = %tab_id,
            was_active = was_active
        );
    }

    /// A finished navigation resets the `text_changed` baseline.
    pub fn on_tab_updated(&self, tab_id: TabId, complete: bool) {
        if !complete {
            return;
        }
        if self
            .inner
            .lock()
            .content_snapshots
            .remove(&tab_id)
            .is_some()
        {
            debug!(event = "core.tab.snapshot_reset", tab_id = %tab_id);
        }
    }

    /// Persist every active session so a restarted daemon can resume it.
    /// Returns the number of sessions saved.
    pub fn save_snapshot(&self) -> Result<usize, CoordinatorError> {
        let snapshot = {
            let state = self.inner.lock();
            let mut sessions: Vec<SnapshotEntry> = state
                .sessions
                .iter()
                .map(|session| SnapshotEntry {
                    tab_id: session.tab_id,
                    mode: session.mode,
                    settings: session.settings.clone(),
                    count: state.counters.get(session.tab_id),
                })
                .collect();
            sessions.sort_by_key(|entry| entry.tab_id);
            SessionSnapshot { sessions }
        };

        snapshot.save(self.inner.store.as_ref())?;
        info!(
            event = "core.snapshot.save_completed",
            sessions = snapshot.sessions.len()
        );
        Ok(snapshot.sessions.len())
    }

    /// Resume sessions from a saved snapshot, skipping tabs that no longer
    /// exist. The snapshot is erased before anything is started. Returns the
    /// number of sessions resumed.
    pub async fn restore_snapshot(&self) -> Result<usize, CoordinatorError> {
        let Some(snapshot) = SessionSnapshot::take(self.inner.store.as_ref())? else {
            debug!(event = "core.snapshot.restore_skipped", reason = "no snapshot");
            return Ok(0);
        };

        info!(
            event = "core.snapshot.restore_started",
            sessions = snapshot.sessions.len()
        );

        let tabs = &self.inner.host.tabs;
        let probes = futures::future::join_all(
            snapshot
                .sessions
                .iter()
                .map(|entry| tabs.get_tab(entry.tab_id)),
        )
        .await;

        let mut restored = 0;
        for (entry, probe) in snapshot.sessions.into_iter().zip(probes) {
            if let Err(e) = probe {
                info!(
                    event = "core.snapshot.entry_skipped",
                    tab_id = %entry.tab_id,
                    reason = %e
                );
                continue;
            }

            self.inner.lock().counters.set(entry.tab_id, entry.count);
            match self.start(entry.tab_id, entry.mode, entry.settings) {
                Ok(()) => restored += 1,
                Err(e) => warn!(
                    event = "core.snapshot.entry_failed",
                    tab_id = %entry.tab_id,
                    error = %e
                ),
            }
        }

        info!(event = "core.snapshot.restore_completed", restored = restored);
        Ok(restored)
    }

    /// Forget counters and countdowns left behind by tabs the host reports
    /// closed. Tabs with a session are skipped; their trigger probes them.
    pub async fn prune_closed_tabs(&self) -> usize {
        let candidates: Vec<TabId> = {
            let state = self.inner.lock();
            let mut tabs = state.countdowns.tabs();
            tabs.extend(state.counters.tabs());
            tabs.sort();
            tabs.dedup();
            tabs.retain(|&tab_id| state.sessions.get(tab_id).is_none());
            tabs
        };
        if candidates.is_empty() {
            return 0;
        }

        let tabs = &self.inner.host.tabs;
        let probes =
            futures::future::join_all(candidates.iter().map(|&tab_id| tabs.get_tab(tab_id))).await;

        let mut pruned = 0;
        let mut state = self.inner.lock();
        for (tab_id, probe) in candidates.into_iter().zip(probes) {
            if matches!(probe, Err(HostError::TabGone { .. })) && state.sessions.get(tab_id).is_none()
            {
                state.forget_tab(tab_id);
                pruned += 1;
            }
        }
        drop(state);

        if pruned > 0 {
            info!(event = "core.tab.prune_completed", pruned = pruned);
        }
        pruned
    }

    pub fn content_script_state(&self, tab_id: TabId) -> ContentScriptState {
        self.inner
            .lock()
            .sessions
            .get(tab_id)
            .map(RefreshSession::content_script_state)
            .unwrap_or_default()
    }

    pub async fn tab_info(&self, tab_id: TabId) -> Result<TabInfo, CoordinatorError> {
        Ok(self.inner.host.tabs.get_tab(tab_id).await?)
    }

    /// Rearm every countdown from now and announce the new deadlines.
    pub fn force_refresh_timers(&self) -> usize {
        let now = self.inner.clock.now_ms();
        let rearmed = self.inner.lock().countdowns.rearm_all(now);
        for (tab_id, r) in &rearmed {
            self.inner.publish_timer_reset(*tab_id, *r);
        }
        info!(event = "core.countdown.force_refresh_completed", timers = rearmed.len());
        rearmed.len()
    }

    /// Disarm every trigger. Persisted state is left alone.
    pub fn shutdown(&self) {
        let drained = self.inner.lock().sessions.drain();
        info!(event = "core.coordinator.shutdown_completed", sessions = drained.len());
    }
}
