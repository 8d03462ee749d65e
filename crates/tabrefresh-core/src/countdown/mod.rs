//! Countdown model: per-tab timer state for display.
//!
//! Countdowns are informational. They are armed with each session, rearmed
//! after every reload and survive `stop` until explicitly cleared.

mod model;

pub use model::CountdownState;

use std::collections::HashMap;
use std::sync::Arc;

use tabrefresh_protocol::{TabId, TimeUnit, TimerInfo};
use tracing::{debug, warn};

use crate::persistence::{self, KeyValueStore, keys};

/// Result of a rearm: when the next refresh is due and the fresh timer info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rearmed {
    pub next_refresh_ms: i64,
    pub timer_info: TimerInfo,
}

pub struct CountdownModel {
    timers: HashMap<TabId, CountdownState>,
    store: Arc<dyn KeyValueStore>,
    rearm_buffer_ms: u64,
}

impl CountdownModel {
    pub fn new(store: Arc<dyn KeyValueStore>, rearm_buffer_ms: u64) -> Self {
        Self {
            timers: HashMap::new(),
            store,
            rearm_buffer_ms,
        }
    }

    /// Load persisted countdowns. Entries that fail to decode are dropped.
    pub fn hydrate(&mut self) -> usize {
        let keys = match self.store.keys_with_prefix(keys::COUNTDOWN_PREFIX) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(event = "core.countdown.hydrate_failed", error = %e);
                return 0;
            }
        };

        let mut loaded = 0;
        for key in keys {
            let Some(tab_id) = keys::tab_from_key(keys::COUNTDOWN_PREFIX, &key) else {
                continue;
            };
            match persistence::load::<CountdownState>(self.store.as_ref(), &key) {
                Ok(Some(state)) => {
                    self.timers.insert(tab_id, state);
                    loaded += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        event = "core.countdown.hydrate_entry_invalid",
                        tab_id = %tab_id,
                        error = %e
                    );
                }
            }
        }
        debug!(event = "core.countdown.hydrate_completed", loaded = loaded);
        loaded
    }

    /// Start a countdown of `duration_ms` from `now_ms`.
    pub fn arm(&mut self, tab_id: TabId, duration_ms: u64, unit: TimeUnit, now_ms: i64) {
        let state = CountdownState {
            end_time_ms: now_ms.saturating_add(signed_ms(duration_ms)),
            total_duration_ms: duration_ms,
            unit,
        };
        self.timers.insert(tab_id, state);
        self.persist(tab_id, &state);
    }

    /// Current timer info. Zeroed for tabs without a countdown.
    pub fn query(&self, tab_id: TabId, now_ms: i64) -> TimerInfo {
        self.timers
            .get(&tab_id)
            .map(|state| state.timer_info(now_ms))
            .unwrap_or_default()
    }

    /// Restart the countdown from `now_ms` with its original duration plus
    /// the rearm buffer. `None` for tabs without a countdown.
    pub fn rearm(&mut self, tab_id: TabId, now_ms: i64) -> Option<Rearmed> {
        let buffer = self.rearm_buffer_ms;
        let state = self.timers.get_mut(&tab_id)?;
        state.end_time_ms = now_ms
            .saturating_add(signed_ms(state.total_duration_ms))
            .saturating_add(signed_ms(buffer));
        let state = *state;
        self.persist(tab_id, &state);
        Some(Rearmed {
            next_refresh_ms: state.end_time_ms,
            timer_info: state.timer_info(now_ms),
        })
    }

    /// Rearm every countdown. Returns the tabs that were rearmed.
    pub fn rearm_all(&mut self, now_ms: i64) -> Vec<(TabId, Rearmed)> {
        let tabs: Vec<TabId> = self.timers.keys().copied().collect();
        tabs.into_iter()
            .filter_map(|tab_id| self.rearm(tab_id, now_ms).map(|r| (tab_id, r)))
            .collect()
    }

    /// Forget the countdown in memory and in the store.
    pub fn clear(&mut self, tab_id: TabId) {
        self.timers.remove(&tab_id);
        if let Err(e) = self.store.remove(&keys::countdown(tab_id)) {
            warn!(event = "core.countdown.clear_failed", tab_id = %tab_id, error = %e);
        }
    }

    pub fn get(&self, tab_id: TabId) -> Option<&CountdownState> {
        self.timers.get(&tab_id)
    }

    /// Tabs that currently have a countdown.
    pub fn tabs(&self) -> Vec<TabId> {
        self.timers.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    fn persist(&self, tab_id: TabId, state: &CountdownState) {
        if let Err(e) = persistence::save(self.store.as_ref(), &keys::countdown(tab_id), state) {
            warn!(event = "core.countdown.persist_failed", tab_id = %tab_id, error = %e);
        }
    }
}

/// Durations past `i64::MAX` milliseconds saturate instead of wrapping.
fn signed_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn model() -> (CountdownModel, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (CountdownModel::new(store.clone(), 100), store)
    }

    #[test]
    fn test_query_unknown_tab_is_zeroed() {
        let (model, _) = model();
        assert_eq!(model.query(TabId::new(1), 0), TimerInfo::default());
    }

    #[test]
    fn test_arm_persists_state() {
        let (mut model, store) = model();
        model.arm(TabId::new(1), 30_000, TimeUnit::Seconds, 1_000);

        let saved: CountdownState = persistence::load(store.as_ref(), "countdown_1")
            .unwrap()
            .unwrap();
        assert_eq!(saved.end_time_ms, 31_000);
        assert_eq!(saved.total_duration_ms, 30_000);
    }

    #[test]
    fn test_query_does_not_mutate() {
        let (mut model, _) = model();
        model.arm(TabId::new(1), 30_000, TimeUnit::Seconds, 0);
        let before = *model.get(TabId::new(1)).unwrap();
        let _ = model.query(TabId::new(1), 15_000);
        assert_eq!(*model.get(TabId::new(1)).unwrap(), before);
    }

    #[test]
    fn test_rearm_adds_buffer() {
        let (mut model, _) = model();
        model.arm(TabId::new(1), 5_000, TimeUnit::Seconds, 0);

        let rearmed = model.rearm(TabId::new(1), 5_000).unwrap();
        assert_eq!(rearmed.next_refresh_ms, 10_100);
        assert_eq!(rearmed.timer_info.remaining, 5);
        assert_eq!(rearmed.timer_info.percentage, 0);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let (mut model, _) = model();
        model.arm(TabId::new(1), u64::MAX, TimeUnit::Milliseconds, 1_000);

        let info = model.query(TabId::new(1), 1_000);
        assert_eq!(info.total, u64::MAX.div_ceil(1000));
        assert!(info.remaining > 0);
        assert!(info.percentage < 100);
        assert_eq!(model.get(TabId::new(1)).unwrap().end_time_ms, i64::MAX);

        let rearmed = model.rearm(TabId::new(1), 2_000).unwrap();
        assert_eq!(rearmed.next_refresh_ms, i64::MAX);
        assert!(rearmed.timer_info.remaining > 0);
    }

    #[test]
    fn test_rearm_unknown_tab_is_noop() {
        let (mut model, store) = model();
        assert!(model.rearm(TabId::new(9), 0).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_removes_memory_and_store() {
        let (mut model, store) = model();
        model.arm(TabId::new(1), 5_000, TimeUnit::Seconds, 0);
        model.clear(TabId::new(1));
        assert!(model.is_empty());
        assert!(store.get("countdown_1").unwrap().is_none());
    }

    #[test]
    fn test_hydrate_restores_persisted_countdowns() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut model = CountdownModel::new(store.clone(), 100);
            model.arm(TabId::new(4), 60_000, TimeUnit::Minutes, 0);
            model.arm(TabId::new(5), 10_000, TimeUnit::Seconds, 0);
        }
        store
            .set("countdown_6", serde_json::json!("garbage"))
            .unwrap();

        let mut model = CountdownModel::new(store, 100);
        assert_eq!(model.hydrate(), 2);
        assert_eq!(model.query(TabId::new(4), 30_000).remaining, 30);
        assert_eq!(model.query(TabId::new(4), 30_000).unit, TimeUnit::Minutes);
        assert_eq!(model.query(TabId::new(6), 0), TimerInfo::default());
    }

    #[test]
    fn test_rearm_all() {
        let (mut model, _) = model();
        model.arm(TabId::new(1), 5_000, TimeUnit::Seconds, 0);
        model.arm(TabId::new(2), 8_000, TimeUnit::Seconds, 0);

        let mut rearmed = model.rearm_all(3_000);
        rearmed.sort_by_key(|(tab, _)| *tab);
        assert_eq!(rearmed.len(), 2);
        assert_eq!(rearmed[0].1.next_refresh_ms, 8_100);
        assert_eq!(rearmed[1].1.next_refresh_ms, 11_100);
    }
}
