//! Per-tab refresh counters, mirrored to the store.

use std::collections::HashMap;
use std::sync::Arc;

use tabrefresh_protocol::TabId;
use tracing::warn;

use crate::persistence::{self, KeyValueStore, keys};

pub struct RefreshCounters {
    counts: HashMap<TabId, u64>,
    store: Arc<dyn KeyValueStore>,
}

impl RefreshCounters {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            counts: HashMap::new(),
            store,
        }
    }

    /// Pull the persisted count into memory unless it is already there.
    pub fn load_if_absent(&mut self, tab_id: TabId) -> u64 {
        if let Some(&count) = self.counts.get(&tab_id) {
            return count;
        }
        let count = self.persisted(tab_id).unwrap_or(0);
        self.counts.insert(tab_id, count);
        count
    }

    /// Current count; falls back to the store for tabs not loaded yet.
    pub fn get(&self, tab_id: TabId) -> u64 {
        match self.counts.get(&tab_id) {
            Some(&count) => count,
            None => self.persisted(tab_id).unwrap_or(0),
        }
    }

    pub fn increment(&mut self, tab_id: TabId) -> u64 {
        let current = self.load_if_absent(tab_id);
        let count = current.saturating_add(1);
        self.set(tab_id, count);
        count
    }

    pub fn set(&mut self, tab_id: TabId, count: u64) {
        self.counts.insert(tab_id, count);
        if let Err(e) = persistence::save(self.store.as_ref(), &keys::refresh_count(tab_id), &count)
        {
            warn!(event = "core.counter.persist_failed", tab_id = %tab_id, error = %e);
        }
    }

    /// Zero in memory; the persisted key is removed.
    pub fn reset(&mut self, tab_id: TabId) {
        self.counts.insert(tab_id, 0);
        self.remove_persisted(tab_id);
    }

    /// Forget the tab entirely.
    pub fn delete(&mut self, tab_id: TabId) {
        self.counts.remove(&tab_id);
        self.remove_persisted(tab_id);
    }

    /// Tabs with a count in memory or in the store.
    pub fn tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self.counts.keys().copied().collect();
        match self.store.keys_with_prefix(keys::REFRESH_COUNT_PREFIX) {
            Ok(stored) => tabs.extend(
                stored
                    .iter()
                    .filter_map(|key| keys::tab_from_key(keys::REFRESH_COUNT_PREFIX, key)),
            ),
            Err(e) => warn!(event = "core.counter.list_failed", error = %e),
        }
        tabs.sort();
        tabs.dedup();
        tabs
    }

    fn persisted(&self, tab_id: TabId) -> Option<u64> {
        match persistence::load::<u64>(self.store.as_ref(), &keys::refresh_count(tab_id)) {
            Ok(count) => count,
            Err(e) => {
                warn!(event = "core.counter.load_failed", tab_id = %tab_id, error = %e);
                None
            }
        }
    }

    fn remove_persisted(&self, tab_id: TabId) {
        if let Err(e) = self.store.remove(&keys::refresh_count(tab_id)) {
            warn!(event = "core.counter.remove_failed", tab_id = %tab_id, error = %e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use serde_json::json;

    fn counters() -> (Arc<MemoryStore>, RefreshCounters) {
        let store = Arc::new(MemoryStore::new());
        let counters = RefreshCounters::new(store.clone());
        (store, counters)
    }

    #[test]
    fn test_increment_persists() {
        let (store, mut counters) = counters();
        let tab = TabId::new(1);
        assert_eq!(counters.increment(tab), 1);
        assert_eq!(counters.increment(tab), 2);
        assert_eq!(store.get("refresh_count_1").unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_load_if_absent_reads_store_once() {
        let (store, mut counters) = counters();
        store.set("refresh_count_9", json!(41)).unwrap();

        assert_eq!(counters.load_if_absent(TabId::new(9)), 41);
        store.set("refresh_count_9", json!(0)).unwrap();
        assert_eq!(counters.load_if_absent(TabId::new(9)), 41);
        assert_eq!(counters.increment(TabId::new(9)), 42);
    }

    #[test]
    fn test_reset_zeroes_and_removes_key() {
        let (store, mut counters) = counters();
        let tab = TabId::new(3);
        counters.increment(tab);
        counters.reset(tab);
        assert_eq!(counters.get(tab), 0);
        assert!(store.get("refresh_count_3").unwrap().is_none());
    }

    #[test]
    fn test_delete_forgets_tab() {
        let (store, mut counters) = counters();
        let tab = TabId::new(4);
        counters.increment(tab);
        counters.delete(tab);
        assert_eq!(counters.get(tab), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_persisted_count_reads_as_zero() {
        let (store, mut counters) = counters();
        store.set("refresh_count_5", json!("lots")).unwrap();
        assert_eq!(counters.load_if_absent(TabId::new(5)), 0);
    }
}
