//! Sessions saved across a planned daemon restart.

use serde::{Deserialize, Serialize};
use tabrefresh_protocol::{RefreshMode, RefreshSettings, TabId};

use crate::persistence::{self, KeyValueStore, StoreError, keys};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub tab_id: TabId,
    pub mode: RefreshMode,
    pub settings: RefreshSettings,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub sessions: Vec<SnapshotEntry>,
}

impl SessionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        persistence::save(store, keys::SESSION_SNAPSHOT, self)
    }

    /// Read and erase the snapshot. The key is removed even when the
    /// stored value fails to decode, so a snapshot is consumed at most once.
    pub fn take(store: &dyn KeyValueStore) -> Result<Option<Self>, StoreError> {
        let loaded = persistence::load::<Self>(store, keys::SESSION_SNAPSHOT);
        store.remove(keys::SESSION_SNAPSHOT)?;
        loaded
    }
}
