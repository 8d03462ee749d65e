//! Authoritative map of active sessions.

use std::collections::HashMap;

use tabrefresh_protocol::TabId;
use tracing::debug;

use super::types::RefreshSession;

/// At most one session per tab. Every session leaving the registry is
/// disarmed on the way out.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<TabId, RefreshSession>,
    last_generation: u64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh generation number for a session about to be armed.
    pub fn next_generation(&mut self) -> u64 {
        self.last_generation += 1;
        self.last_generation
    }

    /// Insert a session, disarming and returning any session it replaces.
    pub fn insert(&mut self, session: RefreshSession) -> Option<RefreshSession> {
        let replaced = self.sessions.insert(session.tab_id, session);
        if let Some(ref old) = replaced {
            old.disarm();
            debug!(
                event = "core.registry.session_replaced",
                tab_id = %old.tab_id,
                generation = old.generation
            );
        }
        replaced
    }

    /// Disarm and remove the session. `None` when the tab was idle.
    pub fn remove(&mut self, tab_id: TabId) -> Option<RefreshSession> {
        let session = self.sessions.remove(&tab_id)?;
        session.disarm();
        Some(session)
    }

    /// Remove the session only if it is still `generation`.
    pub fn remove_if_current(&mut self, tab_id: TabId, generation: u64) -> Option<RefreshSession> {
        if self.is_current(tab_id, generation) {
            self.remove(tab_id)
        } else {
            None
        }
    }

    pub fn get(&self, tab_id: TabId) -> Option<&RefreshSession> {
        self.sessions.get(&tab_id)
    }

    pub fn get_mut(&mut self, tab_id: TabId) -> Option<&mut RefreshSession> {
        self.sessions.get_mut(&tab_id)
    }

    pub fn is_current(&self, tab_id: TabId, generation: u64) -> bool {
        self.sessions
            .get(&tab_id)
            .is_some_and(|s| s.generation == generation)
    }

    /// Active tabs in ascending id order.
    pub fn active_tabs(&self) -> Vec<TabId> {
        let mut tabs: Vec<TabId> = self.sessions.keys().copied().collect();
        tabs.sort();
        tabs
    }

    pub fn iter(&self) -> impl Iterator<Item = &RefreshSession> {
        self.sessions.values()
    }

    /// Disarm and remove every session.
    pub fn drain(&mut self) -> Vec<RefreshSession> {
        let drained: Vec<RefreshSession> = self.sessions.drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.disarm();
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
