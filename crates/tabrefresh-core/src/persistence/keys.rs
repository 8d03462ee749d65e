//! Storage key layout.

use tabrefresh_protocol::TabId;

pub const REFRESH_COUNT_PREFIX: &str = "refresh_count_";
pub const COUNTDOWN_PREFIX: &str = "countdown_";
pub const SESSION_SNAPSHOT: &str = "session_snapshot";
pub const GLOBAL_SETTINGS: &str = "auto_refresh_settings";

pub fn refresh_count(tab_id: TabId) -> String {
    format!("{}{}", REFRESH_COUNT_PREFIX, tab_id)
}

pub fn countdown(tab_id: TabId) -> String {
    format!("{}{}", COUNTDOWN_PREFIX, tab_id)
}

/// Extract the tab id from a per-tab key such as `countdown_42`.
pub fn tab_from_key(prefix: &str, key: &str) -> Option<TabId> {
    key.strip_prefix(prefix)?.parse().ok()
}
