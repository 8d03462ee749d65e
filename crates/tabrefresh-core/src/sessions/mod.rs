//! Per-tab refresh sessions: the registry of active triggers, refresh
//! counters and the restart snapshot.

pub mod counters;
pub mod registry;
pub mod snapshot;
pub mod types;

pub use counters::RefreshCounters;
pub use registry::SessionRegistry;
pub use snapshot::{SessionSnapshot, SnapshotEntry};
pub use types::RefreshSession;
