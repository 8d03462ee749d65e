//! tabrefresh-core: per-tab browser auto-refresh scheduling
//!
//! This library owns everything the daemon needs to keep tabs refreshing:
//! validated triggers, countdowns, refresh counters and restart snapshots.
//! The browser itself is reached only through the [`host`] traits.
//!
//! # Main Entry Points
//!
//! - [`coordinator`] - Start, stop and query refresh sessions
//! - [`trigger`] - Settings validation and the recurring tick job
//! - [`countdown`] - Timer state for the countdown display
//! - [`persistence`] - Durable key-value storage

pub mod clock;
pub mod coordinator;
pub mod countdown;
pub mod errors;
pub mod host;
pub mod logging;
pub mod persistence;
pub mod prompt;
pub mod sessions;
pub mod trigger;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export wire types the core API speaks in
pub use tabrefresh_protocol::{
    GlobalSettings, LiveSettingsPatch, RefreshMode, RefreshSettings, RefreshStateView, TabId,
    TimerInfo,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{Coordinator, CoordinatorError, CoordinatorOptions, HostServices};
pub use errors::{RefreshError, RefreshResult};
pub use host::{HostError, Notifier, Prompter, TabHost};
pub use persistence::{JsonFileStore, KeyValueStore, MemoryStore, StoreError};

// Re-export logging initialization
pub use logging::init_logging;
