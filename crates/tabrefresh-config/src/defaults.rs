//! Built-in fallback values for every optional config field.

pub const DEFAULT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_RESOURCE_CHECK_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_LANGUAGE: &str = "en";

/// How long the continue-prompt waits for an answer before stopping.
pub const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 30;

/// Added to every rearmed countdown so the display never runs ahead of the
/// actual tick.
pub const DEFAULT_REARM_BUFFER_MS: u64 = 100;

/// Upper bound for the rearm buffer. Anything larger visibly desyncs the
/// countdown from the refresh.
pub const MAX_REARM_BUFFER_MS: u64 = 5_000;
