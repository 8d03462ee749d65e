//! Trigger engine: validation of refresh settings into strategies, the
//! per-strategy evaluation rules, and the recurring per-tab job.

pub mod condition;
pub mod engine;
pub mod errors;
pub mod schedule;
pub mod strategy;

pub use condition::Condition;
pub use engine::{TickFlow, TriggerHandle, arm};
pub use errors::TriggerError;
pub use schedule::{Schedule, TimeWindow};
pub use strategy::{Strategy, TriggerPlan, plan};
