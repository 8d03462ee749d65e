//! Abstract browser host: tab operations, user prompts and UI pushes.

pub mod errors;
pub mod traits;

pub use errors::HostError;
pub use traits::{Notifier, Prompter, TabHost};
