pub mod errors;
pub mod pid;
pub mod protocol;
pub mod server;
pub mod types;

// Primary re-exports
pub use errors::DaemonError;
pub use server::{HostBridge, ServerContext, run_server};
pub use types::{DaemonConfig, load_daemon_config};
