use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::errors::DaemonError;

/// Ownership of the daemon PID file. Removed on drop.
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Claim the PID file for this process.
    ///
    /// Fails with `AlreadyRunning` when the file names a live process. A file
    /// left behind by a dead daemon is replaced.
    pub fn acquire(path: &Path) -> Result<Self, DaemonError> {
        if let Some(existing) = check_daemon_running(path) {
            return Err(DaemonError::AlreadyRunning(existing));
        }

        let pid = std::process::id();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{}\n", pid))?;
        debug!(event = "daemon.pid.write_completed", pid = pid, path = %path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        // Only remove the file if it still names us.
        if read_pid_file(&self.path) != Some(std::process::id()) {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(event = "daemon.pid.remove_completed", path = %self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                event = "daemon.pid.remove_failed",
                path = %self.path.display(),
                error = %e,
            ),
        }
    }
}

/// Read the PID from the PID file. `None` if missing or unparseable.
pub fn read_pid_file(path: &Path) -> Option<u32> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(
                event = "daemon.pid.read_failed",
                path = %path.display(),
                error = %e,
            );
            return None;
        }
    };
    match content.trim().parse::<u32>() {
        Ok(pid) => Some(pid),
        Err(_) => {
            warn!(
                event = "daemon.pid.parse_failed",
                path = %path.display(),
                content = %content.trim(),
            );
            None
        }
    }
}

/// Uses `kill(pid, 0)`, which checks existence without sending a signal.
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        // EPERM: exists, owned by someone else
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// `Some(pid)` if the PID file names a live process.
///
/// A PID file naming a dead process is stale and gets removed.
pub fn check_daemon_running(pid_path: &Path) -> Option<u32> {
    let pid = read_pid_file(pid_path)?;

    if is_process_alive(pid) {
        return Some(pid);
    }

    warn!(
        event = "daemon.pid.stale_detected",
        pid = pid,
        path = %pid_path.display(),
    );
    match fs::remove_file(pid_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            event = "daemon.pid.stale_remove_failed",
            pid = pid,
            path = %pid_path.display(),
            error = %e,
        ),
    }
    None
}
