use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DAEMON_LOG: &str = "daemon.log";

/// Default time between sync iterations.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
/// Shortest interval accepted; a sync iteration may take minutes.
pub const MIN_INTERVAL: Duration = Duration::from_secs(10);
/// How often the log file size is checked.
pub const ROTATION_CHECK: Duration = Duration::from_secs(60);

pub fn logs_dir(state_dir: &Path) -> PathBuf {
    state_dir.join("logs")
}

pub fn log_path(state_dir: &Path) -> PathBuf {
    logs_dir(state_dir).join(DAEMON_LOG)
}
