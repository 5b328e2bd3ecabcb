use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the interval scheduler and its setup.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] mediastack_core::ConfigError),

    #[error("sync error: {0}")]
    Sync(#[from] mediastack_sync::SyncError),

    #[error("{task} task failed: {reason}")]
    Task { task: &'static str, reason: String },

    #[error("invalid interval: {0}")]
    InvalidInterval(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
