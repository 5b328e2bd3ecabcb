//! Error types for mediastack-sync.

use std::path::PathBuf;

use thiserror::Error;

use mediastack_compose::ComposeError;

/// All errors that can arise from sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The tracked directory is not a usable git work tree.
    #[error("repository unavailable at {path}: {reason}")]
    RepositoryUnavailable { path: PathBuf, reason: String },

    /// The remote could not be reached or the branch resolved.
    #[error("network error: {0}")]
    Network(String),

    /// Resetting the working tree to a revision failed.
    #[error("apply failed: {0}")]
    Apply(String),

    /// Any other git invocation failed.
    #[error("`{command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    /// An error from the container runtime.
    #[error("compose error: {0}")]
    Compose(#[from] ComposeError),

    /// A hook or dependency command exited unsuccessfully.
    #[error("{command} exited with {status}: {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    /// The webhook rejected or never received the notification.
    #[error("notification failed: {0}")]
    Notify(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (manifest, state file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
