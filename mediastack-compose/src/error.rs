//! Error types for mediastack-compose.

use thiserror::Error;

/// All errors that can arise from driving the container runtime.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// The runtime binary could not be spawned at all.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The runtime ran but exited unsuccessfully.
    #[error("`{command}` failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    /// `docker compose ps` output was not understood.
    #[error("unparseable service status output: {0}")]
    Status(String),

    /// No declared service came up after `up`.
    #[error("no services started: {0}")]
    StartFailed(String),
}
