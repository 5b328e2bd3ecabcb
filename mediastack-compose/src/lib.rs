//! # mediastack-compose
//!
//! Service orchestration for the managed stack.
//!
//! [`ControlPlane`] is the seam the sync pipeline and health verifier talk
//! to; [`DockerCompose`] drives the real `docker compose` CLI and
//! [`fakes::FakeControlPlane`] stands in for it in tests.
//!
//! A restart cycle moves through [`RestartPhase`]:
//!
//! ```text
//! Running -> Stopping -> ImagesRefreshing -> Starting -> Running | Degraded
//! ```

mod docker;
mod error;
pub mod fakes;
pub mod status;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use docker::DockerCompose;
pub use error::ComposeError;

/// Lifecycle control over every managed service as a group.
///
/// Implementations must be shareable across the health verifier's probe
/// threads.
pub trait ControlPlane: Send + Sync {
    /// Whether the container runtime itself is reachable.
    fn daemon_active(&self) -> bool;

    fn stop_all(&self) -> Result<(), ComposeError>;

    fn pull_latest_images(&self) -> Result<(), ComposeError>;

    /// Start everything; `Err` only when nothing came up.
    fn start_all(&self) -> Result<StartOutcome, ComposeError>;

    /// Service name → running.
    fn status(&self) -> Result<BTreeMap<String, bool>, ComposeError>;

    /// At most `max_lines` of the newest log output for `service`.
    fn recent_logs(&self, service: &str, max_lines: usize) -> Result<Vec<String>, ComposeError>;
}

/// Result of a `start_all` that brought up at least one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOutcome {
    pub started: Vec<String>,
    pub failed: Vec<String>,
}

impl StartOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Phase of a stop / pull / start cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPhase {
    Running,
    Stopping,
    ImagesRefreshing,
    Starting,
    /// Some services failed to start; persists for the rest of the iteration.
    Degraded,
}

impl fmt::Display for RestartPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestartPhase::Running => write!(f, "running"),
            RestartPhase::Stopping => write!(f, "stopping"),
            RestartPhase::ImagesRefreshing => write!(f, "refreshing images"),
            RestartPhase::Starting => write!(f, "starting"),
            RestartPhase::Degraded => write!(f, "degraded"),
        }
    }
}

/// Combine the `up` result with a post-start status query.
///
/// `declared` empty means "whatever the status query reports".
pub fn evaluate_start(
    declared: &[String],
    up: Result<(), ComposeError>,
    status: Result<BTreeMap<String, bool>, ComposeError>,
) -> Result<StartOutcome, ComposeError> {
    let status = match (status, up) {
        (Ok(status), _) => status,
        (Err(status_err), Ok(())) => {
            tracing::warn!("could not confirm service state after start: {status_err}");
            return Ok(StartOutcome {
                started: declared.to_vec(),
                failed: Vec::new(),
            });
        }
        (Err(_), Err(up_err)) => return Err(up_err),
    };

    let names: Vec<String> = if declared.is_empty() {
        status.keys().cloned().collect()
    } else {
        declared.to_vec()
    };

    let (started, failed): (Vec<String>, Vec<String>) = names
        .into_iter()
        .partition(|name| status.get(name).copied().unwrap_or(false));

    if started.is_empty() {
        let detail = if failed.is_empty() {
            "no services reported".to_string()
        } else {
            failed.join(", ")
        };
        return Err(ComposeError::StartFailed(detail));
    }

    Ok(StartOutcome { started, failed })
}
