//! mediastack core library: domain types, stack configuration and errors.
//!
//! - [`types`]: revisions, decisions, health and step outcome types
//! - [`config`]: `mediastack.yaml` load / resolve / write
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ServiceConfig, StackConfig};
pub use error::ConfigError;
pub use types::{
    BackupRecord, ChangeSet, HealthReport, ProbeResult, RestartDecision, Revision,
    ServiceStatus, StepOutcome, Verdict,
};
