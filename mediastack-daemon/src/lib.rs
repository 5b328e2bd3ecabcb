//! Interval scheduler for unattended sync: one iteration per tick, never
//! overlapping, with ctrl-c shutdown and daemon log rotation.

mod error;
pub mod log_rotation;
pub mod paths;
mod runtime;

pub use error::DaemonError;
pub use log_rotation::RotationPolicy;
pub use runtime::{init_tracing, run, start_blocking, ConfigReloader, DaemonOptions, IterationSummary};
