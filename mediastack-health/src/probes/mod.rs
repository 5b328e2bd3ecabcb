//! One [`Probe`](crate::Probe) implementation per health check.

mod daemon;
mod disk;
mod logs;
mod permissions;
mod playlist;
mod service;

pub use daemon::DaemonProbe;
pub use disk::{classify_free_space, DiskProbe};
pub use logs::{count_error_lines, LogErrorProbe};
pub use permissions::PermissionProbe;
pub use playlist::PlaylistProbe;
pub use service::ServiceProbe;
