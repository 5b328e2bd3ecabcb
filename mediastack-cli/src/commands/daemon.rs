//! `mediastack daemon`: run sync on an interval in the foreground.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use mediastack_core::StackConfig;
use mediastack_daemon::{paths, start_blocking, DaemonOptions};

/// Arguments for `mediastack daemon`.
#[derive(Args, Debug)]
pub struct DaemonArgs {
    /// Seconds between sync iterations.
    #[arg(long, default_value_t = paths::DEFAULT_INTERVAL.as_secs())]
    pub interval: u64,

    /// Log to `<state_dir>/logs/daemon.log` instead of stderr.
    #[arg(long)]
    pub log_file: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}

impl DaemonArgs {
    pub fn run(self, config: StackConfig, config_path: Option<PathBuf>) -> Result<i32> {
        start_blocking(
            config,
            DaemonOptions {
                interval: Duration::from_secs(self.interval),
                config_path,
                log_to_file: self.log_file,
                json_logs: self.json_logs,
                ..DaemonOptions::default()
            },
        )?;
        Ok(0)
    }
}
