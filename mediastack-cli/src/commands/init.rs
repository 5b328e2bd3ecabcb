//! `mediastack init`: write a starter config.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use mediastack_core::{config, StackConfig};

/// Arguments for `mediastack init`.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the config.
    #[arg(long, default_value = config::CONFIG_FILE_NAME)]
    pub path: PathBuf,

    /// Remote repository to track; enables first-run initialization.
    #[arg(long)]
    pub remote_url: Option<String>,

    /// Branch to track.
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<i32> {
        let stack = StackConfig {
            remote_url: self.remote_url,
            branch: self.branch,
            ..StackConfig::default()
        };
        config::write_at(&self.path, &stack, self.force)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        println!("{} {}", "wrote".green().bold(), self.path.display());
        Ok(0)
    }
}
