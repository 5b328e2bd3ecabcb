//! `mediastack backup`: snapshot the env and compose files on demand.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use mediastack_core::StackConfig;
use mediastack_sync::{backup, GitRepo, RevisionTracker};

/// Arguments for `mediastack backup`.
#[derive(Args, Debug)]
pub struct BackupArgs {}

impl BackupArgs {
    pub fn run(self, config: &StackConfig) -> Result<i32> {
        let revision = GitRepo::new(&config.repo_dir).current_local_revision().ok();
        let sources = [config.env_path(), config.compose_path()];
        let record = backup::snapshot(&sources, &config.backup_root(), Utc::now(), revision.as_ref())
            .context("backup failed")?;

        println!("{} {}", "backup:".bold(), record.dir.display());
        for path in &record.copied {
            println!("  {}  {}", "+".green(), path.display());
        }
        for path in &record.skipped {
            println!("  {}  {} (missing)", "-".yellow(), path.display());
        }
        Ok(0)
    }
}
