//! `mediastack sync`: one deployment iteration.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use mediastack_core::{StackConfig, StepOutcome};
use mediastack_sync::{pipeline, RunOptions, SyncReport};

use super::health::print_probe_lines;

/// Arguments for `mediastack sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Fetch and classify only; no backup, apply, restart or notification.
    #[arg(long)]
    pub dry_run: bool,

    /// Exit 3 instead of 0 when the remote cannot be reached.
    #[arg(long)]
    pub strict_fetch: bool,
}

impl SyncArgs {
    pub fn run(self, config: &StackConfig) -> Result<i32> {
        let report = pipeline::run(
            config,
            RunOptions {
                dry_run: self.dry_run,
            },
        );
        print_report(&report);
        Ok(report.exit_code(self.strict_fetch))
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    let short = |rev: &Option<mediastack_core::Revision>| {
        rev.as_ref()
            .map(|r| r.short().to_string())
            .unwrap_or_else(|| "none".to_string())
    };

    let status = report.status_label();
    let status = if report.has_fatal() {
        status.red().bold()
    } else if report.has_warnings() || report.fetch_failed() {
        status.yellow().bold()
    } else {
        status.green().bold()
    };
    println!(
        "{prefix}{status}: {} -> {}",
        short(&report.local),
        short(&report.remote)
    );

    if !report.changes.is_empty() {
        println!(
            "{prefix}{} changed path(s); restart: {}, reinstall dependencies: {}",
            report.changes.len(),
            yes_no(report.decision.restart),
            yes_no(report.decision.reinstall_dependencies)
        );
        for path in &report.changes {
            println!("  ~  {path}");
        }
    }

    if let Some(backup) = &report.backup {
        println!("backup: {}", backup.dir.display());
    }

    for record in &report.steps {
        let line = match &record.outcome {
            StepOutcome::Ok | StepOutcome::Skipped => continue,
            StepOutcome::Transient(d) => format!("  ?  {}: {d}", record.step).yellow(),
            StepOutcome::Warning(d) => format!("  !  {}: {d}", record.step).yellow(),
            StepOutcome::Fatal(d) => format!("  ✗  {}: {d}", record.step).red(),
        };
        println!("{line}");
    }

    if let Some(health) = &report.health {
        println!("health:");
        print_probe_lines(health);
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
