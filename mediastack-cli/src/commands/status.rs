//! `mediastack status`: per-service state and the last sync result.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use mediastack_compose::DockerCompose;
use mediastack_core::{ServiceStatus, StackConfig};
use mediastack_health::{service_statuses, UreqHttp};
use mediastack_sync::{state, SyncReport};

/// Arguments for `mediastack status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "service")]
    name: String,
    #[tabled(rename = "running")]
    running: String,
    #[tabled(rename = "http")]
    http: String,
    #[tabled(rename = "recent errors")]
    errors: usize,
}

#[derive(Serialize)]
struct StatusJson<'a> {
    services: &'a [ServiceStatus],
    last_sync: Option<LastSyncJson>,
}

#[derive(Serialize)]
struct LastSyncJson {
    status: &'static str,
    finished_at: Option<DateTime<Utc>>,
    revision: Option<String>,
    exit_code: i32,
}

impl StatusArgs {
    pub fn run(self, config: &StackConfig) -> Result<i32> {
        let plane = DockerCompose::from_config(config);
        let services = service_statuses(config, &plane, &UreqHttp);
        let last = state::load_at(&config.state_path()).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "ignoring unreadable sync state");
            None
        });

        if self.json {
            let out = StatusJson {
                services: &services,
                last_sync: last.as_ref().map(|r| LastSyncJson {
                    status: r.status_label(),
                    finished_at: r.finished_at,
                    revision: r.remote.as_ref().map(|rev| rev.0.clone()),
                    exit_code: r.exit_code(false),
                }),
            };
            println!(
                "{}",
                serde_json::to_string_pretty(&out).context("failed to serialize status JSON")?
            );
            return Ok(0);
        }

        print_table(&services);
        print_last_sync(last.as_ref());
        Ok(0)
    }
}

fn print_table(services: &[ServiceStatus]) {
    let rows: Vec<ServiceRow> = services
        .iter()
        .map(|s| ServiceRow {
            name: s.name.clone(),
            running: if s.running {
                "up".green().to_string()
            } else {
                "down".red().to_string()
            },
            http: match (s.running, s.http_reachable) {
                (false, _) => "-".dimmed().to_string(),
                (true, true) => "ok".green().to_string(),
                (true, false) => "unreachable".red().to_string(),
            },
            errors: s.recent_error_count,
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn print_last_sync(last: Option<&SyncReport>) {
    let Some(report) = last else {
        println!("last sync: {}", "never".dimmed());
        return;
    };
    let age = report
        .finished_at
        .map(format_age)
        .unwrap_or_else(|| "unfinished".to_string());
    let revision = report
        .remote
        .as_ref()
        .map(|r| r.short().to_string())
        .unwrap_or_else(|| "none".to_string());
    let status = if report.has_fatal() {
        report.status_label().red()
    } else if report.has_warnings() {
        report.status_label().yellow()
    } else {
        report.status_label().green()
    };
    println!("last sync: {status} at {revision} ({age})");
}

fn format_age(at: DateTime<Utc>) -> String {
    let secs = Utc::now().signed_duration_since(at).num_seconds().max(0);
    match secs {
        s if s < 60 => format!("{s}s ago"),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86_400),
    }
}
