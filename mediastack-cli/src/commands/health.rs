//! `mediastack health`: run the probe battery on demand.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use mediastack_compose::DockerCompose;
use mediastack_core::{HealthReport, StackConfig, Verdict};
use mediastack_health::{DfFreeSpace, HealthVerifier, UreqHttp};

/// Arguments for `mediastack health`.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct ProbeRow {
    #[tabled(rename = "probe")]
    name: String,
    #[tabled(rename = "verdict")]
    verdict: String,
    #[tabled(rename = "detail")]
    detail: String,
}

impl HealthArgs {
    /// Exit 1 if any probe failed; warnings alone exit 0.
    pub fn run(self, config: &StackConfig) -> Result<i32> {
        let plane = DockerCompose::from_config(config);
        let report = HealthVerifier::for_stack(config, &plane, &UreqHttp, &DfFreeSpace).run();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize health JSON")?
            );
        } else {
            print_table(&report);
        }

        Ok(if report.count(Verdict::Fail) > 0 { 1 } else { 0 })
    }
}

fn print_table(report: &HealthReport) {
    let rows: Vec<ProbeRow> = report
        .probes
        .iter()
        .map(|p| ProbeRow {
            name: p.name.clone(),
            verdict: verdict_label(p.verdict),
            detail: p.detail.clone(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!(
        "{} pass | {} warn | {} fail",
        report.count(Verdict::Pass),
        report.count(Verdict::Warn),
        report.count(Verdict::Fail)
    );
}

fn verdict_label(verdict: Verdict) -> String {
    match verdict {
        Verdict::Pass => "PASS".green().bold().to_string(),
        Verdict::Warn => "WARN".yellow().bold().to_string(),
        Verdict::Fail => "FAIL".red().bold().to_string(),
    }
}

/// One line per probe, for embedding in other command output.
pub fn print_probe_lines(report: &HealthReport) {
    for probe in &report.probes {
        println!("  {}  {}: {}", verdict_label(probe.verdict), probe.name, probe.detail);
    }
}
