//! mediastack: keep a self-hosted media stack in sync with its repository.
//!
//! # Usage
//!
//! ```text
//! mediastack sync [--dry-run] [--strict-fetch]
//! mediastack health [--json]
//! mediastack status [--json]
//! mediastack logs <service> [--lines N]
//! mediastack backup
//! mediastack init [--path <file>] [--remote-url <url>] [--branch <name>] [--force]
//! mediastack daemon [--interval <secs>] [--log-file] [--json-logs]
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    backup::BackupArgs, daemon::DaemonArgs, health::HealthArgs, init::InitArgs, logs::LogsArgs,
    status::StatusArgs, sync::SyncArgs,
};
use mediastack_core::{config, StackConfig};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "mediastack",
    version,
    about = "Deploy, restart and health-check a docker-compose media stack from git",
    long_about = None,
)]
struct Cli {
    /// Config file (default: ./mediastack.yaml, then the user config dir).
    #[arg(long, short = 'c', global = true, env = "MEDIASTACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pull the tracked branch, apply it and restart services if needed.
    Sync(SyncArgs),

    /// Run every health probe against the running stack.
    Health(HealthArgs),

    /// Show per-service state and the last sync result.
    Status(StatusArgs),

    /// Print recent log lines for one service.
    Logs(LogsArgs),

    /// Snapshot the env and compose files now.
    Backup(BackupArgs),

    /// Write a default mediastack.yaml.
    Init(InitArgs),

    /// Run sync on a fixed interval until interrupted.
    Daemon(DaemonArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let explicit = cli.config.as_deref();

    let code = match cli.command {
        Commands::Init(args) => args.run()?,
        Commands::Daemon(args) => args.run(load_config(explicit)?, cli.config.clone())?,
        Commands::Sync(args) => {
            mediastack_daemon::init_tracing("info", None, false);
            args.run(&load_config(explicit)?)?
        }
        Commands::Health(args) => {
            mediastack_daemon::init_tracing("warn", None, false);
            args.run(&load_config(explicit)?)?
        }
        Commands::Status(args) => {
            mediastack_daemon::init_tracing("warn", None, false);
            args.run(&load_config(explicit)?)?
        }
        Commands::Logs(args) => {
            mediastack_daemon::init_tracing("warn", None, false);
            args.run(&load_config(explicit)?)?
        }
        Commands::Backup(args) => {
            mediastack_daemon::init_tracing("info", None, false);
            args.run(&load_config(explicit)?)?
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<StackConfig> {
    config::resolve(explicit).context("failed to load mediastack config")
}
