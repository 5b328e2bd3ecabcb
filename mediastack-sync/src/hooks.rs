//! Operator hook scripts and the dependency reinstall command.

use std::path::Path;
use std::process::Command;

use mediastack_core::Revision;

use crate::error::{io_err, SyncError};

pub const REVISION_ENV: &str = "MEDIASTACK_REVISION";
pub const RESTARTED_ENV: &str = "MEDIASTACK_RESTARTED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// No script at the configured path.
    NotPresent,
    Succeeded,
}

/// Run `script` through `sh` from `cwd` if it exists.
///
/// The script sees the revision just applied and whether services were
/// restarted. A non-zero exit is an error.
pub fn run_hook(
    script: &Path,
    cwd: &Path,
    revision: &Revision,
    restarted: bool,
) -> Result<HookOutcome, SyncError> {
    if !script.is_file() {
        tracing::debug!("hook {} not present", script.display());
        return Ok(HookOutcome::NotPresent);
    }

    tracing::info!("running hook {}", script.display());
    let output = Command::new("sh")
        .arg(script)
        .current_dir(cwd)
        .env(REVISION_ENV, &revision.0)
        .env(RESTARTED_ENV, if restarted { "1" } else { "0" })
        .output()
        .map_err(|e| io_err(script, e))?;

    if !output.status.success() {
        return Err(SyncError::Command {
            command: script.display().to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(HookOutcome::Succeeded)
}

/// Run an argv-style command from `cwd`, e.g. the dependency reinstall.
pub fn run_command(argv: &[String], cwd: &Path) -> Result<(), SyncError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(SyncError::Command {
            command: String::new(),
            status: "not run".into(),
            stderr: "empty command".into(),
        });
    };

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| io_err(cwd, e))?;

    if !output.status.success() {
        return Err(SyncError::Command {
            command: argv.join(" "),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}
