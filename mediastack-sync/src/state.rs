//! `last_sync.json`: the most recent iteration's report.
//!
//! Written atomically (`.tmp` + rename) so a reader never sees a partial
//! document.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};
use crate::report::SyncReport;

pub const STATE_FILE: &str = "last_sync.json";

pub fn state_path_at(state_dir: &Path) -> PathBuf {
    state_dir.join(STATE_FILE)
}

/// `None` if no iteration has been recorded yet.
pub fn load_at(state_dir: &Path) -> Result<Option<SyncReport>, SyncError> {
    let path = state_path_at(state_dir);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(Some(serde_json::from_str(&contents)?))
}

pub fn save_at(state_dir: &Path, report: &SyncReport) -> Result<(), SyncError> {
    std::fs::create_dir_all(state_dir).map_err(|e| io_err(state_dir, e))?;
    let path = state_path_at(state_dir);
    let json = serde_json::to_string_pretty(report)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
