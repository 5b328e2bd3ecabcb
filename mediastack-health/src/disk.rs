//! Free-space lookup for the media volume.

use std::path::{Path, PathBuf};
use std::process::Command;

pub trait FreeSpace: Send + Sync {
    /// Bytes available to unprivileged users on the volume holding `path`.
    fn available_bytes(&self, path: &Path) -> Result<u64, String>;
}

/// [`FreeSpace`] via POSIX `df -Pk`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DfFreeSpace;

impl FreeSpace for DfFreeSpace {
    fn available_bytes(&self, path: &Path) -> Result<u64, String> {
        let target = nearest_existing(path);
        let output = Command::new("df")
            .arg("-Pk")
            .arg(&target)
            .output()
            .map_err(|e| format!("failed to run df: {e}"))?;
        if !output.status.success() {
            return Err(format!(
                "df {} failed: {}",
                target.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        parse_df_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the `Available` column (1K blocks) of `df -P` output into bytes.
pub fn parse_df_output(stdout: &str) -> Result<u64, String> {
    let line = stdout
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .last()
        .ok_or_else(|| "df returned no data rows".to_string())?;
    let available = line
        .split_whitespace()
        .nth(3)
        .ok_or_else(|| format!("unexpected df row: {line}"))?;
    let kib: u64 = available
        .parse()
        .map_err(|_| format!("non-numeric available column: {available}"))?;
    Ok(kib * 1024)
}

/// `df` fails on missing paths; walk up until something exists.
fn nearest_existing(path: &Path) -> PathBuf {
    let mut current = path.to_path_buf();
    while !current.exists() {
        match current.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => current = parent.to_path_buf(),
            _ => return PathBuf::from("."),
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_posix_df_output() {
        let out = "Filesystem     1024-blocks      Used Available Capacity Mounted on\n\
                   /dev/sda1        102400000  50000000  52400000      49% /\n";
        assert_eq!(parse_df_output(out).unwrap(), 52_400_000 * 1024);
    }

    #[test]
    fn header_only_is_an_error() {
        let out = "Filesystem 1024-blocks Used Available Capacity Mounted on\n";
        assert!(parse_df_output(out).is_err());
    }

    #[test]
    fn nearest_existing_walks_up() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("a").join("b");
        assert_eq!(nearest_existing(&missing), tmp.path());
    }
}
