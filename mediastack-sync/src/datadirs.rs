//! Make sure every configured data directory exists and is group-writable.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Directories created by [`ensure_data_dirs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDirs {
    pub created: Vec<PathBuf>,
    /// Directories whose mode could not be set.
    pub unfixed: Vec<PathBuf>,
}

/// Create missing directories and set mode `0775` on unix.
///
/// Creation failure is an error; permission fixes are best-effort.
pub fn ensure_data_dirs(dirs: &[PathBuf]) -> Result<DataDirs, SyncError> {
    let mut result = DataDirs::default();
    for dir in dirs {
        if !dir.is_dir() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
            tracing::info!("created data dir {}", dir.display());
            result.created.push(dir.clone());
        }
        if let Err(e) = fix_permissions(dir) {
            tracing::warn!("could not set permissions on {}: {e}", dir.display());
            result.unfixed.push(dir.clone());
        }
    }
    Ok(result)
}

#[cfg(unix)]
fn fix_permissions(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o775))
}

#[cfg(not(unix))]
fn fix_permissions(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_only_missing_dirs() {
        let tmp = TempDir::new().unwrap();
        let existing = tmp.path().join("media");
        std::fs::create_dir(&existing).unwrap();
        let missing = tmp.path().join("xteve_config");

        let result = ensure_data_dirs(&[existing.clone(), missing.clone()]).unwrap();

        assert_eq!(result.created, vec![missing.clone()]);
        assert!(missing.is_dir());
        assert!(result.unfixed.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn sets_group_writable_mode() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("caddy_data");

        ensure_data_dirs(&[dir.clone()]).unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o775);
    }

    #[test]
    fn file_in_the_way_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("media");
        std::fs::write(&blocker, "").unwrap();
        assert!(ensure_data_dirs(&[blocker]).is_err());
    }
}
