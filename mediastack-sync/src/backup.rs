//! Pre-apply snapshots under `<backup_root>/<YYYYmmdd_HHMMSS>/`.
//!
//! Each snapshot holds byte-for-byte copies of the configured files plus a
//! `manifest.json` recording the revision being replaced and the SHA-256
//! of every copy. Snapshots are never pruned.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use mediastack_core::{BackupRecord, Revision};

use crate::error::{io_err, SyncError};

pub const MANIFEST_FILE: &str = "manifest.json";

/// On-disk `manifest.json` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub created_at: DateTime<Utc>,
    /// Revision that was on disk when the snapshot was taken.
    pub revision: Option<Revision>,
    pub files: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub source: PathBuf,
    /// File name inside the snapshot directory.
    pub name: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Copy every existing file in `sources` into a fresh timestamped directory.
///
/// Missing sources are recorded in [`BackupRecord::skipped`]; any I/O error
/// on an existing source aborts the snapshot and removes its directory, so a
/// snapshot on disk always has a complete `manifest.json`.
pub fn snapshot(
    sources: &[PathBuf],
    backup_root: &Path,
    now: DateTime<Utc>,
    revision: Option<&Revision>,
) -> Result<BackupRecord, SyncError> {
    let dir = create_snapshot_dir(backup_root, now)?;
    let (copied, skipped) =
        discard_on_error(&dir, || fill_snapshot(&dir, sources, now, revision))?;

    tracing::info!(
        "backup at {}: {} copied, {} skipped",
        dir.display(),
        copied.len(),
        skipped.len()
    );

    Ok(BackupRecord {
        dir,
        created_at: now,
        copied,
        skipped,
    })
}

/// Copy `sources` into `dir` and write the manifest; `(copied, skipped)`.
fn fill_snapshot(
    dir: &Path,
    sources: &[PathBuf],
    now: DateTime<Utc>,
    revision: Option<&Revision>,
) -> Result<(Vec<PathBuf>, Vec<PathBuf>), SyncError> {
    let mut copied = Vec::new();
    let mut skipped = Vec::new();
    let mut entries = Vec::new();

    for source in sources {
        if !source.is_file() {
            tracing::debug!("backup source {} missing, skipped", source.display());
            skipped.push(source.clone());
            continue;
        }
        let Some(name) = source.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            skipped.push(source.clone());
            continue;
        };
        let dest = dir.join(&name);
        let bytes = std::fs::copy(source, &dest).map_err(|e| io_err(source, e))?;
        entries.push(ManifestEntry {
            source: source.clone(),
            name,
            sha256: sha256_file(&dest)?,
            bytes,
        });
        copied.push(dest);
    }

    let manifest = BackupManifest {
        created_at: now,
        revision: revision.cloned(),
        files: entries,
    };
    let manifest_path = dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(&manifest_path, json).map_err(|e| io_err(&manifest_path, e))?;
    Ok((copied, skipped))
}

/// Run `fill`; on error remove `dir` before returning the error.
fn discard_on_error<T>(
    dir: &Path,
    fill: impl FnOnce() -> Result<T, SyncError>,
) -> Result<T, SyncError> {
    fill().map_err(|err| {
        if let Err(rm) = std::fs::remove_dir_all(dir) {
            tracing::warn!("could not remove partial backup {}: {rm}", dir.display());
        }
        err
    })
}

/// Read a snapshot's manifest.
pub fn load_manifest(dir: &Path) -> Result<BackupManifest, SyncError> {
    let path = dir.join(MANIFEST_FILE);
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// `<root>/<YYYYmmdd_HHMMSS>`, or `<stamp>-N` when that already exists.
fn create_snapshot_dir(root: &Path, now: DateTime<Utc>) -> Result<PathBuf, SyncError> {
    std::fs::create_dir_all(root).map_err(|e| io_err(root, e))?;
    let stamp = now.format("%Y%m%d_%H%M%S").to_string();

    let mut candidate = root.join(&stamp);
    let mut n = 1;
    loop {
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                candidate = root.join(format!("{stamp}-{n}"));
                n += 1;
            }
            Err(e) => return Err(io_err(&candidate, e)),
        }
    }
}

fn sha256_file(path: &Path) -> Result<String, SyncError> {
    let bytes = std::fs::read(path).map_err(|e| io_err(path, e))?;
    let mut h = Sha256::new();
    h.update(&bytes);
    Ok(hex::encode(h.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, h, m, s).unwrap()
    }

    #[test]
    fn copies_existing_files_and_skips_missing() {
        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join(".env");
        let compose = tmp.path().join("docker-compose.yml");
        std::fs::write(&env, "TZ=UTC\n").unwrap();

        let record = snapshot(
            &[env.clone(), compose.clone()],
            &tmp.path().join("backups"),
            at(4, 5, 6),
            None,
        )
        .unwrap();

        assert_eq!(record.dir, tmp.path().join("backups").join("20240309_040506"));
        assert_eq!(record.copied, vec![record.dir.join(".env")]);
        assert_eq!(record.skipped, vec![compose]);
        assert_eq!(std::fs::read_to_string(record.dir.join(".env")).unwrap(), "TZ=UTC\n");
    }

    #[test]
    fn failed_fill_removes_the_partial_snapshot() {
        let tmp = TempDir::new().unwrap();
        let dir = create_snapshot_dir(&tmp.path().join("backups"), at(7, 8, 9)).unwrap();
        std::fs::write(dir.join(".env"), "TZ=UTC\n").unwrap();

        let result: Result<(), SyncError> =
            discard_on_error(&dir, || Err(SyncError::Apply("copy failed".into())));

        assert!(result.is_err());
        assert!(!dir.exists());
        assert_eq!(std::fs::read_dir(tmp.path().join("backups")).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_leaves_no_snapshot_behind() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join(".env");
        let compose = tmp.path().join("docker-compose.yml");
        std::fs::write(&env, "TZ=UTC\n").unwrap();
        std::fs::write(&compose, "services: {}\n").unwrap();
        std::fs::set_permissions(&compose, std::fs::Permissions::from_mode(0o000)).unwrap();
        if std::fs::read(&compose).is_ok() {
            // privileged user; permissions are not enforced
            return;
        }

        let root = tmp.path().join("backups");
        let err = snapshot(&[env, compose.clone()], &root, at(7, 8, 9), None).unwrap_err();
        std::fs::set_permissions(&compose, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
        assert_eq!(std::fs::read_dir(&root).unwrap().count(), 0);
    }

    #[test]
    fn same_second_snapshots_get_distinct_dirs() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("backups");
        let first = snapshot(&[], &root, at(1, 2, 3), None).unwrap();
        let second = snapshot(&[], &root, at(1, 2, 3), None).unwrap();
        let third = snapshot(&[], &root, at(1, 2, 3), None).unwrap();

        assert_eq!(first.dir.file_name().unwrap(), "20240309_010203");
        assert_eq!(second.dir.file_name().unwrap(), "20240309_010203-1");
        assert_eq!(third.dir.file_name().unwrap(), "20240309_010203-2");
    }

    #[test]
    fn manifest_records_revision_and_digest() {
        let tmp = TempDir::new().unwrap();
        let compose = tmp.path().join("docker-compose.yml");
        std::fs::write(&compose, "services: {}\n").unwrap();
        let rev = Revision::from("abc123");

        let record = snapshot(&[compose.clone()], &tmp.path().join("b"), at(0, 0, 0), Some(&rev))
            .unwrap();
        let manifest = load_manifest(&record.dir).unwrap();

        assert_eq!(manifest.revision, Some(rev));
        assert_eq!(manifest.files.len(), 1);
        let entry = &manifest.files[0];
        assert_eq!(entry.source, compose);
        assert_eq!(entry.bytes, 13);
        assert_eq!(entry.sha256.len(), 64);
        assert_eq!(entry.sha256, sha256_file(&record.copied[0]).unwrap());
    }

    #[test]
    fn unwritable_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "").unwrap();
        let err = snapshot(&[], &blocker, at(0, 0, 0), None).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "got: {err}");
    }
}
