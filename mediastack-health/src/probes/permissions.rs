use std::fs;
use std::path::{Path, PathBuf};

use mediastack_core::ProbeResult;

use crate::Probe;

/// Every data directory exists and is writable by this process.
pub struct PermissionProbe {
    dirs: Vec<PathBuf>,
}

impl PermissionProbe {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }
}

fn check_writable(dir: &Path) -> Result<(), String> {
    if !dir.is_dir() {
        return Err("missing".to_string());
    }
    let marker = dir.join(format!(".mediastack-write-test-{}", std::process::id()));
    fs::write(&marker, b"").map_err(|e| e.to_string())?;
    let _ = fs::remove_file(&marker);
    Ok(())
}

impl Probe for PermissionProbe {
    fn name(&self) -> String {
        "permissions".to_string()
    }

    fn run(&self) -> ProbeResult {
        let problems: Vec<String> = self
            .dirs
            .iter()
            .filter_map(|dir| {
                check_writable(dir)
                    .err()
                    .map(|reason| format!("{} ({reason})", dir.display()))
            })
            .collect();

        if problems.is_empty() {
            ProbeResult::pass(
                self.name(),
                format!("{} data directories writable", self.dirs.len()),
            )
        } else {
            ProbeResult::fail(self.name(), format!("not writable: {}", problems.join(", ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediastack_core::Verdict;
    use tempfile::TempDir;

    #[test]
    fn writable_dirs_pass_and_leave_no_marker() {
        let tmp = TempDir::new().unwrap();
        let media = tmp.path().join("media");
        fs::create_dir_all(&media).unwrap();

        let result = PermissionProbe::new(vec![media.clone()]).run();
        assert_eq!(result.verdict, Verdict::Pass);
        assert_eq!(fs::read_dir(&media).unwrap().count(), 0);
    }

    #[test]
    fn missing_dir_fails_with_path() {
        let tmp = TempDir::new().unwrap();
        let ok = tmp.path().join("media");
        fs::create_dir_all(&ok).unwrap();
        let missing = tmp.path().join("caddy_data");

        let result = PermissionProbe::new(vec![ok, missing]).run();
        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.detail.contains("caddy_data (missing)"), "{}", result.detail);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_dir_fails() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let media = tmp.path().join("media");
        let config = tmp.path().join("jellyfin_config");
        fs::create_dir_all(&media).unwrap();
        fs::create_dir_all(&config).unwrap();
        fs::set_permissions(&config, fs::Permissions::from_mode(0o555)).unwrap();

        let privileged = fs::write(config.join("root-check"), b"").is_ok();
        let result = PermissionProbe::new(vec![media, config.clone()]).run();
        fs::set_permissions(&config, fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            // permissions are not enforced for this user
            return;
        }

        assert_eq!(result.verdict, Verdict::Fail);
        assert!(result.detail.contains("jellyfin_config"), "{}", result.detail);
        assert!(!result.detail.contains("media ("), "{}", result.detail);
    }
}
