//! Stack configuration (`mediastack.yaml`).
//!
//! # Resolution order
//!
//! 1. `--config <path>` / `$MEDIASTACK_CONFIG` (must exist)
//! 2. `<cwd>/mediastack.yaml`
//! 3. `<config_dir>/mediastack/config.yaml`
//! 4. Built-in defaults, with the repository rooted at `<cwd>`
//!
//! # API pattern
//!
//! As with the rest of the workspace, functions that touch user directories
//! have an `_at` form taking explicit roots; tests only call the `_at` forms.
//!
//! Relative paths in the file are resolved against `repo_dir`, and a
//! relative `repo_dir` is resolved against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};

pub const CONFIG_FILE_NAME: &str = "mediastack.yaml";
pub const CONFIG_ENV: &str = "MEDIASTACK_CONFIG";
pub const WEBHOOK_ENV: &str = "MEDIASTACK_WEBHOOK_URL";
/// Older deployments exported the Discord webhook under this name.
pub const LEGACY_WEBHOOK_ENV: &str = "DISCORD_WEBHOOK_URL";

const GB: u64 = 1024 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One managed service as declared in the compose file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    /// Full URL probed with `GET`; `None` means "running" is the only check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_url: Option<String>,
}

impl ServiceConfig {
    pub fn new(name: &str, health_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            health_url: health_url.map(str::to_string),
        }
    }
}

/// Free-space thresholds for the media volume, in gigabytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskConfig {
    /// Volume to inspect; defaults to `repo_dir`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Strictly more than this passes.
    pub warn_below_gb: f64,
    /// Strictly less than this fails.
    pub fail_below_gb: f64,
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            path: None,
            warn_below_gb: 5.0,
            fail_below_gb: 1.0,
        }
    }
}

impl DiskConfig {
    pub fn warn_below_bytes(&self) -> u64 {
        (self.warn_below_gb * GB as f64) as u64
    }

    pub fn fail_below_bytes(&self) -> u64 {
        (self.fail_below_gb * GB as f64) as u64
    }
}

/// Recent-log error scan window and thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogScanConfig {
    pub lines: usize,
    pub warn_at: usize,
    pub fail_at: usize,
    /// Matched case-insensitively anywhere in a line.
    pub tokens: Vec<String>,
}

impl Default for LogScanConfig {
    fn default() -> Self {
        Self {
            lines: 50,
            warn_at: 1,
            fail_at: 5,
            tokens: ["error", "fatal", "panic", "exception", "failed"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Optional operator scripts run around an apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    pub pre_apply: PathBuf,
    pub post_apply: PathBuf,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            pre_apply: PathBuf::from("scripts/pre-deploy.sh"),
            post_apply: PathBuf::from("scripts/post-deploy.sh"),
        }
    }
}

// ---------------------------------------------------------------------------
// StackConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Root of the git working tree holding the compose definition.
    pub repo_dir: PathBuf,
    /// Used to auto-initialize `repo_dir` when it is not a git tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,
    pub branch: String,
    pub compose_file: PathBuf,
    pub env_file: PathBuf,
    pub scripts_dir: PathBuf,
    pub dependency_manifest: PathBuf,
    /// argv run from `repo_dir` when the dependency manifest changes.
    pub reinstall_command: Vec<String>,
    pub backup_dir: PathBuf,
    /// Holds `last_sync.json` and daemon logs.
    pub state_dir: PathBuf,
    pub settle_secs: u64,
    pub http_timeout_secs: u64,
    /// Media root, application config roots, proxy data root.
    pub data_dirs: Vec<PathBuf>,
    pub services: Vec<ServiceConfig>,
    pub disk: DiskConfig,
    pub log_scan: LogScanConfig,
    /// IPTV playlist expected in the aggregator's config directory.
    pub playlist: PathBuf,
    pub hooks: HooksConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Tera template for the notification body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_template: Option<String>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            repo_dir: PathBuf::from("."),
            remote_url: None,
            branch: "main".to_string(),
            compose_file: PathBuf::from("docker-compose.yml"),
            env_file: PathBuf::from(".env"),
            scripts_dir: PathBuf::from("scripts"),
            dependency_manifest: PathBuf::from("requirements.txt"),
            reinstall_command: ["pip3", "install", "-r", "requirements.txt"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            backup_dir: PathBuf::from("backups"),
            state_dir: PathBuf::from(".mediastack"),
            settle_secs: 30,
            http_timeout_secs: 10,
            data_dirs: ["media", "jellyfin_config", "xteve_config", "caddy_data"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            services: vec![
                ServiceConfig::new("jellyfin", Some("http://localhost:8096/health")),
                ServiceConfig::new("caddy", Some("http://localhost:80")),
                ServiceConfig::new("xteve", Some("http://localhost:34400/web/")),
            ],
            disk: DiskConfig::default(),
            log_scan: LogScanConfig::default(),
            playlist: PathBuf::from("xteve_config/playlist.m3u"),
            hooks: HooksConfig::default(),
            webhook_url: None,
            notification_template: None,
        }
    }
}

impl StackConfig {
    /// Defaults rooted at `repo_dir`.
    pub fn rooted_at(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            ..Self::default()
        }
    }

    /// Resolve a possibly-relative path against `repo_dir`.
    pub fn in_repo(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.repo_dir.join(path)
        }
    }

    pub fn compose_path(&self) -> PathBuf {
        self.in_repo(&self.compose_file)
    }

    pub fn env_path(&self) -> PathBuf {
        self.in_repo(&self.env_file)
    }

    pub fn backup_root(&self) -> PathBuf {
        self.in_repo(&self.backup_dir)
    }

    pub fn state_path(&self) -> PathBuf {
        self.in_repo(&self.state_dir)
    }

    pub fn data_paths(&self) -> Vec<PathBuf> {
        self.data_dirs.iter().map(|d| self.in_repo(d)).collect()
    }

    pub fn playlist_path(&self) -> PathBuf {
        self.in_repo(&self.playlist)
    }

    pub fn disk_path(&self) -> PathBuf {
        match &self.disk.path {
            Some(path) => self.in_repo(path),
            None => self.repo_dir.clone(),
        }
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }

    /// Apply environment overrides through `lookup` (usually `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook = lookup(WEBHOOK_ENV).or_else(|| lookup(LEGACY_WEBHOOK_ENV));
        if let Some(url) = webhook.filter(|u| !u.trim().is_empty()) {
            self.webhook_url = Some(url);
        }
    }

    /// Reject configurations that would make the control loop meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.branch.trim().is_empty() {
            return Err(ConfigError::Invalid("branch must not be empty".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(ConfigError::Invalid("service name must not be empty".into()));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate service '{}'",
                    service.name
                )));
            }
        }
        if self.disk.fail_below_gb > self.disk.warn_below_gb {
            return Err(ConfigError::Invalid(format!(
                "disk.fail_below_gb ({}) exceeds disk.warn_below_gb ({})",
                self.disk.fail_below_gb, self.disk.warn_below_gb
            )));
        }
        if self.log_scan.warn_at > self.log_scan.fail_at {
            return Err(ConfigError::Invalid(
                "log_scan.warn_at exceeds log_scan.fail_at".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load / resolve / write
// ---------------------------------------------------------------------------

/// Load and validate a config file. Environment overrides are not applied.
pub fn load_at(path: &Path) -> Result<StackConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut config: StackConfig = if contents.trim().is_empty() {
        StackConfig::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?
    };

    if config.repo_dir.is_relative() {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.repo_dir = base.join(&config.repo_dir);
    }
    config.validate()?;
    Ok(config)
}

/// Resolve the active config from explicit roots.
///
/// `config_home` is the platform config directory (`~/.config` on Linux).
pub fn resolve_at(
    explicit: Option<&Path>,
    cwd: &Path,
    config_home: Option<&Path>,
) -> Result<StackConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_at(path);
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        return load_at(&local);
    }

    if let Some(home) = config_home {
        let user = home.join("mediastack").join("config.yaml");
        if user.exists() {
            return load_at(&user);
        }
    }

    Ok(StackConfig::rooted_at(cwd))
}

/// [`resolve_at`] using the process cwd, `dirs::config_dir()` and env overrides.
pub fn resolve(explicit: Option<&Path>) -> Result<StackConfig, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| io_err(".", e))?;
    let config_home = dirs::config_dir();
    let mut config = resolve_at(explicit, &cwd, config_home.as_deref())?;
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(config)
}

/// Write `config` as YAML to `path`, refusing to clobber unless `force`.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn write_at(path: &Path, config: &StackConfig, force: bool) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
    }
    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| io_err(path, e))?;
    Ok(())
}
