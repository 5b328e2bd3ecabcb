//! Config load error-message, resolution-order, and write integration tests.

use assert_fs::prelude::*;
use mediastack_core::{
    config::{self, StackConfig, CONFIG_FILE_NAME},
    ConfigError,
};
use predicates::prelude::predicate;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// 1. Load error messages
// ---------------------------------------------------------------------------

#[test]
fn load_missing_config_returns_not_found() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join("nope.yaml");
    let err = config::load_at(&path).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got: {err}");
    assert!(err.to_string().contains("nope.yaml"));
}

#[test]
fn load_corrupt_yaml_returns_parse_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(CONFIG_FILE_NAME);
    file.write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains(CONFIG_FILE_NAME));
}

#[test]
fn load_wrong_type_returns_parse_error() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(CONFIG_FILE_NAME);
    file.write_str("settle_secs: soon\n").expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Defaults and partial files
// ---------------------------------------------------------------------------

#[test]
fn empty_file_yields_defaults_rooted_at_file_dir() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(CONFIG_FILE_NAME);
    file.write_str("").expect("write");

    let loaded = config::load_at(file.path()).expect("load");
    assert_eq!(loaded.repo_dir, dir.path().join("."));
    assert_eq!(loaded.branch, "main");
    assert_eq!(loaded.services.len(), 3);
}

#[test]
fn partial_file_keeps_defaults_for_missing_sections() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(CONFIG_FILE_NAME);
    file.write_str(
        "branch: production\nsettle_secs: 5\nservices:\n  - name: jellyfin\n    health_url: http://127.0.0.1:8096/health\n",
    )
    .expect("write");

    let loaded = config::load_at(file.path()).expect("load");
    assert_eq!(loaded.branch, "production");
    assert_eq!(loaded.settle_secs, 5);
    assert_eq!(loaded.service_names(), vec!["jellyfin".to_string()]);
    assert_eq!(loaded.log_scan.lines, 50);
    assert_eq!(loaded.disk.warn_below_gb, 5.0);
}

#[test]
fn absolute_repo_dir_is_not_rebased() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(CONFIG_FILE_NAME);
    file.write_str("repo_dir: /srv/mediastack\n").expect("write");

    let loaded = config::load_at(file.path()).expect("load");
    assert_eq!(loaded.repo_dir, PathBuf::from("/srv/mediastack"));
}

#[rstest]
#[case("disk:\n  warn_below_gb: 1\n  fail_below_gb: 5\n")]
#[case("branch: \"\"\n")]
#[case("services:\n  - name: caddy\n  - name: caddy\n")]
fn invalid_configs_are_rejected(#[case] yaml: &str) {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let file = dir.child(CONFIG_FILE_NAME);
    file.write_str(yaml).expect("write");

    let err = config::load_at(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got: {err}");
}

// ---------------------------------------------------------------------------
// 3. Resolution order
// ---------------------------------------------------------------------------

#[test]
fn resolve_prefers_cwd_file_over_user_config() {
    let cwd = assert_fs::TempDir::new().expect("cwd");
    let config_home = assert_fs::TempDir::new().expect("config home");
    cwd.child(CONFIG_FILE_NAME)
        .write_str("branch: from-cwd\n")
        .expect("write");
    config_home
        .child("mediastack/config.yaml")
        .write_str("branch: from-user\n")
        .expect("write");

    let resolved = config::resolve_at(None, cwd.path(), Some(config_home.path())).expect("resolve");
    assert_eq!(resolved.branch, "from-cwd");
}

#[test]
fn resolve_falls_back_to_user_config() {
    let cwd = assert_fs::TempDir::new().expect("cwd");
    let config_home = assert_fs::TempDir::new().expect("config home");
    config_home
        .child("mediastack/config.yaml")
        .write_str("branch: from-user\nrepo_dir: /srv/stack\n")
        .expect("write");

    let resolved = config::resolve_at(None, cwd.path(), Some(config_home.path())).expect("resolve");
    assert_eq!(resolved.branch, "from-user");
}

#[test]
fn resolve_without_any_file_uses_defaults_at_cwd() {
    let cwd = assert_fs::TempDir::new().expect("cwd");
    let resolved = config::resolve_at(None, cwd.path(), None).expect("resolve");
    assert_eq!(resolved, StackConfig::rooted_at(cwd.path()));
}

#[test]
fn resolve_explicit_missing_path_is_an_error() {
    let cwd = assert_fs::TempDir::new().expect("cwd");
    let missing = cwd.path().join("elsewhere.yaml");
    let err = config::resolve_at(Some(&missing), cwd.path(), None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }));
}

// ---------------------------------------------------------------------------
// 4. Write
// ---------------------------------------------------------------------------

#[test]
fn write_then_load_preserves_values() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    let mut config = StackConfig::rooted_at(dir.path());
    config.branch = "stable".into();
    config.webhook_url = Some("https://hooks.example/abc".into());

    config::write_at(&path, &config, false).expect("write");
    dir.child(CONFIG_FILE_NAME)
        .assert(predicate::str::contains("branch: stable"));
    assert!(!path.with_extension("yaml.tmp").exists(), "tmp file must be renamed away");

    let loaded = config::load_at(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn write_refuses_to_clobber_without_force() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "branch: keep-me\n").expect("seed");

    let err = config::write_at(&path, &StackConfig::default(), false).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists { .. }));
    assert_eq!(fs::read_to_string(&path).expect("read"), "branch: keep-me\n");

    config::write_at(&path, &StackConfig::default(), true).expect("forced write");
    assert!(fs::read_to_string(&path).expect("read").contains("branch: main"));
}
