use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::{Command, Output};

use mediastack_core::StackConfig;

use crate::status::{parse_ps_output, with_declared};
use crate::{evaluate_start, ComposeError, ControlPlane, StartOutcome};

/// [`ControlPlane`] backed by the `docker` CLI and its compose plugin.
#[derive(Debug, Clone)]
pub struct DockerCompose {
    program: String,
    project_dir: PathBuf,
    compose_file: PathBuf,
    env_file: Option<PathBuf>,
    services: Vec<String>,
}

impl DockerCompose {
    pub fn new(project_dir: impl Into<PathBuf>, compose_file: impl Into<PathBuf>) -> Self {
        Self {
            program: "docker".to_string(),
            project_dir: project_dir.into(),
            compose_file: compose_file.into(),
            env_file: None,
            services: Vec::new(),
        }
    }

    pub fn from_config(config: &StackConfig) -> Self {
        Self {
            env_file: Some(config.env_path()),
            services: config.service_names(),
            ..Self::new(&config.repo_dir, config.compose_path())
        }
    }

    /// Use a different runtime binary (e.g. `podman`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }

    /// Full argv (after the program) for a compose subcommand.
    ///
    /// The env file is checked on every call: an apply may remove it.
    pub fn compose_args(&self, sub: &[&str]) -> Vec<String> {
        let mut args = vec![
            "compose".to_string(),
            "-f".to_string(),
            self.compose_file.display().to_string(),
        ];
        if let Some(env) = self.env_file.as_ref().filter(|env| env.is_file()) {
            args.push("--env-file".to_string());
            args.push(env.display().to_string());
        }
        args.extend(sub.iter().map(|s| s.to_string()));
        args
    }

    fn exec(&self, args: &[String]) -> Result<Output, ComposeError> {
        Command::new(&self.program)
            .args(args)
            .current_dir(&self.project_dir)
            .output()
            .map_err(|source| ComposeError::Spawn {
                program: self.program.clone(),
                source,
            })
    }

    fn compose(&self, sub: &[&str]) -> Result<Output, ComposeError> {
        let args = self.compose_args(sub);
        let output = self.exec(&args)?;
        if output.status.success() {
            return Ok(output);
        }
        Err(ComposeError::CommandFailed {
            command: format!("{} {}", self.program, args.join(" ")),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

impl ControlPlane for DockerCompose {
    fn daemon_active(&self) -> bool {
        match self.exec(&["info".to_string()]) {
            Ok(output) => output.status.success(),
            Err(err) => {
                tracing::debug!("docker info failed: {err}");
                false
            }
        }
    }

    fn stop_all(&self) -> Result<(), ComposeError> {
        self.compose(&["down"]).map(|_| ())
    }

    fn pull_latest_images(&self) -> Result<(), ComposeError> {
        self.compose(&["pull"]).map(|_| ())
    }

    fn start_all(&self) -> Result<StartOutcome, ComposeError> {
        let up = self.compose(&["up", "-d", "--remove-orphans"]).map(|_| ());
        if let Err(err) = &up {
            tracing::warn!("compose up reported failure: {err}");
        }
        evaluate_start(&self.services, up, self.status())
    }

    fn status(&self) -> Result<BTreeMap<String, bool>, ComposeError> {
        let output = self.compose(&["ps", "--all", "--format", "json"])?;
        let observed = parse_ps_output(&String::from_utf8_lossy(&output.stdout))?;
        Ok(with_declared(observed, &self.services))
    }

    fn recent_logs(&self, service: &str, max_lines: usize) -> Result<Vec<String>, ComposeError> {
        let tail = max_lines.to_string();
        let output = self.compose(&["logs", "--no-color", "--tail", tail.as_str(), service])?;
        let text = String::from_utf8_lossy(&output.stdout);
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let skip = lines.len().saturating_sub(max_lines);
        Ok(lines.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn compose_args_include_file_and_env() {
        let dir = TempDir::new().unwrap();
        let env = dir.path().join(".env");
        std::fs::write(&env, "TZ=UTC\n").unwrap();
        let mut compose = DockerCompose::new(dir.path(), "/srv/stack/docker-compose.yml");
        compose.env_file = Some(env.clone());
        assert_eq!(
            compose.compose_args(&["up", "-d"]),
            vec![
                "compose".to_string(),
                "-f".to_string(),
                "/srv/stack/docker-compose.yml".to_string(),
                "--env-file".to_string(),
                env.display().to_string(),
                "up".to_string(),
                "-d".to_string(),
            ]
        );
    }

    #[test]
    fn env_file_removed_after_construction_is_dropped_from_args() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "TZ=UTC\n").unwrap();
        let compose = DockerCompose::from_config(&StackConfig::rooted_at(dir.path()));
        assert!(compose.compose_args(&["ps"]).contains(&"--env-file".to_string()));

        std::fs::remove_file(dir.path().join(".env")).unwrap();
        let args = compose.compose_args(&["up", "-d"]);
        assert!(!args.contains(&"--env-file".to_string()), "{args:?}");
        assert_eq!(args.last().map(String::as_str), Some("-d"));
    }

    #[test]
    fn env_file_created_after_construction_is_picked_up() {
        let dir = TempDir::new().unwrap();
        let compose = DockerCompose::from_config(&StackConfig::rooted_at(dir.path()));
        assert!(!compose.compose_args(&["pull"]).contains(&"--env-file".to_string()));

        std::fs::write(dir.path().join(".env"), "TZ=UTC\n").unwrap();
        assert!(compose.compose_args(&["pull"]).contains(&"--env-file".to_string()));
    }

    #[test]
    fn compose_args_without_env_file() {
        let compose = DockerCompose::new("/srv", "compose.yml");
        assert_eq!(compose.compose_args(&["pull"]), vec!["compose", "-f", "compose.yml", "pull"]);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let compose = DockerCompose::new(".", "compose.yml")
            .with_program("mediastack-definitely-not-a-binary");
        assert!(matches!(compose.stop_all(), Err(ComposeError::Spawn { .. })));
        assert!(!compose.daemon_active());
    }

    #[test]
    fn from_config_takes_declared_services() {
        let dir = TempDir::new().unwrap();
        let compose = DockerCompose::from_config(&StackConfig::rooted_at(dir.path()));
        assert_eq!(compose.services, vec!["jellyfin", "caddy", "xteve"]);
    }
}
