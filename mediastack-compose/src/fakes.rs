//! In-memory [`ControlPlane`] fake (testing only)
//!
//! Records every call so tests can assert on ordering, and lets a test
//! script daemon liveness, per-service start failures, and log output.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::{evaluate_start, ComposeError, ControlPlane, StartOutcome};

#[derive(Debug, Default)]
pub struct FakeControlPlane {
    daemon_down: bool,
    declared: Vec<String>,
    running: Mutex<BTreeMap<String, bool>>,
    refuse_start: BTreeSet<String>,
    fail_stop: bool,
    fail_pull: bool,
    fail_up: bool,
    logs: BTreeMap<String, Vec<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    /// A healthy daemon with every service in `services` running.
    pub fn new(services: &[&str]) -> Self {
        let declared: Vec<String> = services.iter().map(|s| s.to_string()).collect();
        let running = declared.iter().map(|s| (s.clone(), true)).collect();
        Self {
            declared,
            running: Mutex::new(running),
            ..Self::default()
        }
    }

    pub fn daemon_down(mut self) -> Self {
        self.daemon_down = true;
        self
    }

    /// `service` is currently stopped.
    pub fn stopped(self, service: &str) -> Self {
        self.running
            .lock()
            .unwrap()
            .insert(service.to_string(), false);
        self
    }

    /// `service` will not come up on `start_all`.
    pub fn refusing_to_start(mut self, service: &str) -> Self {
        self.refuse_start.insert(service.to_string());
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn failing_pull(mut self) -> Self {
        self.fail_pull = true;
        self
    }

    /// `up` fails and no service starts.
    pub fn failing_start(mut self) -> Self {
        self.fail_up = true;
        self
    }

    pub fn with_logs(mut self, service: &str, lines: &[&str]) -> Self {
        self.logs.insert(
            service.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    /// Calls in the order they were made, e.g. `["stop_all", "pull", ...]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn failure(command: &str) -> ComposeError {
        ComposeError::CommandFailed {
            command: command.to_string(),
            status: "exit status: 1".to_string(),
            stderr: "scripted failure".to_string(),
        }
    }
}

impl ControlPlane for FakeControlPlane {
    fn daemon_active(&self) -> bool {
        self.record("daemon_active");
        !self.daemon_down
    }

    fn stop_all(&self) -> Result<(), ComposeError> {
        self.record("stop_all");
        if self.fail_stop {
            return Err(Self::failure("docker compose down"));
        }
        for state in self.running.lock().unwrap().values_mut() {
            *state = false;
        }
        Ok(())
    }

    fn pull_latest_images(&self) -> Result<(), ComposeError> {
        self.record("pull_latest_images");
        if self.fail_pull {
            return Err(Self::failure("docker compose pull"));
        }
        Ok(())
    }

    fn start_all(&self) -> Result<StartOutcome, ComposeError> {
        self.record("start_all");
        if self.fail_up {
            return Err(Self::failure("docker compose up -d"));
        }
        {
            let mut running = self.running.lock().unwrap();
            for name in &self.declared {
                running.insert(name.clone(), !self.refuse_start.contains(name));
            }
        }
        let up = if self.refuse_start.is_empty() {
            Ok(())
        } else {
            Err(Self::failure("docker compose up -d"))
        };
        let status = self.running.lock().unwrap().clone();
        evaluate_start(&self.declared, up, Ok(status))
    }

    fn status(&self) -> Result<BTreeMap<String, bool>, ComposeError> {
        self.record("status");
        Ok(self.running.lock().unwrap().clone())
    }

    fn recent_logs(&self, service: &str, max_lines: usize) -> Result<Vec<String>, ComposeError> {
        self.record(format!("recent_logs:{service}"));
        let lines = self.logs.get(service).cloned().unwrap_or_default();
        let skip = lines.len().saturating_sub(max_lines);
        Ok(lines.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_cycle_restores_running_state() {
        let plane = FakeControlPlane::new(&["jellyfin", "caddy"]);
        plane.stop_all().unwrap();
        assert_eq!(plane.status().unwrap().get("caddy"), Some(&false));
        plane.pull_latest_images().unwrap();
        let outcome = plane.start_all().unwrap();
        assert!(!outcome.is_degraded());
        assert_eq!(
            plane.calls(),
            vec!["stop_all", "status", "pull_latest_images", "start_all"]
        );
    }

    #[test]
    fn refused_service_degrades_start() {
        let plane = FakeControlPlane::new(&["jellyfin", "caddy", "xteve"]).refusing_to_start("xteve");
        let outcome = plane.start_all().unwrap();
        assert_eq!(outcome.failed, vec!["xteve".to_string()]);
    }

    #[test]
    fn logs_are_tailed() {
        let plane = FakeControlPlane::new(&["caddy"]).with_logs("caddy", &["a", "b", "c"]);
        assert_eq!(plane.recent_logs("caddy", 2).unwrap(), vec!["b", "c"]);
        assert!(plane.recent_logs("unknown", 2).unwrap().is_empty());
    }
}
