use std::time::Duration;

use mediastack_compose::ControlPlane;
use mediastack_core::{ProbeResult, ServiceConfig};

use crate::http::HttpCheck;
use crate::Probe;

/// A service is running and, if it declares one, answers its health URL.
///
/// Not running fails; running but unresponsive only warns.
pub struct ServiceProbe<'a> {
    service: ServiceConfig,
    timeout: Duration,
    plane: &'a dyn ControlPlane,
    http: &'a dyn HttpCheck,
}

impl<'a> ServiceProbe<'a> {
    pub fn new(
        service: ServiceConfig,
        timeout: Duration,
        plane: &'a dyn ControlPlane,
        http: &'a dyn HttpCheck,
    ) -> Self {
        Self {
            service,
            timeout,
            plane,
            http,
        }
    }
}

impl Probe for ServiceProbe<'_> {
    fn name(&self) -> String {
        format!("service:{}", self.service.name)
    }

    fn run(&self) -> ProbeResult {
        let running = match self.plane.status() {
            Ok(status) => status.get(&self.service.name).copied().unwrap_or(false),
            Err(err) => {
                return ProbeResult::fail(self.name(), format!("status unavailable: {err}"));
            }
        };
        if !running {
            return ProbeResult::fail(self.name(), "not running");
        }

        let Some(url) = self.service.health_url.as_deref() else {
            return ProbeResult::pass(self.name(), "running (no health endpoint)");
        };
        match self.http.get(url, self.timeout) {
            Ok(code) => ProbeResult::pass(self.name(), format!("running, {url} -> {code}")),
            Err(reason) => {
                ProbeResult::warn(self.name(), format!("running but {url} unreachable: {reason}"))
            }
        }
    }
}
