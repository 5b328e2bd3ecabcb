//! # mediastack-health
//!
//! Health verification for the managed stack.
//!
//! A [`HealthVerifier`] holds a battery of independent [`Probe`]s. Every
//! probe runs on every verification, concurrently, and results are
//! aggregated only after all of them have finished, in registration order.

pub mod disk;
pub mod fakes;
pub mod http;
pub mod probes;

use std::time::Duration;

use mediastack_compose::ControlPlane;
use mediastack_core::{HealthReport, ProbeResult, ServiceStatus, StackConfig, Verdict};

use crate::disk::FreeSpace;
use crate::http::HttpCheck;
use crate::probes::{
    count_error_lines, DaemonProbe, DiskProbe, LogErrorProbe, PermissionProbe, PlaylistProbe,
    ServiceProbe,
};

pub use disk::DfFreeSpace;
pub use http::UreqHttp;

/// One independent, read-only health check.
pub trait Probe: Send + Sync {
    fn name(&self) -> String;
    fn run(&self) -> ProbeResult;
}

/// An ordered set of probes run as one verification.
#[derive(Default)]
pub struct HealthVerifier<'a> {
    probes: Vec<Box<dyn Probe + 'a>>,
}

impl<'a> HealthVerifier<'a> {
    pub fn new() -> Self {
        Self { probes: Vec::new() }
    }

    /// The standard battery for a stack: daemon, disk, permissions, one
    /// liveness and one log probe per service, then the IPTV playlist.
    pub fn for_stack(
        config: &StackConfig,
        plane: &'a dyn ControlPlane,
        http: &'a dyn HttpCheck,
        space: &'a dyn FreeSpace,
    ) -> Self {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let mut verifier = Self::new()
            .with_probe(DaemonProbe::new(plane))
            .with_probe(DiskProbe::new(config.disk_path(), config.disk.clone(), space))
            .with_probe(PermissionProbe::new(config.data_paths()));
        for service in &config.services {
            verifier.push(ServiceProbe::new(service.clone(), timeout, plane, http));
        }
        for service in &config.services {
            verifier.push(LogErrorProbe::new(
                service.name.clone(),
                config.log_scan.clone(),
                plane,
            ));
        }
        verifier.with_probe(PlaylistProbe::new(config.playlist_path()))
    }

    pub fn with_probe(mut self, probe: impl Probe + 'a) -> Self {
        self.push(probe);
        self
    }

    pub fn push(&mut self, probe: impl Probe + 'a) {
        self.probes.push(Box::new(probe));
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run every probe and aggregate. Never short-circuits.
    pub fn run(&self) -> HealthReport {
        let results: Vec<ProbeResult> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .probes
                .iter()
                .map(|probe| (probe.name(), scope.spawn(move || probe.run())))
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| ProbeResult::fail(name, "probe panicked"))
                })
                .collect()
        });

        for result in &results {
            match result.verdict {
                Verdict::Pass => {
                    tracing::info!(probe = %result.name, detail = %result.detail, "probe passed")
                }
                Verdict::Warn => {
                    tracing::warn!(probe = %result.name, detail = %result.detail, "probe warned")
                }
                Verdict::Fail => {
                    tracing::error!(probe = %result.name, detail = %result.detail, "probe failed")
                }
            }
        }

        let report = HealthReport::new(results);
        tracing::info!(
            passed = report.passed(),
            warn = report.count(Verdict::Warn),
            fail = report.count(Verdict::Fail),
            "health verification finished"
        );
        report
    }
}

/// Per-service running / reachable / error-count rows.
pub fn service_statuses(
    config: &StackConfig,
    plane: &dyn ControlPlane,
    http: &dyn HttpCheck,
) -> Vec<ServiceStatus> {
    let timeout = Duration::from_secs(config.http_timeout_secs);
    let running = plane.status().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "service status query failed");
        Default::default()
    });

    config
        .services
        .iter()
        .map(|service| {
            let is_running = running.get(&service.name).copied().unwrap_or(false);
            let http_reachable = is_running
                && service
                    .health_url
                    .as_deref()
                    .map(|url| http.get(url, timeout).is_ok())
                    .unwrap_or(true);
            let recent_error_count = plane
                .recent_logs(&service.name, config.log_scan.lines)
                .map(|lines| count_error_lines(&lines, &config.log_scan.tokens))
                .unwrap_or(0);
            ServiceStatus {
                name: service.name.clone(),
                running: is_running,
                http_reachable,
                recent_error_count,
            }
        })
        .collect()
}
