//! The sync control loop.
//!
//! One iteration, strictly ordered:
//!
//! 1. Resolve the local revision (initializing a fresh tracking root when a
//!    remote URL is configured) and fetch the remote tip.
//! 2. Stop here when local and remote agree.
//! 3. Diff and classify the change set.
//! 4. Snapshot env and compose files.
//! 5. Apply the remote revision.
//! 6. Reinstall dependencies when the manifest changed.
//! 7. Ensure data directories exist.
//! 8. Pre-apply hook.
//! 9. Restart and verify health, when the change set requires it.
//! 10. Post-apply hook.
//! 11. Notify and record `last_sync.json`.
//!
//! Lower layers return errors; only this module decides whether an error is
//! transient, a warning, or fatal, by recording a [`StepOutcome`].

use std::time::Duration;

use chrono::Utc;

use mediastack_compose::{ControlPlane, DockerCompose, RestartPhase};
use mediastack_core::{Revision, RestartDecision, StackConfig, StepOutcome};
use mediastack_health::disk::FreeSpace;
use mediastack_health::http::HttpCheck;
use mediastack_health::{DfFreeSpace, HealthVerifier, UreqHttp};

use crate::backup;
use crate::classify::{classify, ClassifierRules};
use crate::datadirs::ensure_data_dirs;
use crate::error::SyncError;
use crate::git::{GitRepo, RevisionTracker};
use crate::hooks::{run_command, run_hook, HookOutcome};
use crate::notify::{render_message, Disabled, Notify, WebhookNotifier};
use crate::report::{Step, SyncReport};
use crate::state;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Detect and classify only; touch nothing.
    pub dry_run: bool,
}

/// Everything one iteration talks to.
pub struct SyncPipeline<'a> {
    config: &'a StackConfig,
    tracker: &'a dyn RevisionTracker,
    plane: &'a dyn ControlPlane,
    http: &'a dyn HttpCheck,
    space: &'a dyn FreeSpace,
    notifier: &'a dyn Notify,
    rules: ClassifierRules,
}

impl<'a> SyncPipeline<'a> {
    pub fn new(
        config: &'a StackConfig,
        tracker: &'a dyn RevisionTracker,
        plane: &'a dyn ControlPlane,
        http: &'a dyn HttpCheck,
        space: &'a dyn FreeSpace,
        notifier: &'a dyn Notify,
    ) -> Self {
        Self {
            config,
            tracker,
            plane,
            http,
            space,
            notifier,
            rules: ClassifierRules::from_config(config),
        }
    }

    pub fn with_rules(mut self, rules: ClassifierRules) -> Self {
        self.rules = rules;
        self
    }

    /// Run one iteration. Never panics on step failure; inspect the report.
    pub fn run_iteration(&self, options: RunOptions) -> SyncReport {
        let mut report = SyncReport::begin(options.dry_run);
        self.execute(&mut report, options);

        if !options.dry_run {
            if report.fetch_failed() || report.up_to_date() {
                tracing::debug!("nothing to announce");
            } else {
                self.notify(&mut report);
            }
        }
        report.finish();

        if !options.dry_run {
            if let Err(e) = state::save_at(&self.config.state_path(), &report) {
                tracing::warn!("could not record sync state: {e}");
            }
        }
        tracing::info!("sync finished: {}", report.status_label());
        report
    }

    fn execute(&self, report: &mut SyncReport, options: RunOptions) {
        // 1. revisions
        let local = match self.resolve_local(report, options.dry_run) {
            Some(local) => local,
            None => return,
        };
        report.local = local.clone();

        let remote = match self.tracker.fetch_remote(&self.config.branch) {
            Ok(remote) => remote,
            Err(e) => {
                report.record(Step::Fetch, StepOutcome::Transient(e.to_string()));
                return;
            }
        };
        report.record(Step::Fetch, StepOutcome::Ok);
        report.remote = Some(remote.clone());

        // 2. no-op
        if local.as_ref() == Some(&remote) {
            tracing::info!("already at {}", remote.short());
            return;
        }

        // 3. classify
        self.classify_changes(report, local.as_ref(), &remote);
        tracing::info!(
            "{} -> {}: {} path(s) changed, restart={}, reinstall={}",
            local.as_ref().map_or("none", Revision::short),
            remote.short(),
            report.changes.len(),
            report.decision.restart,
            report.decision.reinstall_dependencies
        );
        if options.dry_run {
            return;
        }

        // 4. backup
        let sources = [self.config.env_path(), self.config.compose_path()];
        match backup::snapshot(
            &sources,
            &self.config.backup_root(),
            Utc::now(),
            local.as_ref(),
        ) {
            Ok(record) => {
                report.record(Step::Backup, StepOutcome::Ok);
                report.backup = Some(record);
            }
            Err(e) => report.record(Step::Backup, StepOutcome::Warning(e.to_string())),
        }

        // 5. apply
        if let Err(e) = self.tracker.apply_revision(&remote) {
            report.record(Step::Apply, StepOutcome::Fatal(e.to_string()));
            return;
        }
        report.record(Step::Apply, StepOutcome::Ok);

        // 6. dependencies
        let outcome = if report.decision.reinstall_dependencies {
            match run_command(&self.config.reinstall_command, &self.config.repo_dir) {
                Ok(()) => StepOutcome::Ok,
                Err(e) => StepOutcome::Warning(e.to_string()),
            }
        } else {
            StepOutcome::Skipped
        };
        report.record(Step::Dependencies, outcome);

        // 7. data dirs
        let outcome = match ensure_data_dirs(&self.config.data_paths()) {
            Ok(dirs) if dirs.unfixed.is_empty() => StepOutcome::Ok,
            Ok(dirs) => StepOutcome::Warning(format!(
                "could not set permissions on {} dir(s)",
                dirs.unfixed.len()
            )),
            Err(e) => StepOutcome::Warning(e.to_string()),
        };
        report.record(Step::DataDirs, outcome);

        // 8. pre hook
        let restart = report.decision.restart;
        let outcome = self.hook(&self.config.hooks.pre_apply, &remote, restart);
        report.record(Step::PreHook, outcome);

        // 9. restart + verify
        let stack_up = if restart {
            self.restart_and_verify(report)
        } else {
            report.record(Step::Health, StepOutcome::Skipped);
            true
        };

        // 10. post hook
        if stack_up {
            let outcome = self.hook(&self.config.hooks.post_apply, &remote, restart);
            report.record(Step::PostHook, outcome);
        } else {
            report.record(Step::PostHook, StepOutcome::Skipped);
        }
    }

    /// `Some(None)` for a freshly initialized root with no checkout yet,
    /// `None` when the iteration cannot continue.
    fn resolve_local(&self, report: &mut SyncReport, dry_run: bool) -> Option<Option<Revision>> {
        let err = match self.tracker.current_local_revision() {
            Ok(rev) => {
                report.record(Step::LocalRevision, StepOutcome::Ok);
                return Some(Some(rev));
            }
            Err(err) => err,
        };

        let (SyncError::RepositoryUnavailable { .. }, Some(url)) = (&err, &self.config.remote_url)
        else {
            report.record(Step::LocalRevision, StepOutcome::Fatal(err.to_string()));
            return None;
        };

        if dry_run {
            report.record(
                Step::LocalRevision,
                StepOutcome::Warning(format!("{err}; would initialize from {url}")),
            );
            return None;
        }

        match self.tracker.initialize(url, &self.config.branch) {
            Ok(()) => {
                report.record(
                    Step::LocalRevision,
                    StepOutcome::Warning(format!("initialized tracking root from {url}")),
                );
                Some(None)
            }
            Err(e) => {
                report.record(Step::LocalRevision, StepOutcome::Fatal(e.to_string()));
                None
            }
        }
    }

    fn classify_changes(&self, report: &mut SyncReport, local: Option<&Revision>, remote: &Revision) {
        let changes = match local {
            Some(local) => self.tracker.diff(local, remote),
            None => self.tracker.tree_paths(remote),
        };
        match changes {
            Ok(changes) => {
                report.decision = classify(&changes, &self.rules);
                report.changes = changes;
                report.record(Step::Diff, StepOutcome::Ok);
            }
            Err(e) => {
                report.decision = RestartDecision {
                    restart: true,
                    reinstall_dependencies: true,
                };
                report.record(
                    Step::Diff,
                    StepOutcome::Warning(format!("{e}; assuming restart and reinstall")),
                );
            }
        }
    }

    fn hook(&self, script: &std::path::Path, revision: &Revision, restarted: bool) -> StepOutcome {
        match run_hook(
            &self.config.in_repo(script),
            &self.config.repo_dir,
            revision,
            restarted,
        ) {
            Ok(HookOutcome::Succeeded) => StepOutcome::Ok,
            Ok(HookOutcome::NotPresent) => StepOutcome::Skipped,
            Err(e) => StepOutcome::Warning(e.to_string()),
        }
    }

    /// Stop, pull, start, settle, verify. Returns whether any service is up.
    fn restart_and_verify(&self, report: &mut SyncReport) -> bool {
        if !self.plane.daemon_active() {
            report.record(
                Step::Daemon,
                StepOutcome::Fatal("container runtime is not running".into()),
            );
            return false;
        }
        report.record(Step::Daemon, StepOutcome::Ok);

        set_phase(report, RestartPhase::Stopping);
        let outcome = match self.plane.stop_all() {
            Ok(()) => StepOutcome::Ok,
            Err(e) => StepOutcome::Warning(e.to_string()),
        };
        report.record(Step::StopServices, outcome);

        set_phase(report, RestartPhase::ImagesRefreshing);
        let outcome = match self.plane.pull_latest_images() {
            Ok(()) => StepOutcome::Ok,
            Err(e) => StepOutcome::Warning(e.to_string()),
        };
        report.record(Step::PullImages, outcome);

        set_phase(report, RestartPhase::Starting);
        match self.plane.start_all() {
            Ok(started) if started.is_degraded() => {
                set_phase(report, RestartPhase::Degraded);
                report.record(
                    Step::StartServices,
                    StepOutcome::Fatal(format!(
                        "{} of {} service(s) failed to start: {}",
                        started.failed.len(),
                        started.failed.len() + started.started.len(),
                        started.failed.join(", ")
                    )),
                );
            }
            Ok(_) => {
                set_phase(report, RestartPhase::Running);
                report.record(Step::StartServices, StepOutcome::Ok);
            }
            Err(e) => {
                set_phase(report, RestartPhase::Degraded);
                report.record(Step::StartServices, StepOutcome::Fatal(e.to_string()));
                report.record(Step::Health, StepOutcome::Skipped);
                return false;
            }
        }

        if self.config.settle_secs > 0 {
            tracing::info!("waiting {}s for services to settle", self.config.settle_secs);
            std::thread::sleep(Duration::from_secs(self.config.settle_secs));
        }

        let health =
            HealthVerifier::for_stack(self.config, self.plane, self.http, self.space).run();
        let outcome = if health.passed() {
            StepOutcome::Ok
        } else {
            StepOutcome::Warning(format!(
                "{} probe(s) reported problems",
                health.problems().count()
            ))
        };
        report.health = Some(health);
        report.record(Step::Health, outcome);
        true
    }

    fn notify(&self, report: &mut SyncReport) {
        let message = render_message(report, self.config.notification_template.as_deref());
        let outcome = match self.notifier.send(&message) {
            Ok(()) => StepOutcome::Ok,
            Err(e) => StepOutcome::Warning(e.to_string()),
        };
        report.record(Step::Notify, outcome);
    }
}

fn set_phase(report: &mut SyncReport, phase: RestartPhase) {
    tracing::info!("restart phase: {phase}");
    report.restart_phase = Some(phase);
}

/// One iteration against the real git, docker, HTTP and disk.
pub fn run(config: &StackConfig, options: RunOptions) -> SyncReport {
    let tracker = GitRepo::new(&config.repo_dir);
    let plane = DockerCompose::from_config(config);
    let notifier: Box<dyn Notify> = match &config.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(
            url.clone(),
            Duration::from_secs(config.http_timeout_secs),
        )),
        None => Box::new(Disabled),
    };

    SyncPipeline::new(config, &tracker, &plane, &UreqHttp, &DfFreeSpace, notifier.as_ref())
        .run_iteration(options)
}
