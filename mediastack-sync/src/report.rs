//! The outcome of one sync iteration.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mediastack_compose::RestartPhase;
use mediastack_core::{BackupRecord, ChangeSet, HealthReport, RestartDecision, Revision, StepOutcome};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
/// Only with `strict_fetch`; otherwise an unreachable remote exits 0.
pub const EXIT_FETCH_FAILED: i32 = 3;

/// Control-loop steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    LocalRevision,
    Fetch,
    Diff,
    Backup,
    Apply,
    Dependencies,
    DataDirs,
    PreHook,
    Daemon,
    StopServices,
    PullImages,
    StartServices,
    Health,
    PostHook,
    Notify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::LocalRevision => "local-revision",
            Step::Fetch => "fetch",
            Step::Diff => "diff",
            Step::Backup => "backup",
            Step::Apply => "apply",
            Step::Dependencies => "dependencies",
            Step::DataDirs => "data-dirs",
            Step::PreHook => "pre-hook",
            Step::Daemon => "daemon",
            Step::StopServices => "stop",
            Step::PullImages => "pull",
            Step::StartServices => "start",
            Step::Health => "health",
            Step::PostHook => "post-hook",
            Step::Notify => "notify",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: Step,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    /// `None` before the first deployment of a fresh tracking root.
    pub local: Option<Revision>,
    pub remote: Option<Revision>,
    pub changes: ChangeSet,
    pub decision: RestartDecision,
    pub backup: Option<BackupRecord>,
    pub steps: Vec<StepRecord>,
    pub restart_phase: Option<RestartPhase>,
    pub health: Option<HealthReport>,
}

impl SyncReport {
    pub fn begin(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            local: None,
            remote: None,
            changes: ChangeSet::new(),
            decision: RestartDecision::default(),
            backup: None,
            steps: Vec::new(),
            restart_phase: None,
            health: None,
        }
    }

    pub fn record(&mut self, step: Step, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Fatal(d) => tracing::error!("{step}: {d}"),
            StepOutcome::Warning(d) | StepOutcome::Transient(d) => tracing::warn!("{step}: {d}"),
            StepOutcome::Ok | StepOutcome::Skipped => tracing::debug!("{step}: {outcome:?}"),
        }
        self.steps.push(StepRecord { step, outcome });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .rev()
            .find(|r| r.step == step)
            .map(|r| &r.outcome)
    }

    pub fn has_fatal(&self) -> bool {
        self.steps.iter().any(|r| r.outcome.is_fatal())
    }

    pub fn fetch_failed(&self) -> bool {
        matches!(self.outcome(Step::Fetch), Some(StepOutcome::Transient(_)))
    }

    /// Local and remote agree: nothing was touched.
    pub fn up_to_date(&self) -> bool {
        self.remote.is_some() && self.local == self.remote && !self.has_fatal()
    }

    pub fn has_warnings(&self) -> bool {
        self.steps
            .iter()
            .any(|r| matches!(r.outcome, StepOutcome::Warning(_)))
            || self.health.as_ref().is_some_and(|h| !h.passed())
    }

    pub fn status_label(&self) -> &'static str {
        if self.has_fatal() {
            "failed"
        } else if self.fetch_failed() {
            "remote unreachable"
        } else if self.up_to_date() {
            "up to date"
        } else if self.dry_run {
            "dry run"
        } else if self.has_warnings() {
            "deployed with warnings"
        } else {
            "deployed"
        }
    }

    /// `1` for any fatal step, `3` for an unreachable remote under
    /// `strict_fetch`, otherwise `0`.
    pub fn exit_code(&self, strict_fetch: bool) -> i32 {
        if self.has_fatal() {
            EXIT_FATAL
        } else if strict_fetch && self.fetch_failed() {
            EXIT_FETCH_FAILED
        } else {
            EXIT_OK
        }
    }
}
