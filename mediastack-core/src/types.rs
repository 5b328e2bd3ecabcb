//! Domain types shared by every mediastack crate.
//!
//! All path fields use `PathBuf`; repository-relative change paths are kept
//! as `String` because they come straight from `git diff --name-only`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// An opaque content identifier (commit hash) for the managed tree.
///
/// Revisions are only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(pub String);

impl Revision {
    /// First 8 characters, for log lines and notifications.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Revision {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Revision {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Repository-relative paths that differ between two revisions.
pub type ChangeSet = BTreeSet<String>;

// ---------------------------------------------------------------------------
// Decisions and records
// ---------------------------------------------------------------------------

/// What a set of changes requires of the running stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartDecision {
    pub restart: bool,
    pub reinstall_dependencies: bool,
}

/// A `backups/<timestamp>/` directory created just before an apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub dir: PathBuf,
    pub created_at: DateTime<Utc>,
    /// Files that were copied into `dir`.
    pub copied: Vec<PathBuf>,
    /// Configured sources that did not exist at snapshot time.
    pub skipped: Vec<PathBuf>,
}

/// Point-in-time view of one managed service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub running: bool,
    pub http_reachable: bool,
    pub recent_error_count: usize,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Verdict of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Warn => write!(f, "warn"),
            Verdict::Fail => write!(f, "fail"),
        }
    }
}

/// Named outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub name: String,
    pub verdict: Verdict,
    pub detail: String,
}

impl ProbeResult {
    pub fn new(name: impl Into<String>, verdict: Verdict, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            verdict,
            detail: detail.into(),
        }
    }

    pub fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Verdict::Pass, detail)
    }

    pub fn warn(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Verdict::Warn, detail)
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(name, Verdict::Fail, detail)
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Ordered probe results from one health verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub probes: Vec<ProbeResult>,
}

impl HealthReport {
    pub fn new(probes: Vec<ProbeResult>) -> Self {
        Self { probes }
    }

    /// `true` iff every probe passed. An empty report passes.
    pub fn passed(&self) -> bool {
        self.probes.iter().all(ProbeResult::passed)
    }

    /// Probes that did not pass, in report order.
    pub fn problems(&self) -> impl Iterator<Item = &ProbeResult> {
        self.probes.iter().filter(|p| !p.passed())
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.probes.iter().filter(|p| p.verdict == verdict).count()
    }

    pub fn get(&self, name: &str) -> Option<&ProbeResult> {
        self.probes.iter().find(|p| p.name == name)
    }
}

// ---------------------------------------------------------------------------
// Step outcomes
// ---------------------------------------------------------------------------

/// Classification of one control-loop step.
///
/// Only [`StepOutcome::Fatal`] affects an iteration's exit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum StepOutcome {
    Ok,
    /// The step was not needed this iteration.
    Skipped,
    /// Transient condition; retried by the next scheduled run.
    Transient(String),
    /// Recoverable-but-degraded.
    Warning(String),
    Fatal(String),
}

impl StepOutcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StepOutcome::Fatal(_))
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            StepOutcome::Ok | StepOutcome::Skipped => None,
            StepOutcome::Transient(d) | StepOutcome::Warning(d) | StepOutcome::Fatal(d) => {
                Some(d)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_revision_truncates_to_eight_chars() {
        let rev = Revision::from("0123456789abcdef");
        assert_eq!(rev.short(), "01234567");
        assert_eq!(Revision::from("abc").short(), "abc");
    }

    #[test]
    fn empty_report_passes() {
        assert!(HealthReport::default().passed());
    }

    #[test]
    fn single_fail_among_passes_flips_aggregate() {
        let mut probes: Vec<_> = (0..4)
            .map(|i| ProbeResult::pass(format!("p{i}"), "ok"))
            .collect();
        probes.push(ProbeResult::fail("disk", "0.5 GB free"));
        let report = HealthReport::new(probes);
        assert!(!report.passed());
        assert_eq!(report.probes.len(), 5);
        assert_eq!(report.problems().count(), 1);
    }

    #[test]
    fn warn_also_fails_aggregate() {
        let report = HealthReport::new(vec![
            ProbeResult::pass("daemon", "active"),
            ProbeResult::warn("playlist", "missing"),
        ]);
        assert!(!report.passed());
        assert_eq!(report.count(Verdict::Warn), 1);
    }

    #[test]
    fn only_fatal_outcome_is_fatal() {
        assert!(StepOutcome::Fatal("x".into()).is_fatal());
        assert!(!StepOutcome::Warning("x".into()).is_fatal());
        assert!(!StepOutcome::Transient("x".into()).is_fatal());
        assert_eq!(StepOutcome::Ok.detail(), None);
    }
}
