//! Scriptable [`RevisionTracker`] and [`Notify`] fakes (testing only)

use std::sync::Mutex;

use mediastack_core::{ChangeSet, Revision};

use crate::error::SyncError;
use crate::git::RevisionTracker;
use crate::notify::Notify;

#[derive(Debug, Default)]
pub struct FakeTracker {
    /// `None` reports the tracking root as unavailable.
    local: Mutex<Option<Revision>>,
    remote: Option<Revision>,
    changes: ChangeSet,
    fail_diff: bool,
    fail_apply: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeTracker {
    /// A tracker at `local` whose remote is at `remote`.
    pub fn at(local: &str, remote: &str) -> Self {
        Self {
            local: Mutex::new(Some(Revision::from(local))),
            remote: Some(Revision::from(remote)),
            ..Self::default()
        }
    }

    /// Not yet a tracking root; the remote is at `remote`.
    pub fn uninitialized(remote: &str) -> Self {
        Self {
            remote: Some(Revision::from(remote)),
            ..Self::default()
        }
    }

    /// At `local` with an unreachable remote.
    pub fn unreachable(local: &str) -> Self {
        Self {
            local: Mutex::new(Some(Revision::from(local))),
            ..Self::default()
        }
    }

    /// Paths returned by `diff` and `tree_paths`.
    pub fn with_changes(mut self, paths: &[&str]) -> Self {
        self.changes = paths.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn failing_diff(mut self) -> Self {
        self.fail_diff = true;
        self
    }

    pub fn failing_apply(mut self) -> Self {
        self.fail_apply = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// The revision now on "disk".
    pub fn local(&self) -> Option<Revision> {
        self.local.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl RevisionTracker for FakeTracker {
    fn current_local_revision(&self) -> Result<Revision, SyncError> {
        self.record("current_local_revision");
        self.local().ok_or_else(|| SyncError::RepositoryUnavailable {
            path: "/fake".into(),
            reason: "not a git work tree".into(),
        })
    }

    fn fetch_remote(&self, branch: &str) -> Result<Revision, SyncError> {
        self.record(format!("fetch_remote:{branch}"));
        self.remote
            .clone()
            .ok_or_else(|| SyncError::Network("could not resolve host".into()))
    }

    fn diff(&self, from: &Revision, to: &Revision) -> Result<ChangeSet, SyncError> {
        self.record("diff");
        if from == to {
            return Ok(ChangeSet::new());
        }
        if self.fail_diff {
            return Err(SyncError::Git {
                command: "git diff".into(),
                stderr: "bad object".into(),
            });
        }
        Ok(self.changes.clone())
    }

    fn tree_paths(&self, _rev: &Revision) -> Result<ChangeSet, SyncError> {
        self.record("tree_paths");
        Ok(self.changes.clone())
    }

    fn apply_revision(&self, to: &Revision) -> Result<(), SyncError> {
        self.record(format!("apply_revision:{to}"));
        if self.fail_apply {
            return Err(SyncError::Apply("index.lock exists".into()));
        }
        *self.local.lock().unwrap() = Some(to.clone());
        Ok(())
    }

    fn initialize(&self, remote_url: &str, branch: &str) -> Result<(), SyncError> {
        self.record(format!("initialize:{remote_url}:{branch}"));
        Ok(())
    }
}

/// Keeps every message it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the message, then reports a delivery failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notify for RecordingNotifier {
    fn send(&self, message: &str) -> Result<(), SyncError> {
        self.sent.lock().unwrap().push(message.to_string());
        if self.fail {
            return Err(SyncError::Notify("HTTP 500".into()));
        }
        Ok(())
    }
}
