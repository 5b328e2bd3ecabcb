//! Revision tracking over the git CLI.
//!
//! Only four operations are needed from the remote: fetch a branch, diff two
//! revisions, list a revision's tree, and hard-reset the working tree. Reset
//! never runs `git clean`, so untracked runtime data (media, `.env`,
//! `backups/`) survives an apply.

use std::path::{Path, PathBuf};
use std::process::Command;

use mediastack_core::{ChangeSet, Revision};

use crate::error::{io_err, SyncError};

pub const REMOTE_NAME: &str = "origin";

/// The version-controlled source of the stack definition.
pub trait RevisionTracker {
    /// The revision currently checked out on disk.
    fn current_local_revision(&self) -> Result<Revision, SyncError>;

    /// Fetch `branch` from the remote and return its tip.
    fn fetch_remote(&self, branch: &str) -> Result<Revision, SyncError>;

    /// Paths that differ between `from` and `to`. Empty when equal.
    fn diff(&self, from: &Revision, to: &Revision) -> Result<ChangeSet, SyncError>;

    /// Every path tracked at `rev`; the change set of a first deployment.
    fn tree_paths(&self, rev: &Revision) -> Result<ChangeSet, SyncError>;

    /// Make the working tree match `to` exactly, discarding local edits.
    fn apply_revision(&self, to: &Revision) -> Result<(), SyncError>;

    /// Turn the directory into a tracking root for `remote_url`.
    fn initialize(&self, remote_url: &str, branch: &str) -> Result<(), SyncError>;
}

/// [`RevisionTracker`] for a local git work tree.
#[derive(Debug, Clone)]
pub struct GitRepo {
    dir: PathBuf,
}

impl GitRepo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether `dir` is the top level of its own git work tree.
    ///
    /// A plain directory nested inside some other repository is not a
    /// tracking root: resetting it would reset the enclosing repository.
    pub fn is_repo(&self) -> bool {
        if !self.dir.is_dir() {
            return false;
        }
        let output = match Command::new("git")
            .args(["rev-parse", "--show-toplevel"])
            .current_dir(&self.dir)
            .output()
        {
            Ok(output) if output.status.success() => output,
            _ => return false,
        };
        let toplevel = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        match (toplevel.canonicalize(), self.dir.canonicalize()) {
            (Ok(toplevel), Ok(dir)) => toplevel == dir,
            _ => false,
        }
    }

    /// Run git in the work tree and return trimmed stdout.
    fn git(&self, args: &[&str]) -> Result<String, SyncError> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.dir)
            .output()
            .map_err(|e| io_err(&self.dir, e))?;

        if !output.status.success() {
            return Err(SyncError::Git {
                command: format!("git {}", args.join(" ")),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn unavailable(&self, reason: impl Into<String>) -> SyncError {
        SyncError::RepositoryUnavailable {
            path: self.dir.clone(),
            reason: reason.into(),
        }
    }
}

fn parse_name_list(stdout: &str) -> ChangeSet {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn remote_ref(branch: &str) -> String {
    format!("refs/remotes/{REMOTE_NAME}/{branch}")
}

impl RevisionTracker for GitRepo {
    fn current_local_revision(&self) -> Result<Revision, SyncError> {
        if !self.is_repo() {
            return Err(self.unavailable("not the top level of a git work tree"));
        }
        let sha = self
            .git(&["rev-parse", "--verify", "HEAD"])
            .map_err(|e| self.unavailable(e.to_string()))?;
        if sha.is_empty() {
            return Err(self.unavailable("git rev-parse HEAD returned empty output"));
        }
        Ok(Revision(sha))
    }

    fn fetch_remote(&self, branch: &str) -> Result<Revision, SyncError> {
        let refspec = format!("+refs/heads/{branch}:{}", remote_ref(branch));
        self.git(&["fetch", "--quiet", REMOTE_NAME, &refspec])
            .map_err(|e| SyncError::Network(e.to_string()))?;
        let target = format!("{}^{{commit}}", remote_ref(branch));
        let sha = self
            .git(&["rev-parse", "--verify", &target])
            .map_err(|e| SyncError::Network(e.to_string()))?;
        Ok(Revision(sha))
    }

    fn diff(&self, from: &Revision, to: &Revision) -> Result<ChangeSet, SyncError> {
        if from == to {
            return Ok(ChangeSet::new());
        }
        let out = self.git(&["diff", "--name-only", "--no-renames", &from.0, &to.0])?;
        Ok(parse_name_list(&out))
    }

    fn tree_paths(&self, rev: &Revision) -> Result<ChangeSet, SyncError> {
        let out = self.git(&["ls-tree", "-r", "--name-only", &rev.0])?;
        Ok(parse_name_list(&out))
    }

    fn apply_revision(&self, to: &Revision) -> Result<(), SyncError> {
        if !self.is_repo() {
            return Err(SyncError::Apply(format!(
                "{} is not the top level of a git work tree",
                self.dir.display()
            )));
        }
        self.git(&["reset", "--hard", "--quiet", &to.0])
            .map_err(|e| SyncError::Apply(e.to_string()))?;
        tracing::info!("working tree reset to {}", to.short());
        Ok(())
    }

    fn initialize(&self, remote_url: &str, branch: &str) -> Result<(), SyncError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        if !self.is_repo() {
            self.git(&["init", "--quiet"])?;
        }
        let head = format!("refs/heads/{branch}");
        self.git(&["symbolic-ref", "HEAD", &head])?;
        if self.git(&["remote", "get-url", REMOTE_NAME]).is_ok() {
            self.git(&["remote", "set-url", REMOTE_NAME, remote_url])?;
        } else {
            self.git(&["remote", "add", REMOTE_NAME, remote_url])?;
        }
        tracing::warn!(
            "initialized tracking root at {} for {remote_url} ({branch})",
            self.dir.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_list_ignores_blank_lines() {
        let set = parse_name_list("docker-compose.yml\n\n scripts/update.sh \n");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["docker-compose.yml", "scripts/update.sh"]
        );
    }

    #[test]
    fn diff_of_equal_revisions_is_empty_without_git() {
        let repo = GitRepo::new("/definitely/not/a/repo");
        let rev = Revision::from("abc123");
        assert!(repo.diff(&rev, &rev).unwrap().is_empty());
    }

    #[test]
    fn missing_dir_is_repository_unavailable() {
        let tmp = tempfile::TempDir::new().unwrap();
        let repo = GitRepo::new(tmp.path().join("missing"));
        let err = repo.current_local_revision().unwrap_err();
        assert!(matches!(err, SyncError::RepositoryUnavailable { .. }), "got: {err}");
    }
}
