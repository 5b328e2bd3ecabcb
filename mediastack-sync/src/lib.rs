//! # mediastack-sync
//!
//! Keeps a deployed stack in step with its remote repository.
//!
//! Call [`pipeline::run`] for one iteration against the real git, docker and
//! webhook, or build a [`SyncPipeline`] over fakes to drive it in tests.

pub mod backup;
pub mod classify;
pub mod datadirs;
pub mod error;
pub mod fakes;
pub mod git;
pub mod hooks;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod state;

pub use classify::{classify, ClassifierRules};
pub use error::SyncError;
pub use git::{GitRepo, RevisionTracker};
pub use notify::{Notify, WebhookNotifier};
pub use pipeline::{run, RunOptions, SyncPipeline};
pub use report::{Step, SyncReport};
