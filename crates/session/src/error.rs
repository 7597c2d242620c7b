//! Error taxonomy for reroll sessions
//!
//! A rebase conflict is deliberately absent here: it is a suspend signal,
//! surfaced as [`crate::Outcome::Suspended`], not an error. Likewise a
//! verification failure after the output patch is written is a warning
//! carried inside [`crate::Outcome::Completed`].

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RerollError {
    /// Bad arguments or an unreadable patch file; nothing was mutated.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The locator found no commit to try the patch against.
    #[error("no commit found to apply the patch to")]
    NotFound,

    /// The patch's embedded date predates all recorded history.
    #[error("no commit exists at or before {0}")]
    NoCommitBeforeDate(DateTime<Utc>),

    /// The patch does not apply even at the oldest commit.
    #[error("patch does not apply anywhere in history")]
    PatchNeverApplicable,

    /// The patch was rejected at the commit the locator chose.
    #[error("patch failed to apply at {commit}")]
    ApplyFailed { commit: String },

    /// Resume was attempted while conflicts are still unresolved.
    #[error("unresolved conflicts remain in: {}", .0.join(", "))]
    ConflictsUnresolved(Vec<String>),

    /// Fresh arguments disagree with the suspended session's record.
    #[error("arguments do not match the suspended session: {0}")]
    SessionMismatch(String),

    /// A rebase is already in progress that this session does not own.
    #[error("a rebase is in progress that does not belong to a reroll session; finish or abort it first")]
    ForeignRebase,

    /// `--resume` or `--abort` without a persisted session.
    #[error("no suspended reroll session found")]
    NoSession,

    /// `--resume` while git shows no rebase in progress.
    #[error("session state exists but no rebase is in progress; start over or run --abort")]
    NoRebaseInProgress,

    /// Underlying git or IO failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T, E = RerollError> = std::result::Result<T, E>;
