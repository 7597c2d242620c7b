//! Git oracle for patch rerolling
//!
//! This crate wraps the `git` CLI as an external process and exposes the
//! small set of operations the reroll session needs:
//! - reference queries (current branch, rev-parse, history enumeration)
//! - checkout and branch create/delete
//! - patch dry-run check and apply (strict and fuzzy)
//! - commit, rebase (start/continue/abort), diff between references
//! - explicit repository-status predicates (rebase marker, unmerged paths)

pub mod git;
pub mod status;

// Re-exports
pub use git::{ApplyMode, GitRepo, RebaseOutcome};
pub use status::{has_conflict_markers, CONFLICT_MARKER_END, CONFLICT_MARKER_START};
