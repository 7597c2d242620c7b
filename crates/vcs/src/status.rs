//! Repository status predicates
//!
//! Conflict state is detected through explicit git queries (the rebase
//! marker directories, the unmerged-paths diff filter), never by matching
//! substrings of porcelain output. The one content-level heuristic —
//! looking for conflict markers inside a file — is isolated behind
//! [`has_conflict_markers`] so its fragility stays contained.

use crate::git::GitRepo;
use anyhow::{Context, Result};
use std::path::Path;

/// Conflict marker strings (Git-compatible)
pub const CONFLICT_MARKER_START: &str = "<<<<<<<";
pub const CONFLICT_MARKER_END: &str = ">>>>>>>";

impl GitRepo {
    /// Whether a rebase is currently in progress.
    ///
    /// Git keeps its rebase state in `rebase-merge` (interactive/merge
    /// backend) or `rebase-apply` (am backend) under the git dir; either
    /// directory existing is the authoritative in-progress marker.
    pub fn rebase_in_progress(&self) -> Result<bool> {
        let git_dir = self.git_dir()?;
        Ok(git_dir.join("rebase-merge").exists() || git_dir.join("rebase-apply").exists())
    }

    /// Paths that are still unmerged (conflict stage entries in the index).
    pub fn unmerged_paths(&self) -> Result<Vec<String>> {
        let out = self.run_ok(&["diff", "--name-only", "--diff-filter=U"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Paths staged in the index (relative to HEAD).
    pub fn staged_paths(&self) -> Result<Vec<String>> {
        let out = self.run_ok(&["diff", "--cached", "--name-only"])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Check if a file contains conflict markers.
///
/// Returns true if the file contains Git-style conflict markers.
pub fn has_conflict_markers(file_path: &Path) -> Result<bool> {
    if !file_path.exists() {
        return Ok(false);
    }

    let bytes = std::fs::read(file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let content = String::from_utf8_lossy(&bytes);

    Ok(content.contains(CONFLICT_MARKER_START) && content.contains(CONFLICT_MARKER_END))
}
