//! Persisted session record
//!
//! One small serde_json file under the repository's git dir. Written
//! right after validation succeeds and before the first mutating git
//! operation; cleared only on terminal success or terminal non-resumable
//! failure. While a session is suspended on rebase conflicts the file
//! stays put — that is the resumability contract.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Session state persisted to `<git-dir>/reroll/session.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Path to the patch being rerolled
    pub patch_path: PathBuf,
    /// Issue identifier the patch belongs to
    pub issue: String,
    /// Reference the patch is being rerolled onto
    pub target_ref: String,
    /// Ephemeral working branch (`test-<issue>`)
    pub work_branch: String,
    /// Reference to restore when the session ends
    pub original_ref: String,
}

impl SessionState {
    fn state_path(git_dir: &Path) -> PathBuf {
        git_dir.join("reroll/session.json")
    }

    /// Load session state from the git dir, validating required fields.
    pub fn load(git_dir: &Path) -> Result<Option<SessionState>> {
        let state_path = Self::state_path(git_dir);
        if !state_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&state_path)
            .context("Failed to read session state")?;
        let state: SessionState = serde_json::from_str(&content)
            .context("Failed to parse session state")?;

        if state.issue.is_empty() || state.work_branch.is_empty() || state.original_ref.is_empty()
        {
            anyhow::bail!(
                "Corrupt session state at {} (empty required field)",
                state_path.display()
            );
        }

        Ok(Some(state))
    }

    /// Save session state to the git dir.
    pub fn save(&self, git_dir: &Path) -> Result<()> {
        let state_dir = git_dir.join("reroll");
        std::fs::create_dir_all(&state_dir)
            .context("Failed to create session state directory")?;

        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize session state")?;

        std::fs::write(Self::state_path(git_dir), content)
            .context("Failed to write session state")?;

        Ok(())
    }

    /// Clear session state (after terminal success, rollback, or abort).
    pub fn clear(git_dir: &Path) -> Result<()> {
        let state_path = Self::state_path(git_dir);
        if state_path.exists() {
            std::fs::remove_file(&state_path)
                .context("Failed to remove session state")?;
        }
        Ok(())
    }
}
