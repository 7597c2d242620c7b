//! Reroll session state machine
//!
//! Drives one reroll attempt end to end:
//!
//! ```text
//! Fresh → Validated → Located → BranchCreated → PatchApplied → Rebasing
//!       → {RebaseClean | RebaseConflicted} → PatchGenerated → Verified
//! ```
//!
//! `RebaseConflicted` is the single suspend point: the session state stays
//! persisted, the working tree is left mid-rebase for the operator, and a
//! later invocation re-enters through [`resume`] once conflicts are
//! resolved and staged. Every other exit restores the original reference.

use crate::error::{RerollError, Result};
use crate::locator::{self, CommitRef, HistoryOracle};
use crate::output;
use crate::patch::PatchArtifact;
use crate::state::SessionState;
use anyhow::{Context, Result as AnyResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use vcs::{ApplyMode, GitRepo, RebaseOutcome};

/// Phases of a reroll session, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Fresh,
    Validated,
    Located,
    BranchCreated,
    PatchApplied,
    Rebasing,
    RebaseClean,
    RebaseConflicted,
    PatchGenerated,
    Verified,
}

/// Arguments for one reroll attempt.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Patch file to reroll
    pub patch_path: PathBuf,
    /// Issue identifier; also derives the ephemeral branch name
    pub issue: String,
    /// Reference to reroll onto (default: the current reference)
    pub target_ref: Option<String>,
    /// Skip confirmations, overwrite existing output
    pub force: bool,
    /// Where to write the regenerated patch (default: repository root)
    pub output_dir: Option<PathBuf>,
}

/// How a session ended (conflict suspension included — it is an expected
/// outcome, not an error).
#[derive(Debug)]
pub enum Outcome {
    /// The patch already applies to the target; nothing was created.
    AlreadyApplies,
    /// Full run finished; `verified` is false when the regenerated patch
    /// failed its dry-run re-check (the branch is kept for inspection).
    Completed { output: PathBuf, verified: bool },
    /// Rebase stopped on conflicts; state persisted, tree left mid-rebase.
    Suspended { unmerged: Vec<String> },
    /// A suspended session was abandoned and cleaned up.
    Aborted,
}

/// Confirmation seam for destructive prompts (existing-branch deletion).
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> AnyResult<bool>;
}

/// Confirm implementation that always agrees; used by force mode and tests.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> AnyResult<bool> {
        Ok(true)
    }
}

/// Progress notifications emitted while the machine runs.
#[derive(Debug)]
pub enum SessionEvent<'a> {
    Entered(Phase),
    /// One applicability probe during the binary search
    Probe { commit: &'a CommitRef, applies: bool },
    Located { commit: &'a CommitRef },
    /// Strict apply was rejected; retrying with reduced context
    ApplyRetryFuzzy,
    BranchReplaced(&'a str),
    OutputWritten(&'a Path),
    VerificationFailed,
}

/// Restores the original reference if a session unwinds early.
///
/// Disarmed on every deliberate exit; the drop path also refuses to touch
/// the tree while a rebase is in progress, since switching branches there
/// would corrupt git's rebase state.
struct RestoreGuard<'a> {
    repo: &'a GitRepo,
    original: String,
    armed: bool,
}

impl<'a> RestoreGuard<'a> {
    fn new(repo: &'a GitRepo, original: &str) -> Self {
        Self {
            repo,
            original: original.to_string(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(true) = self.repo.rebase_in_progress() {
            return;
        }
        if let Err(e) = self.repo.checkout(&self.original) {
            tracing::warn!("failed to restore {}: {e:#}", self.original);
        }
    }
}

/// History oracle backed by the real repository. Applicability probes
/// check out the candidate commit and dry-run the patch there.
struct GitOracle<'a> {
    repo: &'a GitRepo,
    patch: &'a PatchArtifact,
    target: &'a str,
}

impl HistoryOracle for GitOracle<'_> {
    fn commits(&self) -> AnyResult<Vec<CommitRef>> {
        let ids = self.repo.rev_list(self.target)?;
        Ok(ids.into_iter().map(CommitRef::new).collect())
    }

    fn commit_before(&self, when: DateTime<Utc>) -> AnyResult<Option<CommitRef>> {
        let id = self.repo.commit_before(self.target, when)?;
        Ok(id.map(CommitRef::new))
    }

    fn applies_at(&self, commit: &CommitRef) -> AnyResult<bool> {
        self.repo.checkout(commit.as_str())?;
        self.repo.apply_check(self.patch.path())
    }
}

/// One fresh reroll attempt against a repository.
pub struct RerollSession<'a, C: Confirm> {
    repo: &'a GitRepo,
    config: SessionConfig,
    confirm: &'a C,
    phase: Phase,
}

impl<'a, C: Confirm> RerollSession<'a, C> {
    pub fn new(repo: &'a GitRepo, config: SessionConfig, confirm: &'a C) -> Self {
        Self {
            repo,
            config,
            confirm,
            phase: Phase::Fresh,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase, on: &mut dyn FnMut(SessionEvent<'_>)) {
        tracing::debug!(?phase, "entering phase");
        self.phase = phase;
        on(SessionEvent::Entered(phase));
    }

    /// Run the session from `Fresh` to a terminal outcome or the
    /// `RebaseConflicted` suspend point.
    pub fn run(&mut self, on: &mut dyn FnMut(SessionEvent<'_>)) -> Result<Outcome> {
        // --- Fresh → Validated ---
        let issue = validate_issue(&self.config.issue)?;
        let patch = PatchArtifact::open(&self.config.patch_path)?;
        let git_dir = self.repo.git_dir()?;

        // A live rebase means either a suspended session (resume it) or
        // someone else's work in progress (hands off either way).
        if self.repo.rebase_in_progress()? {
            return Err(if SessionState::load(&git_dir)?.is_some() {
                RerollError::InvalidInput(
                    "a reroll session is suspended; run --resume or --abort".to_string(),
                )
            } else {
                RerollError::ForeignRebase
            });
        }

        let original_ref = self.repo.current_ref()?;
        let work_branch = format!("test-{issue}");
        if original_ref == work_branch {
            return Err(RerollError::InvalidInput(format!(
                "cannot reroll from the ephemeral branch {work_branch}; check out another reference first"
            )));
        }

        let target_ref = match &self.config.target_ref {
            Some(t) => {
                self.repo
                    .rev_parse(t)
                    .map_err(|_| RerollError::InvalidInput(format!("unknown target reference: {t}")))?;
                t.clone()
            }
            None => original_ref.clone(),
        };
        self.enter(Phase::Validated, on);

        let mut guard = RestoreGuard::new(self.repo, &original_ref);

        // Common-case fast path: nothing to reroll. Checked before any
        // branch creation or persistence.
        if target_ref != original_ref {
            self.repo.checkout(&target_ref)?;
        }
        if self.repo.apply_check(patch.path())? {
            self.repo.checkout(&original_ref)?;
            guard.disarm();
            return Ok(Outcome::AlreadyApplies);
        }

        // Persist before the first destructive operation so a crash later
        // leaves enough to recover or abort from.
        let state = SessionState {
            patch_path: patch.path().to_path_buf(),
            issue: issue.clone(),
            target_ref: target_ref.clone(),
            work_branch: work_branch.clone(),
            original_ref: original_ref.clone(),
        };
        state.save(&git_dir)?;

        // --- Validated → Located ---
        let oracle = GitOracle {
            repo: self.repo,
            patch: &patch,
            target: &target_ref,
        };
        let located = match locator::locate_with(&patch, &oracle, &mut |commit, applies| {
            on(SessionEvent::Probe { commit, applies })
        }) {
            Ok(commit) => commit,
            Err(e) => {
                // Locator failure is terminal: restore the tree, leave no
                // session behind.
                self.repo.checkout(&original_ref)?;
                guard.disarm();
                SessionState::clear(&git_dir)?;
                return Err(e);
            }
        };
        on(SessionEvent::Located { commit: &located });
        self.enter(Phase::Located, on);

        // The search left the tree at its last probe; put it back.
        self.repo.checkout(&target_ref)?;

        // --- Located → BranchCreated ---
        if self.repo.branch_exists(&work_branch)? {
            let allowed = self.config.force
                || self.confirm.confirm(&format!(
                    "Branch {work_branch} already exists. Delete and recreate it?"
                ))?;
            if !allowed {
                SessionState::clear(&git_dir)?;
                return Err(RerollError::InvalidInput(format!(
                    "declined to replace existing branch {work_branch}"
                )));
            }
            self.repo.delete_branch(&work_branch)?;
            on(SessionEvent::BranchReplaced(&work_branch));
        }
        self.repo.create_branch(&work_branch, located.as_str())?;
        self.repo.checkout(&work_branch)?;
        self.enter(Phase::BranchCreated, on);

        // --- BranchCreated → PatchApplied ---
        let mut applied = self.repo.apply(patch.path(), ApplyMode::Strict)?;
        if !applied {
            on(SessionEvent::ApplyRetryFuzzy);
            applied = self.repo.apply(patch.path(), ApplyMode::Fuzzy)?;
        }
        if !applied {
            // Full rollback: the locator's answer was wrong after all.
            self.repo.checkout(&original_ref)?;
            guard.disarm();
            self.repo.delete_branch(&work_branch)?;
            SessionState::clear(&git_dir)?;
            return Err(RerollError::ApplyFailed {
                commit: located.to_string(),
            });
        }
        self.repo
            .commit(&format!("Issue #{issue}: apply {}", patch.file_name()))?;
        self.enter(Phase::PatchApplied, on);

        // --- PatchApplied → Rebasing ---
        self.enter(Phase::Rebasing, on);
        match self.repo.rebase_onto(&target_ref, &work_branch)? {
            RebaseOutcome::Clean => {
                self.enter(Phase::RebaseClean, on);
            }
            RebaseOutcome::Conflicted => {
                // The suspend point: state stays persisted, the tree stays
                // mid-rebase for manual resolution.
                self.enter(Phase::RebaseConflicted, on);
                guard.disarm();
                let unmerged = self.repo.unmerged_paths()?;
                return Ok(Outcome::Suspended { unmerged });
            }
        }

        let outcome = finish(
            self.repo,
            &git_dir,
            &state,
            self.config.force,
            self.config.output_dir.as_deref(),
            on,
        )?;
        guard.disarm();
        Ok(outcome)
    }
}

/// Re-enter a suspended session after manual conflict resolution.
///
/// Fresh arguments, when provided, must agree with the persisted record;
/// disagreement is an error, never a silent override.
pub fn resume(
    repo: &GitRepo,
    args: Option<&SessionConfig>,
    force: bool,
    output_dir: Option<&Path>,
    on: &mut dyn FnMut(SessionEvent<'_>),
) -> Result<Outcome> {
    let git_dir = repo.git_dir()?;
    let state = SessionState::load(&git_dir)?.ok_or(RerollError::NoSession)?;

    if let Some(cfg) = args {
        check_args_match(cfg, &state)?;
    }

    if !repo.rebase_in_progress()? {
        return Err(RerollError::NoRebaseInProgress);
    }

    // Refuse to continue while anything is still conflicted: unmerged
    // index entries, or staged files that kept their markers.
    let mut blocked = repo.unmerged_paths()?;
    for path in repo.staged_paths()? {
        if blocked.contains(&path) {
            continue;
        }
        if vcs::has_conflict_markers(&repo.root().join(&path))? {
            blocked.push(path);
        }
    }
    if !blocked.is_empty() {
        return Err(RerollError::ConflictsUnresolved(blocked));
    }

    on(SessionEvent::Entered(Phase::Rebasing));
    match repo.rebase_continue()? {
        RebaseOutcome::Conflicted => {
            // Treated as a fresh conflict; the session stays suspended.
            on(SessionEvent::Entered(Phase::RebaseConflicted));
            let unmerged = repo.unmerged_paths()?;
            Ok(Outcome::Suspended { unmerged })
        }
        RebaseOutcome::Clean => {
            on(SessionEvent::Entered(Phase::RebaseClean));
            finish(repo, &git_dir, &state, force, output_dir, on)
        }
    }
}

/// Abandon a suspended session: abort the rebase, restore the original
/// reference, delete the ephemeral branch, clear the persisted state.
pub fn abort(repo: &GitRepo) -> Result<Outcome> {
    let git_dir = repo.git_dir()?;
    let state = SessionState::load(&git_dir)?.ok_or(RerollError::NoSession)?;

    if repo.rebase_in_progress()? {
        repo.rebase_abort()?;
    }
    repo.checkout(&state.original_ref)?;
    if repo.branch_exists(&state.work_branch)? {
        repo.delete_branch(&state.work_branch)?;
    }
    SessionState::clear(&git_dir)?;

    Ok(Outcome::Aborted)
}

/// Shared tail of a successful rebase: regenerate, verify, restore.
fn finish(
    repo: &GitRepo,
    git_dir: &Path,
    state: &SessionState,
    force: bool,
    output_dir: Option<&Path>,
    on: &mut dyn FnMut(SessionEvent<'_>),
) -> Result<Outcome> {
    // --- PatchGenerated ---
    let dir = output_dir.unwrap_or_else(|| repo.root());
    let out_path = output::output_path(dir, &state.issue, force);
    let diff = repo.diff(&state.target_ref, &state.work_branch)?;
    std::fs::write(&out_path, &diff)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;
    on(SessionEvent::OutputWritten(&out_path));
    on(SessionEvent::Entered(Phase::PatchGenerated));

    // --- Verified ---
    // Dry-run the regenerated patch against the target. An empty diff
    // means the work was already upstream; nothing left to check.
    let verified = if diff.is_empty() {
        true
    } else {
        repo.checkout(&state.target_ref)?;
        repo.apply_check(&out_path)?
    };
    if !verified {
        on(SessionEvent::VerificationFailed);
    }
    on(SessionEvent::Entered(Phase::Verified));

    // --- Terminal restore ---
    repo.checkout(&state.original_ref)?;
    if verified {
        repo.delete_branch(&state.work_branch)?;
    }
    // A failed verification keeps the branch around for inspection.
    SessionState::clear(git_dir)?;

    Ok(Outcome::Completed {
        output: out_path,
        verified,
    })
}

fn check_args_match(cfg: &SessionConfig, state: &SessionState) -> Result<()> {
    let given = std::fs::canonicalize(&cfg.patch_path).unwrap_or_else(|_| cfg.patch_path.clone());
    let recorded =
        std::fs::canonicalize(&state.patch_path).unwrap_or_else(|_| state.patch_path.clone());
    if given != recorded {
        return Err(RerollError::SessionMismatch(format!(
            "patch is {} but the session recorded {}",
            cfg.patch_path.display(),
            state.patch_path.display()
        )));
    }
    if cfg.issue != state.issue {
        return Err(RerollError::SessionMismatch(format!(
            "issue is {} but the session recorded {}",
            cfg.issue, state.issue
        )));
    }
    if let Some(target) = &cfg.target_ref {
        if *target != state.target_ref {
            return Err(RerollError::SessionMismatch(format!(
                "target is {target} but the session recorded {}",
                state.target_ref
            )));
        }
    }
    Ok(())
}

/// Issue ids become branch and file names, so keep them to safe characters.
fn validate_issue(issue: &str) -> Result<String> {
    if issue.is_empty() {
        return Err(RerollError::InvalidInput("issue id must not be empty".to_string()));
    }
    if !issue
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(RerollError::InvalidInput(format!(
            "issue id '{issue}' contains characters unsuitable for a branch name"
        )));
    }
    Ok(issue.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_issue() {
        assert!(validate_issue("1234").is_ok());
        assert!(validate_issue("abc-42_x").is_ok());
        assert!(validate_issue("").is_err());
        assert!(validate_issue("a b").is_err());
        assert!(validate_issue("x/y").is_err());
    }

    #[test]
    fn test_args_match_detects_disagreement() {
        let state = SessionState {
            patch_path: PathBuf::from("/nonexistent/fix.patch"),
            issue: "1234".to_string(),
            target_ref: "main".to_string(),
            work_branch: "test-1234".to_string(),
            original_ref: "main".to_string(),
        };

        let mut cfg = SessionConfig {
            patch_path: PathBuf::from("/nonexistent/fix.patch"),
            issue: "1234".to_string(),
            target_ref: None,
            force: false,
            output_dir: None,
        };
        assert!(check_args_match(&cfg, &state).is_ok());

        // Omitted target falls back to the recorded one
        cfg.target_ref = Some("main".to_string());
        assert!(check_args_match(&cfg, &state).is_ok());

        cfg.target_ref = Some("develop".to_string());
        assert!(matches!(
            check_args_match(&cfg, &state).unwrap_err(),
            RerollError::SessionMismatch(_)
        ));

        cfg.target_ref = None;
        cfg.issue = "9999".to_string();
        assert!(matches!(
            check_args_match(&cfg, &state).unwrap_err(),
            RerollError::SessionMismatch(_)
        ));

        cfg.issue = "1234".to_string();
        cfg.patch_path = PathBuf::from("/nonexistent/other.patch");
        assert!(matches!(
            check_args_match(&cfg, &state).unwrap_err(),
            RerollError::SessionMismatch(_)
        ));
    }
}
