//! Git CLI wrapper
//!
//! Every operation shells out to `git` with the repository root as the
//! working directory. Failures carry the command's stderr in the error
//! context. Nothing here is retried; the one apply fallback (strict then
//! fuzzy) is driven by the caller through [`ApplyMode`].

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// How strictly a patch is matched against the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// Full context must match (`git apply`)
    Strict,
    /// Reduced context matching (`git apply -C1`)
    Fuzzy,
}

/// Result of starting or continuing a rebase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseOutcome {
    /// Rebase finished; the branch now sits on the new base
    Clean,
    /// Rebase stopped on conflicts and is still in progress
    Conflicted,
}

/// Handle to a git repository, addressed by its working-tree root.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Open a repository at an explicit working-tree root.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.join(".git").exists() {
            anyhow::bail!("Not a git repository: {}", root.display());
        }
        Ok(Self { root })
    }

    /// Find the repository root by walking up from the current directory.
    pub fn discover() -> Result<Self> {
        let mut current = std::env::current_dir().context("Failed to get current directory")?;

        loop {
            if current.join(".git").exists() {
                return Ok(Self { root: current });
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => anyhow::bail!("Not a git repository (no .git directory found)"),
            }
        }
    }

    /// Working-tree root path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of the `.git` directory.
    pub fn git_dir(&self) -> Result<PathBuf> {
        let out = self.run_ok(&["rev-parse", "--absolute-git-dir"])?;
        Ok(PathBuf::from(out.trim()))
    }

    /// Run git and return the raw output, regardless of exit status.
    pub(crate) fn run(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(?args, root = %self.root.display(), "git");
        Command::new("git")
            .current_dir(&self.root)
            // rebase --continue must never drop into an editor
            .env("GIT_EDITOR", "true")
            .args(args)
            .output()
            .with_context(|| format!("Failed to execute git {}", args.join(" ")))
    }

    /// Run git, failing with stderr context unless it exits zero.
    /// Returns trimmed-capable stdout as a String.
    pub(crate) fn run_ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git {} failed: {}", args.join(" "), stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Run git and report only whether it exited zero.
    pub(crate) fn run_check(&self, args: &[&str]) -> Result<bool> {
        Ok(self.run(args)?.status.success())
    }

    /// Current branch name, or the commit id when HEAD is detached.
    pub fn current_ref(&self) -> Result<String> {
        let output = self.run(&["symbolic-ref", "--short", "-q", "HEAD"])?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).trim().to_string());
        }
        // Detached HEAD
        let sha = self.run_ok(&["rev-parse", "HEAD"])?;
        Ok(sha.trim().to_string())
    }

    /// Resolve a reference to a full commit id.
    pub fn rev_parse(&self, reference: &str) -> Result<String> {
        let out = self
            .run_ok(&["rev-parse", "--verify", &format!("{reference}^{{commit}}")])
            .with_context(|| format!("Unknown reference: {reference}"))?;
        Ok(out.trim().to_string())
    }

    /// Check out a reference (branch name or commit id).
    pub fn checkout(&self, reference: &str) -> Result<()> {
        self.run_ok(&["checkout", "--quiet", reference])
            .with_context(|| format!("Failed to check out {reference}"))?;
        Ok(())
    }

    /// Whether a local branch exists.
    pub fn branch_exists(&self, name: &str) -> Result<bool> {
        self.run_check(&[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{name}"),
        ])
    }

    /// Create a local branch pointing at a commit.
    pub fn create_branch(&self, name: &str, at: &str) -> Result<()> {
        self.run_ok(&["branch", name, at])
            .with_context(|| format!("Failed to create branch {name} at {at}"))?;
        Ok(())
    }

    /// Delete a local branch, discarding its commits.
    pub fn delete_branch(&self, name: &str) -> Result<()> {
        self.run_ok(&["branch", "-D", name])
            .with_context(|| format!("Failed to delete branch {name}"))?;
        Ok(())
    }

    /// Full linear history of a reference, newest first.
    pub fn rev_list(&self, reference: &str) -> Result<Vec<String>> {
        let out = self.run_ok(&["rev-list", "--first-parent", reference])?;
        Ok(out.lines().map(|l| l.trim().to_string()).collect())
    }

    /// Most recent commit on a reference at or before the given time.
    pub fn commit_before(
        &self,
        reference: &str,
        when: DateTime<Utc>,
    ) -> Result<Option<String>> {
        let stamp = when.to_rfc3339_opts(SecondsFormat::Secs, true);
        let out = self.run_ok(&[
            "rev-list",
            "-1",
            "--first-parent",
            &format!("--before={stamp}"),
            reference,
        ])?;
        let sha = out.trim();
        if sha.is_empty() {
            Ok(None)
        } else {
            Ok(Some(sha.to_string()))
        }
    }

    /// Dry-run: would this patch apply cleanly to the working tree?
    pub fn apply_check(&self, patch: &Path) -> Result<bool> {
        let patch = patch.to_string_lossy();
        self.run_check(&["apply", "--check", &patch])
    }

    /// Apply a patch to the working tree and index. Staging through
    /// `--index` keeps the subsequent commit to exactly the patch's
    /// changes — untracked files lying around are never swept in.
    /// Returns false when git rejects the patch.
    pub fn apply(&self, patch: &Path, mode: ApplyMode) -> Result<bool> {
        let patch = patch.to_string_lossy();
        match mode {
            ApplyMode::Strict => self.run_check(&["apply", "--index", &patch]),
            ApplyMode::Fuzzy => self.run_check(&["apply", "--index", "-C1", &patch]),
        }
    }

    /// Commit staged changes with the given message.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_ok(&["commit", "--quiet", "-m", message])
            .context("Failed to commit")?;
        Ok(())
    }

    /// Rebase a branch onto a target reference.
    ///
    /// Checks out `branch` as a side effect (git's own behavior). A nonzero
    /// exit with the rebase marker present means the rebase stopped on
    /// conflicts; a nonzero exit without the marker is a hard failure.
    pub fn rebase_onto(&self, target: &str, branch: &str) -> Result<RebaseOutcome> {
        let output = self.run(&["rebase", target, branch])?;
        if output.status.success() {
            return Ok(RebaseOutcome::Clean);
        }
        if self.rebase_in_progress()? {
            return Ok(RebaseOutcome::Conflicted);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git rebase {target} {branch} failed: {}", stderr.trim());
    }

    /// Continue an in-progress rebase after conflicts were resolved.
    ///
    /// A failure that leaves the rebase marker in place is reported as a
    /// fresh conflict, not an error.
    pub fn rebase_continue(&self) -> Result<RebaseOutcome> {
        let output = self.run(&["rebase", "--continue"])?;
        if output.status.success() {
            return Ok(RebaseOutcome::Clean);
        }
        if self.rebase_in_progress()? {
            return Ok(RebaseOutcome::Conflicted);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git rebase --continue failed: {}", stderr.trim());
    }

    /// Abort an in-progress rebase, restoring the pre-rebase state.
    pub fn rebase_abort(&self) -> Result<()> {
        self.run_ok(&["rebase", "--abort"])
            .context("Failed to abort rebase")?;
        Ok(())
    }

    /// Diff between two references, as patch text.
    pub fn diff(&self, from: &str, to: &str) -> Result<Vec<u8>> {
        let output = self.run(&["diff", &format!("{from}..{to}")])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("git diff {from}..{to} failed: {}", stderr.trim());
        }
        Ok(output.stdout)
    }
}
