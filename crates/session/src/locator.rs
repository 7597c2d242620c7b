//! Historical-commit locator
//!
//! Finds the most recent commit a patch still applies to. Two strategies:
//! a direct lookup when the patch carries an authorship date, and a binary
//! search over the linear history when it does not.
//!
//! The binary search leans on monotonic applicability: scanned from tip to
//! root, applicability flips at most once from false to true. That can be
//! violated if matching context is later re-introduced, but it bounds the
//! search at O(log N) checkout-and-dry-run probes instead of O(N).

use crate::error::{RerollError, Result};
use crate::patch::PatchArtifact;
use anyhow::Result as AnyResult;
use chrono::{DateTime, Utc};

/// Opaque commit identifier. Ordering is positional (index into the
/// tip-first history sequence), never derived from the id text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitRef(String);

impl CommitRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated id for display.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl std::fmt::Display for CommitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// History queries the locator needs. `applies_at` materializes the
/// working tree at the candidate commit, so probes are not free and the
/// caller must restore the tree once the search concludes.
pub trait HistoryOracle {
    /// Full linear history, newest first (index 0 = tip).
    fn commits(&self) -> AnyResult<Vec<CommitRef>>;

    /// Most recent commit at or before the given time.
    fn commit_before(&self, when: DateTime<Utc>) -> AnyResult<Option<CommitRef>>;

    /// Whether the patch applies cleanly at the given commit.
    fn applies_at(&self, commit: &CommitRef) -> AnyResult<bool>;
}

/// Locate the most recent commit the patch applies to.
pub fn locate(patch: &PatchArtifact, oracle: &impl HistoryOracle) -> Result<CommitRef> {
    locate_with(patch, oracle, &mut |_, _| {})
}

/// Like [`locate`], reporting each applicability probe through `on_probe`
/// so callers can narrate progress.
pub fn locate_with(
    patch: &PatchArtifact,
    oracle: &impl HistoryOracle,
    on_probe: &mut dyn FnMut(&CommitRef, bool),
) -> Result<CommitRef> {
    if let Some(date) = patch.embedded_date()? {
        tracing::debug!(%date, "locating by embedded patch date");
        return oracle
            .commit_before(date)?
            .ok_or(RerollError::NoCommitBeforeDate(date));
    }

    tracing::debug!("no embedded date; binary-searching history");
    binary_search(oracle, on_probe)
}

/// Find the most recent applicable commit in a tip-first history with
/// monotonic applicability (false toward the tip, true toward the root).
///
/// This is "find last true", with true sitting at the *older* end of the
/// sequence; ties consistently prefer the most recent applicable commit.
fn binary_search(
    oracle: &impl HistoryOracle,
    on_probe: &mut dyn FnMut(&CommitRef, bool),
) -> Result<CommitRef> {
    let commits = oracle.commits()?;
    let n = commits.len();
    if n == 0 {
        return Err(RerollError::NotFound);
    }

    // Precondition: the patch must apply at the oldest commit, otherwise
    // the monotonicity assumption gives the search nothing to find.
    let oldest = &commits[n - 1];
    let applies_at_oldest = oracle.applies_at(oldest)?;
    on_probe(oldest, applies_at_oldest);
    if !applies_at_oldest {
        return Err(RerollError::PatchNeverApplicable);
    }

    // Invariant: best always holds an index known to apply; [left, right]
    // brackets the candidates that could still be more recent.
    let mut best = n - 1;
    if n == 1 {
        return Ok(commits[0].clone());
    }

    let mut left = 0usize;
    let mut right = n - 2;

    while left <= right {
        let mid = left + (right - left) / 2;
        let applies = oracle.applies_at(&commits[mid])?;
        on_probe(&commits[mid], applies);

        if applies {
            best = mid;
            if mid == 0 {
                break;
            }
            right = mid - 1;
        } else {
            left = mid + 1;
        }
    }

    Ok(commits[best].clone())
}
