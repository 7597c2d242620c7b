//! Patch artifact handling
//!
//! A patch is read-only input: it is never rewritten, only checked,
//! applied, and eventually superseded by a freshly generated file. The
//! only parsing done here is locating a single `Date:` header line, the
//! kind emitted by `git format-patch` and most mail-based patch flows.

use crate::error::{RerollError, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// A patch file on disk.
#[derive(Debug, Clone)]
pub struct PatchArtifact {
    path: PathBuf,
}

impl PatchArtifact {
    /// Open a patch file, failing with `InvalidInput` when it is missing
    /// or not a regular file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(RerollError::InvalidInput(format!(
                "patch file not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the patch, for commit messages and display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Extract the authorship timestamp from the first `Date:` header
    /// line, if the patch carries one.
    pub fn embedded_date(&self) -> Result<Option<DateTime<Utc>>> {
        let bytes = std::fs::read(&self.path).map_err(|e| {
            RerollError::InvalidInput(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let content = String::from_utf8_lossy(&bytes);

        for line in content.lines() {
            if let Some(date) = parse_date_line(line) {
                return Ok(Some(date));
            }
        }

        Ok(None)
    }
}

/// Parse a `Date: ...` header line. Accepts RFC 2822 (what git writes)
/// with an RFC 3339 fallback.
fn parse_date_line(line: &str) -> Option<DateTime<Utc>> {
    let rest = line.strip_prefix("Date:")?.trim();
    if rest.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc2822(rest) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(rest) {
        return Some(parsed.with_timezone(&Utc));
    }

    None
}
