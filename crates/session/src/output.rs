//! Output artifact naming
//!
//! The regenerated patch is named from the issue identifier. Without
//! force mode an existing file is never clobbered: the next numbered
//! variant is picked instead.

use std::path::{Path, PathBuf};

/// Pick the path for the regenerated patch.
///
/// Base name is `reroll-<issue>.patch`; collisions fall back to
/// `reroll-<issue>.2.patch`, `.3`, ... unless `force` is set.
pub fn output_path(dir: &Path, issue: &str, force: bool) -> PathBuf {
    let base = dir.join(format!("reroll-{issue}.patch"));
    if force || !base.exists() {
        return base;
    }

    let mut n = 2u32;
    loop {
        let candidate = dir.join(format!("reroll-{issue}.{n}.patch"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
