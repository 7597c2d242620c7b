//! Resume a suspended session

use crate::util;
use owo_colors::OwoColorize;
use session::{Outcome, RerollError, SessionConfig};
use std::path::PathBuf;
use vcs::GitRepo;

pub fn run(
    patch: Option<PathBuf>,
    issue: Option<String>,
    target: Option<String>,
    force: bool,
    output_dir: Option<PathBuf>,
) -> Result<Outcome, RerollError> {
    let repo = GitRepo::discover().map_err(RerollError::from)?;

    // Arguments are optional on resume; when given they must agree with
    // the persisted session.
    let args = match (patch, issue) {
        (Some(patch_path), Some(issue)) => Some(SessionConfig {
            patch_path,
            issue,
            target_ref: target,
            force,
            output_dir: output_dir.clone(),
        }),
        _ => None,
    };

    println!("{}", "Resuming suspended reroll...".dimmed());
    session::resume(&repo, args.as_ref(), force, output_dir.as_deref(), &mut |event| {
        util::print_event(&event)
    })
}
