//! Fresh reroll run

use crate::util::{self, StdinConfirm};
use owo_colors::OwoColorize;
use session::{Outcome, RerollError, RerollSession, SessionConfig};
use std::path::PathBuf;
use vcs::GitRepo;

pub fn run(
    patch: PathBuf,
    issue: String,
    target: Option<String>,
    force: bool,
    output_dir: Option<PathBuf>,
) -> Result<Outcome, RerollError> {
    // 1. Find the repository
    let repo = GitRepo::discover().map_err(RerollError::from)?;

    // 2. Assemble the session
    let config = SessionConfig {
        patch_path: patch,
        issue,
        target_ref: target,
        force,
        output_dir,
    };

    println!(
        "{}",
        format!("Rerolling {}...", config.patch_path.display()).dimmed()
    );

    // 3. Drive it to an outcome or the suspend point
    let mut session = RerollSession::new(&repo, config, &StdinConfirm);
    session.run(&mut |event| util::print_event(&event))
}
