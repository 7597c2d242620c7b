//! Abort a suspended session

use owo_colors::OwoColorize;
use session::{Outcome, RerollError};
use vcs::GitRepo;

pub fn run() -> Result<Outcome, RerollError> {
    let repo = GitRepo::discover().map_err(RerollError::from)?;

    println!("{}", "Aborting suspended reroll...".dimmed());
    session::abort(&repo)
}
