//! Shared helpers for CLI commands

use anyhow::Result;
use owo_colors::OwoColorize;
use session::{Confirm, Phase, SessionEvent};
use std::io::Write;

/// Confirmation prompt over stdin.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> Result<bool> {
        print!("{prompt} [y/N] ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes" | "YES"))
    }
}

/// Narrate session progress the way a human would want to follow it.
pub fn print_event(event: &SessionEvent<'_>) {
    match event {
        SessionEvent::Entered(Phase::Validated) => {
            println!("{}", "Checking whether the patch still applies...".dimmed());
        }
        SessionEvent::Entered(Phase::Rebasing) => {
            println!("{}", "Rebasing onto the target...".dimmed());
        }
        SessionEvent::Entered(_) => {}
        SessionEvent::Probe { commit, applies } => {
            if *applies {
                println!("  {} {}", commit.short().yellow(), "applies".green());
            } else {
                println!("  {} {}", commit.short().yellow(), "does not apply".red());
            }
        }
        SessionEvent::Located { commit } => {
            println!(
                "{} Patch applies at {}",
                "✓".green(),
                commit.short().yellow()
            );
        }
        SessionEvent::ApplyRetryFuzzy => {
            println!(
                "{} Strict apply rejected, retrying with reduced context",
                "!".yellow()
            );
        }
        SessionEvent::BranchReplaced(name) => {
            println!("{} Replaced existing branch {}", "!".yellow(), name.yellow());
        }
        SessionEvent::OutputWritten(path) => {
            println!(
                "{} Wrote {}",
                "✓".green(),
                path.display().to_string().cyan()
            );
        }
        SessionEvent::VerificationFailed => {
            println!(
                "{} Regenerated patch does not re-apply cleanly",
                "✗".red()
            );
        }
    }
}
