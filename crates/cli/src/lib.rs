//! Command-line surface for patch rerolling
//!
//! Exit codes: 0 success (including the "already applies" fast path),
//! 1 validation or unrecoverable error, 2 conflicts awaiting manual
//! resolution.

use clap::Parser;
use owo_colors::OwoColorize;
use session::Outcome;
use std::path::PathBuf;
use std::process::ExitCode;

pub mod cmd;
pub mod util;

/// Reroll - regenerate a stale patch against the current state of a branch
#[derive(Parser)]
#[command(name = "reroll")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Patch file to reroll
    #[arg(required_unless_present_any = ["resume", "abort"])]
    pub patch: Option<PathBuf>,

    /// Issue identifier (derives the test-<issue> working branch)
    #[arg(required_unless_present_any = ["resume", "abort"])]
    pub issue: Option<String>,

    /// Reference to reroll onto (default: the current branch)
    pub target: Option<String>,

    /// Resume a session suspended on rebase conflicts
    #[arg(long, conflicts_with = "abort")]
    pub resume: bool,

    /// Abort a suspended session and restore the original branch
    #[arg(long)]
    pub abort: bool,

    /// Skip confirmations and overwrite existing output
    #[arg(short, long)]
    pub force: bool,

    /// Directory for the regenerated patch (default: repository root)
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,
}

const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_CONFLICTS: u8 = 2;

/// Dispatch the parsed invocation and map its outcome to an exit code.
pub fn run(cli: Cli) -> ExitCode {
    let result = if cli.abort {
        cmd::abort::run()
    } else if cli.resume {
        cmd::resume::run(cli.patch, cli.issue, cli.target, cli.force, cli.output_dir)
    } else {
        // clap guarantees both are present outside --resume/--abort
        let (Some(patch), Some(issue)) = (cli.patch, cli.issue) else {
            eprintln!("{} patch and issue are required", "Error:".red());
            return ExitCode::from(EXIT_ERROR);
        };
        cmd::reroll::run(patch, issue, cli.target, cli.force, cli.output_dir)
    };

    match result {
        Ok(outcome) => report_outcome(&outcome),
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn report_outcome(outcome: &Outcome) -> ExitCode {
    match outcome {
        Outcome::AlreadyApplies => {
            println!(
                "{} Patch already applies cleanly; no reroll needed",
                "✓".green()
            );
            ExitCode::from(EXIT_OK)
        }
        Outcome::Completed { output, verified } => {
            println!();
            println!("{} Reroll complete", "✓".green());
            println!("  Wrote {}", output.display().to_string().cyan());
            if !*verified {
                println!(
                    "{} the regenerated patch failed its dry-run re-check;\n  the ephemeral branch was kept for inspection",
                    "Warning:".yellow()
                );
            }
            ExitCode::from(EXIT_OK)
        }
        Outcome::Suspended { unmerged } => {
            println!();
            println!(
                "{} Rebase stopped on {} conflicted file(s):",
                "!".yellow(),
                unmerged.len().to_string().red()
            );
            for path in unmerged {
                println!("  {} {}", "✗".red(), path);
            }
            println!();
            println!("{}", "To resolve:".bold());
            println!("  1. Edit the conflicted files (look for <<<<<<< markers)");
            println!("  2. Stage the resolutions with 'git add'");
            println!("  3. Run {} to continue", "'reroll --resume'".bright_cyan());
            println!();
            println!("{}", "To abort:".dimmed());
            println!("  Run {} to restore the original branch", "'reroll --abort'".bright_cyan());
            ExitCode::from(EXIT_CONFLICTS)
        }
        Outcome::Aborted => {
            println!("{} Session aborted, original branch restored", "✓".green());
            ExitCode::from(EXIT_OK)
        }
    }
}
