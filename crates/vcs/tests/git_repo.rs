//! Integration tests for the git wrapper
//!
//! Each test builds a real repository in a temp directory and drives it
//! through the `GitRepo` API.

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use vcs::{ApplyMode, GitRepo, RebaseOutcome};

fn run_git(root: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(root)
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init_repo() -> (TempDir, GitRepo) {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    run_git(root, &["init"]);
    run_git(root, &["checkout", "-b", "main"]);
    run_git(root, &["config", "user.email", "test@example.com"]);
    run_git(root, &["config", "user.name", "Test User"]);
    run_git(root, &["config", "commit.gpgsign", "false"]);
    let repo = GitRepo::open(root).unwrap();
    (temp, repo)
}

fn commit_file(root: &Path, name: &str, content: &str, message: &str) {
    std::fs::write(root.join(name), content).unwrap();
    run_git(root, &["add", "-A"]);
    run_git(root, &["commit", "-m", message]);
}

fn commit_file_at(root: &Path, name: &str, content: &str, message: &str, date: &str) {
    std::fs::write(root.join(name), content).unwrap();
    run_git(root, &["add", "-A"]);
    let output = Command::new("git")
        .current_dir(root)
        .env("GIT_AUTHOR_DATE", date)
        .env("GIT_COMMITTER_DATE", date)
        .args(["commit", "-m", message])
        .output()
        .unwrap();
    assert!(output.status.success());
}

/// Capture `git diff` of the current working tree, then revert it.
fn take_patch(root: &Path) -> Vec<u8> {
    let output = Command::new("git")
        .current_dir(root)
        .args(["diff"])
        .output()
        .unwrap();
    assert!(output.status.success());
    run_git(root, &["checkout", "--", "."]);
    output.stdout
}

#[test]
fn test_open_rejects_non_repo() {
    let temp = TempDir::new().unwrap();
    assert!(GitRepo::open(temp.path()).is_err());
}

#[test]
fn test_current_ref_and_rev_parse() {
    let (temp, repo) = init_repo();
    commit_file(temp.path(), "a.txt", "one\n", "first");

    assert_eq!(repo.current_ref().unwrap(), "main");

    let sha = repo.rev_parse("main").unwrap();
    assert_eq!(sha.len(), 40);
    assert!(repo.rev_parse("no-such-ref").is_err());

    // Detached HEAD reports the commit id
    repo.checkout(&sha).unwrap();
    assert_eq!(repo.current_ref().unwrap(), sha);
}

#[test]
fn test_branch_lifecycle() {
    let (temp, repo) = init_repo();
    commit_file(temp.path(), "a.txt", "one\n", "first");

    assert!(!repo.branch_exists("test-123").unwrap());
    repo.create_branch("test-123", "main").unwrap();
    assert!(repo.branch_exists("test-123").unwrap());
    repo.delete_branch("test-123").unwrap();
    assert!(!repo.branch_exists("test-123").unwrap());
}

#[test]
fn test_rev_list_is_newest_first() {
    let (temp, repo) = init_repo();
    commit_file(temp.path(), "a.txt", "one\n", "first");
    commit_file(temp.path(), "a.txt", "two\n", "second");
    commit_file(temp.path(), "a.txt", "three\n", "third");

    let commits = repo.rev_list("main").unwrap();
    assert_eq!(commits.len(), 3);
    assert_eq!(commits[0], repo.rev_parse("main").unwrap());
    assert_eq!(commits[2], repo.rev_parse("main~2").unwrap());
}

#[test]
fn test_commit_before() {
    let (temp, repo) = init_repo();
    commit_file_at(temp.path(), "a.txt", "one\n", "first", "2020-01-01T12:00:00Z");
    commit_file_at(temp.path(), "a.txt", "two\n", "second", "2021-01-01T12:00:00Z");

    let old = "2020-06-01T00:00:00Z".parse().unwrap();
    let found = repo.commit_before("main", old).unwrap();
    assert_eq!(found, Some(repo.rev_parse("main~1").unwrap()));

    let recent = "2022-01-01T00:00:00Z".parse().unwrap();
    let found = repo.commit_before("main", recent).unwrap();
    assert_eq!(found, Some(repo.rev_parse("main").unwrap()));

    let ancient = "2010-01-01T00:00:00Z".parse().unwrap();
    assert_eq!(repo.commit_before("main", ancient).unwrap(), None);
}

#[test]
fn test_apply_check_and_apply() {
    let (temp, repo) = init_repo();
    let root = temp.path();
    commit_file(root, "a.txt", "one\ntwo\nthree\n", "first");

    // Build a patch that changes "two" -> "2"
    std::fs::write(root.join("a.txt"), "one\n2\nthree\n").unwrap();
    let patch = take_patch(root);
    let patch_path = root.join("change.patch");
    std::fs::write(&patch_path, &patch).unwrap();

    assert!(repo.apply_check(&patch_path).unwrap());
    assert!(repo.apply(&patch_path, ApplyMode::Strict).unwrap());
    assert_eq!(
        std::fs::read_to_string(root.join("a.txt")).unwrap(),
        "one\n2\nthree\n"
    );

    // Applying again must fail the dry run
    assert!(!repo.apply_check(&patch_path).unwrap());
}

#[test]
fn test_fuzzy_apply_tolerates_drifted_context() {
    let (temp, repo) = init_repo();
    let root = temp.path();
    let lines = "l1\nl2\nl3\nl4\nl5\nl6\nl7\n";
    commit_file(root, "a.txt", lines, "first");

    // Patch changes l4 with the default three lines of context
    std::fs::write(root.join("a.txt"), "l1\nl2\nl3\nL4\nl5\nl6\nl7\n").unwrap();
    let patch = take_patch(root);
    let patch_path = root.join("change.patch");
    std::fs::write(&patch_path, &patch).unwrap();

    // Drift a context line two lines away from the change
    commit_file(root, "a.txt", "l1\nL2\nl3\nl4\nl5\nl6\nl7\n", "drift");

    assert!(!repo.apply(&patch_path, ApplyMode::Strict).unwrap());
    assert!(repo.apply(&patch_path, ApplyMode::Fuzzy).unwrap());
    assert_eq!(
        std::fs::read_to_string(root.join("a.txt")).unwrap(),
        "l1\nL2\nl3\nL4\nl5\nl6\nl7\n"
    );
}

#[test]
fn test_clean_rebase() {
    let (temp, repo) = init_repo();
    let root = temp.path();
    commit_file(root, "a.txt", "one\n", "first");

    repo.create_branch("topic", "main").unwrap();
    repo.checkout("topic").unwrap();
    commit_file(root, "b.txt", "branch work\n", "topic work");

    repo.checkout("main").unwrap();
    commit_file(root, "c.txt", "main work\n", "main work");

    let outcome = repo.rebase_onto("main", "topic").unwrap();
    assert_eq!(outcome, RebaseOutcome::Clean);
    assert!(!repo.rebase_in_progress().unwrap());
}

#[test]
fn test_conflicted_rebase_continue_and_abort() {
    let (temp, repo) = init_repo();
    let root = temp.path();
    commit_file(root, "a.txt", "base\n", "first");

    repo.create_branch("topic", "main").unwrap();
    repo.checkout("topic").unwrap();
    commit_file(root, "a.txt", "topic change\n", "topic work");

    repo.checkout("main").unwrap();
    commit_file(root, "a.txt", "main change\n", "main work");

    let outcome = repo.rebase_onto("main", "topic").unwrap();
    assert_eq!(outcome, RebaseOutcome::Conflicted);
    assert!(repo.rebase_in_progress().unwrap());

    let unmerged = repo.unmerged_paths().unwrap();
    assert_eq!(unmerged, vec!["a.txt".to_string()]);
    assert!(vcs::has_conflict_markers(&root.join("a.txt")).unwrap());

    // Resolve, stage, continue
    std::fs::write(root.join("a.txt"), "merged change\n").unwrap();
    run_git(root, &["add", "a.txt"]);
    assert!(repo.unmerged_paths().unwrap().is_empty());
    assert_eq!(repo.staged_paths().unwrap(), vec!["a.txt".to_string()]);

    let outcome = repo.rebase_continue().unwrap();
    assert_eq!(outcome, RebaseOutcome::Clean);
    assert!(!repo.rebase_in_progress().unwrap());
    assert_eq!(
        std::fs::read_to_string(root.join("a.txt")).unwrap(),
        "merged change\n"
    );
}

#[test]
fn test_rebase_abort_restores_state() {
    let (temp, repo) = init_repo();
    let root = temp.path();
    commit_file(root, "a.txt", "base\n", "first");

    repo.create_branch("topic", "main").unwrap();
    repo.checkout("topic").unwrap();
    commit_file(root, "a.txt", "topic change\n", "topic work");

    repo.checkout("main").unwrap();
    commit_file(root, "a.txt", "main change\n", "main work");

    assert_eq!(
        repo.rebase_onto("main", "topic").unwrap(),
        RebaseOutcome::Conflicted
    );

    repo.rebase_abort().unwrap();
    assert!(!repo.rebase_in_progress().unwrap());
    assert_eq!(repo.current_ref().unwrap(), "topic");
}

#[test]
fn test_diff_between_refs() {
    let (temp, repo) = init_repo();
    let root = temp.path();
    commit_file(root, "a.txt", "one\n", "first");

    repo.create_branch("topic", "main").unwrap();
    repo.checkout("topic").unwrap();
    commit_file(root, "a.txt", "one\nextra\n", "topic work");

    let diff = repo.diff("main", "topic").unwrap();
    let text = String::from_utf8_lossy(&diff);
    assert!(text.contains("+extra"));
    assert!(text.contains("a.txt"));

    // Identical refs diff to nothing
    assert!(repo.diff("topic", "topic").unwrap().is_empty());
}
