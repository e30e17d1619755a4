//! Parity tests for worktree-facing commands: init, checkout, switch, restore.

mod common;

use common::*;

#[test]
fn init_creates_same_layout_as_c_git() {
    let dir_git = tempfile::tempdir().unwrap();
    let dir_gitr = tempfile::tempdir().unwrap();

    let g = git(dir_git.path(), &["init", "-b", "main"]);
    let m = gitr(dir_gitr.path(), &["init", "-b", "main"]);
    assert_exit_code_eq(&g, &m);

    assert!(dir_git.path().join(".git/HEAD").exists());
    assert!(dir_gitr.path().join(".git/HEAD").exists());

    let head_git = std::fs::read_to_string(dir_git.path().join(".git/HEAD")).unwrap();
    let head_gitr = std::fs::read_to_string(dir_gitr.path().join(".git/HEAD")).unwrap();
    assert_eq!(head_git, head_gitr);
}

#[test]
fn switch_create_matches_c_git() {
    let dir_git = tempfile::tempdir().unwrap();
    let dir_gitr = tempfile::tempdir().unwrap();
    setup_linear_history(dir_git.path(), 2);
    setup_linear_history(dir_gitr.path(), 2);

    let g = git(dir_git.path(), &["switch", "--create", "topic"]);
    let m = gitr(dir_gitr.path(), &["switch", "--create", "topic"]);
    assert_exit_code_eq(&g, &m);

    let g_head = git(dir_git.path(), &["symbolic-ref", "HEAD"]);
    let m_head = gitr(dir_gitr.path(), &["symbolic-ref", "HEAD"]);
    assert_output_eq(&g_head, &m_head);
}

#[test]
fn switch_detach_matches_c_git() {
    let dir_git = tempfile::tempdir().unwrap();
    let dir_gitr = tempfile::tempdir().unwrap();
    setup_linear_history(dir_git.path(), 3);
    setup_linear_history(dir_gitr.path(), 3);

    let g = git(dir_git.path(), &["switch", "--detach", "HEAD~1"]);
    let m = gitr(dir_gitr.path(), &["switch", "--detach", "HEAD~1"]);
    assert_exit_code_eq(&g, &m);

    let g_head = git(dir_git.path(), &["rev-parse", "HEAD"]);
    let m_head = gitr(dir_gitr.path(), &["rev-parse", "HEAD"]);
    assert_output_eq(&g_head, &m_head);
}

#[test]
fn checkout_switches_branch_and_updates_worktree() {
    let dir_git = tempfile::tempdir().unwrap();
    let dir_gitr = tempfile::tempdir().unwrap();
    setup_branched_history(dir_git.path());
    setup_branched_history(dir_gitr.path());

    let g = git(dir_git.path(), &["checkout", "feature"]);
    let m = gitr(dir_gitr.path(), &["checkout", "feature"]);
    assert_exit_code_eq(&g, &m);

    assert!(dir_git.path().join("feature_0.txt").exists());
    assert!(dir_gitr.path().join("feature_0.txt").exists());
}

#[test]
fn restore_worktree_from_index() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    let path = dir.path().join("file_0.txt");
    std::fs::write(&path, "local edit\n").unwrap();

    let result = gitr(dir.path(), &["restore", "file_0.txt"]);
    assert_eq!(result.exit_code, 0);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "content for commit 0\n");
}

#[test]
fn restore_staged_unstages_file() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    let path = dir.path().join("new.txt");
    std::fs::write(&path, "new content\n").unwrap();
    gitr(dir.path(), &["hash-object", "-w", "new.txt"]);
    git(dir.path(), &["add", "new.txt"]);

    let result = gitr(dir.path(), &["restore", "--staged", "new.txt"]);
    assert_eq!(result.exit_code, 0);

    let status = git(dir.path(), &["status", "--porcelain"]);
    assert!(status.stdout.contains("?? new.txt"));
}
