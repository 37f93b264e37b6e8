use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    git(dir, &["config", "user.email", "test@example.com"]);
    git(dir, &["config", "user.name", "Test"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn commit_all(dir: &Path, message: &str) -> String {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
    git(dir, &["rev-parse", "HEAD"])
}

fn write_file(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

fn git_fixup_bin() -> &'static str {
    env!("CARGO_BIN_EXE_git-fixup")
}

#[test]
fn attributes_adjacent_hunk_to_topic_commit() {
    let repo = TempDir::new().unwrap();
    let dir = repo.path();
    init_repo(dir);

    write_file(dir, "greeting.txt", "hello\nworld\nagain\n");
    let base = commit_all(dir, "initial commit");

    write_file(dir, "greeting.txt", "hello\nworld wide\nagain\n");
    commit_all(dir, "feat: say world wide");
    let topic_sha = git(dir, &["rev-parse", "HEAD"]);

    // Stage a change adjacent to the line the topic commit touched.
    write_file(dir, "greeting.txt", "hello\nworld wide web\nagain\n");
    git(dir, &["add", "-A"]);

    let output = Command::new(git_fixup_bin())
        .arg(&base)
        .current_dir(dir)
        .output()
        .expect("failed to run git-fixup");
    assert!(
        output.status.success(),
        "git-fixup failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let head = git(dir, &["rev-parse", "HEAD"]);
    assert_ne!(head, topic_sha, "a new commit should have been created");

    let subject = git(dir, &["log", "-1", "--format=%s"]);
    assert_eq!(subject, format!("fixup! {topic_sha}"));

    let parent = git(dir, &["rev-parse", "HEAD^"]);
    assert_eq!(parent, topic_sha, "fixup commit should sit on top of the original HEAD");

    // the user's own staging area must be untouched by the tool
    let staged = git(dir, &["diff", "--cached", "--name-only"]);
    assert_eq!(staged, "greeting.txt");
}

#[test]
fn no_commits_created_when_nothing_can_be_attributed() {
    let repo = TempDir::new().unwrap();
    let dir = repo.path();
    init_repo(dir);

    write_file(dir, "a.txt", "line1\nline2\n");
    let base = commit_all(dir, "initial commit");
    write_file(dir, "b.txt", "unrelated\n");
    commit_all(dir, "feat: unrelated second commit");
    let head_before = git(dir, &["rev-parse", "HEAD"]);

    // Stage a change whose surrounding lines are untouched by any topic
    // commit, so no unambiguous topic target exists for context strictness.
    write_file(dir, "a.txt", "line1 edited\nline2\n");
    git(dir, &["add", "-A"]);

    let output = Command::new(git_fixup_bin())
        .arg(&base)
        .arg("--strict")
        .arg("2")
        .current_dir(dir)
        .output()
        .expect("failed to run git-fixup");
    assert!(output.status.success());

    let head_after = git(dir, &["rev-parse", "HEAD"]);
    assert_eq!(head_before, head_after, "no fixup commit should have been created");
}
