use std::collections::HashMap;
use std::process::Command;

use anyhow::{Context, Result};

use crate::diff::run_git_cmd;

/// sha (40-hex) -> subject line, for every non-merge commit in `R..HEAD`.
pub type CommitSubjects = HashMap<String, String>;

/// Enumerate non-merge commits reachable from HEAD but not from `base`.
pub fn topic_commits(base: &str) -> Result<CommitSubjects> {
    let mut cmd = Command::new("git");
    cmd.args(["log", "--no-merges", "--format=%H:%s"]);
    cmd.arg(format!("{base}..HEAD"));
    let output = run_git_cmd(&mut cmd).context("enumerating topic commits")?;

    let mut subjects = CommitSubjects::new();
    for line in output.lines() {
        if line.is_empty() {
            continue;
        }
        let (sha, subject) = line
            .split_once(':')
            .with_context(|| format!("malformed topic-commit line: {line:?}"))?;
        subjects.insert(sha.to_string(), subject.to_string());
    }
    Ok(subjects)
}

/// Resolve `revision` (e.g. `@{upstream}`) to a full commit sha.
pub fn resolve_commit(revision: &str) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(["rev-parse", "--verify"]).arg(format!("{revision}^{{commit}}"));
    let out = run_git_cmd(&mut cmd)
        .with_context(|| format!("resolving revision {revision:?}"))?;
    Ok(out.trim().to_string())
}

/// The repository's top-level working directory.
pub fn repo_root() -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.args(["rev-parse", "--show-toplevel"]);
    let out = run_git_cmd(&mut cmd).context("locating repository root")?;
    Ok(out.trim().to_string())
}
