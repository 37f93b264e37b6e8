use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use crate::diff::Hunk;

/// Hunks attributed to the same target sha, plus the order targets were
/// first seen in so emission is reproducible even though the backing map
/// itself has no ordering guarantee.
#[derive(Debug, Default)]
pub struct FixupGroups {
    order: Vec<String>,
    groups: HashMap<String, Vec<Hunk>>,
}

impl FixupGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target_sha: String, hunk: Hunk) {
        if !self.groups.contains_key(&target_sha) {
            self.order.push(target_sha.clone());
        }
        self.groups.entry(target_sha).or_default().push(hunk);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Hunk])> {
        self.order
            .iter()
            .map(move |sha| (sha.as_str(), self.groups[sha].as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Reconstruct a combined unified-diff patch for one fixup group: each
/// hunk's preserved file header, `@@` header, and body, concatenated in
/// the order the hunks were attributed.
fn build_patch(hunks: &[Hunk]) -> String {
    let mut patch = String::new();
    for hunk in hunks {
        patch.push_str(&hunk.file_header);
        patch.push('\n');
        patch.push_str(&hunk.header);
        patch.push('\n');
        for line in &hunk.lines {
            patch.push_str(line);
            patch.push('\n');
        }
    }
    patch
}

/// Stage `patch` into the index at `index_file`, tolerating zero-context
/// hunks (hunks reconstructed here may carry no surrounding context).
fn apply_to_index(patch: &str, index_file: &Path) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(["apply", "--cached", "--unidiff-zero"]);
    cmd.env("GIT_INDEX_FILE", index_file);
    cmd.stdin(Stdio::piped());

    let mut child = cmd.spawn().context("failed to run git apply")?;
    child
        .stdin
        .as_mut()
        .expect("stdin was piped")
        .write_all(patch.as_bytes())
        .context("writing patch to git apply")?;
    let output = child.wait_with_output().context("failed to run git apply")?;

    if !output.status.success() {
        anyhow::bail!("git apply failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}

/// Commit the index at `index_file` with a message marking it as a fixup
/// of `target_sha`.
fn commit_fixup(target_sha: &str, index_file: &Path) -> Result<()> {
    let mut cmd = Command::new("git");
    cmd.args(["commit", "--no-verify", "-m", &format!("fixup! {target_sha}")]);
    cmd.env("GIT_INDEX_FILE", index_file);

    let output = cmd.output().context("failed to run git commit")?;
    if !output.status.success() {
        anyhow::bail!("git commit failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}

/// Apply and commit every group in `groups`, against the redirected index
/// at `index_file`. A failure on one group is fatal; groups already
/// committed stay committed (no rollback, per spec).
pub fn commit_groups(groups: &FixupGroups, index_file: &Path) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for (target_sha, hunks) in groups.iter() {
        let patch = build_patch(hunks);
        apply_to_index(&patch, index_file)
            .with_context(|| format!("applying fixup patch for {target_sha}"))?;
        commit_fixup(target_sha, index_file)
            .with_context(|| format!("creating fixup commit for {target_sha}"))?;
        created.push(target_sha.to_string());
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hunk(file: &str, header: &str, lines: &[&str]) -> Hunk {
        Hunk {
            file: file.to_string(),
            old_file: file.to_string(),
            new_file: file.to_string(),
            file_header: format!("--- a/{file}\n+++ b/{file}"),
            header: header.to_string(),
            start: 1,
            count: 1,
            lines: lines.iter().map(|l| l.to_string()).collect(),
        }
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let mut groups = FixupGroups::new();
        groups.insert("b".to_string(), hunk("x.txt", "@@ -1 +1 @@", &["-a", "+b"]));
        groups.insert("a".to_string(), hunk("y.txt", "@@ -1 +1 @@", &["-c", "+d"]));
        groups.insert("b".to_string(), hunk("z.txt", "@@ -1 +1 @@", &["-e", "+f"]));

        let order: Vec<&str> = groups.iter().map(|(sha, _)| sha).collect();
        assert_eq!(order, vec!["b", "a"]);

        let b_hunks: Vec<&[Hunk]> = groups.iter().filter(|(sha, _)| *sha == "b").map(|(_, h)| h).collect();
        assert_eq!(b_hunks[0].len(), 2);
    }

    #[test]
    fn build_patch_concatenates_hunks_in_order() {
        let h1 = hunk("x.txt", "@@ -1 +1 @@", &["-a", "+b"]);
        let h2 = hunk("x.txt", "@@ -5 +5 @@", &["-c", "+d"]);
        let patch = build_patch(&[h1, h2]);
        assert!(patch.contains("--- a/x.txt\n+++ b/x.txt\n@@ -1 +1 @@\n-a\n+b\n"));
        assert!(patch.contains("@@ -5 +5 @@\n-c\n+d\n"));
    }
}
