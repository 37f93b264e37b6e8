use std::process::Command;

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

use crate::alias::resolve_aliases;
use crate::attribution::{self, Attribution};
use crate::blame::blame_for_hunk;
use crate::commit::{FixupGroups, commit_groups};
use crate::diff::{parse_diff, run_git_staged_diff};
use crate::topic::{repo_root, resolve_commit, topic_commits};

/// Plain configuration handed from the CLI to the driver. The driver
/// itself never touches `clap`.
pub struct RunConfig {
    pub revision: String,
    pub context: usize,
    pub strictness: u8,
    pub verbosity: u8,
}

impl RunConfig {
    /// §4.7 step 2: context ≥ 0 is guaranteed by the type; strictness > 0
    /// requires context > 0, since adjacency needs at least one line of
    /// surrounding context to reason about.
    fn validate(&self) -> Result<()> {
        if self.strictness > attribution::SURROUNDED {
            bail!("strictness must be 0, 1, or 2, got {}", self.strictness);
        }
        if self.strictness > 0 && self.context == 0 {
            bail!("strict mode (-s > 0) requires a nonzero context count (-c)");
        }
        Ok(())
    }
}

/// §4.7: resolve the revision, validate config, move to the repo root,
/// gather hunks/subjects/aliases/blame, attribute each hunk, then emit
/// fixup commits against a private redirected index.
pub fn run(config: &RunConfig) -> Result<()> {
    let base = resolve_commit(&config.revision)
        .with_context(|| format!("resolving revision {:?}", config.revision))?;

    config.validate()?;

    let root = repo_root()?;
    std::env::set_current_dir(&root).with_context(|| format!("changing directory to {root}"))?;

    let staged_diff =
        run_git_staged_diff(config.context).context("reading staged diff")?;
    let hunks = parse_diff(&staged_diff);

    let subjects = topic_commits(&base).context("enumerating topic commits")?;
    let aliases = resolve_aliases(&subjects).context("resolving fixup aliases")?;

    let mut groups = FixupGroups::new();
    for hunk in hunks {
        let blame = blame_for_hunk(&hunk, &aliases)
            .with_context(|| format!("fetching blame for {}", hunk.file))?;

        match attribution::attribute(&hunk, &blame, &subjects, config.strictness) {
            Attribution::Assigned(target) => {
                if config.verbosity >= 1 {
                    eprintln!("{}:{} -> fixup! {}", hunk.file, hunk.start, &target[..8.min(target.len())]);
                }
                if config.verbosity >= 2 {
                    print_blame_table(&hunk, &blame);
                }
                groups.insert(target, hunk);
            }
            Attribution::Rejected(reason) => {
                if config.verbosity >= 1 {
                    eprintln!("{}:{} -> skipped ({})", hunk.file, hunk.start, reason.as_str());
                }
                if config.verbosity >= 2 {
                    print_blame_table(&hunk, &blame);
                }
            }
        }
    }

    if groups.is_empty() {
        return Ok(());
    }

    let index_file = NamedTempFile::new().context("creating temporary index file")?;
    let index_path = index_file.path();

    let mut read_tree = Command::new("git");
    read_tree.args(["read-tree", "HEAD"]);
    read_tree.env("GIT_INDEX_FILE", index_path);
    let status = read_tree
        .status()
        .context("failed to run git read-tree")?;
    if !status.success() {
        bail!("git read-tree HEAD failed");
    }

    commit_groups(&groups, index_path).context("creating fixup commits")?;

    Ok(())
}

/// `-vv` tabular blame-diff: 8-char sha, 4-char line number, 30-char
/// HEAD text, 30-char working-tree text, tabs rendered as `^I`, trailing
/// whitespace stripped.
fn print_blame_table(hunk: &crate::diff::Hunk, blame: &crate::blame::Blame) {
    let index = attribution::build_blame_index(hunk);
    for (di, line) in hunk.lines.iter().enumerate() {
        let bi = index[di];
        let (sha, head_text) = match blame.get(&bi) {
            Some(bl) => (&bl.sha[..8.min(bl.sha.len())], bl.text.as_str()),
            None => ("--------", ""),
        };
        let working_text = line.get(1..).unwrap_or("");
        let row = format!(
            "{:<8} {:<4} {:<30} {:<30}",
            sha,
            bi,
            render_column(head_text),
            render_column(working_text),
        );
        eprintln!("{}", row.trim_end());
    }
}

fn render_column(text: &str) -> String {
    let truncated: String = text.chars().take(30).collect();
    truncated.replace('\t', "^I")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(strictness: u8, context: usize) -> RunConfig {
        RunConfig { revision: "@{upstream}".to_string(), context, strictness, verbosity: 0 }
    }

    #[test]
    fn rejects_strict_mode_with_zero_context() {
        assert!(cfg(1, 0).validate().is_err());
    }

    #[test]
    fn allows_strict_mode_with_context() {
        assert!(cfg(1, 3).validate().is_ok());
    }

    #[test]
    fn allows_context_strictness_with_zero_context() {
        assert!(cfg(0, 0).validate().is_ok());
    }

    #[test]
    fn rejects_strictness_above_surrounded() {
        assert!(cfg(3, 3).validate().is_err());
    }
}
