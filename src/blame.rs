use std::collections::HashMap;
use std::process::Command;

use anyhow::{Context, Result};

use crate::alias::AliasMap;
use crate::diff::{Hunk, run_git_cmd};

/// One blamed pre-image line: the commit it's attributed to (already
/// rewritten through [`AliasMap`]) and its text with the porcelain tab
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameLine {
    pub sha: String,
    pub text: String,
}

/// pre-image line number -> blamed line, covering exactly
/// `[start, start+count)` of one hunk.
pub type Blame = HashMap<usize, BlameLine>;

/// Fetch blame for a hunk's pre-image range against HEAD, rewriting
/// commit identifiers through `aliases` so every sha in the result is a
/// canonical topic target.
pub fn blame_for_hunk(hunk: &Hunk, aliases: &AliasMap) -> Result<Blame> {
    if hunk.count == 0 {
        return Ok(Blame::new());
    }
    blame_range(&hunk.old_file, hunk.start, hunk.count, aliases)
}

fn blame_range(file: &str, start: usize, count: usize, aliases: &AliasMap) -> Result<Blame> {
    let mut cmd = Command::new("git");
    cmd.args(["blame", "--porcelain", "-L", &format!("{start},+{count}"), "HEAD", "--", file]);
    let output = run_git_cmd(&mut cmd)
        .with_context(|| format!("fetching blame for {file} lines {start}..{}", start + count))?;

    Ok(parse_porcelain_blame(&output, aliases))
}

/// Parse `git blame --porcelain` output into a line-number -> BlameLine map.
///
/// Header lines look like `<40hex> <origline> <finalline> [<group count>]`;
/// a line starting with a tab carries the content for the most recently
/// seen header. Every other line is an ancillary metadata line (author,
/// summary, etc.) and is ignored.
fn parse_porcelain_blame(output: &str, aliases: &AliasMap) -> Blame {
    let mut blame = Blame::new();
    let mut current: Option<(String, usize)> = None;

    for line in output.lines() {
        if let Some(content) = line.strip_prefix('\t') {
            if let Some((sha, final_line)) = current.take() {
                let resolved = aliases.get(&sha).cloned().unwrap_or(sha);
                blame.insert(
                    final_line,
                    BlameLine {
                        sha: resolved,
                        text: content.to_string(),
                    },
                );
            }
            continue;
        }

        if let Some(header) = parse_header_line(line) {
            current = Some(header);
        }
        // anything else is an ancillary metadata line (author, summary, ...)
    }

    blame
}

/// A header line is `<40hex> <orig> <final> [<n>]`. Boundary commits are
/// prefixed with `^`, which we strip like any other sha.
fn parse_header_line(line: &str) -> Option<(String, usize)> {
    let mut parts = line.split_whitespace();
    let sha = parts.next()?;
    let sha = sha.trim_start_matches('^');
    if sha.len() != 40 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let _orig_line: usize = parts.next()?.parse().ok()?;
    let final_line: usize = parts.next()?.parse().ok()?;
    Some((sha.to_string(), final_line))
}
