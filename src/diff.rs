use anyhow::{Context, Result};
use std::process::Command;

/// A single hunk parsed from a unified diff, with its pre-image
/// coordinates preserved for blame correlation and its header/body
/// preserved byte-for-byte for re-emission by the committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// Display path, with any leading `a/`/`b/` stripped.
    pub file: String,
    /// Old-side file path, or "/dev/null" for new files.
    pub old_file: String,
    /// New-side file path, or "/dev/null" for deleted files.
    pub new_file: String,
    /// The `--- a/...` and `+++ b/...` lines, joined by a newline.
    pub file_header: String,
    /// The `@@ -S[,C] +T[,D] @@...` line, verbatim.
    pub header: String,
    /// 1-based line number in the pre-image where the hunk begins.
    pub start: usize,
    /// Number of pre-image lines the hunk covers (defaults to 1 when
    /// the header omits it).
    pub count: usize,
    /// Body lines, each starting with ` `, `+`, `-`, or `\`.
    pub lines: Vec<String>,
}

const DIFF_FORMAT_ARGS: &[&str] = &[
    "--no-color",
    "--no-ext-diff",
    "--src-prefix=a/",
    "--dst-prefix=b/",
];

/// `git diff --cached`, ignoring submodules, with the given context count.
pub fn run_git_staged_diff(context: usize) -> Result<String> {
    let mut cmd = Command::new("git");
    cmd.arg("diff").arg("--cached");
    cmd.args(DIFF_FORMAT_ARGS);
    cmd.arg(format!("--unified={context}"));
    cmd.arg("--ignore-submodules");
    run_git_cmd(&mut cmd).context("reading staged diff")
}

pub fn run_git_cmd(cmd: &mut Command) -> Result<String> {
    let output = cmd.output().context("failed to run git command")?;
    if !output.status.success() {
        anyhow::bail!(
            "git command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extract a file path from a `--- a/...` or `+++ b/...` line.
fn strip_diff_prefix(line: &str) -> &str {
    line.strip_prefix("--- a/")
        .or_else(|| line.strip_prefix("+++ b/"))
        .or_else(|| line.strip_prefix("--- /"))
        .or_else(|| line.strip_prefix("+++ /"))
        .or_else(|| line.strip_prefix("+++ a/"))
        .or_else(|| line.strip_prefix("--- "))
        .or_else(|| line.strip_prefix("+++ "))
        .unwrap_or(line)
}

/// Parse a unified-diff byte stream into a sequence of [`Hunk`]s.
///
/// Hunks whose pre-image and post-image paths differ (creations,
/// deletions, renames) are discarded by design. Lines that don't match
/// any recognized prefix are skipped silently; the diff generator is
/// trusted.
pub fn parse_diff(input: &str) -> Vec<Hunk> {
    let mut hunks = Vec::new();
    let mut current_old_file = String::new();
    let mut current_new_file = String::new();
    let mut current_file_header = String::new();
    let mut current_header: Option<(String, usize, usize)> = None;
    let mut current_lines: Vec<String> = Vec::new();

    macro_rules! flush {
        () => {
            if let Some((header, start, count)) = current_header.take() {
                if current_old_file == current_new_file {
                    hunks.push(Hunk {
                        file: current_new_file.clone(),
                        old_file: current_old_file.clone(),
                        new_file: current_new_file.clone(),
                        file_header: current_file_header.clone(),
                        header,
                        start,
                        count,
                        lines: std::mem::take(&mut current_lines),
                    });
                } else {
                    current_lines.clear();
                }
            }
        };
    }

    for line in input.lines() {
        if line.starts_with("diff --git") {
            flush!();
            current_file_header.clear();
            current_old_file.clear();
            current_new_file.clear();
        } else if line.starts_with("--- ") {
            flush!();
            current_file_header = line.to_string();
            current_old_file = strip_diff_prefix(line).to_string();
        } else if line.starts_with("+++ ") {
            current_file_header.push('\n');
            current_file_header.push_str(line);
            current_new_file = strip_diff_prefix(line).to_string();
        } else if line.starts_with("@@ ") {
            flush!();
            match parse_hunk_header(line) {
                Some((start, count, ..)) => {
                    current_header = Some((line.to_string(), start, count));
                }
                None => current_header = None,
            }
        } else if current_header.is_some() {
            match line.as_bytes().first() {
                Some(b' ') | Some(b'+') | Some(b'-') | Some(b'\\') => {
                    current_lines.push(line.to_string());
                }
                _ => {
                    // Not a recognized body line; this terminates the hunk.
                    // The line itself is re-examined below since it may be
                    // a new file marker we don't otherwise match here.
                    flush!();
                }
            }
        }
    }
    flush!();

    hunks
}

/// Parse `@@ -S[,C] +T[,D] @@...` into `(pre_start, pre_count, post_start, post_count)`.
/// Count defaults to 1 when omitted.
pub fn parse_hunk_header(header: &str) -> Option<(usize, usize, usize, usize)> {
    let header = header.strip_prefix("@@ ")?;
    let end_idx = header.find(" @@")?;
    let range_part = &header[..end_idx];

    let mut parts = range_part.split_whitespace();
    let old_part = parts.next()?.strip_prefix('-')?;
    let (old_from, old_count) = parse_range(old_part)?;
    let new_part = parts.next()?.strip_prefix('+')?;
    let (new_from, new_count) = parse_range(new_part)?;

    Some((old_from, old_count, new_from, new_count))
}

fn parse_range(s: &str) -> Option<(usize, usize)> {
    if let Some((from, count)) = s.split_once(',') {
        Some((from.parse().ok()?, count.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}
