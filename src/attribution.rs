use std::collections::HashSet;

use crate::blame::Blame;
use crate::diff::Hunk;
use crate::topic::CommitSubjects;

/// Strictness level controlling how conservative attribution is.
pub const CONTEXT: u8 = 0;
pub const ADJACENT: u8 = 1;
pub const SURROUNDED: u8 = 2;

/// Why a hunk was not assigned to a single topic commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// More than one topic commit is a plausible target.
    Ambiguous,
    /// Under strict mode, some blamed line belongs to a non-topic commit.
    UpstreamBlamed,
    /// No topic commit is blamed for any relevant line.
    NoTarget,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Ambiguous => "multiple targets",
            RejectReason::UpstreamBlamed => "changes lines blamed on upstream",
            RejectReason::NoTarget => "no targets",
        }
    }
}

/// The attribution engine's decision for one hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    Assigned(String),
    Rejected(RejectReason),
}

/// For each body line, the pre-image line number it corresponds to (for
/// additions: the pre-image line immediately following the insertion).
pub fn build_blame_index(hunk: &Hunk) -> Vec<usize> {
    let mut index = Vec::with_capacity(hunk.lines.len());
    let mut cursor = hunk.start;
    for line in &hunk.lines {
        index.push(cursor);
        match line.as_bytes().first() {
            Some(b' ') | Some(b'-') => cursor += 1,
            _ => {}
        }
    }
    index
}

fn is_topic(sha: &str, subjects: &CommitSubjects) -> bool {
    subjects.contains_key(sha)
}

/// Decide the single hunk-relative target at an insertion point, given the
/// shas blamed on its immediate pre-image neighbors.
fn insertion_target(adjacent: &[String], subjects: &CommitSubjects, strictness: u8) -> Option<String> {
    let target_shas: Vec<&String> = adjacent.iter().filter(|s| is_topic(s, subjects)).collect();

    let is_surrounded = !target_shas.is_empty()
        && adjacent.iter().all(|s| is_topic(s, subjects))
        && target_shas.first() == target_shas.last();
    let is_adjacent = target_shas.len() == 1;

    if is_surrounded || (strictness < SURROUNDED && is_adjacent) {
        target_shas.first().map(|s| (*s).clone())
    } else {
        None
    }
}

/// The ADJACENT/SURROUNDED candidate-gathering algorithm (§4.5 step 2).
fn adjacent_blamed(
    hunk: &Hunk,
    index: &[usize],
    blame: &Blame,
    subjects: &CommitSubjects,
    strictness: u8,
) -> HashSet<String> {
    let mut blamed = HashSet::new();
    let mut di = 0;

    while di < hunk.lines.len() {
        let line = &hunk.lines[di];
        let bi = index[di];

        match line.as_bytes().first() {
            Some(b'-') => {
                if let Some(bl) = blame.get(&bi) {
                    blamed.insert(bl.sha.clone());
                }
                di += 1;
            }
            Some(b'+') => {
                let mut adjacent = Vec::new();
                if let Some(prev_bi) = bi.checked_sub(1) {
                    if let Some(bl) = blame.get(&prev_bi) {
                        adjacent.push(bl.sha.clone());
                    }
                }
                if let Some(bl) = blame.get(&bi) {
                    if adjacent.last() != Some(&bl.sha) {
                        adjacent.push(bl.sha.clone());
                    }
                }
                if let Some(target) = insertion_target(&adjacent, subjects, strictness) {
                    blamed.insert(target);
                }
                // one insertion run yields one decision, not N
                di += 1;
                while di < hunk.lines.len() && hunk.lines[di].as_bytes().first() == Some(&b'+') {
                    di += 1;
                }
            }
            _ => di += 1,
        }
    }

    blamed
}

/// Decide attribution for one hunk. Pure function of its inputs: same
/// `(hunk, blame, subjects, strictness)` always yields the same result,
/// independent of any map's iteration order.
pub fn attribute(hunk: &Hunk, blame: &Blame, subjects: &CommitSubjects, strictness: u8) -> Attribution {
    let index = build_blame_index(hunk);

    let target_set: HashSet<String> = if strictness == CONTEXT {
        let context_set: HashSet<String> = blame.values().map(|b| b.sha.clone()).collect();
        let topic_count = context_set.iter().filter(|s| is_topic(s, subjects)).count();
        if topic_count > 1 {
            adjacent_blamed(hunk, &index, blame, subjects, strictness)
        } else {
            context_set
        }
    } else {
        adjacent_blamed(hunk, &index, blame, subjects, strictness)
    };

    decide(&target_set, subjects, strictness)
}

fn decide(target_set: &HashSet<String>, subjects: &CommitSubjects, strictness: u8) -> Attribution {
    let upstream_is_blamed = target_set.iter().any(|s| !is_topic(s, subjects));
    let topic_targets: Vec<&String> = target_set.iter().filter(|s| is_topic(s, subjects)).collect();

    if strictness > CONTEXT && upstream_is_blamed {
        return Attribution::Rejected(RejectReason::UpstreamBlamed);
    }

    match topic_targets.len() {
        0 => Attribution::Rejected(RejectReason::NoTarget),
        1 => Attribution::Assigned(topic_targets[0].clone()),
        _ => Attribution::Rejected(RejectReason::Ambiguous),
    }
}
