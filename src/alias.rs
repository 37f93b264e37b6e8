use std::collections::HashMap;

use anyhow::{Result, bail};

use crate::topic::CommitSubjects;

/// topic sha -> canonical target sha, for commits whose subject marks
/// them as a fixup/squash of another topic commit.
pub type AliasMap = HashMap<String, String>;

const FIXUP_PREFIX: &str = "fixup! ";
const SQUASH_PREFIX: &str = "squash! ";

fn strip_fixup_marker(subject: &str) -> Option<&str> {
    subject
        .strip_prefix(FIXUP_PREFIX)
        .or_else(|| subject.strip_prefix(SQUASH_PREFIX))
}

/// Resolve every `fixup!`/`squash!` commit in `subjects` to the unique
/// other topic commit whose subject starts with the captured prefix.
///
/// A subject whose captured prefix is itself a `fixup!`/`squash!` marker
/// (fixup-of-fixup), an ambiguous prefix match, or no match at all is a
/// fatal error, per spec.
pub fn resolve_aliases(subjects: &CommitSubjects) -> Result<AliasMap> {
    let mut aliases = AliasMap::new();

    for (sha, subject) in subjects {
        let Some(prefix) = strip_fixup_marker(subject) else {
            continue;
        };

        if strip_fixup_marker(prefix).is_some() {
            bail!("nested fixup commit (fixup-of-fixup) for {sha}: {subject:?}");
        }

        let matches: Vec<&String> = subjects
            .iter()
            .filter(|(other_sha, other_subject)| {
                *other_sha != sha && other_subject.starts_with(prefix)
            })
            .map(|(other_sha, _)| other_sha)
            .collect();

        match matches.as_slice() {
            [] => bail!("no fixup target found for {sha}: {subject:?}"),
            [target] => {
                aliases.insert(sha.clone(), (*target).clone());
            }
            _ => bail!("ambiguous fixup target for {sha}: {subject:?} matches {matches:?}"),
        }
    }

    Ok(aliases)
}
