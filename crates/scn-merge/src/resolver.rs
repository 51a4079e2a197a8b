//! Conflict resolution.
//!
//! [`resolve`] is a pure function of a diff, a strategy, and (for manual
//! merges) the caller's per-conflict choices. It never touches a store.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use scn_diff::{DiffEntry, DiffSet, EntryKey};
use scn_types::MergeStrategy;

/// Which side wins a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    Source,
    Target,
}

/// One manual decision, as sent over the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionChoice {
    pub entry: EntryKey,
    pub choice: Choice,
}

/// Manual decisions keyed by diff entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ResolutionChoice>", into = "Vec<ResolutionChoice>")]
pub struct ConflictResolutions(BTreeMap<EntryKey, Choice>);

impl ConflictResolutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entry: EntryKey, choice: Choice) -> Self {
        self.0.insert(entry, choice);
        self
    }

    pub fn get(&self, entry: &EntryKey) -> Option<Choice> {
        self.0.get(entry).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(EntryKey, Choice)> for ConflictResolutions {
    fn from_iter<I: IntoIterator<Item = (EntryKey, Choice)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<ResolutionChoice>> for ConflictResolutions {
    fn from(choices: Vec<ResolutionChoice>) -> Self {
        choices.into_iter().map(|c| (c.entry, c.choice)).collect()
    }
}

impl From<ConflictResolutions> for Vec<ResolutionChoice> {
    fn from(resolutions: ConflictResolutions) -> Self {
        resolutions
            .0
            .into_iter()
            .map(|(entry, choice)| ResolutionChoice { entry, choice })
            .collect()
    }
}

/// How every entry of a diff is to be handled.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    /// Entries whose source value will be written to the target.
    pub applied: Vec<DiffEntry>,
    /// Conflicting source changes the target keeps its own value over.
    pub superseded: Vec<DiffEntry>,
    /// Conflicts still waiting for a manual choice.
    pub conflicts: Vec<DiffEntry>,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
}

impl Resolution {
    /// Returns `true` when nothing is left for the caller to decide.
    pub fn is_complete(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Decide every entry of `diff`.
///
/// Clean entries are always applied. Conflicts follow `strategy`; under
/// [`MergeStrategy::Manual`] each is looked up in `resolutions` and left in
/// [`Resolution::conflicts`] when no choice was given. Resolutions that match
/// no conflict are ignored.
pub fn resolve(
    diff: &DiffSet,
    strategy: MergeStrategy,
    resolutions: &ConflictResolutions,
) -> Resolution {
    let mut out = Resolution::default();
    let mut conflict_keys = BTreeSet::new();

    for entry in &diff.entries {
        if !entry.is_conflict() {
            out.applied.push(entry.clone());
            continue;
        }
        out.conflicts_detected += 1;
        conflict_keys.insert(entry.key());

        let choice = match strategy {
            MergeStrategy::FavorSource => Some(Choice::Source),
            MergeStrategy::FavorTarget => Some(Choice::Target),
            MergeStrategy::Manual => resolutions.get(&entry.key()),
        };
        match choice {
            Some(Choice::Source) => out.applied.push(entry.clone()),
            Some(Choice::Target) => out.superseded.push(entry.clone()),
            None => {
                out.conflicts.push(entry.clone());
                continue;
            }
        }
        out.conflicts_resolved += 1;
    }

    if strategy == MergeStrategy::Manual {
        for key in resolutions.0.keys().filter(|k| !conflict_keys.contains(*k)) {
            warn!(entry = ?key, "resolution matches no conflict; ignored");
        }
    }
    out
}
