//! Diff entries: one tagged variant per entity class.

use std::fmt;

use serde::{Deserialize, Serialize};

use scn_types::{
    AssignmentKey, AssignmentValue, OverrideKey, OverrideValue, PhaseKey, PhaseValue, ScenarioId,
};

/// How a row differs between source and target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The source has the row and the target does not.
    Added,
    /// The source dropped a row the target still has.
    Removed,
    /// Both differ in value, or one side deleted what the other edited.
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Removed => write!(f, "removed"),
            Self::Modified => write!(f, "modified"),
        }
    }
}

/// A change to one row, identified by its natural key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Change<K, V> {
    pub key: K,
    pub kind: ChangeKind,
    pub source: Option<V>,
    pub target: Option<V>,
    /// Value at the branch point; always `None` in two-way comparisons.
    pub base: Option<V>,
    /// Both sides changed the row since the branch point.
    pub conflict: bool,
    pub description: String,
}

/// Entity class of a diff entry, in the order entries are listed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Assignment,
    ProjectOverride,
    PhaseTimeline,
}

/// A single row-level difference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entity", rename_all = "snake_case")]
pub enum DiffEntry {
    Assignment(Change<AssignmentKey, AssignmentValue>),
    ProjectOverride(Change<OverrideKey, OverrideValue>),
    PhaseTimeline(Change<PhaseKey, PhaseValue>),
}

impl DiffEntry {
    pub fn class(&self) -> EntityClass {
        match self {
            Self::Assignment(_) => EntityClass::Assignment,
            Self::ProjectOverride(_) => EntityClass::ProjectOverride,
            Self::PhaseTimeline(_) => EntityClass::PhaseTimeline,
        }
    }

    pub fn key(&self) -> EntryKey {
        match self {
            Self::Assignment(c) => EntryKey::Assignment(c.key),
            Self::ProjectOverride(c) => EntryKey::ProjectOverride(c.key),
            Self::PhaseTimeline(c) => EntryKey::PhaseTimeline(c.key),
        }
    }

    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Assignment(c) => c.kind,
            Self::ProjectOverride(c) => c.kind,
            Self::PhaseTimeline(c) => c.kind,
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Assignment(c) => c.conflict,
            Self::ProjectOverride(c) => c.conflict,
            Self::PhaseTimeline(c) => c.conflict,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Assignment(c) => &c.description,
            Self::ProjectOverride(c) => &c.description,
            Self::PhaseTimeline(c) => &c.description,
        }
    }
}

/// Identity of a diff entry, used to address conflicts in manual
/// resolutions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "entity", content = "key", rename_all = "snake_case")]
pub enum EntryKey {
    Assignment(AssignmentKey),
    ProjectOverride(OverrideKey),
    PhaseTimeline(PhaseKey),
}

/// Added / modified / removed tallies for one entity class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl ClassCounts {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.removed
    }

    fn record(&mut self, kind: ChangeKind) {
        match kind {
            ChangeKind::Added => self.added += 1,
            ChangeKind::Modified => self.modified += 1,
            ChangeKind::Removed => self.removed += 1,
        }
    }
}

/// The differences between a source scenario and a target scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffSet {
    pub source_id: ScenarioId,
    pub target_id: ScenarioId,
    pub source_revision: u64,
    pub target_revision: u64,
    /// Whether a branch-point snapshot was used (three-way diff).
    pub three_way: bool,
    /// Ordered by entity class, then natural key.
    pub entries: Vec<DiffEntry>,
}

impl DiffSet {
    /// Returns `true` if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &DiffEntry> + '_ {
        self.entries.iter().filter(|e| e.is_conflict())
    }

    pub fn conflict_count(&self) -> usize {
        self.conflicts().count()
    }

    /// Tallies for one entity class.
    pub fn counts(&self, class: EntityClass) -> ClassCounts {
        let mut counts = ClassCounts::default();
        for entry in self.entries.iter().filter(|e| e.class() == class) {
            counts.record(entry.kind());
        }
        counts
    }

    pub fn of_class(&self, class: EntityClass) -> impl Iterator<Item = &DiffEntry> + '_ {
        self.entries.iter().filter(move |e| e.class() == class)
    }
}
