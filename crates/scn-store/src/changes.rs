//! Change sets: the unit of atomic writes.
//!
//! Every mutation of scenario-scoped data goes through a [`ChangeSet`]. A
//! backend either applies all of its operations or none of them, and checks
//! the expected revisions before touching anything.

use serde::{Deserialize, Serialize};

use scn_types::{
    AssignmentDraft, AssignmentKey, MergeRecord, OverrideDraft, OverrideKey, PhaseDraft, PhaseKey,
    ScenarioId, ScenarioStatus,
};

/// A single write, addressed by natural key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Insert an assignment, or replace the editable fields of the one with
    /// the same key (its id is kept).
    UpsertAssignment {
        scenario_id: ScenarioId,
        draft: AssignmentDraft,
    },
    DeleteAssignment {
        scenario_id: ScenarioId,
        key: AssignmentKey,
    },
    UpsertOverride {
        scenario_id: ScenarioId,
        draft: OverrideDraft,
    },
    DeleteOverride {
        scenario_id: ScenarioId,
        key: OverrideKey,
    },
    /// Insert or replace a phase timeline. The draft's predecessor links
    /// replace every incoming dependency of the timeline.
    UpsertPhaseTimeline {
        scenario_id: ScenarioId,
        draft: PhaseDraft,
    },
    /// Delete a timeline together with every dependency touching it.
    DeletePhaseTimeline {
        scenario_id: ScenarioId,
        key: PhaseKey,
    },
    SetScenarioStatus {
        scenario_id: ScenarioId,
        status: ScenarioStatus,
    },
    AppendMergeRecord(MergeRecord),
}

impl WriteOp {
    /// The scenario whose rows or status this operation writes.
    pub fn scenario_id(&self) -> ScenarioId {
        match self {
            Self::UpsertAssignment { scenario_id, .. }
            | Self::DeleteAssignment { scenario_id, .. }
            | Self::UpsertOverride { scenario_id, .. }
            | Self::DeleteOverride { scenario_id, .. }
            | Self::UpsertPhaseTimeline { scenario_id, .. }
            | Self::DeletePhaseTimeline { scenario_id, .. }
            | Self::SetScenarioStatus { scenario_id, .. } => *scenario_id,
            Self::AppendMergeRecord(record) => record.target_scenario_id,
        }
    }

    /// Returns `true` for operations on scoped data rows (as opposed to
    /// scenario status or the audit log).
    pub fn is_row_write(&self) -> bool {
        !matches!(
            self,
            Self::SetScenarioStatus { .. } | Self::AppendMergeRecord(_)
        )
    }
}

/// An ordered batch of writes with optional optimistic revision checks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub ops: Vec<WriteOp>,
    /// `(scenario, revision)` pairs that must still hold at commit time.
    #[serde(default)]
    pub expected_revisions: Vec<(ScenarioId, u64)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn with(mut self, op: WriteOp) -> Self {
        self.ops.push(op);
        self
    }

    /// Require `scenario` to still be at `revision` when the set is applied.
    pub fn expect_revision(mut self, scenario: ScenarioId, revision: u64) -> Self {
        self.expected_revisions.push((scenario, revision));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of scoped row writes (excludes status changes and audit records).
    pub fn row_writes(&self) -> usize {
        self.ops.iter().filter(|op| op.is_row_write()).count()
    }
}

/// What a committed change set did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub ops_applied: usize,
    /// New revision of every scenario the change set touched.
    pub revisions: Vec<(ScenarioId, u64)>,
}

impl CommitReceipt {
    pub fn revision_of(&self, scenario: &ScenarioId) -> Option<u64> {
        self.revisions
            .iter()
            .find(|(id, _)| id == scenario)
            .map(|(_, rev)| *rev)
    }
}
