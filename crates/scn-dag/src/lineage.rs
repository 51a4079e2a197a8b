//! Parent-chain walks over the stored hierarchy.

use std::collections::HashSet;

use scn_types::ScenarioId;

use crate::error::{DagError, DagResult};

/// Walk parent links from `start` to its root.
///
/// `parent_of` returns `None` when the scenario does not exist and
/// `Some(parent)` otherwise. The result starts with `start` and ends with the
/// root. Revisiting a scenario fails with [`DagError::CycleDetected`]; a
/// missing scenario fails with [`DagError::DanglingParent`].
pub fn lineage<F>(start: ScenarioId, parent_of: F) -> DagResult<Vec<ScenarioId>>
where
    F: Fn(&ScenarioId) -> Option<Option<ScenarioId>>,
{
    if parent_of(&start).is_none() {
        return Err(DagError::DanglingParent {
            node: start,
            parent: start,
        });
    }

    let mut chain = vec![start];
    let mut seen = HashSet::from([start]);
    let mut current = start;

    while let Some(parent) = parent_of(&current).flatten() {
        if !seen.insert(parent) {
            return Err(DagError::CycleDetected(parent));
        }
        if parent_of(&parent).is_none() {
            return Err(DagError::DanglingParent {
                node: current,
                parent,
            });
        }
        chain.push(parent);
        current = parent;
    }
    Ok(chain)
}

/// Returns `true` if `ancestor` appears on the parent chain of `id`
/// (a scenario is not its own ancestor).
pub fn is_ancestor<F>(ancestor: ScenarioId, id: ScenarioId, parent_of: F) -> DagResult<bool>
where
    F: Fn(&ScenarioId) -> Option<Option<ScenarioId>>,
{
    Ok(lineage(id, parent_of)?.iter().skip(1).any(|s| *s == ancestor))
}
