//! The scenario forest: a derived, rebuildable view of the hierarchy.
//!
//! Scenarios are stored flat, keyed by id, with a `parent_scenario_id`
//! reference. [`ScenarioTreeBuilder`] turns such a list into owned trees
//! without back-pointers, using an index arena while building.
//!
//! # Invariants
//!
//! - No node appears in two children lists.
//! - Children keep the order in which they appear in the input.
//! - Depth is bounded only by the longest parent chain.
//! - A node whose parent is missing becomes a root.
//! - A cycle is an error, never an infinite loop.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use scn_types::{Scenario, ScenarioId};

use crate::error::{DagError, DagResult};

/// A scenario together with its children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub scenario: Scenario,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn id(&self) -> ScenarioId {
        self.scenario.id
    }
}

/// One or more scenario trees. Normally a single tree rooted at the baseline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioForest {
    pub roots: Vec<TreeNode>,
}

impl ScenarioForest {
    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Depth-first, pre-order traversal yielding `(depth, scenario)`.
    /// Roots have depth 0.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Scenario)> + '_ {
        let mut stack: Vec<(usize, &TreeNode)> =
            self.roots.iter().rev().map(|n| (0, n)).collect();
        std::iter::from_fn(move || {
            let (depth, node) = stack.pop()?;
            stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
            Some((depth, &node.scenario))
        })
    }

    /// Height of the tallest tree (a lone root has height 1).
    pub fn depth(&self) -> usize {
        self.iter().map(|(d, _)| d + 1).max().unwrap_or(0)
    }

    /// Find a node anywhere in the forest.
    pub fn find(&self, id: &ScenarioId) -> Option<&TreeNode> {
        let mut stack: Vec<&TreeNode> = self.roots.iter().collect();
        while let Some(node) = stack.pop() {
            if node.scenario.id == *id {
                return Some(node);
            }
            stack.extend(node.children.iter());
        }
        None
    }

    /// Ids from the root down to `id`, inclusive.
    pub fn path_to(&self, id: &ScenarioId) -> Option<Vec<ScenarioId>> {
        let mut stack: Vec<(&TreeNode, Vec<ScenarioId>)> = self
            .roots
            .iter()
            .map(|r| (r, vec![r.scenario.id]))
            .collect();
        while let Some((node, path)) = stack.pop() {
            if node.scenario.id == *id {
                return Some(path);
            }
            for child in &node.children {
                let mut next = path.clone();
                next.push(child.scenario.id);
                stack.push((child, next));
            }
        }
        None
    }
}

/// Builds a [`ScenarioForest`] from flat scenario records.
pub struct ScenarioTreeBuilder;

impl ScenarioTreeBuilder {
    /// Build the forest.
    ///
    /// Two passes over an index arena: the first maps ids to positions, the
    /// second attaches every record to its parent's children list (or to the
    /// roots when the parent is absent or unknown). Records unreachable from
    /// any root can only sit on a cycle, which is reported as
    /// [`DagError::CycleDetected`].
    pub fn build(records: &[Scenario]) -> DagResult<ScenarioForest> {
        let mut index: HashMap<ScenarioId, usize> = HashMap::with_capacity(records.len());
        for (i, scenario) in records.iter().enumerate() {
            if index.insert(scenario.id, i).is_some() {
                return Err(DagError::DuplicateNode(scenario.id));
            }
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        let mut roots: Vec<usize> = Vec::new();
        for (i, scenario) in records.iter().enumerate() {
            match scenario.parent_scenario_id {
                Some(parent) if parent == scenario.id => {
                    return Err(DagError::CycleDetected(scenario.id));
                }
                Some(parent) => match index.get(&parent) {
                    Some(&p) => children[p].push(i),
                    None => {
                        debug!(
                            scenario = %scenario.id,
                            parent = %parent,
                            "dangling parent; treating scenario as a root"
                        );
                        roots.push(i);
                    }
                },
                None => roots.push(i),
            }
        }

        // Pre-order over the arena; anything not reached is on a cycle.
        let mut order: Vec<usize> = Vec::with_capacity(records.len());
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(children[i].iter().rev().copied());
        }
        if order.len() < records.len() {
            let mut reached = vec![false; records.len()];
            for &i in &order {
                reached[i] = true;
            }
            if let Some(i) = reached.iter().position(|r| !r) {
                return Err(DagError::CycleDetected(records[i].id));
            }
        }

        // Materialize bottom-up: reverse pre-order visits children first.
        let mut built: Vec<Option<TreeNode>> = vec![None; records.len()];
        for &i in order.iter().rev() {
            let kids = children[i]
                .iter()
                .filter_map(|&c| built[c].take())
                .collect();
            built[i] = Some(TreeNode {
                scenario: records[i].clone(),
                children: kids,
            });
        }

        let roots = roots.iter().filter_map(|&r| built[r].take()).collect();
        Ok(ScenarioForest { roots })
    }
}
