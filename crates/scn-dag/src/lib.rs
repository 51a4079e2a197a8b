//! Hierarchy and dependency graphs for the scenario planner.
//!
//! Both graphs here are *derived* structures over flat records: the scenario
//! forest is rebuilt from scenario rows on demand, and the phase dependency
//! order is recomputed from edge rows whenever a scenario is written.

pub mod error;
pub mod lineage;
pub mod phases;
pub mod tree;

pub use error::{DagError, DagResult};
pub use lineage::{is_ancestor, lineage};
pub use phases::{check_acyclic, topological_order};
pub use tree::{ScenarioForest, ScenarioTreeBuilder, TreeNode};
