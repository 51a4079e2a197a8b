//! Phase dependency graphs.
//!
//! Within one scenario, phase timelines are linked by dependency edges
//! (predecessor -> successor). The graph must stay acyclic; the store checks
//! every change set against [`topological_order`] before committing it.

use std::collections::{HashMap, VecDeque};

use scn_types::PhaseTimelineId;

use crate::error::{DagError, DagResult};

/// Order timelines so every predecessor precedes its successors.
///
/// Kahn's algorithm. Ties are broken by the order of `nodes`, so the result
/// is deterministic. Fails with [`DagError::DependencyCycle`] listing the
/// timelines left unsorted (those on or behind a cycle).
pub fn topological_order(
    nodes: &[PhaseTimelineId],
    edges: &[(PhaseTimelineId, PhaseTimelineId)],
) -> DagResult<Vec<PhaseTimelineId>> {
    let position: HashMap<PhaseTimelineId, usize> =
        nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (pred, succ) in edges {
        if pred == succ {
            return Err(DagError::SelfDependency(*pred));
        }
        let p = *position.get(pred).ok_or(DagError::UnknownTimeline(*pred))?;
        let s = *position.get(succ).ok_or(DagError::UnknownTimeline(*succ))?;
        successors[p].push(s);
        in_degree[s] += 1;
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(i) = queue.pop_front() {
        order.push(nodes[i]);
        for &s in &successors[i] {
            in_degree[s] -= 1;
            if in_degree[s] == 0 {
                queue.push_back(s);
            }
        }
    }

    if order.len() < nodes.len() {
        let stuck = (0..nodes.len())
            .filter(|&i| in_degree[i] > 0)
            .map(|i| nodes[i])
            .collect();
        return Err(DagError::DependencyCycle(stuck));
    }
    Ok(order)
}

/// Check that the dependency graph is a DAG.
pub fn check_acyclic(
    nodes: &[PhaseTimelineId],
    edges: &[(PhaseTimelineId, PhaseTimelineId)],
) -> DagResult<()> {
    topological_order(nodes, edges).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ids(n: usize) -> Vec<PhaseTimelineId> {
        (0..n).map(|_| PhaseTimelineId::new()).collect()
    }

    #[test]
    fn orders_chain() {
        let n = ids(3);
        let order = topological_order(&n, &[(n[1], n[2]), (n[0], n[1])]).unwrap();
        assert_eq!(order, n);
    }

    #[test]
    fn independent_nodes_keep_input_order() {
        let n = ids(4);
        let order = topological_order(&n, &[]).unwrap();
        assert_eq!(order, n);
    }

    #[test]
    fn diamond_is_acyclic() {
        let n = ids(4);
        let edges = [(n[0], n[1]), (n[0], n[2]), (n[1], n[3]), (n[2], n[3])];
        let order = topological_order(&n, &edges).unwrap();
        assert_eq!(order.first(), Some(&n[0]));
        assert_eq!(order.last(), Some(&n[3]));
    }

    #[test]
    fn cycle_reports_stuck_nodes() {
        let n = ids(4);
        let edges = [(n[0], n[1]), (n[1], n[2]), (n[2], n[1])];
        let err = check_acyclic(&n, &edges).unwrap_err();
        match err {
            DagError::DependencyCycle(stuck) => {
                assert!(stuck.contains(&n[1]));
                assert!(stuck.contains(&n[2]));
                assert!(!stuck.contains(&n[0]));
                assert!(!stuck.contains(&n[3]));
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn self_edge_rejected() {
        let n = ids(1);
        assert_eq!(
            check_acyclic(&n, &[(n[0], n[0])]),
            Err(DagError::SelfDependency(n[0]))
        );
    }

    #[test]
    fn unknown_node_rejected() {
        let n = ids(1);
        let ghost = PhaseTimelineId::new();
        assert_eq!(
            check_acyclic(&n, &[(n[0], ghost)]),
            Err(DagError::UnknownTimeline(ghost))
        );
    }

    proptest! {
        /// Edges that only point forward in a fixed numbering never form a cycle,
        /// and the produced order respects every edge.
        #[test]
        fn forward_edges_always_sort(pairs in prop::collection::vec((0usize..12, 0usize..12), 0..40)) {
            let n = ids(12);
            let edges: Vec<_> = pairs
                .into_iter()
                .filter(|(a, b)| a < b)
                .map(|(a, b)| (n[a], n[b]))
                .collect();
            let order = topological_order(&n, &edges).unwrap();
            let pos: HashMap<_, _> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
            for (p, s) in &edges {
                prop_assert!(pos[p] < pos[s]);
            }
        }
    }
}
