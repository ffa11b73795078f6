//! Execution-order scheduling.

use std::collections::{BTreeSet, VecDeque};

use plc_core::NodeId;

use crate::cycles::{cyclic_members, find_cycles};
use crate::error::{GraphError, GraphResult};
use crate::graph::DependencyGraph;

/// Compute an execution order with Kahn's algorithm.
///
/// Connected instances are emitted so that every source precedes each
/// target it feeds; ties resolve in declaration order. Instances without any
/// connection are appended afterwards, sorted by name.
///
/// Fails with [`GraphError::Cycle`] when the connections contain a cycle.
pub fn topological_order(graph: &DependencyGraph) -> GraphResult<Vec<String>> {
    let mut in_degree: Vec<usize> = graph
        .node_ids()
        .map(|id| graph.predecessors(id).len())
        .collect();

    let connected: Vec<NodeId> = graph.node_ids().filter(|&id| !graph.is_isolated(id)).collect();

    let mut queue: VecDeque<NodeId> = connected
        .iter()
        .copied()
        .filter(|id| in_degree[id.index()] == 0)
        .collect();

    let mut order: Vec<NodeId> = Vec::with_capacity(graph.len());
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for &next in graph.successors(node) {
            let deg = &mut in_degree[next.index()];
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() < connected.len() {
        return Err(GraphError::Cycle {
            members: cyclic_members(graph),
            cycles: find_cycles(graph),
        });
    }

    let mut names = graph.to_names(&order);

    let mut isolated: Vec<String> = graph
        .node_ids()
        .filter(|&id| graph.is_isolated(id))
        .map(|id| graph.name(id).to_string())
        .collect();
    if !isolated.is_empty() {
        isolated.sort();
        tracing::debug!(?isolated, "appending instances without connections");
        names.extend(isolated);
    }

    Ok(names)
}

/// Resolve the execution order for a graph.
///
/// An explicit order is returned verbatim without running the topological
/// sort; instances it omits or names in excess are reported as warnings
/// only. Explicit orders are how feedback loops (for example cascade
/// control) are scheduled, so they are never checked against edges.
pub fn resolve_order(
    graph: &DependencyGraph,
    explicit: Option<&[String]>,
) -> GraphResult<Vec<String>> {
    match explicit {
        Some(order) => {
            check_permutation(graph, order);
            Ok(order.to_vec())
        }
        None => topological_order(graph),
    }
}

fn check_permutation(graph: &DependencyGraph, order: &[String]) {
    let declared: BTreeSet<&str> = graph.names().iter().map(String::as_str).collect();
    let listed: BTreeSet<&str> = order.iter().map(String::as_str).collect();

    let missing: Vec<&str> = declared.difference(&listed).copied().collect();
    let extra: Vec<&str> = listed.difference(&declared).copied().collect();

    if !missing.is_empty() {
        tracing::warn!(?missing, "execution order omits instances; they will not execute");
    }
    if !extra.is_empty() {
        tracing::warn!(?extra, "execution order names unknown instances");
    }
    if listed.len() != order.len() {
        tracing::warn!("execution order lists an instance more than once");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(names: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new(names.iter().copied());
        for (a, b) in edges {
            g.add_edge(a, b).unwrap();
        }
        g
    }

    #[test]
    fn chain_is_ordered() {
        let g = graph(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        assert_eq!(topological_order(&g).unwrap(), ["a", "b", "c"]);
    }

    #[test]
    fn ties_follow_declaration_order() {
        let g = graph(&["x", "y", "sink"], &[("y", "sink"), ("x", "sink")]);
        assert_eq!(topological_order(&g).unwrap(), ["x", "y", "sink"]);
    }

    #[test]
    fn isolated_instances_are_appended_by_name() {
        let g = graph(&["zeta", "a", "b", "alpha"], &[("a", "b")]);
        assert_eq!(topological_order(&g).unwrap(), ["a", "b", "alpha", "zeta"]);
    }

    #[test]
    fn empty_graph_has_empty_order() {
        let g = DependencyGraph::default();
        assert!(topological_order(&g).unwrap().is_empty());
    }

    #[test]
    fn cycle_without_override_fails() {
        let g = graph(
            &["pid1", "valve1", "tank1", "idle"],
            &[("pid1", "valve1"), ("valve1", "tank1"), ("tank1", "pid1")],
        );
        match topological_order(&g) {
            Err(GraphError::Cycle { members, cycles }) => {
                assert_eq!(members, ["pid1", "valve1", "tank1"]);
                assert_eq!(cycles.len(), 1);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn explicit_order_is_used_verbatim() {
        let g = graph(
            &["pid1", "valve1", "tank1"],
            &[("pid1", "valve1"), ("valve1", "tank1"), ("tank1", "pid1")],
        );
        let explicit: Vec<String> = ["tank1", "pid1", "valve1"].map(String::from).to_vec();
        assert_eq!(resolve_order(&g, Some(&explicit)).unwrap(), explicit);
    }

    #[test]
    fn explicit_order_mismatch_is_not_fatal() {
        let g = graph(&["a", "b"], &[]);
        let explicit = vec!["a".to_string(), "ghost".to_string()];
        assert_eq!(resolve_order(&g, Some(&explicit)).unwrap(), explicit);
    }
}
