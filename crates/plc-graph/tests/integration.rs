//! Integration tests for plc-graph.

use plc_graph::{
    DependencyGraph, GraphError, analyze_circuits, cyclic_members, resolve_order,
    topological_order,
};
use proptest::prelude::*;

fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("u{i}")).collect()
}

fn reachable(n: usize, edges: &[(usize, usize)], from: usize, to: usize) -> bool {
    let mut seen = vec![false; n];
    let mut stack: Vec<usize> = edges.iter().filter(|e| e.0 == from).map(|e| e.1).collect();
    while let Some(node) = stack.pop() {
        if node == to {
            return true;
        }
        if std::mem::replace(&mut seen[node], true) {
            continue;
        }
        stack.extend(edges.iter().filter(|e| e.0 == node).map(|e| e.1));
    }
    false
}

#[test]
fn single_tank_loop_needs_explicit_order() {
    // pid1 -> valve1 -> tank1 -> pid1
    let mut g = DependencyGraph::new(["pid1", "valve1", "tank1"]);
    g.add_edge("pid1", "valve1").unwrap();
    g.add_edge("valve1", "tank1").unwrap();
    g.add_edge("tank1", "pid1").unwrap();

    let err = resolve_order(&g, None).unwrap_err();
    assert!(matches!(err, GraphError::Cycle { .. }));
    assert!(err.to_string().contains("pid1"));

    let explicit: Vec<String> = vec!["pid1".into(), "valve1".into(), "tank1".into()];
    assert_eq!(resolve_order(&g, Some(&explicit)).unwrap(), explicit);

    let circuits = analyze_circuits(&g);
    assert_eq!(circuits.len(), 1);
    assert_eq!(circuits[0].name, "pid1");
}

#[test]
fn open_loop_feed_forward() {
    // sensor -> pid -> valve, with an unrelated logger
    let mut g = DependencyGraph::new(["valve", "logger", "pid", "sensor"]);
    g.add_edge("sensor", "pid").unwrap();
    g.add_edge("pid", "valve").unwrap();

    let order = topological_order(&g).unwrap();
    assert_eq!(order, ["sensor", "pid", "valve", "logger"]);
    assert_eq!(analyze_circuits(&g).len(), 2);
}

proptest! {
    // Forward edges only (i < j) so the graph is a DAG. Nodes are declared
    // in shuffled order so declaration order alone is not a valid schedule.
    #[test]
    fn dag_order_respects_every_edge(
        (n, raw, declared) in (1usize..24).prop_flat_map(|n| (
            Just(n),
            prop::collection::vec((0usize..n, 0usize..n), 0..60),
            Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
        )),
    ) {
        let edges: Vec<(usize, usize)> = raw.into_iter().filter(|(a, b)| a < b).collect();
        let labels = names(n);
        let mut g = DependencyGraph::new(declared.iter().map(|&i| labels[i].clone()));
        for &(a, b) in &edges {
            g.add_edge(&labels[a], &labels[b]).unwrap();
        }

        let order = topological_order(&g).unwrap();
        prop_assert_eq!(order.len(), n);

        let position = |name: &str| order.iter().position(|o| o == name).unwrap();
        for &(a, b) in &edges {
            prop_assert!(position(&labels[a]) < position(&labels[b]));
        }
    }

    #[test]
    fn cycle_members_match_reachability(
        n in 1usize..12,
        raw in prop::collection::vec((0usize..12, 0usize..12), 0..30),
    ) {
        let edges: Vec<(usize, usize)> = raw.into_iter().map(|(a, b)| (a % n, b % n)).collect();
        let labels = names(n);
        let mut g = DependencyGraph::new(labels.iter().cloned());
        for &(a, b) in &edges {
            g.add_edge(&labels[a], &labels[b]).unwrap();
        }

        let expected: Vec<String> = (0..n)
            .filter(|&i| reachable(n, &edges, i, i))
            .map(|i| labels[i].clone())
            .collect();
        prop_assert_eq!(cyclic_members(&g), expected.clone());

        match topological_order(&g) {
            Ok(order) => {
                prop_assert!(expected.is_empty());
                prop_assert_eq!(order.len(), n);
            }
            Err(GraphError::Cycle { members, cycles }) => {
                prop_assert_eq!(members, expected);
                prop_assert!(!cycles.is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }
}
