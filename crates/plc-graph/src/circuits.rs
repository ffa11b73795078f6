//! Circuit analysis: connected components of the undirected connection
//! graph. Used for diagnostics and grouping, never for scheduling.

use plc_core::NodeId;

use crate::graph::DependencyGraph;

/// A maximal set of instances linked by connections in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Circuit {
    /// Name of the earliest-declared member.
    pub name: String,
    /// Members in declaration order.
    pub members: Vec<String>,
}

/// Group instances into circuits.
///
/// Circuits are returned in the declaration order of their first member.
/// An instance without connections forms a circuit on its own.
pub fn analyze_circuits(graph: &DependencyGraph) -> Vec<Circuit> {
    let mut visited = vec![false; graph.len()];
    let mut circuits = Vec::new();

    for root in graph.node_ids() {
        if visited[root.index()] {
            continue;
        }
        visited[root.index()] = true;

        let mut members: Vec<NodeId> = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            members.push(node);
            let neighbors = graph
                .successors(node)
                .iter()
                .chain(graph.predecessors(node).iter());
            for &next in neighbors {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    stack.push(next);
                }
            }
        }

        members.sort();
        let members = graph.to_names(&members);
        circuits.push(Circuit {
            name: members[0].clone(),
            members,
        });
    }

    circuits
}
