//! Cycle detection.
//!
//! Both walks use an explicit stack over arena indices, so stack depth does
//! not grow with the length of a dependency chain.

use std::collections::VecDeque;

use plc_core::NodeId;

use crate::graph::DependencyGraph;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Find cycle paths by depth-first search.
///
/// Each returned path lists the instances of one cycle in edge order,
/// without repeating the first instance at the end. Every strongly
/// connected component that contains a cycle yields at least one path.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    let mut marks = vec![Mark::Unvisited; graph.len()];
    let mut cycles = Vec::new();

    for root in graph.node_ids() {
        if marks[root.index()] != Mark::Unvisited {
            continue;
        }

        // (node, index of the next successor to visit)
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        let mut path: Vec<NodeId> = vec![root];
        marks[root.index()] = Mark::InProgress;

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let succ = graph.successors(node);
            if next < succ.len() {
                frame.1 += 1;
                let child = succ[next];
                match marks[child.index()] {
                    Mark::Unvisited => {
                        marks[child.index()] = Mark::InProgress;
                        stack.push((child, 0));
                        path.push(child);
                    }
                    Mark::InProgress => {
                        if let Some(start) = path.iter().position(|&n| n == child) {
                            cycles.push(graph.to_names(&path[start..]));
                        }
                    }
                    Mark::Done => {}
                }
            } else {
                marks[node.index()] = Mark::Done;
                stack.pop();
                path.pop();
            }
        }
    }

    cycles
}

/// Every instance that can reach itself through one or more edges, in
/// declaration order.
///
/// Unlike [`find_cycles`], this names every member of every cycle.
pub fn cyclic_members(graph: &DependencyGraph) -> Vec<String> {
    graph
        .node_ids()
        .filter(|&id| reaches_itself(graph, id))
        .map(|id| graph.name(id).to_string())
        .collect()
}

fn reaches_itself(graph: &DependencyGraph, start: NodeId) -> bool {
    let mut seen = vec![false; graph.len()];
    let mut queue: VecDeque<NodeId> = graph.successors(start).iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        if node == start {
            return true;
        }
        if seen[node.index()] {
            continue;
        }
        seen[node.index()] = true;
        queue.extend(graph.successors(node).iter().copied());
    }
    false
}
