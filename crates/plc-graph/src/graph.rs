//! Arena-backed dependency graph.

use std::collections::HashMap;

use plc_core::NodeId;

use crate::error::{GraphError, GraphResult};

/// Directed graph over instance names.
///
/// An edge `source -> target` means "target depends on source": one of the
/// source's parameters feeds one of the target's parameters. Parallel
/// connections between the same pair of instances collapse into one edge.
/// Node indices follow declaration order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: Vec<String>,
    index: HashMap<String, NodeId>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl DependencyGraph {
    /// Create a graph with one node per name, in the given order.
    ///
    /// Repeated names are kept once.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut graph = Self::default();
        for name in names {
            let name = name.into();
            if graph.add_node(name.clone()).is_err() {
                tracing::debug!(instance = %name, "duplicate instance name ignored");
            }
        }
        graph
    }

    /// Add a node at the end of the declaration order.
    pub fn add_node(&mut self, name: impl Into<String>) -> GraphResult<NodeId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateInstance { name });
        }
        let id = NodeId::from_index(self.names.len());
        self.index.insert(name.clone(), id);
        self.names.push(name);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        Ok(id)
    }

    /// Add a dependency edge. Returns `false` if the edge already existed.
    pub fn add_edge(&mut self, source: &str, target: &str) -> GraphResult<bool> {
        let from = self.require(source)?;
        let to = self.require(target)?;
        if self.successors[from.index()].contains(&to) {
            return Ok(false);
        }
        self.successors[from.index()].push(to);
        self.predecessors[to.index()].push(from);
        Ok(true)
    }

    fn require(&self, name: &str) -> GraphResult<NodeId> {
        self.id(name).ok_or_else(|| GraphError::UnknownInstance {
            name: name.to_string(),
        })
    }

    pub fn id(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.names[id.index()]
    }

    /// All names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.names.len()).map(NodeId::from_index)
    }

    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        &self.successors[id.index()]
    }

    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        &self.predecessors[id.index()]
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(Vec::len).sum()
    }

    /// `true` when the node has no edge in either direction.
    pub fn is_isolated(&self, id: NodeId) -> bool {
        self.successors[id.index()].is_empty() && self.predecessors[id.index()].is_empty()
    }

    pub(crate) fn to_names(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter().map(|&id| self.name(id).to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_keep_declaration_order() {
        let graph = DependencyGraph::new(["tank1", "pid1", "valve1"]);
        assert_eq!(graph.names(), ["tank1", "pid1", "valve1"]);
        assert_eq!(graph.id("pid1").map(|id| id.index()), Some(1));
    }

    #[test]
    fn duplicate_names_collapse() {
        let graph = DependencyGraph::new(["a", "b", "a"]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn parallel_edges_collapse() {
        let mut graph = DependencyGraph::new(["a", "b"]);
        assert!(graph.add_edge("a", "b").unwrap());
        assert!(!graph.add_edge("a", "b").unwrap());
        assert_eq!(graph.edge_count(), 1);

        let a = graph.id("a").unwrap();
        let b = graph.id("b").unwrap();
        assert_eq!(graph.successors(a), [b]);
        assert_eq!(graph.predecessors(b), [a]);
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let mut graph = DependencyGraph::new(["a"]);
        let err = graph.add_edge("a", "ghost").unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownInstance {
                name: "ghost".to_string()
            }
        );
    }

    #[test]
    fn isolation() {
        let mut graph = DependencyGraph::new(["a", "b", "c"]);
        graph.add_edge("a", "b").unwrap();
        assert!(!graph.is_isolated(graph.id("a").unwrap()));
        assert!(graph.is_isolated(graph.id("c").unwrap()));
    }
}
