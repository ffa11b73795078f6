//! Dependency structure derived from a configuration.

use plc_graph::{Circuit, DependencyGraph, GraphResult, analyze_circuits, resolve_order};

use crate::schema::PlcConfig;

impl PlcConfig {
    /// Dependency graph over the declared instances.
    ///
    /// Connections with a malformed endpoint or an unknown instance add no
    /// edge; they are reported by [`crate::validate_config`].
    pub fn dependency_graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new(self.instances.names());
        for conn in &self.connections {
            let Ok((source, target)) = conn.endpoints() else {
                tracing::debug!(connection = %conn, "malformed connection left out of graph");
                continue;
            };
            if graph.add_edge(&source.instance, &target.instance).is_err() {
                tracing::debug!(connection = %conn, "connection to unknown instance left out of graph");
            }
        }
        graph
    }

    /// Execution order: the explicit override if present, otherwise the
    /// topological order of the dependency graph.
    pub fn execution_order(&self) -> GraphResult<Vec<String>> {
        resolve_order(&self.dependency_graph(), self.execution_order.as_deref())
    }

    /// Connected groups of instances, for diagnostics.
    pub fn circuits(&self) -> Vec<Circuit> {
        analyze_circuits(&self.dependency_graph())
    }
}
