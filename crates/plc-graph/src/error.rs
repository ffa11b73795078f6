//! Graph-specific error types.

use thiserror::Error;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction and scheduling errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An edge names an instance the graph does not contain.
    #[error("Instance '{name}' is not part of the graph")]
    UnknownInstance { name: String },

    /// The same instance name was declared twice.
    #[error("Instance '{name}' is declared more than once")]
    DuplicateInstance { name: String },

    /// The connection graph contains circular data dependencies and no
    /// explicit execution order was supplied.
    #[error(
        "Circular dependency among instances [{}] ({}); an explicit execution order is required",
        .members.join(", "),
        format_paths(.cycles)
    )]
    Cycle {
        /// Every instance that lies on at least one cycle.
        members: Vec<String>,
        /// Concrete cycle paths found by depth-first search.
        cycles: Vec<Vec<String>>,
    },
}

/// Render each cycle as `a -> b -> a`.
fn format_paths(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut path = cycle.join(" -> ");
            if let Some(first) = cycle.first() {
                path.push_str(" -> ");
                path.push_str(first);
            }
            path
        })
        .collect::<Vec<_>>()
        .join("; ")
}
