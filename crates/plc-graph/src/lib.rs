//! plc-graph: dependency graph and scheduling for PLC instances.
//!
//! Provides:
//! - An arena-backed directed graph where `source -> target` means the target
//!   consumes one of the source's parameters
//! - Kahn topological scheduling with explicit-order overrides
//! - Cycle detection with an explicit stack (no recursion)
//! - Circuit analysis (undirected connected components) for diagnostics
//!
//! # Example
//!
//! ```
//! use plc_graph::{DependencyGraph, resolve_order};
//!
//! let names = ["pid1", "valve1", "tank1"];
//! let mut graph = DependencyGraph::new(names);
//! graph.add_edge("pid1", "valve1").unwrap();
//! graph.add_edge("valve1", "tank1").unwrap();
//!
//! let order = resolve_order(&graph, None).unwrap();
//! assert_eq!(order, vec!["pid1", "valve1", "tank1"]);
//! ```

pub mod circuits;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod schedule;

pub use circuits::{Circuit, analyze_circuits};
pub use cycles::{cyclic_members, find_cycles};
pub use error::{GraphError, GraphResult};
pub use graph::DependencyGraph;
pub use schedule::{resolve_order, topological_order};
