//! Grove Graph - the knowledge graph engine
//!
//! This crate owns the graph of code entities and their relationships:
//! an indexed in-memory store, the traversal algorithms on top of it, the
//! builder that turns analyzer output into a graph, and the query layers
//! (structured filters, impact analysis, similarity, natural language).
//!
//! # Architecture
//!
//! The store keeps nodes and edges in a petgraph arena reached only
//! through typed ids, with extra indexes for:
//! - Kind-based filtering
//! - Name and substring lookups
//! - File-based grouping
//!
//! # Example
//!
//! ```
//! use grove_core::{Node, NodeKind};
//! use grove_graph::{EdgeKind, GraphQuery, GraphStore};
//!
//! let mut graph = GraphStore::new("demo");
//! let file = graph.add_node(Node::new("user.py", NodeKind::File).in_file("user.py"));
//! let func = graph.add_node(Node::new("validate", NodeKind::Function).in_file("user.py"));
//! graph.connect(&file, &func, EdgeKind::Contains);
//!
//! assert_eq!(graph.find_path(&file, &func, 3).map(|p| p.len()), Some(2));
//! let impact = GraphQuery::new(&graph).impact(&func, 5);
//! assert_eq!(impact.critical, 1);
//! ```

mod builder;
mod config;
mod edge;
mod error;
mod export;
mod graph;
mod impact;
mod nl;
mod query;
mod ranking;
mod search_index;
mod symbol_table;
mod traversal;

pub use builder::{classify_file, BuildReport, GraphBuilder};
pub use config::{GraphConfig, QueryDefaults, TraversalLimits};
pub use edge::{Edge, EdgeId, EdgeKind};
pub use error::{GraphError, Result};
pub use export::{ExportFormat, GraphDocument};
pub use graph::{Direction, GraphStore};
pub use impact::{ImpactLevel, ImpactReport, ImpactSeverity};
pub use nl::{QueryEngine, QueryKind, QueryPayload, QueryResult};
pub use query::{EdgeFilter, GraphQuery, NodeFilter, NodeSummary, ScoredNode, DEFAULT_LIMIT};
pub use ranking::{CentralityScores, GraphStatistics};
pub use symbol_table::{Resolved, SymbolTable};
pub use traversal::{CycleSearch, PathSearch, Subgraph};
