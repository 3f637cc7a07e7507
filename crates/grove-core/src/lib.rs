//! Grove Core - the vocabulary of the knowledge graph
//!
//! This crate defines what the graph is made of: code entities (`Node`)
//! with their deterministic identifiers and closed kind set, and the
//! structured records external analyzers hand over for ingestion.
//!
//! It deliberately knows nothing about edges, indices or traversal;
//! those live in `grove-graph`.
//!
//! # Example
//!
//! ```
//! use grove_core::{Node, NodeId, NodeKind};
//!
//! let node = Node::new("validate", NodeKind::Function).in_file("src/user.py");
//! assert_eq!(node.id, NodeId::derive("validate", NodeKind::Function, Some("src/user.py")));
//! ```

pub mod error;
pub mod node;
pub mod records;

pub use error::KindError;
pub use node::{digest_id, Node, NodeId, NodeKind, Properties};
pub use records::{
    AnalysisBundle, AnalysisRecord, CodeUnit, DependencyMap, FileRecord, ImportRecord,
    PatternFinding,
};
