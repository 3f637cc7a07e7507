//! Error types for the core vocabulary.

use thiserror::Error;

/// Raised when a kind tag cannot be parsed from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KindError {
    #[error("unknown node kind `{0}`")]
    UnknownNodeKind(String),

    #[error("unknown edge kind `{0}`")]
    UnknownEdgeKind(String),
}
