//! Error types for the graph crate.
//!
//! Lookups never fail (they return `None` or an empty list); only the
//! document and configuration boundaries produce errors.

use grove_core::KindError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    /// The document could not be decoded, including any kind tag outside
    /// the closed node/edge sets.
    #[error("Invalid graph document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    UnknownKind(#[from] KindError),
}

impl GraphError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
