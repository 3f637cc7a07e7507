//! Code entities stored as graph nodes.
//!
//! A node's identity is a pure function of its name, kind and (optional)
//! file path. Two analyzers describing the same function in the same file
//! therefore produce the same `NodeId`, which is what makes ingestion
//! idempotent.

use crate::error::KindError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Open, kind-specific attribute map (parameters, return type, docstring, ...).
///
/// Ordered so that serialization and comparisons are reproducible.
pub type Properties = BTreeMap<String, Value>;

/// Number of hex digits kept from the SHA-256 digest.
const ID_HEX_LEN: usize = 16;

/// Hashes `seed` and keeps a fixed-length hex prefix.
pub fn digest_id(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let mut encoded = hex::encode(hasher.finalize());
    encoded.truncate(ID_HEX_LEN);
    encoded
}

/// Deterministic node identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Derives the id for a `(name, kind, file)` triple.
    pub fn derive(name: &str, kind: NodeKind, file_path: Option<&str>) -> Self {
        let seed = format!("{}|{}|{}", name, kind, file_path.unwrap_or(""));
        NodeId(digest_id(&seed))
    }

    /// Wraps an already-derived id string (e.g. read back from an export).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        NodeId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of entity kinds a node can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // ── Structural ──────────────────────────────────────────
    File,
    Module,
    Package,

    // ── Code entities ───────────────────────────────────────
    Class,
    Function,
    Method,
    Variable,
    Constant,
    Interface,
    Type,
    Enum,
    Import,
    Export,

    // ── Project artifacts ───────────────────────────────────
    Test,
    Config,
    Route,
    Component,
    Hook,

    // ── Derived knowledge ───────────────────────────────────
    Concept,
    Pattern,
    Dependency,
}

impl NodeKind {
    /// Every kind, in declaration order.
    pub const ALL: [NodeKind; 21] = [
        NodeKind::File,
        NodeKind::Module,
        NodeKind::Package,
        NodeKind::Class,
        NodeKind::Function,
        NodeKind::Method,
        NodeKind::Variable,
        NodeKind::Constant,
        NodeKind::Interface,
        NodeKind::Type,
        NodeKind::Enum,
        NodeKind::Import,
        NodeKind::Export,
        NodeKind::Test,
        NodeKind::Config,
        NodeKind::Route,
        NodeKind::Component,
        NodeKind::Hook,
        NodeKind::Concept,
        NodeKind::Pattern,
        NodeKind::Dependency,
    ];

    /// The canonical lowercase tag, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Package => "package",
            Self::Class => "class",
            Self::Function => "function",
            Self::Method => "method",
            Self::Variable => "variable",
            Self::Constant => "constant",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::Import => "import",
            Self::Export => "export",
            Self::Test => "test",
            Self::Config => "config",
            Self::Route => "route",
            Self::Component => "component",
            Self::Hook => "hook",
            Self::Concept => "concept",
            Self::Pattern => "pattern",
            Self::Dependency => "dependency",
        }
    }

    /// Whether nodes of this kind are callable code units.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method | Self::Hook)
    }

    /// Whether nodes of this kind can be inherited from or implemented.
    pub fn is_type_like(&self) -> bool {
        matches!(self, Self::Class | Self::Interface | Self::Enum | Self::Type)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = KindError;

    /// Parses the canonical tag (case-insensitive) plus a few common
    /// analyzer spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let kind = match lower.as_str() {
            "struct" => Self::Class,
            "trait" | "protocol" => Self::Interface,
            "type_alias" | "typedef" => Self::Type,
            "const" => Self::Constant,
            "async_function" => Self::Function,
            other => Self::ALL
                .into_iter()
                .find(|kind| kind.as_str() == other)
                .ok_or_else(|| KindError::UnknownNodeKind(s.to_string()))?,
        };
        Ok(kind)
    }
}

/// A single code entity in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Derived from `(name, kind, file_path)`.
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub file_path: Option<String>,
    /// First line of the entity (1-based).
    pub line_number: Option<u32>,
    pub end_line: Option<u32>,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub metadata: Properties,
    pub created_at: DateTime<Utc>,
}

impl Node {
    /// Creates a node that is not attached to any file.
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        let name = name.into();
        Self {
            id: NodeId::derive(&name, kind, None),
            name,
            kind,
            file_path: None,
            line_number: None,
            end_line: None,
            properties: Properties::new(),
            metadata: Properties::new(),
            created_at: Utc::now(),
        }
    }

    /// Attaches the node to a file. The id is re-derived.
    pub fn in_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self.rederive_id();
        self
    }

    pub fn with_lines(mut self, start: u32, end: Option<u32>) -> Self {
        self.line_number = Some(start);
        self.end_line = end;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties.extend(properties);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The id this node should carry given its current name, kind and file.
    pub fn derived_id(&self) -> NodeId {
        NodeId::derive(&self.name, self.kind, self.file_path.as_deref())
    }

    /// Resets `id` to `derived_id()`.
    pub fn rederive_id(&mut self) {
        self.id = self.derived_id();
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// `file:line` when both are known, the file alone otherwise.
    pub fn location(&self) -> Option<String> {
        let file = self.file_path.as_ref()?;
        Some(match self.line_number {
            Some(line) => format!("{}:{}", file, line),
            None => file.clone(),
        })
    }
}
