//! Edge types for the knowledge graph.
//!
//! Edges are directed, typed and deduplicated by `(source, target, kind)`:
//! the same relationship reported twice is stored once.

use chrono::{DateTime, Utc};
use grove_core::{digest_id, KindError, NodeId, Properties};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Deterministic edge identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(String);

impl EdgeId {
    /// Derives the id for a `(source, target, kind)` triple.
    pub fn derive(source: &NodeId, target: &NodeId, kind: EdgeKind) -> Self {
        let seed = format!("{}|{}|{}", source, target, kind);
        EdgeId(digest_id(&seed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The type of relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Module A defines symbol B.
    Defines,
    /// File A imports module/file B.
    Imports,
    /// Module A exports symbol B.
    Exports,
    /// Class A extends class B.
    Extends,
    /// Class implements interface/trait.
    Implements,
    /// Container relationship (file contains class, class contains method).
    Contains,
    /// Function A calls function B.
    Calls,
    /// General reference to a symbol.
    References,
    /// File-level dependency from an explicit dependency map.
    DependsOn,
    Returns,
    Accepts,
    Throws,
    Overrides,
    Tests,
    Documents,
    Configures,
    RoutesTo,
    Renders,
    UsesHook,
    RelatedTo,
    SimilarTo,
    DerivedFrom,
    Precedes,
    Follows,
}

impl EdgeKind {
    pub const ALL: [EdgeKind; 24] = [
        EdgeKind::Defines,
        EdgeKind::Imports,
        EdgeKind::Exports,
        EdgeKind::Extends,
        EdgeKind::Implements,
        EdgeKind::Contains,
        EdgeKind::Calls,
        EdgeKind::References,
        EdgeKind::DependsOn,
        EdgeKind::Returns,
        EdgeKind::Accepts,
        EdgeKind::Throws,
        EdgeKind::Overrides,
        EdgeKind::Tests,
        EdgeKind::Documents,
        EdgeKind::Configures,
        EdgeKind::RoutesTo,
        EdgeKind::Renders,
        EdgeKind::UsesHook,
        EdgeKind::RelatedTo,
        EdgeKind::SimilarTo,
        EdgeKind::DerivedFrom,
        EdgeKind::Precedes,
        EdgeKind::Follows,
    ];

    /// Edge kinds followed by dependency and dependent traversals.
    pub const DEPENDENCY: [EdgeKind; 3] =
        [EdgeKind::DependsOn, EdgeKind::Imports, EdgeKind::UsesHook];

    pub fn is_dependency(&self) -> bool {
        Self::DEPENDENCY.contains(self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defines => "defines",
            Self::Imports => "imports",
            Self::Exports => "exports",
            Self::Extends => "extends",
            Self::Implements => "implements",
            Self::Contains => "contains",
            Self::Calls => "calls",
            Self::References => "references",
            Self::DependsOn => "depends_on",
            Self::Returns => "returns",
            Self::Accepts => "accepts",
            Self::Throws => "throws",
            Self::Overrides => "overrides",
            Self::Tests => "tests",
            Self::Documents => "documents",
            Self::Configures => "configures",
            Self::RoutesTo => "routes_to",
            Self::Renders => "renders",
            Self::UsesHook => "uses_hook",
            Self::RelatedTo => "related_to",
            Self::SimilarTo => "similar_to",
            Self::DerivedFrom => "derived_from",
            Self::Precedes => "precedes",
            Self::Follows => "follows",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeKind {
    type Err = KindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| KindError::UnknownEdgeKind(s.to_string()))
    }
}

/// A directed, weighted relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Derived from `(source_id, target_id, kind)`.
    pub id: EdgeId,
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub kind: EdgeKind,
    pub weight: f64,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub metadata: Properties,
    pub created_at: DateTime<Utc>,
}

impl Edge {
    /// Creates an edge with weight 1.0.
    pub fn new(source_id: NodeId, target_id: NodeId, kind: EdgeKind) -> Self {
        Self {
            id: EdgeId::derive(&source_id, &target_id, kind),
            source_id,
            target_id,
            kind,
            weight: 1.0,
            properties: Properties::new(),
            metadata: Properties::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn derived_id(&self) -> EdgeId {
        EdgeId::derive(&self.source_id, &self.target_id, self.kind)
    }

    /// The endpoint opposite to `node`, if `node` is an endpoint at all.
    pub fn other_end(&self, node: &NodeId) -> Option<&NodeId> {
        if &self.source_id == node {
            Some(&self.target_id)
        } else if &self.target_id == node {
            Some(&self.source_id)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::NodeKind;

    fn ids() -> (NodeId, NodeId) {
        (
            NodeId::derive("a", NodeKind::Function, Some("x.py")),
            NodeId::derive("b", NodeKind::Function, Some("x.py")),
        )
    }

    #[test]
    fn test_edge_id_is_deterministic_and_directional() {
        let (a, b) = ids();
        assert_eq!(
            EdgeId::derive(&a, &b, EdgeKind::Calls),
            EdgeId::derive(&a, &b, EdgeKind::Calls)
        );
        assert_ne!(
            EdgeId::derive(&a, &b, EdgeKind::Calls),
            EdgeId::derive(&b, &a, EdgeKind::Calls)
        );
        assert_ne!(
            EdgeId::derive(&a, &b, EdgeKind::Calls),
            EdgeId::derive(&a, &b, EdgeKind::References)
        );
    }

    #[test]
    fn test_new_edge_defaults() {
        let (a, b) = ids();
        let edge = Edge::new(a.clone(), b.clone(), EdgeKind::Imports);
        assert_eq!(edge.weight, 1.0);
        assert_eq!(edge.id, edge.derived_id());
        assert_eq!(edge.other_end(&a), Some(&b));
    }

    #[test]
    fn test_dependency_whitelist() {
        assert!(EdgeKind::Imports.is_dependency());
        assert!(EdgeKind::UsesHook.is_dependency());
        assert!(!EdgeKind::Calls.is_dependency());
        assert!(!EdgeKind::Contains.is_dependency());
    }

    #[test]
    fn test_kind_text_round_trip() {
        for kind in EdgeKind::ALL {
            assert_eq!(kind.to_string().parse::<EdgeKind>().unwrap(), kind);
        }
        assert_eq!(
            serde_json::to_string(&EdgeKind::DependsOn).unwrap(),
            "\"depends_on\""
        );
        assert!("pokes".parse::<EdgeKind>().is_err());
    }
}
