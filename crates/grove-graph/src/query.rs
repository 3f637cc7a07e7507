//! Structured queries over a built graph.
//!
//! `GraphQuery` is a thin read-only view; it never mutates the store and
//! every result is ordered by node or edge id unless it is ranked.

use crate::edge::{Edge, EdgeKind};
use crate::error::Result;
use crate::graph::{Direction, GraphStore};
use grove_core::{Node, NodeId, NodeKind, Properties};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Default cap on filter results.
pub const DEFAULT_LIMIT: usize = 50;

/// Flattened node info for responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub file_path: Option<String>,
    pub line_number: Option<u32>,
}

impl From<&Node> for NodeSummary {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            kind: node.kind,
            file_path: node.file_path.clone(),
            line_number: node.line_number,
        }
    }
}

/// A node with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
    pub node: NodeSummary,
    pub score: f64,
}

/// Conjunctive node filter. Unset fields match everything.
#[derive(Debug, Clone)]
pub struct NodeFilter {
    pub kind: Option<NodeKind>,
    /// Case-insensitive regex over the node name.
    pub name_pattern: Option<String>,
    /// Case-insensitive regex over the file path; nodes without one never match.
    pub file_pattern: Option<String>,
    /// Every entry must be present with an equal value.
    pub properties: Properties,
    pub limit: usize,
}

impl Default for NodeFilter {
    fn default() -> Self {
        Self {
            kind: None,
            name_pattern: None,
            file_pattern: None,
            properties: Properties::new(),
            limit: DEFAULT_LIMIT,
        }
    }
}

impl NodeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Like [`kind`](Self::kind), parsing the tag from user input.
    pub fn kind_str(self, kind: &str) -> Result<Self> {
        Ok(self.kind(kind.parse::<NodeKind>()?))
    }

    pub fn name(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(pattern.into());
        self
    }

    pub fn file(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = Some(pattern.into());
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// Conjunctive edge filter.
#[derive(Debug, Clone)]
pub struct EdgeFilter {
    pub kind: Option<EdgeKind>,
    pub source: Option<NodeId>,
    pub target: Option<NodeId>,
    pub min_weight: Option<f64>,
    pub limit: usize,
}

impl Default for EdgeFilter {
    fn default() -> Self {
        Self {
            kind: None,
            source: None,
            target: None,
            min_weight: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl EdgeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: EdgeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn source(mut self, id: NodeId) -> Self {
        self.source = Some(id);
        self
    }

    pub fn target(mut self, id: NodeId) -> Self {
        self.target = Some(id);
        self
    }

    pub fn min_weight(mut self, weight: f64) -> Self {
        self.min_weight = Some(weight);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// A query interface for complex graph operations.
#[derive(Debug, Clone, Copy)]
pub struct GraphQuery<'a> {
    graph: &'a GraphStore,
}

impl<'a> GraphQuery<'a> {
    pub fn new(graph: &'a GraphStore) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'a GraphStore {
        self.graph
    }

    /// Nodes matching every field of `filter`, sorted by id.
    pub fn find_nodes(&self, filter: &NodeFilter) -> Vec<&'a Node> {
        let name_re = filter.name_pattern.as_deref().map(pattern);
        let file_re = filter.file_pattern.as_deref().map(pattern);

        let candidates: Vec<&'a Node> = match filter.kind {
            Some(kind) => self.graph.nodes_of_kind(kind),
            None => {
                let mut all: Vec<&'a Node> = self.graph.nodes().collect();
                all.sort_by(|a, b| a.id.cmp(&b.id));
                all
            }
        };

        candidates
            .into_iter()
            .filter(|node| is_match(&name_re, Some(node.name.as_str())))
            .filter(|node| is_match(&file_re, node.file_path.as_deref()))
            .filter(|node| {
                filter
                    .properties
                    .iter()
                    .all(|(key, value)| node.properties.get(key) == Some(value))
            })
            .take(filter.limit)
            .collect()
    }

    /// Edges matching every field of `filter`, sorted by id.
    pub fn find_edges(&self, filter: &EdgeFilter) -> Vec<&'a Edge> {
        let candidates: Vec<&'a Edge> = match (&filter.source, &filter.target, filter.kind) {
            (Some(source), _, _) => self.graph.outgoing(source),
            (None, Some(target), _) => self.graph.incoming(target),
            (None, None, Some(kind)) => self.graph.edges_of_kind(kind),
            (None, None, None) => {
                let mut all: Vec<&'a Edge> = self.graph.edges().collect();
                all.sort_by(|a, b| a.id.cmp(&b.id));
                all
            }
        };

        candidates
            .into_iter()
            .filter(|edge| filter.kind.map_or(true, |kind| edge.kind == kind))
            .filter(|edge| filter.source.as_ref().map_or(true, |s| &edge.source_id == s))
            .filter(|edge| filter.target.as_ref().map_or(true, |t| &edge.target_id == t))
            .filter(|edge| filter.min_weight.map_or(true, |w| edge.weight >= w))
            .take(filter.limit)
            .collect()
    }

    /// Everything `id` transitively depends on through dependency edges,
    /// within `depth` hops, in BFS order.
    pub fn find_dependencies(&self, id: &NodeId, depth: usize) -> Vec<NodeId> {
        self.dependency_walk(id, depth, Direction::Outgoing)
    }

    /// Everything that transitively depends on `id` through dependency
    /// edges, within `depth` hops, in BFS order.
    pub fn find_dependents(&self, id: &NodeId, depth: usize) -> Vec<NodeId> {
        self.dependency_walk(id, depth, Direction::Incoming)
    }

    fn dependency_walk(&self, id: &NodeId, depth: usize, direction: Direction) -> Vec<NodeId> {
        let mut result = Vec::new();
        if !self.graph.contains_node(id) {
            return result;
        }

        let mut visited: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut queue = VecDeque::from([(id.clone(), 0usize)]);

        while let Some((current, d)) = queue.pop_front() {
            if d >= depth {
                continue;
            }
            let edges = match direction {
                Direction::Incoming => self.graph.incoming(&current),
                _ => self.graph.outgoing(&current),
            };
            for edge in edges.into_iter().filter(|e| e.kind.is_dependency()) {
                let next = match direction {
                    Direction::Incoming => &edge.source_id,
                    _ => &edge.target_id,
                };
                if visited.insert(next.clone()) {
                    result.push(next.clone());
                    queue.push_back((next.clone(), d + 1));
                }
            }
        }
        result
    }

    /// Nodes most like `id`, best first.
    ///
    /// Scoring: +5 same kind, +2 same file, +1 per property with an equal
    /// value, +0.5 per shared neighbour. Zero scores are dropped; ties go to
    /// the lower id.
    pub fn similar(&self, id: &NodeId, limit: usize) -> Vec<ScoredNode> {
        let Some(target) = self.graph.get_node(id) else {
            return Vec::new();
        };
        let target_neighbors: BTreeSet<NodeId> = self
            .graph
            .neighbor_ids(id, Direction::Both)
            .into_iter()
            .collect();

        let mut scored: Vec<ScoredNode> = self
            .graph
            .nodes()
            .filter(|node| &node.id != id)
            .filter_map(|node| {
                let mut score = 0.0;
                if node.kind == target.kind {
                    score += 5.0;
                }
                if target.file_path.is_some() && node.file_path == target.file_path {
                    score += 2.0;
                }
                score += target
                    .properties
                    .iter()
                    .filter(|(key, value)| node.properties.get(*key) == Some(*value))
                    .count() as f64;
                let shared = self
                    .graph
                    .neighbor_ids(&node.id, Direction::Both)
                    .iter()
                    .filter(|n| target_neighbors.contains(*n))
                    .count();
                score += 0.5 * shared as f64;

                (score > 0.0).then(|| ScoredNode {
                    node: NodeSummary::from(node),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.node.id.cmp(&b.node.id))
        });
        scored.truncate(limit);
        scored
    }

    /// Nodes whose name is `name`, falling back to a case-insensitive match.
    pub fn resolve_name(&self, name: &str) -> Vec<&'a Node> {
        let exact = self.graph.find_by_name(name);
        if !exact.is_empty() {
            return exact;
        }
        self.graph
            .search(name)
            .into_iter()
            .filter(|node| node.name.eq_ignore_ascii_case(name))
            .collect()
    }
}

/// Compiles a case-insensitive pattern, matching it literally when it is
/// not a valid regex.
fn pattern(source: &str) -> Option<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .build()
        .or_else(|_| {
            RegexBuilder::new(&regex::escape(source))
                .case_insensitive(true)
                .build()
        })
        .ok()
}

/// An unset filter matches everything; one that failed to compile, nothing.
fn is_match(filter: &Option<Option<Regex>>, text: Option<&str>) -> bool {
    match filter {
        None => true,
        Some(re) => match (re, text) {
            (Some(re), Some(text)) => re.is_match(text),
            _ => false,
        },
    }
}
