//! Core graph data structure.
//!
//! `GraphStore` keeps nodes and edges in a petgraph arena and addresses
//! them only through their derived ids. Every insertion updates the id,
//! kind, name, file and search indexes in the same call, so an index entry
//! never points at a missing node or edge.

use crate::edge::{Edge, EdgeId, EdgeKind};
use crate::search_index::SearchIndex;
use grove_core::{Node, NodeId, NodeKind, Properties};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Which edges to follow from a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges leaving the node.
    Outgoing,
    /// Follow edges arriving at the node.
    Incoming,
    Both,
}

impl Direction {
    fn petgraph(self) -> &'static [petgraph::Direction] {
        match self {
            Direction::Outgoing => &[petgraph::Direction::Outgoing],
            Direction::Incoming => &[petgraph::Direction::Incoming],
            Direction::Both => &[petgraph::Direction::Outgoing, petgraph::Direction::Incoming],
        }
    }
}

/// The knowledge graph.
#[derive(Clone)]
pub struct GraphStore {
    name: String,
    metadata: Properties,

    /// Arena holding the owned node and edge data.
    pub(crate) graph: DiGraph<Node, Edge>,

    node_index: HashMap<NodeId, NodeIndex>,
    edge_index: HashMap<EdgeId, EdgeIndex>,
    nodes_by_kind: BTreeMap<NodeKind, BTreeSet<NodeId>>,
    edges_by_kind: BTreeMap<EdgeKind, BTreeSet<EdgeId>>,
    name_index: HashMap<String, BTreeSet<NodeId>>,
    file_index: BTreeMap<String, BTreeSet<NodeId>>,
    search_index: SearchIndex,
}

impl std::fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStore")
            .field("name", &self.name)
            .field("node_count", &self.graph.node_count())
            .field("edge_count", &self.graph.edge_count())
            .finish()
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new("knowledge_graph")
    }
}

impl GraphStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: Properties::new(),
            graph: DiGraph::new(),
            node_index: HashMap::new(),
            edge_index: HashMap::new(),
            nodes_by_kind: BTreeMap::new(),
            edges_by_kind: BTreeMap::new(),
            name_index: HashMap::new(),
            file_index: BTreeMap::new(),
            search_index: SearchIndex::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &Properties {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.metadata.insert(key.into(), value.into());
    }

    // ── Mutation ────────────────────────────────────────────

    /// Adds a node, or returns the id of the logically identical node
    /// already stored. An existing node is never modified.
    pub fn add_node(&mut self, mut node: Node) -> NodeId {
        node.rederive_id();
        if self.node_index.contains_key(&node.id) {
            return node.id;
        }

        let id = node.id.clone();
        self.nodes_by_kind
            .entry(node.kind)
            .or_default()
            .insert(id.clone());
        self.name_index
            .entry(node.name.clone())
            .or_default()
            .insert(id.clone());
        if let Some(file) = &node.file_path {
            self.file_index
                .entry(file.clone())
                .or_default()
                .insert(id.clone());
        }
        self.search_index.insert(&node.name, &id);

        let index = self.graph.add_node(node);
        self.node_index.insert(id.clone(), index);
        id
    }

    /// Adds an edge between two stored nodes.
    ///
    /// Returns `None` (and leaves the store untouched) when either endpoint
    /// is unknown. Re-adding an existing edge returns its id unchanged.
    pub fn add_edge(&mut self, mut edge: Edge) -> Option<EdgeId> {
        let (Some(&from), Some(&to)) = (
            self.node_index.get(&edge.source_id),
            self.node_index.get(&edge.target_id),
        ) else {
            warn!(
                "Skipping {} edge {} -> {}: endpoint not in graph",
                edge.kind, edge.source_id, edge.target_id
            );
            return None;
        };

        edge.id = edge.derived_id();
        if self.edge_index.contains_key(&edge.id) {
            return Some(edge.id);
        }

        let id = edge.id.clone();
        self.edges_by_kind
            .entry(edge.kind)
            .or_default()
            .insert(id.clone());
        let index = self.graph.add_edge(from, to, edge);
        self.edge_index.insert(id.clone(), index);
        Some(id)
    }

    /// Shorthand for a weight-1.0 edge without properties.
    pub fn connect(&mut self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> Option<EdgeId> {
        self.add_edge(Edge::new(source.clone(), target.clone(), kind))
    }

    /// Re-inserts every node and then every edge of `other`.
    ///
    /// Dedup makes this idempotent; nodes already present keep their
    /// first-seen properties.
    pub fn merge(&mut self, other: &GraphStore) {
        let (nodes_before, edges_before) = (self.node_count(), self.edge_count());
        for node in other.nodes() {
            self.add_node(node.clone());
        }
        for edge in other.edges() {
            self.add_edge(edge.clone());
        }
        debug!(
            "Merged '{}': +{} nodes, +{} edges",
            other.name,
            self.node_count() - nodes_before,
            self.edge_count() - edges_before
        );
    }

    // ── Lookup ──────────────────────────────────────────────

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        let index = self.node_index.get(id)?;
        self.graph.node_weight(*index)
    }

    pub fn get_edge(&self, id: &EdgeId) -> Option<&Edge> {
        let index = self.edge_index.get(id)?;
        self.graph.edge_weight(*index)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Iterates over all edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.graph.edge_weights()
    }

    /// All node ids, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.node_index.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Nodes of one kind, sorted by id.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&Node> {
        self.nodes_by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Edges of one kind, sorted by id.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> Vec<&Edge> {
        self.edges_by_kind
            .get(&kind)
            .map(|ids| ids.iter().filter_map(|id| self.get_edge(id)).collect())
            .unwrap_or_default()
    }

    pub(crate) fn kind_counts(&self) -> (BTreeMap<NodeKind, usize>, BTreeMap<EdgeKind, usize>) {
        let nodes = self
            .nodes_by_kind
            .iter()
            .map(|(kind, ids)| (*kind, ids.len()))
            .collect();
        let edges = self
            .edges_by_kind
            .iter()
            .map(|(kind, ids)| (*kind, ids.len()))
            .collect();
        (nodes, edges)
    }

    /// Nodes with exactly this name, sorted by id.
    pub fn find_by_name(&self, name: &str) -> Vec<&Node> {
        self.name_index
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Nodes attached to a file, sorted by id.
    pub fn find_by_file(&self, file: &str) -> Vec<&Node> {
        self.file_index
            .get(file)
            .map(|ids| ids.iter().filter_map(|id| self.get_node(id)).collect())
            .unwrap_or_default()
    }

    /// Every file path that has at least one node.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.file_index.keys().map(String::as_str)
    }

    /// Case-insensitive substring search over node names, sorted by id.
    pub fn search(&self, text: &str) -> Vec<&Node> {
        self.search_index
            .search(text)
            .iter()
            .filter_map(|id| self.get_node(id))
            .collect()
    }

    // ── Adjacency ───────────────────────────────────────────

    /// Edges leaving `id`, sorted by edge id.
    pub fn outgoing(&self, id: &NodeId) -> Vec<&Edge> {
        self.edges_directed(id, petgraph::Direction::Outgoing)
    }

    /// Edges arriving at `id`, sorted by edge id.
    pub fn incoming(&self, id: &NodeId) -> Vec<&Edge> {
        self.edges_directed(id, petgraph::Direction::Incoming)
    }

    fn edges_directed(&self, id: &NodeId, direction: petgraph::Direction) -> Vec<&Edge> {
        let Some(&index) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut edges: Vec<&Edge> = self
            .graph
            .edges_directed(index, direction)
            .map(|edge_ref| edge_ref.weight())
            .collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges
    }

    /// Edges touching `id` in the given direction, sorted by edge id.
    pub fn edges_in_direction(&self, id: &NodeId, direction: Direction) -> Vec<&Edge> {
        let mut edges: Vec<&Edge> = direction
            .petgraph()
            .iter()
            .flat_map(|d| self.edges_directed(id, *d))
            .collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));
        edges.dedup_by(|a, b| a.id == b.id);
        edges
    }

    /// Ids of adjacent nodes, sorted and de-duplicated.
    pub fn neighbor_ids(&self, id: &NodeId, direction: Direction) -> Vec<NodeId> {
        let Some(&index) = self.node_index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<NodeId> = direction
            .petgraph()
            .iter()
            .flat_map(|d| self.graph.neighbors_directed(index, *d))
            .filter_map(|n| self.graph.node_weight(n))
            .map(|node| node.id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Adjacent nodes, sorted by id and de-duplicated.
    pub fn neighbors(&self, id: &NodeId, direction: Direction) -> Vec<&Node> {
        self.neighbor_ids(id, direction)
            .iter()
            .filter_map(|n| self.get_node(n))
            .collect()
    }

    /// `(in_degree, out_degree)`; zero for unknown ids.
    pub fn degree(&self, id: &NodeId) -> (usize, usize) {
        let Some(&index) = self.node_index.get(id) else {
            return (0, 0);
        };
        (
            self.graph
                .edges_directed(index, petgraph::Direction::Incoming)
                .count(),
            self.graph
                .edges_directed(index, petgraph::Direction::Outgoing)
                .count(),
        )
    }
}
