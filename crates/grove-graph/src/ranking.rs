//! Degree centrality and whole-graph statistics.

use crate::edge::EdgeKind;
use crate::graph::GraphStore;
use grove_core::{NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalized degree centrality per node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CentralityScores(BTreeMap<NodeId, f64>);

impl CentralityScores {
    /// Score for `id`; 0.0 for unknown nodes.
    pub fn get(&self, id: &NodeId) -> f64 {
        self.0.get(id).copied().unwrap_or(0.0)
    }

    /// The `n` highest-scoring nodes, ties broken by id.
    pub fn top(&self, n: usize) -> Vec<(&NodeId, f64)> {
        let mut ranked: Vec<(&NodeId, f64)> = self.0.iter().map(|(id, s)| (id, *s)).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, f64)> {
        self.0.iter().map(|(id, s)| (id, *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Summary numbers for a whole graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub name: String,
    pub node_count: usize,
    pub edge_count: usize,
    pub file_count: usize,
    pub nodes_by_kind: BTreeMap<NodeKind, usize>,
    pub edges_by_kind: BTreeMap<EdgeKind, usize>,
    /// `2E / N`
    pub average_degree: f64,
    /// `2E / (N (N - 1))`
    pub density: f64,
}

impl GraphStore {
    /// `(in + out) / (2 (N - 1))` for every node.
    ///
    /// All scores are 0.0 when the graph has one node or none.
    pub fn centrality(&self) -> CentralityScores {
        let n = self.node_count();
        let scale = if n > 1 { 2.0 * (n as f64 - 1.0) } else { 0.0 };

        let scores = self
            .node_ids()
            .into_iter()
            .map(|id| {
                let (incoming, outgoing) = self.degree(&id);
                let score = if scale > 0.0 {
                    (incoming + outgoing) as f64 / scale
                } else {
                    0.0
                };
                (id, score)
            })
            .collect();
        CentralityScores(scores)
    }

    pub fn statistics(&self) -> GraphStatistics {
        let nodes = self.node_count() as f64;
        let edges = self.edge_count() as f64;
        let (nodes_by_kind, edges_by_kind) = self.kind_counts();

        GraphStatistics {
            name: self.name().to_string(),
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            file_count: self.files().count(),
            nodes_by_kind,
            edges_by_kind,
            average_degree: if nodes > 0.0 { 2.0 * edges / nodes } else { 0.0 },
            density: if nodes > 1.0 {
                2.0 * edges / (nodes * (nodes - 1.0))
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_core::Node;

    fn star() -> (GraphStore, NodeId, Vec<NodeId>) {
        let mut graph = GraphStore::new("star");
        let hub = graph.add_node(Node::new("hub", NodeKind::Function));
        let leaves: Vec<NodeId> = ["x", "y", "z"]
            .iter()
            .map(|name| graph.add_node(Node::new(*name, NodeKind::Function)))
            .collect();
        for leaf in &leaves {
            graph.connect(&hub, leaf, EdgeKind::Calls);
        }
        (graph, hub, leaves)
    }

    #[test]
    fn test_centrality_star() {
        let (graph, hub, leaves) = star();
        let scores = graph.centrality();

        // hub: degree 3 over 2 * (4 - 1)
        assert!((scores.get(&hub) - 0.5).abs() < 1e-9);
        for leaf in &leaves {
            assert!((scores.get(leaf) - 1.0 / 6.0).abs() < 1e-9);
        }
        assert_eq!(scores.top(1)[0].0, &hub);
    }

    #[test]
    fn test_centrality_trivial_graphs() {
        assert!(GraphStore::default().centrality().is_empty());

        let mut single = GraphStore::default();
        let only = single.add_node(Node::new("only", NodeKind::Module));
        assert_eq!(single.centrality().get(&only), 0.0);
    }

    #[test]
    fn test_statistics() {
        let (graph, _, _) = star();
        let stats = graph.statistics();

        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.nodes_by_kind[&NodeKind::Function], 4);
        assert_eq!(stats.edges_by_kind[&EdgeKind::Calls], 3);
        assert!((stats.average_degree - 1.5).abs() < 1e-9);
        assert!((stats.density - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = GraphStore::default().statistics();
        assert_eq!(stats.average_degree, 0.0);
        assert_eq!(stats.density, 0.0);
        assert!(stats.nodes_by_kind.is_empty());
    }
}
