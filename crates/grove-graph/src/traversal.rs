//! Path finding, cycle detection and subgraph extraction.
//!
//! Every walk visits neighbors in id order, so results are reproducible
//! across runs. The enumerations that can blow up (all paths, cycles,
//! subgraphs) run on explicit stacks/queues and stop at the ceilings in
//! [`TraversalLimits`], reporting `truncated` instead of failing.

use crate::config::{Budget, TraversalLimits};
use crate::graph::{Direction, GraphStore};
use grove_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Simple paths between two nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSearch {
    pub paths: Vec<Vec<NodeId>>,
    /// A path ceiling or visit budget cut the search short.
    pub truncated: bool,
}

/// Cycles found by a depth-first sweep of the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSearch {
    /// Each cycle lists its nodes once; the edge back to the first node is implied.
    pub cycles: Vec<Vec<NodeId>>,
    pub truncated: bool,
}

/// An extracted neighbourhood.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub graph: GraphStore,
    pub truncated: bool,
}

/// One DFS frame: the sorted successors of a node and how many were tried.
struct Frame {
    successors: Vec<NodeId>,
    cursor: usize,
}

impl Frame {
    fn next(&mut self) -> Option<NodeId> {
        let next = self.successors.get(self.cursor).cloned();
        self.cursor += 1;
        next
    }
}

impl GraphStore {
    /// Shortest path from `source` to `target` over outgoing edges, both
    /// endpoints included, at most `max_depth` hops long.
    pub fn find_path(&self, source: &NodeId, target: &NodeId, max_depth: usize) -> Option<Vec<NodeId>> {
        if !self.contains_node(source) || !self.contains_node(target) {
            return None;
        }
        if source == target {
            return Some(vec![source.clone()]);
        }

        let mut parent: HashMap<NodeId, NodeId> = HashMap::new();
        let mut seen: HashSet<NodeId> = HashSet::from([source.clone()]);
        let mut queue = VecDeque::from([(source.clone(), 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.neighbor_ids(&current, Direction::Outgoing) {
                if !seen.insert(next.clone()) {
                    continue;
                }
                parent.insert(next.clone(), current.clone());
                if &next == target {
                    return Some(unwind(&parent, next));
                }
                queue.push_back((next, depth + 1));
            }
        }
        None
    }

    /// All simple paths from `source` to `target` of at most `max_depth`
    /// hops, under the default limits.
    pub fn find_all_paths(&self, source: &NodeId, target: &NodeId, max_depth: usize) -> PathSearch {
        self.find_all_paths_with(source, target, max_depth, &TraversalLimits::default())
    }

    pub fn find_all_paths_with(
        &self,
        source: &NodeId,
        target: &NodeId,
        max_depth: usize,
        limits: &TraversalLimits,
    ) -> PathSearch {
        let mut result = PathSearch::default();
        if !self.contains_node(source) || !self.contains_node(target) {
            return result;
        }
        if source == target {
            result.paths.push(vec![source.clone()]);
            return result;
        }
        if max_depth == 0 {
            return result;
        }

        let mut budget = Budget::start(limits);
        let mut path = vec![source.clone()];
        let mut on_path: HashSet<NodeId> = HashSet::from([source.clone()]);
        let mut stack = vec![self.frame(source)];

        while let Some(frame) = stack.last_mut() {
            let Some(next) = frame.next() else {
                stack.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
                continue;
            };
            if !budget.spend() {
                result.truncated = true;
                break;
            }
            if on_path.contains(&next) {
                continue;
            }
            if &next == target {
                let mut found = path.clone();
                found.push(next);
                result.paths.push(found);
                if result.paths.len() >= limits.max_paths {
                    result.truncated = true;
                    break;
                }
                continue;
            }
            // Extending through `next` only helps if another hop still fits.
            if path.len() < max_depth {
                stack.push(self.frame(&next));
                on_path.insert(next.clone());
                path.push(next);
            }
        }

        debug!(
            "find_all_paths {} -> {}: {} paths (truncated: {})",
            source,
            target,
            result.paths.len(),
            result.truncated
        );
        result
    }

    /// Every cycle reachable by a DFS started from each unvisited node in
    /// id order, under the default limits.
    pub fn find_cycles(&self) -> CycleSearch {
        self.find_cycles_with(&TraversalLimits::default())
    }

    pub fn find_cycles_with(&self, limits: &TraversalLimits) -> CycleSearch {
        let mut result = CycleSearch::default();
        let mut budget = Budget::start(limits);
        let mut visited: HashSet<NodeId> = HashSet::new();

        'roots: for root in self.node_ids() {
            if visited.contains(&root) {
                continue;
            }
            visited.insert(root.clone());
            let mut path = vec![root.clone()];
            let mut on_stack: HashSet<NodeId> = HashSet::from([root.clone()]);
            let mut stack = vec![self.frame(&root)];

            while let Some(frame) = stack.last_mut() {
                let Some(next) = frame.next() else {
                    stack.pop();
                    if let Some(done) = path.pop() {
                        on_stack.remove(&done);
                    }
                    continue;
                };
                if !budget.spend() {
                    result.truncated = true;
                    break 'roots;
                }
                if on_stack.contains(&next) {
                    if let Some(start) = path.iter().position(|id| id == &next) {
                        result.cycles.push(path[start..].to_vec());
                    }
                } else if visited.insert(next.clone()) {
                    stack.push(self.frame(&next));
                    on_stack.insert(next.clone());
                    path.push(next);
                }
            }
        }

        debug!(
            "find_cycles: {} cycles (truncated: {})",
            result.cycles.len(),
            result.truncated
        );
        result
    }

    /// Copies the neighbourhood of `center` up to `depth` hops into a new,
    /// independent store, under the default limits.
    pub fn subgraph(&self, center: &NodeId, depth: usize, direction: Direction) -> GraphStore {
        self.subgraph_with(center, depth, direction, &TraversalLimits::default())
            .graph
    }

    pub fn subgraph_with(
        &self,
        center: &NodeId,
        depth: usize,
        direction: Direction,
        limits: &TraversalLimits,
    ) -> Subgraph {
        let mut graph = GraphStore::new(format!("{}:{}", self.name(), center));
        if !self.contains_node(center) {
            return Subgraph {
                graph,
                truncated: false,
            };
        }

        let mut budget = Budget::start(limits);
        let mut order = vec![center.clone()];
        let mut seen: HashSet<NodeId> = HashSet::from([center.clone()]);
        let mut queue = VecDeque::from([(center.clone(), 0usize)]);

        'walk: while let Some((current, d)) = queue.pop_front() {
            if d >= depth {
                continue;
            }
            for next in self.neighbor_ids(&current, direction) {
                if !budget.spend() {
                    break 'walk;
                }
                if seen.insert(next.clone()) {
                    order.push(next.clone());
                    queue.push_back((next, d + 1));
                }
            }
        }

        for id in &order {
            if let Some(node) = self.get_node(id) {
                graph.add_node(node.clone());
            }
        }
        for edge in self.edges() {
            if seen.contains(&edge.source_id) && seen.contains(&edge.target_id) {
                graph.add_edge(edge.clone());
            }
        }

        Subgraph {
            graph,
            truncated: budget.exhausted(),
        }
    }

    fn frame(&self, id: &NodeId) -> Frame {
        Frame {
            successors: self.neighbor_ids(id, Direction::Outgoing),
            cursor: 0,
        }
    }
}

/// Walks parent links back from `end` and returns the path in order.
fn unwind(parent: &HashMap<NodeId, NodeId>, end: NodeId) -> Vec<NodeId> {
    let mut path = vec![end];
    while let Some(prev) = path.last().and_then(|id| parent.get(id)) {
        path.push(prev.clone());
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;
    use grove_core::{Node, NodeKind};

    /// Builds a graph of functions named by the given letters and wires
    /// `Calls` edges for each `(from, to)` pair.
    fn graph(names: &[&str], calls: &[(&str, &str)]) -> (GraphStore, HashMap<String, NodeId>) {
        let mut graph = GraphStore::new("test");
        let mut ids = HashMap::new();
        for name in names {
            let id = graph.add_node(Node::new(*name, NodeKind::Function));
            ids.insert(name.to_string(), id);
        }
        for (from, to) in calls {
            graph.connect(&ids[*from], &ids[*to], EdgeKind::Calls);
        }
        (graph, ids)
    }

    #[test]
    fn test_find_path_shortest() {
        let (g, ids) = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
        );
        let path = g.find_path(&ids["a"], &ids["d"], 10).unwrap();
        assert_eq!(path, vec![ids["a"].clone(), ids["d"].clone()]);
    }

    #[test]
    fn test_find_path_respects_direction_and_depth() {
        let (g, ids) = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        assert!(g.find_path(&ids["c"], &ids["a"], 10).is_none());
        assert!(g.find_path(&ids["a"], &ids["c"], 1).is_none());
        assert_eq!(g.find_path(&ids["a"], &ids["c"], 2).unwrap().len(), 3);
    }

    #[test]
    fn test_find_path_to_self() {
        let (g, ids) = graph(&["a"], &[]);
        assert_eq!(g.find_path(&ids["a"], &ids["a"], 0), Some(vec![ids["a"].clone()]));
        let ghost = NodeId::derive("ghost", NodeKind::Function, None);
        assert!(g.find_path(&ghost, &ghost, 3).is_none());
    }

    #[test]
    fn test_find_all_paths_diamond() {
        let (g, ids) = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let search = g.find_all_paths(&ids["a"], &ids["d"], 5);
        assert_eq!(search.paths.len(), 2);
        assert!(!search.truncated);
        for path in &search.paths {
            assert_eq!(path.first(), Some(&ids["a"]));
            assert_eq!(path.last(), Some(&ids["d"]));
            assert_eq!(path.len(), 3);
        }
    }

    #[test]
    fn test_find_all_paths_depth_bound() {
        let (g, ids) = graph(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("a", "c")],
        );
        assert_eq!(g.find_all_paths(&ids["a"], &ids["c"], 1).paths.len(), 1);
        assert_eq!(g.find_all_paths(&ids["a"], &ids["c"], 2).paths.len(), 2);
    }

    #[test]
    fn test_find_all_paths_skips_cycles() {
        let (g, ids) = graph(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "a"), ("b", "c")],
        );
        let search = g.find_all_paths(&ids["a"], &ids["c"], 10);
        assert_eq!(search.paths, vec![vec![ids["a"].clone(), ids["b"].clone(), ids["c"].clone()]]);
    }

    #[test]
    fn test_find_all_paths_truncates() {
        // Complete digraph on 6 nodes has many simple paths between any pair.
        let names = ["a", "b", "c", "d", "e", "f"];
        let mut calls = Vec::new();
        for from in names {
            for to in names {
                if from != to {
                    calls.push((from, to));
                }
            }
        }
        let (g, ids) = graph(&names, &calls);

        let limits = TraversalLimits::unbounded_time(3, 100_000);
        let search = g.find_all_paths_with(&ids["a"], &ids["f"], 10, &limits);
        assert_eq!(search.paths.len(), 3);
        assert!(search.truncated);

        let limits = TraversalLimits::unbounded_time(1_000, 5);
        let search = g.find_all_paths_with(&ids["a"], &ids["f"], 10, &limits);
        assert!(search.truncated);
    }

    #[test]
    fn test_find_cycles() {
        let (g, ids) = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")],
        );
        let search = g.find_cycles();
        assert_eq!(search.cycles.len(), 1);
        let cycle = &search.cycles[0];
        assert_eq!(cycle.len(), 3);
        for name in ["a", "b", "c"] {
            assert!(cycle.contains(&ids[name]));
        }
        assert!(!search.truncated);
    }

    #[test]
    fn test_find_cycles_acyclic_and_self_loop() {
        let (g, _) = graph(&["a", "b"], &[("a", "b")]);
        assert!(g.find_cycles().cycles.is_empty());

        let (g, ids) = graph(&["a"], &[("a", "a")]);
        assert_eq!(g.find_cycles().cycles, vec![vec![ids["a"].clone()]]);
    }

    #[test]
    fn test_find_cycles_budget() {
        let (g, _) = graph(
            &["a", "b", "c"],
            &[("a", "b"), ("b", "c"), ("c", "a")],
        );
        let search = g.find_cycles_with(&TraversalLimits::unbounded_time(10, 1));
        assert!(search.truncated);
    }

    #[test]
    fn test_subgraph() {
        let (g, ids) = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "a")],
        );

        let sub = g.subgraph(&ids["a"], 1, Direction::Outgoing);
        assert_eq!(sub.node_count(), 2);
        assert_eq!(sub.edge_count(), 1);

        let both = g.subgraph(&ids["a"], 1, Direction::Both);
        assert_eq!(both.node_count(), 3);
        assert_eq!(both.edge_count(), 2);

        let only_center = g.subgraph(&ids["a"], 0, Direction::Both);
        assert_eq!(only_center.node_count(), 1);
        assert_eq!(only_center.edge_count(), 0);
    }

    #[test]
    fn test_subgraph_budget() {
        let (g, ids) = graph(&["a", "b", "c", "d"], &[("a", "b"), ("b", "c"), ("c", "d")]);

        let cut = g.subgraph_with(
            &ids["a"],
            5,
            Direction::Outgoing,
            &TraversalLimits::unbounded_time(10, 1),
        );
        assert!(cut.truncated);
        assert_eq!(cut.graph.node_count(), 2);

        // Three visits cover the chain exactly.
        let full = g.subgraph_with(
            &ids["a"],
            5,
            Direction::Outgoing,
            &TraversalLimits::unbounded_time(10, 3),
        );
        assert!(!full.truncated);
        assert_eq!(full.graph.node_count(), 4);
    }

    #[test]
    fn test_subgraph_is_independent() {
        let (g, ids) = graph(&["a", "b"], &[("a", "b")]);
        let mut sub = g.subgraph(&ids["a"], 2, Direction::Outgoing);
        sub.add_node(Node::new("extra", NodeKind::Function));
        assert_eq!(sub.node_count(), 3);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_subgraph_missing_center() {
        let (g, _) = graph(&["a"], &[]);
        let ghost = NodeId::derive("ghost", NodeKind::Function, None);
        let sub = g.subgraph(&ghost, 3, Direction::Both);
        assert_eq!(sub.node_count(), 0);
    }
}
