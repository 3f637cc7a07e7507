//! Impact analysis for code changes.
//!
//! A reverse BFS over every incoming edge, answering "what is affected if
//! I change this?". Results are grouped by hop distance so callers can
//! tell immediate breakage from distant ripple effects.

use crate::graph::GraphStore;
use crate::query::{GraphQuery, NodeSummary};
use grove_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::time::Instant;

/// Severity of impact based on hop distance from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactSeverity {
    /// 1 hop: immediate dependents.
    Direct,
    /// 2-3 hops.
    Transitive,
    /// 4+ hops.
    Distant,
}

impl ImpactSeverity {
    /// Thresholds: 1 hop = Direct, 2-3 = Transitive, 4+ = Distant
    pub fn from_hops(hops: usize) -> Self {
        match hops {
            0 | 1 => ImpactSeverity::Direct,
            2 | 3 => ImpactSeverity::Transitive,
            _ => ImpactSeverity::Distant,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImpactSeverity::Direct => "direct",
            ImpactSeverity::Transitive => "transitive",
            ImpactSeverity::Distant => "distant",
        }
    }
}

impl fmt::Display for ImpactSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Nodes first reached at one hop distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactLevel {
    pub depth: usize,
    pub severity: ImpactSeverity,
    /// Sorted by id.
    pub nodes: Vec<NodeSummary>,
    /// Distinct files of `nodes`, sorted.
    pub files: Vec<String>,
}

/// Complete impact analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactReport {
    /// `None` when the target id is not in the graph.
    pub target: Option<NodeSummary>,
    pub levels: Vec<ImpactLevel>,
    pub total_affected: usize,
    /// Every distinct file touched, sorted.
    pub affected_files: Vec<String>,
    /// Size of the depth-1 set.
    pub critical: usize,
    pub max_depth: usize,
    pub query_time_ms: u64,
}

impl ImpactReport {
    /// All affected node ids, nearest first.
    pub fn affected_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.levels
            .iter()
            .flat_map(|level| level.nodes.iter().map(|n| &n.id))
    }

    /// Returns a summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let count = |severity: ImpactSeverity| -> usize {
            self.levels
                .iter()
                .filter(|level| level.severity == severity)
                .map(|level| level.nodes.len())
                .sum()
        };
        format!(
            "Blast radius: {} nodes in {} files (direct: {}, transitive: {}, distant: {})",
            self.total_affected,
            self.affected_files.len(),
            count(ImpactSeverity::Direct),
            count(ImpactSeverity::Transitive),
            count(ImpactSeverity::Distant)
        )
    }
}

impl<'a> GraphQuery<'a> {
    /// Reverse BFS from `id` over all incoming edges, up to `max_depth` hops.
    pub fn impact(&self, id: &NodeId, max_depth: usize) -> ImpactReport {
        let start = Instant::now();
        let graph: &GraphStore = self.graph();

        let mut report = ImpactReport {
            target: graph.get_node(id).map(NodeSummary::from),
            levels: Vec::new(),
            total_affected: 0,
            affected_files: Vec::new(),
            critical: 0,
            max_depth,
            query_time_ms: 0,
        };
        if report.target.is_none() {
            return report;
        }

        let mut visited: HashSet<NodeId> = HashSet::from([id.clone()]);
        let mut frontier: Vec<NodeId> = vec![id.clone()];
        let mut all_files: BTreeSet<String> = BTreeSet::new();

        for depth in 1..=max_depth {
            let mut reached: BTreeSet<NodeId> = BTreeSet::new();
            for current in &frontier {
                for edge in graph.incoming(current) {
                    if visited.insert(edge.source_id.clone()) {
                        reached.insert(edge.source_id.clone());
                    }
                }
            }
            if reached.is_empty() {
                break;
            }

            let nodes: Vec<NodeSummary> = reached
                .iter()
                .filter_map(|n| graph.get_node(n))
                .map(NodeSummary::from)
                .collect();
            let files: BTreeSet<String> = nodes.iter().filter_map(|n| n.file_path.clone()).collect();
            all_files.extend(files.iter().cloned());

            report.levels.push(ImpactLevel {
                depth,
                severity: ImpactSeverity::from_hops(depth),
                nodes,
                files: files.into_iter().collect(),
            });
            frontier = reached.into_iter().collect();
        }

        report.total_affected = report.levels.iter().map(|l| l.nodes.len()).sum();
        report.critical = report
            .levels
            .first()
            .filter(|level| level.depth == 1)
            .map_or(0, |level| level.nodes.len());
        report.affected_files = all_files.into_iter().collect();
        report.query_time_ms = start.elapsed().as_millis() as u64;
        report
    }
}
