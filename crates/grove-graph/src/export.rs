//! Import and export of whole graphs.
//!
//! JSON is the lossless exchange format: `{name, metadata, nodes, edges}`
//! with every node and edge field. GraphML and DOT are write-only views for
//! external tools.

use crate::edge::Edge;
use crate::error::{GraphError, Result};
use crate::graph::GraphStore;
use grove_core::{Node, NodeId, NodeKind, Properties};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Serialized form of a `GraphStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub name: String,
    #[serde(default)]
    pub metadata: Properties,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Output formats understood by [`ExportFormat::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    GraphMl,
    Dot,
}

impl ExportFormat {
    pub fn render(&self, graph: &GraphStore) -> Result<String> {
        match self {
            ExportFormat::Json => graph.to_json(),
            ExportFormat::GraphMl => Ok(graph.to_graphml()),
            ExportFormat::Dot => Ok(graph.to_dot()),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::GraphMl => "graphml",
            ExportFormat::Dot => "dot",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "graphml" | "xml" => Ok(ExportFormat::GraphMl),
            "dot" | "graphviz" => Ok(ExportFormat::Dot),
            other => Err(GraphError::Config(format!("unknown export format '{}'", other))),
        }
    }
}

impl GraphStore {
    /// Snapshot of the store with nodes and edges sorted by id.
    pub fn to_document(&self) -> GraphDocument {
        let mut nodes: Vec<Node> = self.nodes().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        let mut edges: Vec<Edge> = self.edges().cloned().collect();
        edges.sort_by(|a, b| a.id.cmp(&b.id));

        GraphDocument {
            name: self.name().to_string(),
            metadata: self.metadata().clone(),
            nodes,
            edges,
        }
    }

    /// Rebuilds a store, inserting all nodes before any edge.
    ///
    /// Node ids are re-derived on insert; edge endpoints written with other
    /// ids are rewritten to match. Edges whose endpoints are missing from
    /// the document are dropped with a warning, like any other malformed edge.
    pub fn from_document(document: GraphDocument) -> GraphStore {
        let mut graph = GraphStore::new(document.name);
        for (key, value) in document.metadata {
            graph.set_metadata(key, value);
        }
        let mut renamed: HashMap<NodeId, NodeId> = HashMap::new();
        for node in document.nodes {
            let written = node.id.clone();
            let id = graph.add_node(node);
            if id != written {
                renamed.insert(written, id);
            }
        }
        if !renamed.is_empty() {
            debug!("Re-derived {} node ids on import", renamed.len());
        }
        let expected = document.edges.len();
        for mut edge in document.edges {
            if let Some(id) = renamed.get(&edge.source_id) {
                edge.source_id = id.clone();
            }
            if let Some(id) = renamed.get(&edge.target_id) {
                edge.target_id = id.clone();
            }
            graph.add_edge(edge);
        }
        if graph.edge_count() < expected {
            warn!(
                "Imported {} of {} edges; the rest referenced unknown nodes",
                graph.edge_count(),
                expected
            );
        }
        graph
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Parses a JSON document. Unknown node or edge kinds fail the whole import.
    pub fn from_json(json: &str) -> Result<GraphStore> {
        let document: GraphDocument = serde_json::from_str(json)?;
        Ok(GraphStore::from_document(document))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| GraphError::io(path, e))?;
        debug!("Saved graph '{}' to {}", self.name(), path.display());
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<GraphStore> {
        let json = std::fs::read_to_string(path).map_err(|e| GraphError::io(path, e))?;
        let graph = GraphStore::from_json(&json)?;
        debug!(
            "Loaded graph '{}' from {} ({} nodes, {} edges)",
            graph.name(),
            path.display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    pub fn to_graphml(&self) -> String {
        let document = self.to_document();
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str("<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">\n");
        out.push_str("  <key id=\"name\" for=\"node\" attr.name=\"name\" attr.type=\"string\"/>\n");
        out.push_str("  <key id=\"kind\" for=\"node\" attr.name=\"kind\" attr.type=\"string\"/>\n");
        out.push_str(
            "  <key id=\"file_path\" for=\"node\" attr.name=\"file_path\" attr.type=\"string\"/>\n",
        );
        out.push_str("  <key id=\"edge_kind\" for=\"edge\" attr.name=\"kind\" attr.type=\"string\"/>\n");
        out.push_str("  <key id=\"weight\" for=\"edge\" attr.name=\"weight\" attr.type=\"double\"/>\n");
        let _ = writeln!(
            out,
            "  <graph id=\"{}\" edgedefault=\"directed\">",
            xml_escape(&document.name)
        );

        for node in &document.nodes {
            let _ = writeln!(out, "    <node id=\"{}\">", node.id);
            let _ = writeln!(out, "      <data key=\"name\">{}</data>", xml_escape(&node.name));
            let _ = writeln!(out, "      <data key=\"kind\">{}</data>", node.kind);
            if let Some(file) = &node.file_path {
                let _ = writeln!(out, "      <data key=\"file_path\">{}</data>", xml_escape(file));
            }
            out.push_str("    </node>\n");
        }
        for edge in &document.edges {
            let _ = writeln!(
                out,
                "    <edge id=\"{}\" source=\"{}\" target=\"{}\">",
                edge.id, edge.source_id, edge.target_id
            );
            let _ = writeln!(out, "      <data key=\"edge_kind\">{}</data>", edge.kind);
            let _ = writeln!(out, "      <data key=\"weight\">{}</data>", edge.weight);
            out.push_str("    </edge>\n");
        }

        out.push_str("  </graph>\n");
        out.push_str("</graphml>\n");
        out
    }

    pub fn to_dot(&self) -> String {
        let document = self.to_document();
        let mut out = String::new();
        let _ = writeln!(out, "digraph \"{}\" {{", dot_escape(&document.name));
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [shape=box];\n");

        for node in &document.nodes {
            let _ = writeln!(
                out,
                "  \"{}\" [label=\"{}\\n({})\" fillcolor=\"{}\" style=\"filled\"];",
                node.id,
                dot_escape(&node.name),
                node.kind,
                dot_color(node.kind)
            );
        }
        for edge in &document.edges {
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [label=\"{}\"];",
                edge.source_id, edge.target_id, edge.kind
            );
        }

        out.push_str("}\n");
        out
    }
}

fn dot_color(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::File => "lightblue",
        NodeKind::Class => "lightgreen",
        NodeKind::Function | NodeKind::Method => "lightyellow",
        NodeKind::Module => "lightgray",
        NodeKind::Interface => "lightpink",
        _ => "white",
    }
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn dot_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
