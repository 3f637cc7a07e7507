//! Graph builder for constructing the knowledge graph from analysis records.
//!
//! Ingestion runs in a fixed order so that every linking step can rely on
//! the nodes it needs being present:
//!
//! 1. file nodes (`Test` / `Config` / `File` by naming heuristics)
//! 2. code-unit nodes
//! 3. `Contains` edges, file → unit and enclosing unit → nested unit
//! 4. `DependsOn` edges from an explicit map, or `Imports` from import records
//! 5. `Extends` / `Implements` edges through the type symbol table
//! 6. `Calls` edges through the callable symbol table
//! 7. one `Pattern` node per finding, contained by its file
//!
//! A bad record or unit is skipped and counted in [`BuildReport`]; it never
//! aborts the build.

use crate::edge::EdgeKind;
use crate::error::Result;
use crate::graph::GraphStore;
use crate::symbol_table::SymbolTable;
use chrono::Utc;
use grove_core::{
    AnalysisBundle, AnalysisRecord, CodeUnit, DependencyMap, FileRecord, ImportRecord, Node,
    NodeId, NodeKind, PatternFinding, Properties,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

const CONFIG_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml", "ini", "cfg", "conf", "env"];
const TEST_DIRS: &[&str] = &["tests", "test", "__tests__"];

/// Counters describing what one or more `ingest` calls did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub files: usize,
    pub code_units: usize,
    pub edges: usize,
    /// Analysis records or findings dropped as a whole.
    pub skipped_records: usize,
    /// Individual code units dropped (unknown kind, inverted span, no name).
    pub skipped_units: usize,
    pub unresolved_imports: usize,
    /// Name lookups that had more than one candidate.
    pub ambiguous_symbols: usize,
}

/// A code unit accepted in step 2, kept around for the linking steps.
struct PendingUnit {
    id: NodeId,
    file: String,
    unit: CodeUnit,
}

/// Builds a `GraphStore` from external analysis records.
pub struct GraphBuilder {
    graph: GraphStore,
    report: BuildReport,
    /// File path -> file node.
    files: BTreeMap<String, NodeId>,
    /// Classes, interfaces, enums and type aliases.
    types: SymbolTable,
    /// Functions, methods and hooks.
    callables: SymbolTable,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new("knowledge_graph")
    }
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: GraphStore::new(name),
            report: BuildReport::default(),
            files: BTreeMap::new(),
            types: SymbolTable::new(),
            callables: SymbolTable::new(),
        }
    }

    /// Runs all seven steps over one bundle.
    pub fn ingest(&mut self, bundle: &AnalysisBundle) -> &BuildReport {
        let edges_before = self.graph.edge_count();

        for file in &bundle.files {
            self.add_file(file);
        }

        let mut units = Vec::new();
        let mut accepted = Vec::new();
        for record in &bundle.analyses {
            if let Some(found) = self.add_analysis(record) {
                units.extend(found);
                accepted.push(record);
            }
        }
        debug!("Added {} code units from {} records", units.len(), accepted.len());

        self.link_containment(&units);
        match &bundle.dependencies {
            Some(map) => self.link_dependency_map(map),
            None => self.link_imports(&accepted),
        }
        self.link_inheritance(&units);
        self.link_calls(&units);

        for finding in &bundle.findings {
            self.add_finding(finding);
        }

        self.report.edges += self.graph.edge_count() - edges_before;
        info!(
            "Ingested bundle: {} nodes, {} edges ({} records skipped, {} units skipped)",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.report.skipped_records,
            self.report.skipped_units
        );
        &self.report
    }

    /// Decodes a bundle from JSON one record at a time and ingests it.
    ///
    /// Only a document that is not a JSON object fails. A file, analysis
    /// or finding entry that does not decode is skipped with a warning and
    /// counted in `skipped_records`, as is a malformed dependency map (the
    /// build then falls back to import records).
    pub fn ingest_json(&mut self, json: &str) -> Result<&BuildReport> {
        let mut document: Map<String, Value> = serde_json::from_str(json)?;
        let mut skipped = 0;

        let files = decode_records(&mut document, "files", &mut skipped);
        let analyses = decode_records(&mut document, "analyses", &mut skipped);
        let findings = decode_records(&mut document, "findings", &mut skipped);
        let dependencies = match document.remove("dependencies") {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value::<DependencyMap>(value) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!("Ignoring malformed dependency map: {}", e);
                    skipped += 1;
                    None
                }
            },
        };

        self.report.skipped_records += skipped;
        let bundle = AnalysisBundle {
            files,
            analyses,
            dependencies,
            findings,
        };
        Ok(self.ingest(&bundle))
    }

    // ── Step 1: files ───────────────────────────────────────

    /// Adds a file node with its record's attributes.
    pub fn add_file(&mut self, record: &FileRecord) -> Option<NodeId> {
        if record.path.trim().is_empty() {
            warn!("Skipping file record with empty path");
            self.report.skipped_records += 1;
            return None;
        }
        if let Some(id) = self.files.get(&record.path) {
            return Some(id.clone());
        }

        let mut node = Node::new(&record.path, classify_file(&record.path))
            .in_file(&record.path)
            .with_property("extension", record.extension.as_str())
            .with_property("size_bytes", record.size_bytes)
            .with_property("line_count", record.line_count);
        if let Some(language) = &record.language {
            node = node.with_property("language", language.as_str());
        }
        Some(self.register_file(&record.path, node))
    }

    /// The file node for `path`, created bare if no record described it.
    fn ensure_file(&mut self, path: &str) -> NodeId {
        match self.files.get(path) {
            Some(id) => id.clone(),
            None => {
                let node = Node::new(path, classify_file(path)).in_file(path);
                self.register_file(path, node)
            }
        }
    }

    fn register_file(&mut self, path: &str, node: Node) -> NodeId {
        let id = self.graph.add_node(node);
        self.files.insert(path.to_string(), id.clone());
        self.report.files += 1;
        id
    }

    // ── Step 2: code units ──────────────────────────────────

    fn add_analysis(&mut self, record: &AnalysisRecord) -> Option<Vec<PendingUnit>> {
        if let Some(error) = &record.error {
            warn!("Skipping analysis of {}: {}", record.file_path, error);
            self.report.skipped_records += 1;
            return None;
        }
        if record.file_path.trim().is_empty() {
            warn!("Skipping analysis record with empty file path");
            self.report.skipped_records += 1;
            return None;
        }

        self.ensure_file(&record.file_path);
        let mut accepted = Vec::with_capacity(record.code_units.len());
        for unit in &record.code_units {
            if let Some(id) = self.add_unit(&record.file_path, unit) {
                accepted.push(PendingUnit {
                    id,
                    file: record.file_path.clone(),
                    unit: unit.clone(),
                });
            }
        }
        Some(accepted)
    }

    fn add_unit(&mut self, file: &str, unit: &CodeUnit) -> Option<NodeId> {
        let kind: NodeKind = match unit.kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Skipping unit '{}' in {}: {}", unit.name, file, e);
                self.report.skipped_units += 1;
                return None;
            }
        };
        if unit.name.trim().is_empty() || unit.line_end < unit.line_start {
            warn!(
                "Skipping malformed unit '{}' in {} (lines {}-{})",
                unit.name, file, unit.line_start, unit.line_end
            );
            self.report.skipped_units += 1;
            return None;
        }

        let mut node = Node::new(&unit.name, kind)
            .in_file(file)
            .with_properties(unit_properties(unit));
        if unit.line_start > 0 {
            node = node.with_lines(unit.line_start, Some(unit.line_end));
        }
        let id = self.graph.add_node(node);

        if kind.is_type_like() {
            self.types.insert(&unit.name, id.clone(), Some(file));
        }
        if kind.is_callable() {
            self.callables.insert(&unit.name, id.clone(), Some(file));
        }
        self.report.code_units += 1;
        Some(id)
    }

    // ── Step 3: containment ─────────────────────────────────

    fn link_containment(&mut self, units: &[PendingUnit]) {
        let mut by_file: BTreeMap<&str, Vec<&PendingUnit>> = BTreeMap::new();
        for pending in units {
            by_file.entry(pending.file.as_str()).or_default().push(pending);
        }

        for (file, siblings) in by_file {
            let file_id = self.ensure_file(file);
            for child in &siblings {
                self.graph.connect(&file_id, &child.id, EdgeKind::Contains);

                // Innermost enclosing unit, i.e. the smallest span around it.
                let parent = siblings
                    .iter()
                    .filter(|other| other.unit.line_start > 0 && other.unit.encloses(&child.unit))
                    .min_by_key(|other| other.unit.span());
                if let Some(parent) = parent {
                    self.graph.connect(&parent.id, &child.id, EdgeKind::Contains);
                }
            }
        }
    }

    // ── Step 4: dependencies ────────────────────────────────

    fn link_dependency_map(&mut self, map: &DependencyMap) {
        for (source, targets) in map {
            let source_id = self.ensure_file(source);
            for target in targets {
                if target == source {
                    continue;
                }
                let target_id = self.ensure_file(target);
                self.graph.connect(&source_id, &target_id, EdgeKind::DependsOn);
            }
        }
    }

    fn link_imports(&mut self, records: &[&AnalysisRecord]) {
        for record in records {
            let from = self.ensure_file(&record.file_path);
            for import in &record.imports {
                match self.resolve_import(&record.file_path, import) {
                    Some(target) => {
                        if target != from {
                            self.graph.connect(&from, &target, EdgeKind::Imports);
                        }
                    }
                    None => {
                        self.report.unresolved_imports += 1;
                        if import.is_relative || import.module.starts_with('.') {
                            debug!("Unresolved relative import '{}' in {}", import.module, record.file_path);
                            continue;
                        }
                        let external = self
                            .graph
                            .add_node(Node::new(&import.module, NodeKind::Dependency));
                        self.graph.connect(&from, &external, EdgeKind::Imports);
                    }
                }
            }
        }
    }

    /// Finds the known file an import refers to by module-path suffix.
    ///
    /// Files in the importer's own directory win, then the shortest path.
    fn resolve_import(&self, from_file: &str, import: &ImportRecord) -> Option<NodeId> {
        let module = normalize_module(&import.module);
        if module.is_empty() {
            return None;
        }
        let from_dir = parent_dir(from_file);

        self.files
            .iter()
            .filter(|(path, _)| path_matches_module(path, &module))
            .min_by_key(|(path, _)| (parent_dir(path) != from_dir, path.len()))
            .map(|(_, id)| id.clone())
    }

    // ── Steps 5 and 6: name-resolved edges ──────────────────

    fn link_inheritance(&mut self, units: &[PendingUnit]) {
        for pending in units {
            for base in &pending.unit.bases {
                self.link_by_name(pending, base, EdgeKind::Extends);
            }
            for interface in &pending.unit.implements {
                self.link_by_name(pending, interface, EdgeKind::Implements);
            }
        }
    }

    fn link_calls(&mut self, units: &[PendingUnit]) {
        for pending in units {
            for reference in &pending.unit.references {
                self.link_by_name(pending, reference, EdgeKind::Calls);
            }
        }
    }

    fn link_by_name(&mut self, from: &PendingUnit, name: &str, kind: EdgeKind) {
        let table = match kind {
            EdgeKind::Calls => &self.callables,
            _ => &self.types,
        };
        let Some(resolved) = table.resolve_reference(name, Some(&from.file)) else {
            return;
        };
        if resolved.id == from.id {
            return;
        }
        if resolved.ambiguous {
            debug!(
                "Ambiguous {} target '{}' from {}, picked {}",
                kind, name, from.file, resolved.id
            );
            self.report.ambiguous_symbols += 1;
        }
        self.graph.connect(&from.id, &resolved.id, kind);
    }

    // ── Step 7: findings ────────────────────────────────────

    /// Adds a pattern node for a finding and hangs it off its file.
    pub fn add_finding(&mut self, finding: &PatternFinding) -> Option<NodeId> {
        if finding.name.trim().is_empty() || finding.file_path.trim().is_empty() {
            warn!("Skipping finding without name or file");
            self.report.skipped_records += 1;
            return None;
        }

        let mut node = Node::new(&finding.name, NodeKind::Pattern)
            .in_file(&finding.file_path)
            .with_property("category", finding.category.as_str())
            .with_property("severity", finding.severity.as_str())
            .with_property("description", finding.description.as_str())
            .with_property("confidence", finding.confidence);
        if let Some(line) = finding.line_number {
            node = node.with_lines(line, None);
        }

        let file_id = self.ensure_file(&finding.file_path);
        let id = self.graph.add_node(node);
        self.graph.connect(&file_id, &id, EdgeKind::Contains);
        Some(id)
    }

    // ── Finishing ───────────────────────────────────────────

    /// Folds an existing store into the one being built.
    ///
    /// Its files and symbols become resolvable by later `ingest` calls.
    pub fn merge(&mut self, other: &GraphStore) {
        self.graph.merge(other);
        for node in other.nodes() {
            if node.file_path.as_deref() == Some(node.name.as_str())
                && matches!(node.kind, NodeKind::File | NodeKind::Test | NodeKind::Config)
            {
                self.files.entry(node.name.clone()).or_insert_with(|| node.id.clone());
            }
            if node.kind.is_type_like() {
                self.types.insert(&node.name, node.id.clone(), node.file_path.as_deref());
            }
            if node.kind.is_callable() {
                self.callables.insert(&node.name, node.id.clone(), node.file_path.as_deref());
            }
        }
    }

    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Finishes building and returns the graph.
    pub fn build(self) -> GraphStore {
        self.finish().0
    }

    /// Finishes building and returns the graph with its report.
    pub fn finish(mut self) -> (GraphStore, BuildReport) {
        self.graph
            .set_metadata("built_at", Utc::now().to_rfc3339());
        (self.graph, self.report)
    }
}

fn decode_records<T: DeserializeOwned>(
    document: &mut Map<String, Value>,
    section: &str,
    skipped: &mut usize,
) -> Vec<T> {
    let items = match document.remove(section) {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!("Skipping '{}': expected a list", section);
            *skipped += 1;
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping {} entry #{}: {}", section, i, e);
                *skipped += 1;
                None
            }
        })
        .collect()
}

/// Infers the node kind of a file from its path.
pub fn classify_file(path: &str) -> NodeKind {
    let lower = path.replace('\\', "/").to_lowercase();
    let (dir, name) = lower.rsplit_once('/').unwrap_or(("", lower.as_str()));
    let stem = name.split('.').next().unwrap_or(name);
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");

    let is_test = name.starts_with("test_")
        || stem.ends_with("_test")
        || name.contains(".test.")
        || name.contains(".spec.")
        || dir.split('/').any(|part| TEST_DIRS.contains(&part));
    if is_test {
        return NodeKind::Test;
    }
    if CONFIG_EXTENSIONS.contains(&extension) || name.contains("config") {
        return NodeKind::Config;
    }
    NodeKind::File
}

fn unit_properties(unit: &CodeUnit) -> Properties {
    let mut props = Properties::new();
    if !unit.parameters.is_empty() {
        props.insert("parameters".into(), json!(unit.parameters));
    }
    if let Some(return_type) = &unit.return_type {
        props.insert("return_type".into(), json!(return_type));
    }
    if !unit.decorators.is_empty() {
        props.insert("decorators".into(), json!(unit.decorators));
    }
    props.insert("is_async".into(), json!(unit.is_async));
    if let Some(visibility) = &unit.visibility {
        props.insert("visibility".into(), json!(visibility));
    }
    if let Some(docstring) = &unit.docstring {
        props.insert("docstring".into(), json!(docstring));
    }
    if !unit.bases.is_empty() {
        props.insert("bases".into(), json!(unit.bases));
    }
    if !unit.implements.is_empty() {
        props.insert("implements".into(), json!(unit.implements));
    }
    props
}

/// Turns `pkg.mod`, `crate::pkg::mod` or `./pkg/mod` into `pkg/mod`.
fn normalize_module(module: &str) -> String {
    let mut rest = module.trim();
    if rest.contains('/') {
        while let Some(stripped) = rest.strip_prefix("./").or_else(|| rest.strip_prefix("../")) {
            rest = stripped;
        }
        return rest.trim_end_matches('/').to_string();
    }
    rest = rest.trim_start_matches('.');
    for prefix in ["crate::", "self::", "super::"] {
        if let Some(stripped) = rest.strip_prefix(prefix) {
            rest = stripped;
        }
    }
    rest.replace("::", "/").replace('.', "/")
}

fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn path_matches_module(path: &str, module: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let stem = match normalized.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains('/') && !stem.ends_with('/') && !stem.is_empty() => {
            stem
        }
        _ => normalized.as_str(),
    };
    [
        module.to_string(),
        format!("{}/__init__", module),
        format!("{}/mod", module),
        format!("{}/index", module),
    ]
    .iter()
    .any(|candidate| stem == candidate || stem.ends_with(&format!("/{}", candidate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(kind: &str, name: &str, start: u32, end: u32) -> CodeUnit {
        CodeUnit::new(kind, name, start, end)
    }

    fn id_of(graph: &GraphStore, name: &str, kind: NodeKind) -> NodeId {
        graph
            .find_by_name(name)
            .into_iter()
            .find(|n| n.kind == kind)
            .map(|n| n.id.clone())
            .unwrap_or_else(|| panic!("no {} named {}", kind, name))
    }

    fn has_edge(graph: &GraphStore, from: &NodeId, to: &NodeId, kind: EdgeKind) -> bool {
        graph
            .outgoing(from)
            .iter()
            .any(|e| &e.target_id == to && e.kind == kind)
    }

    fn sample_bundle() -> AnalysisBundle {
        AnalysisBundle {
            files: vec![
                FileRecord::new("app/models.py").with_language("python"),
                FileRecord::new("app/services.py").with_language("python"),
                FileRecord::new("tests/test_models.py"),
                FileRecord::new("settings.yaml"),
            ],
            analyses: vec![
                AnalysisRecord::new("app/models.py").with_units(vec![
                    unit("class", "Base", 1, 10),
                    unit("class", "User", 12, 40).with_bases(vec!["Base".into()]),
                    unit("method", "save", 15, 20),
                ]),
                AnalysisRecord::new("app/services.py")
                    .with_units(vec![unit("function", "create_user", 3, 12)
                        .with_references(vec!["User".into(), "user.save".into()])])
                    .with_imports(vec![ImportRecord::new("app.models")]),
            ],
            dependencies: None,
            findings: vec![],
        }
    }

    #[test]
    fn test_classify_file() {
        assert_eq!(classify_file("src/test_user.py"), NodeKind::Test);
        assert_eq!(classify_file("pkg/user_test.go"), NodeKind::Test);
        assert_eq!(classify_file("web/button.spec.ts"), NodeKind::Test);
        assert_eq!(classify_file("web/__tests__/button.js"), NodeKind::Test);
        assert_eq!(classify_file("deploy/app.yaml"), NodeKind::Config);
        assert_eq!(classify_file(".env"), NodeKind::Config);
        assert_eq!(classify_file("webpack.config.js"), NodeKind::Config);
        assert_eq!(classify_file("src/main.rs"), NodeKind::File);
        assert_eq!(classify_file("src/contest.py"), NodeKind::File);
    }

    #[test]
    fn test_builder_builds_structure() {
        let mut builder = GraphBuilder::new("sample");
        let report = builder.ingest(&sample_bundle()).clone();
        let graph = builder.build();

        assert_eq!(report.files, 4);
        assert_eq!(report.code_units, 4);
        assert_eq!(report.skipped_units, 0);

        let models = id_of(&graph, "app/models.py", NodeKind::File);
        let services = id_of(&graph, "app/services.py", NodeKind::File);
        let user = id_of(&graph, "User", NodeKind::Class);
        let base = id_of(&graph, "Base", NodeKind::Class);
        let save = id_of(&graph, "save", NodeKind::Method);
        let create = id_of(&graph, "create_user", NodeKind::Function);

        assert_eq!(graph.nodes_of_kind(NodeKind::Test).len(), 1);
        assert_eq!(graph.nodes_of_kind(NodeKind::Config).len(), 1);

        assert!(has_edge(&graph, &models, &save, EdgeKind::Contains));
        assert!(has_edge(&graph, &user, &save, EdgeKind::Contains));
        assert!(!has_edge(&graph, &base, &save, EdgeKind::Contains));
        assert!(has_edge(&graph, &user, &base, EdgeKind::Extends));
        assert!(has_edge(&graph, &create, &save, EdgeKind::Calls));
        assert!(has_edge(&graph, &services, &models, EdgeKind::Imports));
        assert!(graph.metadata().contains_key("built_at"));
    }

    #[test]
    fn test_unit_properties_carried() {
        let mut bundle = AnalysisBundle::default();
        let mut handler = unit("function", "handle", 1, 5);
        handler.parameters = vec!["request".into()];
        handler.is_async = true;
        handler.docstring = Some("Handles it.".into());
        bundle.analyses.push(AnalysisRecord::new("api.py").with_units(vec![handler]));

        let mut builder = GraphBuilder::default();
        builder.ingest(&bundle);
        let graph = builder.build();

        let node = &graph.find_by_name("handle")[0];
        assert_eq!(node.property("is_async"), Some(&json!(true)));
        assert_eq!(node.property("parameters"), Some(&json!(["request"])));
        assert_eq!(node.line_number, Some(1));
        assert_eq!(node.end_line, Some(5));
    }

    #[test]
    fn test_dependency_map_preferred_over_imports() {
        let mut bundle = sample_bundle();
        let mut deps = DependencyMap::new();
        deps.insert("app/services.py".into(), vec!["app/models.py".into()]);
        bundle.dependencies = Some(deps);

        let mut builder = GraphBuilder::default();
        builder.ingest(&bundle);
        let graph = builder.build();

        assert_eq!(graph.edges_of_kind(EdgeKind::DependsOn).len(), 1);
        assert!(graph.edges_of_kind(EdgeKind::Imports).is_empty());
    }

    #[test]
    fn test_unresolved_import_becomes_dependency() {
        let mut bundle = AnalysisBundle::default();
        bundle.analyses.push(AnalysisRecord::new("client.py").with_imports(vec![
            ImportRecord::new("requests"),
            ImportRecord {
                module: ".missing".into(),
                is_relative: true,
                ..ImportRecord::default()
            },
        ]));

        let mut builder = GraphBuilder::default();
        let report = builder.ingest(&bundle).clone();
        let graph = builder.build();

        assert_eq!(report.unresolved_imports, 2);
        let deps = graph.nodes_of_kind(NodeKind::Dependency);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "requests");
        assert_eq!(graph.edges_of_kind(EdgeKind::Imports).len(), 1);
    }

    #[test]
    fn test_relative_js_import_resolves() {
        let mut bundle = AnalysisBundle::default();
        bundle.files.push(FileRecord::new("web/utils/format.js"));
        bundle.files.push(FileRecord::new("web/app.js"));
        bundle.analyses.push(
            AnalysisRecord::new("web/app.js").with_imports(vec![ImportRecord::new("./utils/format")]),
        );

        let mut builder = GraphBuilder::default();
        builder.ingest(&bundle);
        let graph = builder.build();

        let app = id_of(&graph, "web/app.js", NodeKind::File);
        let format = id_of(&graph, "web/utils/format.js", NodeKind::File);
        assert!(has_edge(&graph, &app, &format, EdgeKind::Imports));
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let mut bundle = sample_bundle();
        bundle.analyses.push(AnalysisRecord {
            file_path: "broken.py".into(),
            error: Some("syntax error".into()),
            ..AnalysisRecord::default()
        });
        bundle.analyses.push(AnalysisRecord::new("").with_units(vec![unit("function", "f", 1, 2)]));
        bundle.analyses.push(AnalysisRecord::new("odd.py").with_units(vec![
            unit("widget", "w", 1, 2),
            unit("function", "backwards", 9, 3),
            unit("function", "fine", 1, 2),
        ]));

        let mut builder = GraphBuilder::default();
        let report = builder.ingest(&bundle).clone();
        let graph = builder.build();

        assert_eq!(report.skipped_records, 2);
        assert_eq!(report.skipped_units, 2);
        assert!(graph.find_by_name("fine").len() == 1);
        assert!(graph.find_by_name("broken.py").is_empty());
        // The good records still went in.
        assert_eq!(graph.find_by_name("User").len(), 1);
    }

    #[test]
    fn test_json_bundle_survives_broken_records() {
        let json = r#"{
            "files": [{"path": "shop/cart.py"}, 42],
            "analyses": [
                {"file_path": "shop/cart.py", "code_units": [
                    {"kind": "class", "name": "Cart", "line_start": 1, "line_end": 30},
                    {"kind": "method", "line_start": 5, "line_end": 9}
                ]},
                {"file_path": "shop/bad.py", "code_units": [
                    {"kind": "function", "name": "f", "line_start": "ten"}
                ]},
                {"code_units": [{"kind": "function", "name": "orphan"}]}
            ],
            "findings": [{"name": "god_class", "file_path": "shop/cart.py"}, "oops"]
        }"#;

        let mut builder = GraphBuilder::default();
        let report = builder.ingest_json(json).unwrap().clone();
        let graph = builder.build();

        // Entries 42 and "oops", the record with a bad line number, and the
        // record without a file path.
        assert_eq!(report.skipped_records, 4);
        // The nameless method.
        assert_eq!(report.skipped_units, 1);
        assert_eq!(report.code_units, 1);
        assert_eq!(graph.find_by_name("Cart").len(), 1);
        assert!(graph.find_by_name("f").is_empty());
        assert!(graph.find_by_name("orphan").is_empty());
        assert_eq!(graph.nodes_of_kind(NodeKind::Pattern).len(), 1);
    }

    #[test]
    fn test_json_bundle_must_be_an_object() {
        let mut builder = GraphBuilder::default();
        assert!(matches!(
            builder.ingest_json("[1, 2]"),
            Err(crate::error::GraphError::Decode(_))
        ));
        assert!(builder.ingest_json("{}").is_ok());
    }

    #[test]
    fn test_findings_become_patterns() {
        let mut bundle = sample_bundle();
        bundle.findings.push(PatternFinding {
            name: "god_class".into(),
            category: "smell".into(),
            severity: "medium".into(),
            description: "Too many responsibilities".into(),
            confidence: 0.8,
            file_path: "app/models.py".into(),
            line_number: Some(12),
        });

        let mut builder = GraphBuilder::default();
        builder.ingest(&bundle);
        let graph = builder.build();

        let pattern = id_of(&graph, "god_class", NodeKind::Pattern);
        let models = id_of(&graph, "app/models.py", NodeKind::File);
        assert!(has_edge(&graph, &models, &pattern, EdgeKind::Contains));
        let node = graph.get_node(&pattern).unwrap();
        assert_eq!(node.property("severity"), Some(&json!("medium")));
    }

    #[test]
    fn test_same_name_classes_prefer_same_file() {
        let mut bundle = AnalysisBundle::default();
        bundle.analyses.push(AnalysisRecord::new("a.py").with_units(vec![
            unit("class", "Base", 1, 5),
            unit("class", "Child", 7, 20).with_bases(vec!["Base".into()]),
        ]));
        bundle
            .analyses
            .push(AnalysisRecord::new("b.py").with_units(vec![unit("class", "Base", 1, 5)]));

        let mut builder = GraphBuilder::default();
        let report = builder.ingest(&bundle).clone();
        let graph = builder.build();

        let child = NodeId::derive("Child", NodeKind::Class, Some("a.py"));
        let local_base = NodeId::derive("Base", NodeKind::Class, Some("a.py"));
        assert!(has_edge(&graph, &child, &local_base, EdgeKind::Extends));
        assert_eq!(graph.edges_of_kind(EdgeKind::Extends).len(), 1);
        assert_eq!(report.ambiguous_symbols, 1);
    }

    #[test]
    fn test_recursive_call_has_no_self_edge() {
        let mut bundle = AnalysisBundle::default();
        bundle.analyses.push(AnalysisRecord::new("fact.py").with_units(vec![
            unit("function", "fact", 1, 4).with_references(vec!["fact".into()]),
        ]));

        let mut builder = GraphBuilder::default();
        builder.ingest(&bundle);
        assert!(builder.build().edges_of_kind(EdgeKind::Calls).is_empty());
    }

    #[test]
    fn test_reingest_is_idempotent() {
        let bundle = sample_bundle();
        let mut builder = GraphBuilder::default();
        builder.ingest(&bundle);
        let (nodes, edges) = (builder.graph.node_count(), builder.graph.edge_count());

        builder.ingest(&bundle);
        assert_eq!(builder.graph.node_count(), nodes);
        assert_eq!(builder.graph.edge_count(), edges);
    }

    #[test]
    fn test_merge_makes_symbols_resolvable() {
        let mut first = GraphBuilder::default();
        first.ingest(&sample_bundle());
        let base_graph = first.build();

        let mut bundle = AnalysisBundle::default();
        bundle.analyses.push(
            AnalysisRecord::new("app/admin.py")
                .with_units(vec![unit("class", "Admin", 1, 9).with_bases(vec!["User".into()])])
                .with_imports(vec![ImportRecord::new("app.models")]),
        );

        let mut builder = GraphBuilder::default();
        builder.merge(&base_graph);
        builder.ingest(&bundle);
        let graph = builder.build();

        let admin = id_of(&graph, "Admin", NodeKind::Class);
        let user = id_of(&graph, "User", NodeKind::Class);
        let admin_file = id_of(&graph, "app/admin.py", NodeKind::File);
        let models = id_of(&graph, "app/models.py", NodeKind::File);
        assert!(has_edge(&graph, &admin, &user, EdgeKind::Extends));
        assert!(has_edge(&graph, &admin_file, &models, EdgeKind::Imports));
    }
}
