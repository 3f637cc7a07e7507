//! Natural-language front end.
//!
//! A fixed, ordered list of phrasings. The first pattern that matches
//! decides which structured query runs; anything unrecognized becomes a
//! plain name search. Answers are always a [`QueryResult`], "not found"
//! included.

use crate::config::{GraphConfig, QueryDefaults, TraversalLimits};
use crate::graph::GraphStore;
use crate::impact::ImpactReport;
use crate::query::{GraphQuery, NodeFilter, NodeSummary, ScoredNode};
use crate::ranking::GraphStatistics;
use grove_core::{Node, NodeId, NodeKind};
use regex::{Captures, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::{debug, warn};

/// Which structured operation answered a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    FindNode,
    FindByKind,
    FindDependencies,
    FindDependents,
    FindPath,
    FindRelated,
    Impact,
    FindCycles,
    Statistics,
    Search,
}

/// Data carried by a [`QueryResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum QueryPayload {
    Empty,
    Nodes(Vec<NodeSummary>),
    Path(Vec<NodeSummary>),
    Ranked(Vec<ScoredNode>),
    Impact(ImpactReport),
    Cycles(Vec<Vec<NodeSummary>>),
    Statistics(GraphStatistics),
}

/// Answer to one natural-language question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub question: String,
    pub kind: QueryKind,
    pub success: bool,
    pub message: String,
    pub payload: QueryPayload,
    pub elapsed_ms: f64,
}

struct Rule {
    kind: QueryKind,
    pattern: Regex,
}

/// Phrasings per query kind, tried top to bottom. `{kinds}` and `{kind}`
/// expand to alternations of plural and singular node kind names.
const PHRASINGS: &[(QueryKind, &str)] = &[
    (
        QueryKind::Statistics,
        r"^(?:show |give me |print )?(?:the )?(?:graph )?(?:stats|statistics|summary|overview)$",
    ),
    (QueryKind::Statistics, r"^how (?:big|large) is the graph$"),
    (
        QueryKind::FindCycles,
        r"^(?:find |show |list |detect |are there )?(?:any |all )?(?:the )?(?:cycles|circular (?:dependencies|imports|references))$",
    ),
    (
        QueryKind::FindPath,
        r"^(?:find |show )?(?:the |a )?path (?:from |between )?(.+?) (?:to|and) (.+)$",
    ),
    (
        QueryKind::FindPath,
        r"^how (?:does|is|do|are) (.+?) (?:connect|connected|reach|linked|related) to (.+)$",
    ),
    (
        QueryKind::Impact,
        r"^(?:what is the |show )?(?:the )?impact of (?:changing |modifying )?(.+)$",
    ),
    (
        QueryKind::Impact,
        r"^what (?:breaks|would break|is affected|gets affected) if (?:i |we )?(?:change|modify|delete|remove|touch) (.+)$",
    ),
    (
        QueryKind::FindDependents,
        r"^(?:what|who) (?:depends on|uses|imports) (.+)$",
    ),
    (
        QueryKind::FindDependents,
        r"^(?:find |show |list )?(?:the |all )?dependents (?:of|for) (.+)$",
    ),
    (
        QueryKind::FindDependencies,
        r"^what does (.+?) (?:depend on|use|import|need)$",
    ),
    (
        QueryKind::FindDependencies,
        r"^(?:find |show |list )?(?:the |all )?dependencies (?:of|for) (.+)$",
    ),
    (
        QueryKind::FindRelated,
        r"^(?:find |show |list )?(?:nodes |code |things |anything )?(?:similar to|related to|like) (.+)$",
    ),
    (
        QueryKind::FindByKind,
        r"^(?:list|show|find|get|what are)(?: me)?(?: all)?(?: the)? ({kinds})$",
    ),
    (QueryKind::FindByKind, r"^how many ({kinds})(?: are there)?$"),
    (
        QueryKind::FindNode,
        r"^(?:find|show|where is|where's|locate|get)(?: the)?(?: ({kind}))? (\S+)$",
    ),
    (QueryKind::Search, r"^(?:search|grep|look)(?: for)? (.+)$"),
];

fn plural(kind: NodeKind) -> String {
    let word = kind.as_str();
    if word.ends_with('s') {
        format!("{}es", word)
    } else if let Some(stem) = word.strip_suffix('y') {
        format!("{}ies", stem)
    } else {
        format!("{}s", word)
    }
}

/// Node kind named by a singular or plural word.
fn kind_from_word(word: &str) -> Option<NodeKind> {
    let lower = word.to_lowercase();
    NodeKind::ALL
        .into_iter()
        .find(|kind| kind.as_str() == lower || plural(*kind) == lower)
}

fn rules() -> &'static [Rule] {
    static RULES: OnceLock<Vec<Rule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let kinds: Vec<String> = NodeKind::ALL.into_iter().map(plural).collect();
        let singular: Vec<&str> = NodeKind::ALL.iter().map(|k| k.as_str()).collect();
        PHRASINGS
            .iter()
            .filter_map(|(kind, phrasing)| {
                let source = phrasing
                    .replace("{kinds}", &kinds.join("|"))
                    .replace("{kind}", &singular.join("|"));
                match RegexBuilder::new(&source).case_insensitive(true).build() {
                    Ok(pattern) => Some(Rule { kind: *kind, pattern }),
                    Err(e) => {
                        warn!("Dropping query phrasing {:?}: {}", phrasing, e);
                        None
                    }
                }
            })
            .collect()
    })
}

/// Answers natural-language questions about one graph.
pub struct QueryEngine<'a> {
    query: GraphQuery<'a>,
    defaults: QueryDefaults,
    limits: TraversalLimits,
}

impl<'a> QueryEngine<'a> {
    pub fn new(graph: &'a GraphStore) -> Self {
        Self::with_config(graph, &GraphConfig::default())
    }

    pub fn with_config(graph: &'a GraphStore, config: &GraphConfig) -> Self {
        Self {
            query: GraphQuery::new(graph),
            defaults: config.query,
            limits: config.limits,
        }
    }

    pub fn ask(&self, question: &str) -> QueryResult {
        let start = Instant::now();
        let text = normalize(question);

        let (kind, answer) = match rules().iter().find_map(|rule| {
            rule.pattern.captures(&text).map(|caps| (rule.kind, caps))
        }) {
            Some((kind, caps)) => {
                debug!("Question {:?} matched {:?}", text, kind);
                (kind, self.dispatch(kind, &caps))
            }
            None => {
                debug!("Question {:?} matched no phrasing, searching names", text);
                (QueryKind::Search, self.search(&text))
            }
        };

        QueryResult {
            question: question.to_string(),
            kind,
            success: answer.success,
            message: answer.message,
            payload: answer.payload,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        }
    }

    fn dispatch(&self, kind: QueryKind, caps: &Captures<'_>) -> Answer {
        let arg = |i: usize| caps.get(i).map(|m| clean(m.as_str())).unwrap_or_default();
        match kind {
            QueryKind::Statistics => self.statistics(),
            QueryKind::FindCycles => self.cycles(),
            QueryKind::FindPath => self.path(&arg(1), &arg(2)),
            QueryKind::Impact => self.impact(&arg(1)),
            QueryKind::FindDependents => self.dependents(&arg(1)),
            QueryKind::FindDependencies => self.dependencies(&arg(1)),
            QueryKind::FindRelated => self.related(&arg(1)),
            QueryKind::FindByKind => self.by_kind(&arg(1)),
            QueryKind::FindNode => {
                let kind = caps.get(1).and_then(|m| kind_from_word(m.as_str()));
                self.find_node(&arg(2), kind)
            }
            QueryKind::Search => self.search(&arg(1)),
        }
    }

    // ── Handlers ────────────────────────────────────────────

    fn statistics(&self) -> Answer {
        let stats = self.query.graph().statistics();
        Answer::ok(
            format!(
                "Graph '{}' has {} nodes and {} edges across {} files",
                stats.name, stats.node_count, stats.edge_count, stats.file_count
            ),
            QueryPayload::Statistics(stats),
        )
    }

    fn cycles(&self) -> Answer {
        let search = self.query.graph().find_cycles_with(&self.limits);
        let cycles: Vec<Vec<NodeSummary>> = search
            .cycles
            .iter()
            .map(|cycle| self.summaries(cycle))
            .collect();
        let mut message = match cycles.len() {
            0 => "No cycles found".to_string(),
            n => format!("Found {} cycles", n),
        };
        if search.truncated {
            message.push_str(" (search truncated)");
        }
        Answer::ok(message, QueryPayload::Cycles(cycles))
    }

    fn path(&self, from: &str, to: &str) -> Answer {
        let (source, target) = match (self.resolve(from), self.resolve(to)) {
            (Some(source), Some(target)) => (source, target),
            (None, _) => return Answer::not_found(from),
            (_, None) => return Answer::not_found(to),
        };
        let depth = self.defaults.path_depth;
        match self.query.graph().find_path(&source.id, &target.id, depth) {
            Some(path) => Answer::ok(
                format!(
                    "Path of {} hops from {} to {}",
                    path.len() - 1,
                    source.name,
                    target.name
                ),
                QueryPayload::Path(self.summaries(&path)),
            ),
            None => Answer::fail(format!(
                "No path from {} to {} within {} hops",
                source.name, target.name, depth
            )),
        }
    }

    fn impact(&self, name: &str) -> Answer {
        let Some(node) = self.resolve(name) else {
            return Answer::not_found(name);
        };
        let report = self.query.impact(&node.id, self.defaults.impact_depth);
        Answer::ok(
            format!("Changing {}: {}", node.name, report.summary()),
            QueryPayload::Impact(report),
        )
    }

    fn dependents(&self, name: &str) -> Answer {
        let Some(node) = self.resolve(name) else {
            return Answer::not_found(name);
        };
        let found = self
            .query
            .find_dependents(&node.id, self.defaults.dependency_depth);
        Answer::ok(
            format!("{} nodes depend on {}", found.len(), node.name),
            QueryPayload::Nodes(self.summaries(&found)),
        )
    }

    fn dependencies(&self, name: &str) -> Answer {
        let Some(node) = self.resolve(name) else {
            return Answer::not_found(name);
        };
        let found = self
            .query
            .find_dependencies(&node.id, self.defaults.dependency_depth);
        Answer::ok(
            format!("{} depends on {} nodes", node.name, found.len()),
            QueryPayload::Nodes(self.summaries(&found)),
        )
    }

    fn related(&self, name: &str) -> Answer {
        let Some(node) = self.resolve(name) else {
            return Answer::not_found(name);
        };
        let ranked = self.query.similar(&node.id, self.defaults.similar_limit);
        Answer::ok(
            format!("{} nodes similar to {}", ranked.len(), node.name),
            QueryPayload::Ranked(ranked),
        )
    }

    fn by_kind(&self, word: &str) -> Answer {
        let Some(kind) = kind_from_word(word) else {
            return Answer::fail(format!("Unknown kind '{}'", word));
        };
        let total = self.query.graph().nodes_of_kind(kind).len();
        let nodes = self
            .query
            .find_nodes(&NodeFilter::new().kind(kind).limit(self.defaults.result_limit));
        Answer::ok(
            format!("{} {} nodes", total, kind),
            QueryPayload::Nodes(nodes.into_iter().map(NodeSummary::from).collect()),
        )
    }

    fn find_node(&self, name: &str, kind: Option<NodeKind>) -> Answer {
        let mut exact = self.query.resolve_name(name);
        if let Some(kind) = kind {
            exact.retain(|node| node.kind == kind);
        }
        if exact.is_empty() {
            // Near misses are still useful.
            return self.search(name);
        }
        exact.truncate(self.defaults.result_limit);
        Answer::ok(
            format!("Found {} nodes named {}", exact.len(), name),
            QueryPayload::Nodes(exact.into_iter().map(NodeSummary::from).collect()),
        )
    }

    fn search(&self, text: &str) -> Answer {
        if text.is_empty() {
            return Answer::fail("Empty question".to_string());
        }
        let mut hits = self.query.graph().search(text);
        if hits.is_empty() {
            return Answer::not_found(text);
        }
        hits.truncate(self.defaults.result_limit);
        Answer::ok(
            format!("{} nodes match '{}'", hits.len(), text),
            QueryPayload::Nodes(hits.into_iter().map(NodeSummary::from).collect()),
        )
    }

    // ── Helpers ─────────────────────────────────────────────

    /// Picks one node for a name: exact match first, code units before
    /// other kinds, then lowest id.
    fn resolve(&self, name: &str) -> Option<&'a Node> {
        let mut candidates = self.query.resolve_name(name);
        if candidates.is_empty() {
            candidates = self
                .query
                .graph()
                .find_by_file(name)
                .into_iter()
                .filter(|node| node.file_path.as_deref() == Some(node.name.as_str()))
                .collect();
        }
        candidates.sort_by_key(|node| {
            let code_unit = node.kind.is_callable() || node.kind.is_type_like();
            (!code_unit, node.id.clone())
        });
        candidates.into_iter().next()
    }

    fn summaries(&self, ids: &[NodeId]) -> Vec<NodeSummary> {
        ids.iter()
            .filter_map(|id| self.query.graph().get_node(id))
            .map(NodeSummary::from)
            .collect()
    }
}

struct Answer {
    success: bool,
    message: String,
    payload: QueryPayload,
}

impl Answer {
    fn ok(message: String, payload: QueryPayload) -> Self {
        Self {
            success: true,
            message,
            payload,
        }
    }

    fn fail(message: String) -> Self {
        Self {
            success: false,
            message,
            payload: QueryPayload::Empty,
        }
    }

    fn not_found(name: &str) -> Self {
        Self::fail(format!("No node named '{}'", name))
    }
}

/// Collapses whitespace and drops trailing punctuation.
fn normalize(question: &str) -> String {
    question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_string()
}

/// Strips quotes and backticks around a captured name.
fn clean(capture: &str) -> String {
    capture
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`'))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::EdgeKind;

    fn graph() -> GraphStore {
        let mut graph = GraphStore::new("shop");
        let app = graph.add_node(Node::new("app.py", NodeKind::File).in_file("app.py"));
        let cart = graph.add_node(Node::new("cart.py", NodeKind::File).in_file("cart.py"));
        let db = graph.add_node(Node::new("db.py", NodeKind::File).in_file("db.py"));
        let checkout = graph.add_node(Node::new("checkout", NodeKind::Function).in_file("app.py"));
        let total = graph.add_node(Node::new("total", NodeKind::Function).in_file("cart.py"));
        let model = graph.add_node(Node::new("Cart", NodeKind::Class).in_file("cart.py"));

        graph.connect(&app, &cart, EdgeKind::Imports);
        graph.connect(&cart, &db, EdgeKind::Imports);
        graph.connect(&db, &app, EdgeKind::DependsOn);
        graph.connect(&app, &checkout, EdgeKind::Contains);
        graph.connect(&cart, &total, EdgeKind::Contains);
        graph.connect(&cart, &model, EdgeKind::Contains);
        graph.connect(&checkout, &total, EdgeKind::Calls);
        graph
    }

    fn names(payload: &QueryPayload) -> Vec<String> {
        match payload {
            QueryPayload::Nodes(nodes) | QueryPayload::Path(nodes) => {
                nodes.iter().map(|n| n.name.clone()).collect()
            }
            QueryPayload::Ranked(ranked) => ranked.iter().map(|s| s.node.name.clone()).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_every_phrasing_compiles() {
        assert_eq!(rules().len(), PHRASINGS.len());
    }

    #[test]
    fn test_statistics() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);
        let result = engine.ask("Show graph stats?");
        assert_eq!(result.kind, QueryKind::Statistics);
        assert!(result.success);
        assert!(matches!(result.payload, QueryPayload::Statistics(ref s) if s.node_count == 6));
    }

    #[test]
    fn test_find_node_and_kind() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);

        let result = engine.ask("where is checkout");
        assert_eq!(result.kind, QueryKind::FindNode);
        assert_eq!(names(&result.payload), vec!["checkout"]);

        let result = engine.ask("find class Cart");
        assert_eq!(result.kind, QueryKind::FindNode);
        assert_eq!(names(&result.payload), vec!["Cart"]);

        let result = engine.ask("list all functions");
        assert_eq!(result.kind, QueryKind::FindByKind);
        assert_eq!(names(&result.payload).len(), 2);

        let result = engine.ask("how many classes are there?");
        assert_eq!(result.kind, QueryKind::FindByKind);
        assert!(result.message.starts_with("1 class"));
    }

    #[test]
    fn test_dependency_questions() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);

        let result = engine.ask("what does app.py depend on?");
        assert_eq!(result.kind, QueryKind::FindDependencies);
        assert_eq!(names(&result.payload), vec!["cart.py", "db.py"]);

        let result = engine.ask("what depends on db.py");
        assert_eq!(result.kind, QueryKind::FindDependents);
        assert_eq!(names(&result.payload), vec!["cart.py", "app.py"]);

        let result = engine.ask("dependents of total");
        assert_eq!(result.kind, QueryKind::FindDependents);
        assert!(result.success);
        assert!(names(&result.payload).is_empty());
    }

    #[test]
    fn test_path_and_cycles() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);

        let result = engine.ask("path from checkout to total");
        assert_eq!(result.kind, QueryKind::FindPath);
        assert_eq!(names(&result.payload), vec!["checkout", "total"]);

        let result = engine.ask("how is total connected to checkout");
        assert_eq!(result.kind, QueryKind::FindPath);
        assert!(!result.success);

        let result = engine.ask("are there any circular dependencies?");
        assert_eq!(result.kind, QueryKind::FindCycles);
        match result.payload {
            QueryPayload::Cycles(cycles) => assert_eq!(cycles.len(), 1),
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_impact_and_related() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);

        let result = engine.ask("what breaks if I change `total`?");
        assert_eq!(result.kind, QueryKind::Impact);
        match &result.payload {
            QueryPayload::Impact(report) => assert_eq!(report.critical, 2),
            other => panic!("unexpected payload {:?}", other),
        }

        let result = engine.ask("similar to total");
        assert_eq!(result.kind, QueryKind::FindRelated);
        assert_eq!(names(&result.payload)[0], "checkout");
    }

    #[test]
    fn test_not_found_is_not_an_error() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);

        let result = engine.ask("impact of nothing_here");
        assert_eq!(result.kind, QueryKind::Impact);
        assert!(!result.success);
        assert!(result.message.contains("nothing_here"));
        assert_eq!(result.payload, QueryPayload::Empty);
    }

    #[test]
    fn test_fallback_search() {
        let graph = graph();
        let engine = QueryEngine::new(&graph);

        let result = engine.ask("CART");
        assert_eq!(result.kind, QueryKind::Search);
        assert!(result.success);
        assert_eq!(names(&result.payload).len(), 2);

        let result = engine.ask("   ");
        assert_eq!(result.kind, QueryKind::Search);
        assert!(!result.success);
    }

    #[test]
    fn test_plural_kinds() {
        assert_eq!(plural(NodeKind::Class), "classes");
        assert_eq!(plural(NodeKind::Dependency), "dependencies");
        assert_eq!(kind_from_word("Functions"), Some(NodeKind::Function));
        assert_eq!(kind_from_word("widgets"), None);
    }
}
