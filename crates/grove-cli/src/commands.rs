//! CLI command implementations.

use colored::Colorize;
use grove_graph::{
    ExportFormat, GraphBuilder, GraphConfig, GraphQuery, GraphStore, ImpactReport, NodeFilter,
    NodeSummary, QueryEngine, QueryPayload, QueryResult,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

const CONFIG_PATH: &str = ".grove/config.json";

fn load_config() -> Result<GraphConfig> {
    Ok(GraphConfig::load_or_default(Path::new(CONFIG_PATH))?)
}

fn load_graph(path: &Path) -> Result<GraphStore> {
    if !path.exists() {
        return Err(format!(
            "no graph at {} (run `grove build <bundle>` first)",
            path.display()
        )
        .into());
    }
    Ok(GraphStore::load_json(path)?)
}

fn location(node: &NodeSummary) -> String {
    match (&node.file_path, node.line_number) {
        (Some(file), Some(line)) => format!("({}:{})", file, line),
        (Some(file), None) => format!("({})", file),
        _ => String::new(),
    }
}

fn print_node(node: &NodeSummary) {
    println!(
        "  {} {} {}",
        node.kind.to_string().yellow(),
        node.name.cyan(),
        location(node).dimmed()
    );
}

/// Initialize Grove in a directory.
pub fn init(path: &Path) -> Result<()> {
    let grove_dir = path.join(".grove");

    if grove_dir.exists() {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    fs::create_dir_all(&grove_dir)?;

    let config_path = grove_dir.join("config.json");
    fs::write(
        &config_path,
        serde_json::to_string_pretty(&GraphConfig::default())?,
    )?;

    println!("{} Initialized Grove in {}", "✓".green(), path.display());
    println!(
        "  Run {} to build the graph",
        "grove build <bundle.json>".cyan()
    );

    Ok(())
}

/// Build the graph from an analysis bundle and save it.
pub fn build(bundle_path: &Path, name: &str, output: &Path) -> Result<()> {
    println!("{}", "Building knowledge graph...".cyan());

    let text = fs::read_to_string(bundle_path)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(format!("Ingesting {}...", bundle_path.display()));

    let mut builder = GraphBuilder::new(name);
    builder.ingest_json(&text)?;
    let (graph, report) = builder.finish();

    spinner.finish_and_clear();

    println!(
        "{} Built {} nodes and {} edges from {} files ({} code units)",
        "✓".green(),
        graph.node_count().to_string().cyan(),
        graph.edge_count().to_string().cyan(),
        report.files,
        report.code_units
    );

    let skipped = report.skipped_records + report.skipped_units;
    if skipped > 0 {
        println!("{} {} malformed records skipped", "⚠".yellow(), skipped);
    }
    if report.unresolved_imports > 0 {
        println!(
            "  {} imports did not resolve to a known file",
            report.unresolved_imports
        );
    }
    if report.ambiguous_symbols > 0 {
        println!(
            "  {} references matched more than one symbol",
            report.ambiguous_symbols
        );
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    graph.save_json(output)?;
    println!("{} Saved to {}", "✓".green(), output.display());

    Ok(())
}

/// Show graph statistics.
pub fn stats(graph_path: &Path, top: usize) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let stats = graph.statistics();

    println!("{}", format!("Graph: {}", stats.name).cyan().bold());
    println!();
    println!("  {} {}", "Nodes:".dimmed(), stats.node_count);
    println!("  {} {}", "Edges:".dimmed(), stats.edge_count);
    println!("  {} {}", "Files:".dimmed(), stats.file_count);
    println!("  {} {:.2}", "Average degree:".dimmed(), stats.average_degree);
    println!("  {} {:.4}", "Density:".dimmed(), stats.density);

    if !stats.nodes_by_kind.is_empty() {
        println!();
        println!("{}", "Nodes by kind".bold());
        for (kind, count) in &stats.nodes_by_kind {
            println!("  {:<16} {}", kind.to_string(), count);
        }
    }
    if !stats.edges_by_kind.is_empty() {
        println!();
        println!("{}", "Edges by kind".bold());
        for (kind, count) in &stats.edges_by_kind {
            println!("  {:<16} {}", kind.to_string(), count);
        }
    }

    let scores = graph.centrality();
    let central = scores.top(top);
    if !central.is_empty() {
        println!();
        println!("{}", "Most connected".bold());
        for (id, score) in central {
            if let Some(node) = graph.get_node(id) {
                println!(
                    "  {:.3} {} {}",
                    score,
                    node.name.cyan(),
                    node.kind.to_string().dimmed()
                );
            }
        }
    }

    Ok(())
}

/// Answer a natural-language question.
pub fn query(graph_path: &Path, question: &str, json_output: bool) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let config = load_config()?;
    let result = QueryEngine::with_config(&graph, &config).ask(question);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_answer(&result);
    Ok(())
}

fn print_answer(result: &QueryResult) {
    let marker = if result.success {
        "✓".green()
    } else {
        "✗".red()
    };
    println!("{} {}", marker, result.message);

    match &result.payload {
        QueryPayload::Empty => {}
        QueryPayload::Nodes(nodes) => {
            for node in nodes {
                print_node(node);
            }
        }
        QueryPayload::Path(steps) => {
            let names: Vec<String> = steps.iter().map(|n| n.name.cyan().to_string()).collect();
            println!("  {}", names.join(" → "));
        }
        QueryPayload::Ranked(ranked) => {
            for scored in ranked {
                println!(
                    "  {:.2} {} {}",
                    scored.score,
                    scored.node.name.cyan(),
                    location(&scored.node).dimmed()
                );
            }
        }
        QueryPayload::Impact(report) => print_impact(report),
        QueryPayload::Cycles(cycles) => {
            for cycle in cycles {
                let names: Vec<&str> = cycle.iter().map(|n| n.name.as_str()).collect();
                println!("  {}", names.join(" → "));
            }
        }
        QueryPayload::Statistics(stats) => {
            println!(
                "  {} nodes, {} edges, {} files",
                stats.node_count, stats.edge_count, stats.file_count
            );
        }
    }
    println!(
        "{}",
        format!("({:?} in {:.1}ms)", result.kind, result.elapsed_ms).dimmed()
    );
}

/// Filter nodes with the structured query layer.
pub fn find(
    graph_path: &Path,
    kind: Option<&str>,
    name: Option<&str>,
    file: Option<&str>,
    limit: Option<usize>,
) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let config = load_config()?;

    let mut filter = NodeFilter::new().limit(limit.unwrap_or(config.query.result_limit));
    if let Some(kind) = kind {
        filter = filter.kind_str(kind)?;
    }
    if let Some(name) = name {
        filter = filter.name(name);
    }
    if let Some(file) = file {
        filter = filter.file(file);
    }

    let nodes = GraphQuery::new(&graph).find_nodes(&filter);
    if nodes.is_empty() {
        println!("No matching nodes");
        return Ok(());
    }

    println!("Found {} nodes:\n", nodes.len());
    for node in nodes {
        print_node(&NodeSummary::from(node));
    }
    Ok(())
}

/// Preview the blast radius of changing a node.
pub fn impact(
    graph_path: &Path,
    target: &str,
    depth: Option<usize>,
    json_output: bool,
) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let config = load_config()?;
    let query = GraphQuery::new(&graph);

    let matches = query.resolve_name(target);
    let node = match matches.first() {
        Some(node) => *node,
        None => return Err(format!("Node '{}' not found in graph", target).into()),
    };
    if matches.len() > 1 {
        tracing::warn!(
            "'{}' names {} nodes, using {}",
            target,
            matches.len(),
            node.location().unwrap_or_else(|| node.id.to_string())
        );
    }

    let report = query.impact(&node.id, depth.unwrap_or(config.query.impact_depth));

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "⚠️  Blast Radius".yellow().bold());
    println!("Target: {} ({})", node.name.cyan(), node.kind);
    println!();
    print_impact(&report);
    Ok(())
}

fn print_impact(report: &ImpactReport) {
    println!("{}", report.summary().bold());
    for level in &report.levels {
        println!();
        println!(
            "{} {} ({} nodes)",
            format!("[{}]", level.severity).yellow(),
            format!("depth {}", level.depth).dimmed(),
            level.nodes.len()
        );
        for node in &level.nodes {
            print_node(node);
        }
    }
}

/// Export the graph in one of the supported formats.
pub fn export(graph_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let format: ExportFormat = format.parse()?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(format!("grove-graph.{}", format.extension())));

    fs::write(&output, format.render(&graph)?)?;
    println!(
        "{} Exported {} to {}",
        "✓".green(),
        format,
        output.display()
    );
    Ok(())
}
