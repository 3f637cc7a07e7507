//! Grove CLI - Command-line interface for Grove
//!
//! Builds a knowledge graph from analyzer output and answers questions
//! about it. The graph is kept as JSON under `.grove/` between runs.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "grove")]
#[command(author = "Grove Contributors")]
#[command(version)]
#[command(about = "A queryable knowledge graph of your code", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Graph file to read (and write, for `build`)
    #[arg(short, long, global = true, default_value = ".grove/graph.json")]
    graph: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Grove in the current directory
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Build the graph from an analysis bundle (JSON)
    Build {
        /// Analysis bundle produced by the analyzers
        bundle: PathBuf,

        /// Name recorded on the graph
        #[arg(short, long, default_value = "knowledge_graph")]
        name: String,
    },

    /// Show graph statistics
    Stats {
        /// Number of most central nodes to list
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Ask a question in plain English
    Query {
        /// The question, e.g. "what depends on auth.py"
        question: String,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Filter nodes by kind, name or file
    Find {
        /// Node kind (function, class, file, ...)
        #[arg(short, long)]
        kind: Option<String>,

        /// Name pattern (regex, case-insensitive)
        #[arg(short, long)]
        name: Option<String>,

        /// File path pattern (regex, case-insensitive)
        #[arg(short, long)]
        file: Option<String>,

        /// Maximum results to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Preview the blast radius of changing a node
    Impact {
        /// The node to analyze (name of a function, class, file, ...)
        target: String,

        /// Maximum depth to search
        #[arg(short, long)]
        depth: Option<usize>,

        /// Output as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Export the graph
    Export {
        /// Output format: json, graphml or dot
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Output file (defaults to `grove-graph.<ext>`)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let graph = cli.graph;
    let result = match cli.command {
        Commands::Init { path } => commands::init(&path),
        Commands::Build { bundle, name } => commands::build(&bundle, &name, &graph),
        Commands::Stats { top } => commands::stats(&graph, top),
        Commands::Query { question, json } => commands::query(&graph, &question, json),
        Commands::Find {
            kind,
            name,
            file,
            limit,
        } => commands::find(
            &graph,
            kind.as_deref(),
            name.as_deref(),
            file.as_deref(),
            limit,
        ),
        Commands::Impact {
            target,
            depth,
            json,
        } => commands::impact(&graph, &target, depth, json),
        Commands::Export { format, output } => {
            commands::export(&graph, &format, output.as_deref())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}
