//! Promptdex CLI - index a repository of documents and query it.
//!
//! Logs go to stderr; results go to stdout, either as a compact listing or,
//! with `--json`, as the serialized result objects.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use promptdex_core::{DocIndex, PromptdexError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "promptdex")]
#[command(about = "Index and search prompt, rule, and command documents")]
#[command(version)]
struct Args {
    /// Repository root to index
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Index database path (defaults to <root>/.promptdex/index.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// File extensions to index, comma-separated (default: md,mdc,markdown,mdx,txt)
    #[arg(long = "ext", value_delimiter = ',', global = true)]
    extensions: Vec<String>,

    /// Include edges to files outside the index in graph queries
    #[arg(long, global = true)]
    include_external: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Index the repository (incremental unless --full)
    Index {
        /// Re-parse every file instead of only changed ones
        #[arg(long)]
        full: bool,
    },

    /// Fan-out search across full-text and metadata strategies
    Search {
        query: String,
        #[arg(short, long, default_value_t = promptdex_core::SearchConfig::DEFAULT_LIMIT)]
        limit: usize,
        /// Only return documents of this type
        #[arg(short = 't', long = "type")]
        doc_type: Option<String>,
        /// Comma-separated strategies (full-text, metadata, semantic)
        #[arg(long = "strategy", value_delimiter = ',')]
        strategies: Vec<String>,
    },

    /// Full-text search only
    Text {
        query: String,
        #[arg(short, long, default_value_t = promptdex_core::SearchConfig::DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(short = 't', long = "type")]
        doc_type: Option<String>,
        /// Report malformed query syntax as an error
        #[arg(long)]
        strict: bool,
    },

    /// Metadata filter search: KEY=VALUE conditions, all required
    Filter {
        #[arg(required = true)]
        conditions: Vec<String>,
        #[arg(short, long, default_value_t = promptdex_core::SearchConfig::DEFAULT_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Dependency traversal from a document
    Deps {
        path: String,
        /// forward, reverse, or both
        #[arg(long, default_value = "forward")]
        direction: String,
        #[arg(long, default_value_t = promptdex_core::GraphConfig::DEFAULT_MAX_DEPTH)]
        max_depth: usize,
    },

    /// Documents nothing references
    EntryPoints,

    /// Documents that reference nothing
    Leaves,

    /// Full adjacency map
    Graph,

    /// Index statistics
    Stats,
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

fn open_index(args: &Args) -> Result<DocIndex> {
    let mut builder = DocIndex::builder(&args.root).include_external(args.include_external);
    if !args.extensions.is_empty() {
        builder = builder.extensions(args.extensions.iter().map(|e| e.trim_start_matches('.').to_string()));
    }
    if let Some(db) = &args.db {
        builder = builder.db_path(db);
    }
    Ok(builder.build()?)
}

async fn run(args: Args) -> Result<()> {
    let index = open_index(&args)?;
    debug!("Using index root {}", index.root_dir().display());

    let outcome = commands::dispatch(&index, args.command, args.json).await;
    finish(outcome, index.close())
}

/// A command error wins over a close error so its exit code survives.
fn finish(outcome: Result<()>, closed: promptdex_core::Result<()>) -> Result<()> {
    match (outcome, closed) {
        (Err(e), Err(close_err)) => {
            warn!("Failed to close index: {}", close_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => Ok(closed?),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.debug);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<PromptdexError>()
                .map(PromptdexError::to_exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
