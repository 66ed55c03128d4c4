use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use file_insight::{
    Engine, EngineConfig, FastEmbedder, FileContentSource, FileRecord, LocalFs, MimeClassifier,
    ModifiedWindow,
};

#[derive(Debug, Parser)]
#[command(
    name = "file-insight",
    version,
    about = "Filtered file search, near-duplicate detection and semantic ranking"
)]
struct Opts {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Decrease log verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
    /// Configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search a directory tree
    Search {
        root: Option<PathBuf>,
        #[arg(long, default_value = "")]
        query: String,
        /// Comma-separated extensions, e.g. pdf,txt
        #[arg(long, value_delimiter = ',')]
        ext: Vec<String>,
        #[arg(long)]
        min_size: Option<String>,
        #[arg(long)]
        max_size: Option<String>,
        /// today, this-week, last-week, this-month, last-month
        #[arg(long, value_parser = parse_window)]
        modified: Option<ModifiedWindow>,
        #[arg(long)]
        limit: Option<usize>,
        /// The originally requested directory, when searching from a broader root
        #[arg(long)]
        anchor: Option<PathBuf>,
    },
    /// Group near-duplicate files
    Duplicates {
        root: Option<PathBuf>,
        /// Embed file contents first so the semantic signal counts
        #[arg(long)]
        embed: bool,
    },
    /// Rank files by semantic similarity to a text query
    Similar {
        root: Option<PathBuf>,
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Group files by MIME family
    Categorize { root: Option<PathBuf> },
}

fn parse_window(value: &str) -> std::result::Result<ModifiedWindow, String> {
    value.parse().map_err(|e: file_insight::EngineError| e.to_string())
}

fn init_tracing(verbosity: i16) -> Result<()> {
    let level = match verbosity {
        i16::MIN..=0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install log subscriber: {e}"))
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(root) => Ok(root),
        None => dirs::desktop_dir().context("Failed to get desktop directory"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn collect_files(engine: &Engine, root: &Path) -> Result<Vec<FileRecord>> {
    let files = engine.search(root, &engine.search_spec("")).await?;
    Ok(files.into_iter().filter(|f| !f.is_dir).collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = Opts::parse();
    init_tracing(opts.verbose as i16 - opts.quiet as i16)?;

    let config = EngineConfig::load(opts.config.as_deref())?;
    let engine = Engine::new(Arc::new(LocalFs), config)?;

    match opts.command {
        Command::Search {
            root,
            query,
            ext,
            min_size,
            max_size,
            modified,
            limit,
            anchor,
        } => {
            let root = resolve_root(root)?;
            let mut spec = engine.search_spec(query).with_extensions(ext);
            spec.min_size = min_size;
            spec.max_size = max_size;
            spec.modified = modified.unwrap_or_default();
            spec.anchor = anchor;
            if let Some(limit) = limit {
                spec = spec.with_result_cap(limit);
            }

            let results = engine.search(&root, &spec).await?;
            print_json(&results)?;
        }
        Command::Duplicates { root, embed } => {
            let root = resolve_root(root)?;
            let files = collect_files(&engine, &root).await?;
            if embed {
                let embedder = FastEmbedder::new()?;
                let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
                engine.ensure_embeddings(&paths, &FileContentSource, &embedder).await;
            }

            let groups = engine.find_duplicates(&files)?;
            info!("Found {} duplicate groups", groups.len());
            print_json(&groups)?;
        }
        Command::Similar { root, query, limit } => {
            let root = resolve_root(root)?;
            let files = collect_files(&engine, &root).await?;
            let embedder = FastEmbedder::new()?;
            let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
            let report = engine.ensure_embeddings(&paths, &FileContentSource, &embedder).await;
            info!("Indexed {} files ({} skipped)", report.embedded, report.failed.len());

            let results = engine.semantic_search_text(&query, &embedder, limit).await?;
            print_json(&results)?;
        }
        Command::Categorize { root } => {
            let root = resolve_root(root)?;
            let files = collect_files(&engine, &root).await?;
            let groups = engine.categorize(&files, &MimeClassifier).await;
            print_json(&groups)?;
        }
    }

    Ok(())
}
