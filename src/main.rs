//! # Memory Harness CLI (`mem`)
//!
//! The `mem` binary is the primary interface to the memory store. It
//! provides commands for storing notes, ingesting documents, semantic
//! recall, deletion, listing, bulk transfer, and starting the HTTP tool
//! server.
//!
//! ## Usage
//!
//! ```bash
//! mem --config ./config/mem.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `mem init` | Create the data directory, index, and registry |
//! | `mem remember "<text>"` | Store a short note |
//! | `mem ingest --file <path>` | Chunk and store a text file |
//! | `mem recall "<query>"` | Semantic search with ranked snippets |
//! | `mem forget <id>...` | Delete documents and their chunks |
//! | `mem list` | List stored documents, newest first |
//! | `mem download` | Export documents as JSONL |
//! | `mem upload <file>` | Import documents from JSONL |
//! | `mem serve mcp` | Start the HTTP tool server |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memory_harness::backend::OllamaBackend;
use memory_harness::config::{self, Config};
use memory_harness::models::normalize_tags;
use memory_harness::server;
use memory_harness::store::MemoryStore;

/// Memory Harness — a local-first retrieval-augmented memory store for AI
/// tools.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/mem.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "mem",
    about = "Memory Harness — a local-first retrieval-augmented memory store for AI tools",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/mem.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory, vector index, and registry.
    ///
    /// Idempotent — running it multiple times is safe.
    Init,

    /// Store a short note in semantic memory.
    Remember {
        /// The note text.
        content: String,

        /// Tag for categorization; repeat for multiple tags, or pass a
        /// comma/space-delimited list.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Chunk and store long-form content.
    ///
    /// Supply exactly one of `--content` or `--file`.
    Ingest {
        /// Inline text to ingest.
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Path to a text file to ingest.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Tag for categorization; repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Search stored content by semantic similarity.
    Recall {
        /// The search query.
        query: String,

        /// Maximum number of documents to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Minimum similarity score (0-1) for a chunk to count as a match.
        #[arg(long)]
        threshold: Option<f32>,

        /// Only return documents carrying at least one of these tags.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Embed a generated hypothetical answer instead of the query.
        /// Helps when the query is phrased as a question.
        #[arg(long)]
        hyde: bool,
    },

    /// Delete documents by id. Unknown ids are reported, not fatal.
    Forget {
        /// One or more document ids.
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List stored documents, newest first.
    List {
        /// Entries to skip.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum entries to return.
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Only list documents carrying at least one of these tags.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Export documents as line-delimited JSON.
    Download {
        /// Output file. Writes to stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Entries to skip.
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum entries to export.
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Only export documents carrying at least one of these tags.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Import documents from a line-delimited JSON file.
    ///
    /// Each line: `{"type": "memory"|"document", "content": "...",
    /// "tags": [...], "source": "..."}`. Invalid lines are reported with
    /// their line number; valid lines are still imported.
    Upload {
        /// Path to the JSONL file.
        file: PathBuf,
    },

    /// Start a server exposing the tool surface.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the MCP-style HTTP tool server.
    Mcp,
}

async fn open_store(config: &Config) -> Result<MemoryStore> {
    let backend = OllamaBackend::new(&config.backend)?;
    let store = MemoryStore::open(config.clone(), Box::new(backend)).await?;
    Ok(store)
}

/// Flatten content to a one-line excerpt for display.
fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace('\n', " ");
    let mut out: String = flat.chars().take(max_chars).collect();
    if flat.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let store = open_store(&cfg).await?;
            println!(
                "Store initialized at {} ({} documents).",
                cfg.store.data_dir.display(),
                store.list(Vec::new(), 0, 1).await?.total
            );
        }
        Commands::Remember { content, tags } => {
            let store = open_store(&cfg).await?;
            let outcome = store.remember(&content, normalize_tags(tags)).await?;
            println!("remembered");
            println!("  document: {}", outcome.document_id);
            println!("  chunk: {}", outcome.chunk_id);
        }
        Commands::Ingest {
            content,
            file,
            tags,
        } => {
            let store = open_store(&cfg).await?;
            let outcome = store
                .ingest(content, file.as_deref(), normalize_tags(tags))
                .await?;
            println!("ingested");
            println!("  document: {}", outcome.document_id);
            println!("  chunks: {}", outcome.chunk_count);
            println!("  preview: \"{}\"", excerpt(&outcome.preview, 120));
        }
        Commands::Recall {
            query,
            limit,
            threshold,
            tags,
            hyde,
        } => {
            let store = open_store(&cfg).await?;
            let hits = store
                .recall(
                    &query,
                    limit.unwrap_or(cfg.retrieval.default_limit),
                    threshold.unwrap_or(cfg.retrieval.default_threshold),
                    normalize_tags(tags),
                    hyde,
                )
                .await?;

            if hits.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (i, hit) in hits.iter().enumerate() {
                println!("{}. [{:.2}] {}", i + 1, hit.score, hit.id);
                println!("    \"{}\"", excerpt(&hit.content, 240));
            }
        }
        Commands::Forget { ids } => {
            let store = open_store(&cfg).await?;
            let outcome = store.forget(&ids).await?;
            println!("forget");
            println!("  deleted: {}", outcome.deleted.len());
            println!("  chunks removed: {}", outcome.chunks_removed);
            for id in &outcome.not_found {
                println!("  not found: {id}");
            }
        }
        Commands::List {
            offset,
            limit,
            tags,
        } => {
            let store = open_store(&cfg).await?;
            let page = store.list(normalize_tags(tags), offset, limit).await?;

            if page.entries.is_empty() {
                println!("No documents.");
                return Ok(());
            }

            for (i, doc) in page.entries.iter().enumerate() {
                let kind = match doc.kind {
                    memory_harness::models::DocumentKind::Memory => "memory",
                    memory_harness::models::DocumentKind::Document => "document",
                };
                println!("{}. {} [{}]", offset + i + 1, doc.id, kind);
                println!(
                    "    created: {}  chunks: {}",
                    doc.created_at.format("%Y-%m-%d %H:%M"),
                    doc.chunk_count
                );
                if !doc.tags.is_empty() {
                    println!("    tags: {}", doc.tags.join(", "));
                }
                println!("    preview: \"{}\"", excerpt(&doc.preview, 120));
            }
            println!(
                "showing {} of {} (offset {})",
                page.count, page.total, page.offset
            );
        }
        Commands::Download {
            out,
            offset,
            limit,
            tags,
        } => {
            let store = open_store(&cfg).await?;
            let records = store
                .download(normalize_tags(tags), offset, limit)
                .await?;

            let mut jsonl = String::new();
            for record in &records {
                jsonl.push_str(&serde_json::to_string(record)?);
                jsonl.push('\n');
            }

            match out {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &jsonl)?;
                    eprintln!("Exported {} records to {}", records.len(), path.display());
                }
                None => print!("{jsonl}"),
            }
        }
        Commands::Upload { file } => {
            let store = open_store(&cfg).await?;
            let jsonl = std::fs::read_to_string(&file)?;
            let report = store.upload(&jsonl).await?;

            println!("upload {}", file.display());
            println!("  imported: {}", report.imported);
            println!("  failed: {}", report.failed);
            for err in &report.errors {
                println!("  line {}: {}", err.line, err.reason);
            }
        }
        Commands::Serve { service } => match service {
            ServeService::Mcp => {
                let store = Arc::new(open_store(&cfg).await?);
                server::run_server(store, &cfg).await?;
            }
        },
    }

    Ok(())
}
