//! Oracle CLI - hybrid lexical + semantic code search.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use oracle::{
    Config, FileSystemRepositoryWalker, IndexRepositoryUseCase, MockEmbedding, OrtEmbedding,
    OrtReranking, PassthroughReranking, ProgressCallback, RerankingService, SearchCodeUseCase,
    SqliteChunkStore, TantivyLexicalIndex, TreeSitterParser, UsearchVectorIndex,
};

/// Oracle - hybrid lexical + semantic code search
#[derive(Parser)]
#[command(name = "oracle")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug-level logging (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a repository
    Index {
        #[command(subcommand)]
        mode: IndexMode,
    },

    /// Run a hybrid search query against the current index
    Ask {
        /// The natural-language or keyword question
        question: String,

        /// Maximum number of results to return
        #[arg(long, default_value = "10")]
        top_k: usize,

        /// Skip the cross-encoder reranking pass
        #[arg(long)]
        no_rerank: bool,

        /// Run retrieval only; never hand off to a generation layer (a
        /// no-op here, since this core has none — kept for CLI-contract
        /// parity with front-ends that do)
        #[arg(long)]
        dry_run: bool,

        /// Bypass any response cache (a no-op here; caching is owned by
        /// the generation layer, out of scope for this core)
        #[arg(long)]
        no_cache: bool,
    },
}

#[derive(Subcommand)]
enum IndexMode {
    /// Build the index from scratch
    Full {
        /// Repository root to index
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Path to the Chunk Store / Lexical Index / Vector Index (defaults to `<path>/.oracle`)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Skip files larger than this many kilobytes
        #[arg(long)]
        max_size: Option<u64>,

        /// Restrict indexing to a subdirectory of `path`
        #[arg(long)]
        scope: Option<PathBuf>,
    },
    /// Reindex only files that changed since the last run
    Update {
        /// Repository root to index
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Path to the Chunk Store / Lexical Index / Vector Index (defaults to `<path>/.oracle`)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Restrict indexing to a subdirectory of `path`
        #[arg(long)]
        scope: Option<PathBuf>,
    },
}

struct Wiring {
    chunk_store: Arc<dyn oracle::ChunkStore>,
    lexical_index: Arc<dyn oracle::LexicalIndex>,
    vector_index: Arc<dyn oracle::VectorIndex>,
    embedding_service: Arc<dyn oracle::EmbeddingService>,
}

/// Opens the on-disk Chunk Store / Lexical Index / Vector Index under
/// `data_dir` (spec §6's `.oracle/index.db`, `.oracle/bm25.*`,
/// `.oracle/vectors.*` layout) and wires the embedding service.
fn wire(data_dir: &std::path::Path, config: &Config) -> Result<Wiring> {
    std::fs::create_dir_all(data_dir).context("failed to create data directory")?;

    let chunk_store = Arc::new(
        SqliteChunkStore::open(data_dir.join("index.db")).context("failed to open chunk store")?,
    );
    let lexical_index = Arc::new(
        TantivyLexicalIndex::open(data_dir.join("bm25")).context("failed to open lexical index")?,
    );
    let vector_index = Arc::new(
        UsearchVectorIndex::open(data_dir.join("vectors.usearch"))
            .context("failed to open vector index")?,
    );

    let embedding_service: Arc<dyn oracle::EmbeddingService> =
        match OrtEmbedding::new(Some(&config.embedding_model)) {
            Ok(service) => Arc::new(service),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to the deterministic mock embedder");
                Arc::new(MockEmbedding::with_dimensions(config.vector_index.dimensions))
            }
        };

    Ok(Wiring {
        chunk_store,
        lexical_index,
        vector_index,
        embedding_service,
    })
}

fn data_dir_for(path: &std::path::Path, db: &Option<PathBuf>) -> PathBuf {
    db.clone().unwrap_or_else(|| path.join(".oracle"))
}

fn scoped_path(path: &std::path::Path, scope: &Option<PathBuf>) -> PathBuf {
    match scope {
        Some(subdir) => path.join(subdir),
        None => path.to_path_buf(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    match cli.command {
        Commands::Index { mode } => {
            let (repo_path, data_dir, max_bytes, scope) = match &mode {
                IndexMode::Full { path, db, max_size, scope } => {
                    (path.clone(), data_dir_for(path, db), max_size.map(|kb| kb * 1024), scope.clone())
                }
                IndexMode::Update { path, db, scope } => {
                    (path.clone(), data_dir_for(path, db), None, scope.clone())
                }
            };

            let config = Config::load(&repo_path).context("failed to load .oracle/config.toml")?;
            let effective_scope = scoped_path(&repo_path, &scope);
            let wiring = wire(&data_dir, &config)?;

            let walker = Arc::new(
                FileSystemRepositoryWalker::new()
                    .with_max_bytes(max_bytes.unwrap_or(config.walker.max_bytes))
                    .with_extra_ignore_dirs(config.walker.extra_ignore_dirs.clone()),
            );
            let parser = Arc::new(TreeSitterParser::new());

            let use_case = IndexRepositoryUseCase::new(
                wiring.chunk_store,
                wiring.lexical_index,
                wiring.vector_index,
                parser,
                wiring.embedding_service,
                walker,
            );

            let bar = ProgressBar::new(0);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} files ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            let progress: ProgressCallback = Box::new(move |done, total| {
                bar.set_length(total);
                bar.set_position(done);
                if done >= total {
                    bar.finish_and_clear();
                }
            });

            let stats = match mode {
                IndexMode::Full { .. } => use_case.full_index(&effective_scope, Some(&progress)).await?,
                IndexMode::Update { .. } => use_case.update_index(&effective_scope, Some(&progress)).await?,
            };

            println!(
                "indexed {} files ({} failed), {} chunks, {} ms",
                stats.files_processed, stats.files_failed, stats.chunks_created, stats.duration_ms
            );
        }

        Commands::Ask { question, top_k, no_rerank, dry_run, no_cache } => {
            let _ = (dry_run, no_cache);

            let repo_path = PathBuf::from(".");
            let config = Config::load(&repo_path).context("failed to load .oracle/config.toml")?;
            let data_dir = repo_path.join(".oracle");
            let wiring = wire(&data_dir, &config)?;

            let reranking_service: Arc<dyn RerankingService> = if no_rerank {
                Arc::new(PassthroughReranking::new())
            } else {
                match config.reranking_model.as_deref() {
                    Some(model_id) => match OrtReranking::new(Some(model_id)) {
                        Ok(service) => Arc::new(service),
                        Err(e) => {
                            tracing::warn!(error = %e, "reranking model unavailable, falling back to passthrough");
                            Arc::new(PassthroughReranking::new())
                        }
                    },
                    None => Arc::new(PassthroughReranking::new()),
                }
            };

            let use_case = SearchCodeUseCase::new(
                wiring.chunk_store,
                wiring.lexical_index,
                wiring.vector_index,
                wiring.embedding_service,
                reranking_service,
            );

            let mut params: oracle::SearchParams = config.search.into();
            params.fusion_limit = params.fusion_limit.max(top_k);

            let results = use_case.hybrid_search(&question, params).await?;
            info!(count = results.len(), "query complete");

            for (i, result) in results.iter().take(top_k).enumerate() {
                println!(
                    "{}. {} ({}) score={:.4}",
                    i + 1,
                    result.location(),
                    if result.symbol_name().is_empty() { "<anonymous>" } else { result.symbol_name() },
                    result.score()
                );
            }
            if results.is_empty() {
                println!("no results");
            }
        }
    }

    Ok(())
}
