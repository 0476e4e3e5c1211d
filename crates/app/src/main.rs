use chrono::Utc;
use clap::{Parser, Subcommand};
use doc_qa_core::{
    derive_document_id, discover_documents, Embedder, ExtractionOptions, FileStore, HashEmbedder,
    QaCoordinator, QaOptions, QdrantStore, RemoteEmbedder, VectorIndex,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "doc-qa", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding the local vector index snapshot.
    #[arg(long, default_value = "./qa_index")]
    data_dir: PathBuf,

    /// Qdrant base URL; the local file index is used when omitted.
    #[arg(long)]
    qdrant_url: Option<String>,

    /// Qdrant collection name.
    #[arg(long, default_value = "document_chunks")]
    qdrant_collection: String,

    /// Remote sentence-embedding endpoint; the deterministic hash embedder
    /// is used when omitted.
    #[arg(long)]
    embed_endpoint: Option<String>,

    /// Model name sent to the remote embedding endpoint.
    #[arg(long, default_value = "all-MiniLM-L6-v2")]
    embed_model: String,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document, or every supported document under a folder.
    Ingest {
        /// File or folder to ingest.
        #[arg(long)]
        path: PathBuf,
        /// Document identifier; derived from each file path when omitted.
        #[arg(long)]
        document_id: Option<String>,
    },
    /// Ask a question against indexed content.
    Ask {
        /// The question.
        #[arg(long)]
        question: String,
        /// Restrict retrieval to one document.
        #[arg(long)]
        document_id: Option<String>,
        /// Context budget in characters.
        #[arg(long, default_value = "2000")]
        max_context_chars: usize,
    },
    /// Delete every indexed chunk for a document.
    Delete {
        #[arg(long)]
        document_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "doc-qa boot"
    );

    match (cli.qdrant_url.clone(), cli.embed_endpoint.clone()) {
        (Some(url), Some(endpoint)) => {
            let store = QdrantStore::new(
                &url,
                &cli.qdrant_collection,
                DEFAULT_EMBEDDING_DIMENSIONS,
            );
            store
                .ensure_collection()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let embedder = RemoteEmbedder::new(
                endpoint,
                cli.embed_model.clone(),
                DEFAULT_EMBEDDING_DIMENSIONS,
            );
            run(cli, store, embedder).await
        }
        (Some(url), None) => {
            let store = QdrantStore::new(
                &url,
                &cli.qdrant_collection,
                DEFAULT_EMBEDDING_DIMENSIONS,
            );
            store
                .ensure_collection()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            run(cli, store, HashEmbedder::default()).await
        }
        (None, Some(endpoint)) => {
            let store = FileStore::open(&cli.data_dir)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let embedder = RemoteEmbedder::new(
                endpoint,
                cli.embed_model.clone(),
                DEFAULT_EMBEDDING_DIMENSIONS,
            );
            run(cli, store, embedder).await
        }
        (None, None) => {
            let store = FileStore::open(&cli.data_dir)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            run(cli, store, HashEmbedder::default()).await
        }
    }
}

async fn run<V, E>(cli: Cli, index: V, embedder: E) -> anyhow::Result<()>
where
    V: VectorIndex + Send + Sync,
    E: Embedder + Send + Sync,
{
    let mut options = QaOptions::default();
    if let Command::Ask {
        max_context_chars, ..
    } = &cli.command
    {
        options.max_context_chars = *max_context_chars;
    }

    let coordinator =
        QaCoordinator::with_options(index, embedder, ExtractionOptions::default(), options)
            .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    match cli.command {
        Command::Ingest { path, document_id } => {
            let files: Vec<PathBuf> = if path.is_dir() {
                discover_documents(&path)
            } else {
                vec![path.clone()]
            };

            if files.is_empty() {
                anyhow::bail!("no supported documents found in {}", path.display());
            }

            let mut chunks_indexed = 0usize;
            let mut skipped = 0usize;

            for file in files {
                let filename = file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default()
                    .to_string();
                let id = document_id
                    .clone()
                    .unwrap_or_else(|| derive_document_id(&file));

                let outcome = coordinator
                    .ingest_document(&id, &file, &filename)
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;

                if outcome.success {
                    chunks_indexed += outcome.chunks_indexed;
                    info!(
                        path = %file.display(),
                        document_id = %id,
                        chunks = outcome.chunks_indexed,
                        "document ingested"
                    );
                } else {
                    skipped += 1;
                    warn!(
                        path = %file.display(),
                        reason = outcome.error.as_deref().unwrap_or("unknown"),
                        "skipped document"
                    );
                }
            }

            println!(
                "{} chunks ingested, {} file(s) skipped at {}",
                chunks_indexed,
                skipped,
                Utc::now().to_rfc3339()
            );
        }
        Command::Ask {
            question,
            document_id,
            ..
        } => {
            let result = coordinator
                .answer_question(&question, document_id.as_deref())
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("answer: {}", result.answer);
            println!(
                "confidence: {:.3} (context chunks used: {})",
                result.confidence_score, result.context_used
            );

            for source in &result.sources {
                let page = source
                    .page_number
                    .map(|page| page.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "[{}] similarity={:.3} page={} section={:?}",
                    source.rank, source.similarity, page, source.section_type
                );
                println!("  {}", source.text_preview);
            }

            if !result.success {
                std::process::exit(1);
            }
        }
        Command::Delete { document_id } => {
            coordinator
                .delete_document(&document_id)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("deleted indexed chunks for document {document_id}");
        }
    }

    Ok(())
}
