use crate::database::{IndexSpec, VectorStore};
use crate::document::{discover_documents, DocumentChunk};
use crate::embeddings::Embedder;
use crate::error::BootstrapError;
use anyhow::{Context, Result};
use log::{error, info};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// How often and how long to wait for a freshly created index
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        ReadinessPolicy {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The index already existed and was used as-is
    Reused,
    /// The index was created and `documents` files were ingested
    Created { documents: usize },
}

/// Make sure `index` exists, creating and filling it from `data_dir` when absent.
///
/// An existing index is reused untouched, even if files under `data_dir` changed.
pub async fn ensure_index(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    index: &str,
    data_dir: &Path,
    policy: ReadinessPolicy,
) -> Result<BootstrapOutcome> {
    if store.index_exists(index).await? {
        info!("Existing vector store found. Reusing it: '{}'", index);
        return Ok(BootstrapOutcome::Reused);
    }

    info!("Vector store index '{}' not found. Creating it...", index);
    store.create_index(&IndexSpec::for_documents(index)).await?;
    wait_until_ready(store, index, policy).await?;
    info!("Created vector store index '{}'. Adding documents...", index);

    let documents = ingest_folder(store, embedder, index, data_dir).await?;
    Ok(BootstrapOutcome::Created { documents })
}

/// Poll `is_ready` every `policy.interval` until it reports true or `policy.timeout` passes
pub async fn wait_until_ready(
    store: &dyn VectorStore,
    index: &str,
    policy: ReadinessPolicy,
) -> Result<()> {
    let started = Instant::now();

    loop {
        if store.is_ready(index).await? {
            return Ok(());
        }

        let waited = started.elapsed();
        if waited >= policy.timeout {
            return Err(BootstrapError::NotReady {
                index: index.to_string(),
                waited,
            }
            .into());
        }

        sleep(policy.interval.min(policy.timeout - waited)).await;
    }
}

/// Embed and upsert every supported file under `data_dir`, one whole file per chunk
pub async fn ingest_folder(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    index: &str,
    data_dir: &Path,
) -> Result<usize> {
    if !data_dir.exists() {
        error!("Data folder not found: '{}'", data_dir.display());
        return Ok(0);
    }

    let files = discover_documents(data_dir)?;
    info!("Found {} files to process", files.len());

    let mut chunks = Vec::with_capacity(files.len());
    for path in &files {
        info!("Processing file: '{}'", path.display());
        chunks.push(DocumentChunk::from_file(path)?);
    }

    let count = chunks.len();
    let embedded = embedder
        .embed_chunks(chunks)
        .await
        .context("Failed to embed documents")?;
    store.upsert(index, embedded).await?;

    Ok(count)
}
