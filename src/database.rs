use crate::document::DocumentChunk;
use crate::embeddings::{EmbeddedChunk, Embedding, EMBEDDING_DIMENSION};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use qdrant_client::qdrant::{
    CollectionStatus, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value, VectorParams,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Similarity metric of a vector index. Documents are only ever compared by cosine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
}

impl From<Metric> for Distance {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Cosine => Distance::Cosine,
        }
    }
}

/// Shape of a vector index to create
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: u64,
    pub metric: Metric,
}

impl IndexSpec {
    /// The schema documents are stored under: 384-dim cosine vectors
    pub fn for_documents(name: impl Into<String>) -> Self {
        IndexSpec {
            name: name.into(),
            dimension: EMBEDDING_DIMENSION as u64,
            metric: Metric::Cosine,
        }
    }
}

/// External vector database keyed by index name
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> Result<bool>;

    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Whether the index can accept writes and queries yet
    async fn is_ready(&self, index: &str) -> Result<bool>;

    async fn upsert(&self, index: &str, chunks: Vec<EmbeddedChunk>) -> Result<()>;

    /// Nearest chunks to `query`, most similar first, at most `limit`
    async fn search(&self, index: &str, query: &Embedding, limit: u64)
        -> Result<Vec<DocumentChunk>>;
}

/// Configuration for Qdrant
#[derive(Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
}

impl std::fmt::Debug for QdrantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QdrantConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// `VectorStore` backed by Qdrant, one collection per index
pub struct QdrantClient {
    client: Qdrant,
}

impl QdrantClient {
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let QdrantConfig { url, api_key } = config;

        let client = Qdrant::from_url(&url)
            .api_key(api_key)
            .build()
            .with_context(|| format!("Invalid Qdrant endpoint {}", url))?;

        Ok(QdrantClient { client })
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn index_exists(&self, index: &str) -> Result<bool> {
        self.client
            .collection_exists(index)
            .await
            .with_context(|| format!("Failed to look up collection {}", index))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let create_collection =
            CreateCollectionBuilder::new(spec.name.clone()).vectors_config(VectorParams {
                size: spec.dimension,
                distance: Distance::from(spec.metric).into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .with_context(|| format!("Failed to create collection {}", spec.name))?;

        Ok(())
    }

    async fn is_ready(&self, index: &str) -> Result<bool> {
        let info = self
            .client
            .collection_info(index)
            .await
            .with_context(|| format!("Failed to describe collection {}", index))?;

        Ok(info
            .result
            .map(|r| r.status == CollectionStatus::Green as i32)
            .unwrap_or(false))
    }

    async fn upsert(&self, index: &str, chunks: Vec<EmbeddedChunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let points = chunks
            .into_iter()
            .map(|embedded| -> Result<PointStruct> {
                let payload = Payload::try_from(json!({
                    "text": embedded.chunk.text,
                    "source": embedded.chunk.source,
                }))
                .context("Failed to build point payload")?;

                Ok(PointStruct::new(
                    point_id(&embedded.chunk.source),
                    embedded.embedding.values,
                    payload,
                ))
            })
            .collect::<Result<Vec<PointStruct>>>()?;

        debug!("Upserting {} points into {}", points.len(), index);

        self.client
            .upsert_points(UpsertPointsBuilder::new(index, points).wait(true))
            .await
            .with_context(|| format!("Failed to upsert points in collection {}", index))?;

        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        query: &Embedding,
        limit: u64,
    ) -> Result<Vec<DocumentChunk>> {
        let hits = self
            .client
            .search_points(
                SearchPointsBuilder::new(index, query.values.clone(), limit).with_payload(true),
            )
            .await
            .with_context(|| format!("Failed to search collection {}", index))?
            .result;

        // Results arrive best match first; points without text are skipped
        Ok(hits
            .iter()
            .filter_map(|point| chunk_from_payload(&point.payload))
            .collect())
    }
}

/// Stable point id derived from the document path, so re-ingesting replaces in place
fn point_id(source: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, source.as_bytes()).to_string()
}

fn chunk_from_payload(payload: &HashMap<String, Value>) -> Option<DocumentChunk> {
    let text = payload.get("text")?.as_str()?;
    let source = payload
        .get("source")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_default();

    Some(DocumentChunk::new(source, text.to_string()))
}
