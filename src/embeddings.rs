use crate::document::DocumentChunk;
use crate::error::EmbeddingError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Vector size used at ingestion and at query time. Both sides must agree.
pub const EMBEDDING_DIMENSION: usize = 384;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Wrap raw model output, rejecting vectors of the wrong size
    pub fn checked(values: Vec<f32>) -> Result<Self, EmbeddingError> {
        if values.len() != EMBEDDING_DIMENSION {
            return Err(EmbeddingError::DimensionMismatch {
                expected: EMBEDDING_DIMENSION,
                actual: values.len(),
            });
        }
        Ok(Embedding { values })
    }
}

/// A document chunk paired with its embedding, ready to be upserted
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub embedding: Embedding,
}

/// Turns text into fixed-size vectors
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;

    /// Embed every chunk in order, one request per chunk
    async fn embed_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<Vec<EmbeddedChunk>> {
        let mut embedded = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let embedding = self.embed(&chunk.text).await?;
            embedded.push(EmbeddedChunk { chunk, embedding });
        }

        Ok(embedded)
    }
}
