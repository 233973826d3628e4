//! Embedding client: a provider seam plus the batching/timeout policy around it.

mod hashing;
mod openai;

pub use hashing::HashingEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;

use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use recall_chunker::Chunk;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A backend that turns a batch of texts into vectors, one per input, in order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier reported in logs
    fn model_id(&self) -> &str;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Which provider backs the embedder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Hashing,
}

/// Provider selection and connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Output dimension of the hashing provider
    pub dimension: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            model: openai::DEFAULT_MODEL.to_string(),
            base_url: openai::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            dimension: hashing::DEFAULT_DIMENSION,
        }
    }
}

/// Batching and timeout policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub provider: ProviderConfig,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            timeout_secs: 30,
            provider: ProviderConfig::default(),
        }
    }
}

impl EmbedderConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Batches texts, bounds every provider call with a timeout and rejects partial results.
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    timeout: Duration,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.provider.model_id())
            .field("batch_size", &self.batch_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, batch_size: usize, timeout: Duration) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            timeout,
        }
    }

    /// Build the configured provider and wrap it.
    pub fn from_config(config: &EmbedderConfig) -> Result<Self> {
        if config.batch_size == 0 {
            return Err(VectorStoreError::InvalidConfig(
                "embedding batch size must be positive".into(),
            ));
        }

        let provider: Arc<dyn EmbeddingProvider> = match config.provider.kind {
            ProviderKind::OpenAi => Arc::new(OpenAiEmbeddingProvider::new(&config.provider)?),
            ProviderKind::Hashing => {
                Arc::new(HashingEmbeddingProvider::new(config.provider.dimension)?)
            }
        };
        log::info!(
            "Embedding provider: {} (batch size {}, timeout {:?})",
            provider.model_id(),
            config.batch_size,
            config.timeout()
        );
        Ok(Self::new(provider, config.batch_size, config.timeout()))
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed `texts` in batches of `batch_size`.
    ///
    /// The first failing batch (error, timeout or wrong vector count) aborts the whole
    /// call; vectors from earlier batches are discarded.
    pub async fn create_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(VectorStoreError::EmptyInput("no texts to embed".into()));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            let embedded = tokio::time::timeout(self.timeout, self.provider.embed_batch(batch))
                .await
                .map_err(|_| VectorStoreError::Timeout(self.timeout))??;

            if embedded.len() != batch.len() {
                return Err(VectorStoreError::provider(format!(
                    "batch {batch_no}: expected {} embeddings, got {}",
                    batch.len(),
                    embedded.len()
                )));
            }
            log::debug!("Embedded batch {batch_no} ({} texts)", batch.len());
            vectors.extend(embedded);
        }
        Ok(vectors)
    }

    /// Embed a single text.
    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.create_embeddings(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| VectorStoreError::provider("provider returned no embedding"))
    }

    /// Fill in the embedding of every chunk. Nothing is assigned unless every batch
    /// succeeded.
    pub async fn embed_chunks(&self, chunks: &mut [Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.create_embeddings(&texts).await?;
        for (chunk, vector) in chunks.iter_mut().zip(vectors) {
            chunk.embedding = vector;
        }
        Ok(())
    }
}
