use crate::error::{Result, SearchError};
use recall_chunker::Chunk;
use recall_vector_store::{Embedder, RetrievalResult, StoreStats, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    /// Minimum cosine score a hit must reach
    pub similarity_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.7,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(SearchError::InvalidConfig("top_k must be positive".into()));
        }
        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            return Err(SearchError::InvalidConfig(format!(
                "similarity threshold {} is outside [-1, 1]",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Query-side entry point: embeds the query and ranks stored chunks against it.
#[derive(Debug, Clone)]
pub struct Retriever {
    store: VectorStore,
    embedder: Arc<Embedder>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(store: VectorStore, embedder: Arc<Embedder>, config: RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            embedder,
            config,
        })
    }

    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub const fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Top matches for `query` using the configured `top_k` and threshold.
    ///
    /// Embedding failures are returned as-is; no match is an empty result.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        self.retrieve_with(query, self.config.top_k, self.config.similarity_threshold)
            .await
    }

    pub async fn retrieve_with(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<RetrievalResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let embedding = self.embedder.create_embedding(query).await?;
        let store = self.store.clone();
        let results = tokio::task::spawn_blocking(move || store.search(&embedding, top_k, threshold))
            .await
            .map_err(|e| SearchError::Other(format!("search task failed: {e}")))??;

        log::debug!("Query {query:?}: {} results", results.len());
        Ok(results)
    }

    /// Embed whatever chunks still lack an embedding, then store them all.
    pub async fn index_chunks(&self, mut chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut pending: Vec<Chunk> = chunks.iter().filter(|c| !c.is_embedded()).cloned().collect();
        if !pending.is_empty() {
            self.embedder.embed_chunks(&mut pending).await?;
            let mut embedded = pending.into_iter();
            for chunk in chunks.iter_mut().filter(|c| !c.is_embedded()) {
                if let Some(done) = embedded.next() {
                    chunk.embedding = done.embedding;
                }
            }
        }

        let store = self.store.clone();
        let added = tokio::task::spawn_blocking(move || store.add_chunks(chunks))
            .await
            .map_err(|e| SearchError::Other(format!("store task failed: {e}")))??;
        Ok(added)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let store = self.store.clone();
        let stats = tokio::task::spawn_blocking(move || store.stats())
            .await
            .map_err(|e| SearchError::Other(format!("stats task failed: {e}")))??;
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_top_k_and_out_of_range_threshold() {
        let zero = RetrievalConfig {
            top_k: 0,
            ..Default::default()
        };
        assert!(matches!(zero.validate(), Err(SearchError::InvalidConfig(_))));

        let too_high = RetrievalConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(too_high.validate().is_err());
        assert!(RetrievalConfig::default().validate().is_ok());
    }
}
