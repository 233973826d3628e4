use crate::config::RecallConfig;
use anyhow::{Context, Result};
use recall_indexer::Indexer;
use recall_search::Retriever;
use recall_vector_store::{Embedder, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command needs, built once from a validated config.
pub struct App {
    pub config: RecallConfig,
    pub indexer: Arc<Indexer>,
    pub retriever: Retriever,
}

impl App {
    pub async fn build(config: RecallConfig) -> Result<Self> {
        config.validate()?;

        let embedder = Arc::new(
            Embedder::from_config(&config.embedding).context("creating embedding client")?,
        );

        let store_path = config.context.store_path.clone();
        let store = tokio::task::spawn_blocking(move || VectorStore::open(store_path))
            .await
            .context("store task panicked")?
            .with_context(|| {
                format!(
                    "opening vector store at {}",
                    config.context.store_path.display()
                )
            })?;

        let indexer = Arc::new(
            Indexer::new(config.indexer.clone(), embedder.clone()).context("creating indexer")?,
        );
        let retriever = Retriever::new(store, embedder, config.retrieval)?;

        Ok(Self {
            config,
            indexer,
            retriever,
        })
    }

    pub fn store(&self) -> &VectorStore {
        self.retriever.store()
    }

    /// The configured folder, resolved the same way the file watcher reports paths.
    pub fn folder(&self) -> Result<PathBuf> {
        let folder = &self.config.context.folder;
        folder
            .canonicalize()
            .with_context(|| format!("context folder {} is not accessible", folder.display()))
    }
}
