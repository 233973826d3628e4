use crate::cache::IndexCache;
use crate::error::{IndexerError, Result};
use crate::hash::file_hash;
use crate::parser::{normalized_extension, ParserRegistry};
use recall_chunker::{Chunk, Chunker, ChunkerConfig, Document};
use recall_vector_store::Embedder;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Instant, SystemTime};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Extension allow-list, e.g. `".pdf"`; matching is case-insensitive
    pub supported_extensions: Vec<String>,
    pub chunking: ChunkerConfig,
    pub cache_dir: PathBuf,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            supported_extensions: vec![".pdf".into(), ".txt".into(), ".md".into()],
            chunking: ChunkerConfig::default(),
            cache_dir: PathBuf::from(".recall/cache"),
        }
    }
}

/// What changed for one path, as seen by a forced refresh
#[derive(Debug, Clone, PartialEq)]
pub enum IndexUpdate {
    Reindexed {
        path: PathBuf,
        /// Document id the path had before this refresh, if it was known
        previous_document_id: Option<String>,
        chunks: Vec<Chunk>,
    },
    Removed {
        path: PathBuf,
        document_id: Option<String>,
    },
}

impl IndexUpdate {
    pub fn path(&self) -> &Path {
        match self {
            Self::Reindexed { path, .. } | Self::Removed { path, .. } => path,
        }
    }
}

/// Decides per file whether cached chunks are still valid, and rebuilds them when not.
pub struct Indexer {
    extensions: HashSet<String>,
    parser: ParserRegistry,
    chunker: Chunker,
    embedder: Arc<Embedder>,
    cache: Arc<IndexCache>,
    documents: RwLock<HashMap<PathBuf, Document>>,
}

impl Indexer {
    pub fn new(config: IndexerConfig, embedder: Arc<Embedder>) -> Result<Self> {
        Self::with_parser(config, ParserRegistry::with_defaults(), embedder)
    }

    /// Build an indexer around a custom parser registry.
    pub fn with_parser(
        config: IndexerConfig,
        parser: ParserRegistry,
        embedder: Arc<Embedder>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunking.clone())?;
        let cache = IndexCache::new(&config.cache_dir)?;
        let extensions = config
            .supported_extensions
            .iter()
            .map(|ext| format!(".{}", ext.trim().trim_start_matches('.').to_lowercase()))
            .collect();

        Ok(Self {
            extensions,
            parser,
            chunker,
            embedder,
            cache: Arc::new(cache),
            documents: RwLock::new(HashMap::new()),
        })
    }

    /// Whether `path` carries an allow-listed extension.
    pub fn is_supported(&self, path: &Path) -> bool {
        normalized_extension(path).is_some_and(|ext| self.extensions.contains(&ext))
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// The document last indexed for `path` in this process.
    pub fn document(&self, path: &Path) -> Option<Document> {
        self.documents
            .read()
            .ok()
            .and_then(|docs| docs.get(path).cloned())
    }

    /// Drop the in-process record for `path`.
    pub fn forget(&self, path: &Path) -> Option<Document> {
        self.documents
            .write()
            .ok()
            .and_then(|mut docs| docs.remove(path))
    }

    /// Index one file and return its embedded chunks.
    ///
    /// Unless `force_reindex`, cached chunks are returned when the file's hash still
    /// matches and its mtime has not advanced; otherwise the file is parsed, chunked
    /// and embedded again. An embedding failure aborts before anything is cached.
    pub async fn index_file(&self, path: impl AsRef<Path>, force_reindex: bool) -> Result<Vec<Chunk>> {
        let path = path.as_ref();
        if !self.is_supported(path) {
            return Err(IndexerError::UnsupportedFormat(path.display().to_string()));
        }

        if !force_reindex {
            if let Some(chunks) = self.cached_chunks(path).await? {
                log::debug!("Cache hit for {}", path.display());
                return Ok(chunks);
            }
        }
        self.rebuild(path).await
    }

    /// Index every allow-listed file below `root`.
    ///
    /// Files that fail are logged and left out of the result.
    pub async fn index_directory(&self, root: impl AsRef<Path>) -> Result<BTreeMap<PathBuf, Vec<Chunk>>> {
        self.walk(root.as_ref(), false).await
    }

    /// Like [`Indexer::index_directory`], but every file is reprocessed.
    pub async fn rebuild_directory(&self, root: impl AsRef<Path>) -> Result<BTreeMap<PathBuf, Vec<Chunk>>> {
        self.walk(root.as_ref(), true).await
    }

    async fn walk(&self, root: &Path, force_reindex: bool) -> Result<BTreeMap<PathBuf, Vec<Chunk>>> {
        if !root.is_dir() {
            return Err(IndexerError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }

        log::info!("Indexing directory {}", root.display());
        let start = Instant::now();
        let mut indexed = BTreeMap::new();
        let mut failed = 0_usize;

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.is_supported(entry.path()) {
                continue;
            }

            let path = entry.into_path();
            match self.index_file(&path, force_reindex).await {
                Ok(chunks) => {
                    indexed.insert(path, chunks);
                }
                Err(e) => {
                    failed += 1;
                    log::warn!("Failed to index {}: {e}", path.display());
                }
            }
        }

        log::info!(
            "Indexed {} files ({} failed) in {:?}",
            indexed.len(),
            failed,
            start.elapsed()
        );
        Ok(indexed)
    }

    /// Forced reindex of `path`, reporting the superseded document id. A path that no
    /// longer exists is forgotten and reported as removed.
    pub async fn refresh_file(&self, path: impl AsRef<Path>) -> Result<IndexUpdate> {
        let path = path.as_ref();
        let previous_document_id = self.document(path).map(|doc| doc.id);

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            self.forget(path);
            return Ok(IndexUpdate::Removed {
                path: path.to_path_buf(),
                document_id: self.unshared(previous_document_id),
            });
        }

        let chunks = self.index_file(path, true).await?;
        Ok(IndexUpdate::Reindexed {
            path: path.to_path_buf(),
            previous_document_id: self.unshared(previous_document_id),
            chunks,
        })
    }

    /// `document_id` unless another indexed path still holds the same content; shared
    /// chunks must outlive any single path.
    fn unshared(&self, document_id: Option<String>) -> Option<String> {
        let id = document_id?;
        let shared = self
            .documents
            .read()
            .map(|docs| docs.values().any(|doc| doc.id == id))
            .unwrap_or(false);
        if shared {
            log::debug!("Document {id} is still referenced by another path");
            None
        } else {
            Some(id)
        }
    }

    async fn cached_chunks(&self, path: &Path) -> Result<Option<Vec<Chunk>>> {
        let known = self.document(path);
        let cache = Arc::clone(&self.cache);
        let owned = path.to_path_buf();

        let hit = tokio::task::spawn_blocking(move || -> Result<Option<(Document, Vec<Chunk>)>> {
            let current_hash = file_hash(&owned)?;
            let mod_time = std::fs::metadata(&owned)?.modified()?;

            let Some(mut doc) = known.or_else(|| cache.load_document(&current_hash)) else {
                return Ok(None);
            };
            if !is_unchanged(&doc, &current_hash, mod_time) {
                log::debug!("Change detected for {}", owned.display());
                return Ok(None);
            }
            let Some(mut chunks) = cache.load_chunks(&doc.hash) else {
                return Ok(None);
            };

            for chunk in &mut chunks {
                chunk.metadata.source.clone_from(&owned);
            }
            doc.file_path = owned;
            Ok(Some((doc, chunks)))
        })
        .await
        .map_err(IndexerError::join)??;

        Ok(hit.map(|(doc, chunks)| {
            self.record(path, doc);
            chunks
        }))
    }

    async fn rebuild(&self, path: &Path) -> Result<Vec<Chunk>> {
        let doc = self.parser.parse_document(path).await?;
        let mut chunks = self.chunker.chunk_document(&doc)?;
        self.embedder.embed_chunks(&mut chunks).await?;

        let cache = Arc::clone(&self.cache);
        let (cached_doc, cached_chunks) = (doc.clone(), chunks.clone());
        match tokio::task::spawn_blocking(move || cache.store(&cached_doc, &cached_chunks)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Failed to cache {}: {e}", path.display()),
            Err(e) => log::warn!("Cache write task for {} failed: {e}", path.display()),
        }

        log::info!(
            "Indexed {} ({} chunks, document {})",
            path.display(),
            chunks.len(),
            doc.id
        );
        self.record(path, doc);
        Ok(chunks)
    }

    fn record(&self, path: &Path, doc: Document) {
        match self.documents.write() {
            Ok(mut docs) => {
                docs.insert(path.to_path_buf(), doc);
            }
            Err(_) => log::error!("Document map lock poisoned; {} not recorded", path.display()),
        }
    }
}

/// Unchanged only if the hash matches AND the mtime has not advanced.
fn is_unchanged(cached: &Document, current_hash: &str, mod_time: SystemTime) -> bool {
    cached.hash == current_hash && mod_time <= cached.file_mod_time
}
