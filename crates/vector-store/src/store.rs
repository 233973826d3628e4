//! Durable chunk table with an in-memory mirror.
//!
//! # Tables
//!
//! - `chunks`: chunk id -> bincode `Chunk`
//! - `metadata`: key -> u64, holds `schema_version`
//!
//! Every mutation runs its redb write transaction and the mirror update under the
//! write side of one `RwLock`; searches score the mirror under the read side. The
//! mirror is rebuilt from a full table scan on open.

use crate::error::{Result, VectorStoreError};
use crate::similarity::cosine_similarity;
use recall_chunker::Chunk;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const CHUNKS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("chunks");
const METADATA_TABLE: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const SCHEMA_VERSION: u64 = 1;

/// A scored search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub chunk: Chunk,
    pub score: f32,
    pub document_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Outcome of [`VectorStore::replace_document`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub removed: usize,
    pub added: usize,
}

struct Inner {
    db: Database,
    path: PathBuf,
    mirror: RwLock<BTreeMap<String, Chunk>>,
}

/// Cheaply cloneable handle to one store file.
///
/// Methods block on redb I/O; async callers should go through `spawn_blocking`.
#[derive(Clone)]
pub struct VectorStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open (or create) the store at `path` and load every chunk into the mirror.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(&path)
            .map_err(|e| VectorStoreError::database("Failed to open database", e))?;
        ensure_schema(&db)?;
        let mirror = load_mirror(&db)?;
        log::info!(
            "Opened vector store {} ({} chunks)",
            path.display(),
            mirror.len()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                db,
                path,
                mirror: RwLock::new(mirror),
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Upsert chunks by id in one transaction. Chunks without an id get the derived one.
    pub fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<usize> {
        let chunks = with_ids(chunks);
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut mirror = self.write_mirror()?;
        let txn = self.begin_write()?;
        {
            let mut table = txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| VectorStoreError::database("Failed to open chunks table", e))?;
            for chunk in &chunks {
                put_chunk(&mut table, chunk)?;
            }
        }
        commit(txn)?;

        let added = chunks.len();
        for chunk in chunks {
            mirror.insert(chunk.id.clone(), chunk);
        }
        log::debug!("Stored {added} chunks");
        Ok(added)
    }

    /// Swap a document's chunks in a single transaction.
    ///
    /// Removes every chunk belonging to `previous_document_id` and to the document
    /// ids carried by `chunks`, then inserts `chunks`. Readers see either the old
    /// set or the new one.
    pub fn replace_document(
        &self,
        previous_document_id: Option<&str>,
        chunks: Vec<Chunk>,
    ) -> Result<ReplaceSummary> {
        let chunks = with_ids(chunks);
        let mut doc_ids: BTreeSet<&str> = chunks.iter().map(|c| c.document_id.as_str()).collect();
        doc_ids.extend(previous_document_id);

        let mut mirror = self.write_mirror()?;
        let stale: Vec<String> = mirror
            .values()
            .filter(|c| doc_ids.contains(c.document_id.as_str()))
            .map(|c| c.id.clone())
            .collect();

        let txn = self.begin_write()?;
        {
            let mut table = txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| VectorStoreError::database("Failed to open chunks table", e))?;
            for id in &stale {
                table
                    .remove(id.as_str())
                    .map_err(|e| VectorStoreError::database("Failed to remove chunk", e))?;
            }
            for chunk in &chunks {
                put_chunk(&mut table, chunk)?;
            }
        }
        commit(txn)?;

        for id in &stale {
            mirror.remove(id);
        }
        let summary = ReplaceSummary {
            removed: stale.len(),
            added: chunks.len(),
        };
        for chunk in chunks {
            mirror.insert(chunk.id.clone(), chunk);
        }
        log::debug!(
            "Replaced document chunks: {} removed, {} added",
            summary.removed,
            summary.added
        );
        Ok(summary)
    }

    /// Remove every chunk of a document; returns how many were removed.
    pub fn delete_by_document_id(&self, document_id: &str) -> Result<usize> {
        let mut mirror = self.write_mirror()?;
        let ids: Vec<String> = mirror
            .values()
            .filter(|c| c.document_id == document_id)
            .map(|c| c.id.clone())
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        let txn = self.begin_write()?;
        {
            let mut table = txn
                .open_table(CHUNKS_TABLE)
                .map_err(|e| VectorStoreError::database("Failed to open chunks table", e))?;
            for id in &ids {
                table
                    .remove(id.as_str())
                    .map_err(|e| VectorStoreError::database("Failed to remove chunk", e))?;
            }
        }
        commit(txn)?;

        for id in &ids {
            mirror.remove(id);
        }
        log::debug!("Deleted {} chunks of document {document_id}", ids.len());
        Ok(ids.len())
    }

    /// Score every embedded chunk against `query`.
    ///
    /// Keeps hits with `score >= threshold`, best first, at most `top_k`. Equal scores
    /// keep chunk-id order.
    pub fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Result<Vec<RetrievalResult>> {
        if query.is_empty() {
            return Err(VectorStoreError::EmptyInput("query embedding is empty".into()));
        }
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mirror = self.read_mirror()?;
        let mut hits: Vec<(f32, &Chunk)> = mirror
            .values()
            .filter(|c| c.is_embedded())
            .map(|c| (cosine_similarity(query, &c.embedding), c))
            .filter(|(score, _)| *score >= threshold)
            .collect();
        hits.sort_by(|a, b| b.0.total_cmp(&a.0));
        hits.truncate(top_k);

        Ok(hits
            .into_iter()
            .map(|(score, chunk)| RetrievalResult {
                document_id: chunk.document_id.clone(),
                chunk: chunk.clone(),
                score,
            })
            .collect())
    }

    pub fn get(&self, chunk_id: &str) -> Result<Option<Chunk>> {
        Ok(self.read_mirror()?.get(chunk_id).cloned())
    }

    pub fn chunks_for_document(&self, document_id: &str) -> Result<Vec<Chunk>> {
        Ok(self
            .read_mirror()?
            .values()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }

    /// Distinct document ids currently stored.
    pub fn document_ids(&self) -> Result<BTreeSet<String>> {
        Ok(self
            .read_mirror()?
            .values()
            .map(|c| c.document_id.clone())
            .collect())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let mirror = self.read_mirror()?;
        let documents: BTreeSet<&str> = mirror.values().map(|c| c.document_id.as_str()).collect();
        Ok(StoreStats {
            documents: documents.len(),
            chunks: mirror.len(),
        })
    }

    fn read_mirror(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Chunk>>> {
        self.inner
            .mirror
            .read()
            .map_err(|_| VectorStoreError::LockPoisoned)
    }

    fn write_mirror(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Chunk>>> {
        self.inner
            .mirror
            .write()
            .map_err(|_| VectorStoreError::LockPoisoned)
    }

    fn begin_write(&self) -> Result<redb::WriteTransaction> {
        self.inner
            .db
            .begin_write()
            .map_err(|e| VectorStoreError::database("Failed to begin write transaction", e))
    }
}

fn with_ids(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    for chunk in &mut chunks {
        chunk.ensure_id();
    }
    chunks
}

fn put_chunk(table: &mut redb::Table<'_, &'static str, &'static [u8]>, chunk: &Chunk) -> Result<()> {
    let bytes = bincode::serialize(chunk)?;
    table
        .insert(chunk.id.as_str(), bytes.as_slice())
        .map_err(|e| VectorStoreError::database("Failed to insert chunk", e))?;
    Ok(())
}

fn commit(txn: redb::WriteTransaction) -> Result<()> {
    txn.commit()
        .map_err(|e| VectorStoreError::database("Failed to commit transaction", e))
}

fn ensure_schema(db: &Database) -> Result<()> {
    let txn = db
        .begin_write()
        .map_err(|e| VectorStoreError::database("Failed to begin write transaction", e))?;
    {
        txn.open_table(CHUNKS_TABLE)
            .map_err(|e| VectorStoreError::database("Failed to create chunks table", e))?;
        let mut meta = txn
            .open_table(METADATA_TABLE)
            .map_err(|e| VectorStoreError::database("Failed to create metadata table", e))?;

        let existing = meta
            .get(SCHEMA_VERSION_KEY)
            .map_err(|e| VectorStoreError::database("Failed to read schema version", e))?
            .map(|v| v.value());
        match existing {
            Some(version) if version != SCHEMA_VERSION => {
                return Err(VectorStoreError::DatabaseError(format!(
                    "unsupported schema version {version} (expected {SCHEMA_VERSION})"
                )));
            }
            Some(_) => {}
            None => {
                meta.insert(SCHEMA_VERSION_KEY, SCHEMA_VERSION)
                    .map_err(|e| VectorStoreError::database("Failed to write schema version", e))?;
            }
        }
    }
    commit(txn)
}

fn load_mirror(db: &Database) -> Result<BTreeMap<String, Chunk>> {
    let txn = db
        .begin_read()
        .map_err(|e| VectorStoreError::database("Failed to begin read transaction", e))?;
    let table = txn
        .open_table(CHUNKS_TABLE)
        .map_err(|e| VectorStoreError::database("Failed to open chunks table", e))?;

    let mut mirror = BTreeMap::new();
    for entry in table
        .iter()
        .map_err(|e| VectorStoreError::database("Failed to scan chunks", e))?
    {
        let (key, value) =
            entry.map_err(|e| VectorStoreError::database("Failed to read chunk", e))?;
        let chunk: Chunk = bincode::deserialize(value.value())?;
        mirror.insert(key.value().to_string(), chunk);
    }
    Ok(mirror)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn chunk(doc: &str, index: usize, embedding: Vec<f32>) -> Chunk {
        let mut chunk = Chunk::new(doc, format!("{doc}.txt"), index, format!("{doc} #{index}"));
        chunk.embedding = embedding;
        chunk
    }

    fn open(dir: &TempDir) -> VectorStore {
        VectorStore::open(dir.path().join("vectors.redb")).expect("open store")
    }

    #[test]
    fn add_is_an_idempotent_upsert() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);

        store
            .add_chunks(vec![chunk("a", 0, vec![1.0, 0.0]), chunk("a", 1, vec![0.0, 1.0])])
            .expect("add");
        store
            .add_chunks(vec![chunk("a", 0, vec![1.0, 0.0])])
            .expect("re-add");

        assert_eq!(
            store.stats().expect("stats"),
            StoreStats {
                documents: 1,
                chunks: 2
            }
        );
    }

    #[test]
    fn search_orders_by_score_and_respects_top_k() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        store
            .add_chunks(vec![
                chunk("a", 0, vec![1.0, 0.0]),
                chunk("b", 0, vec![0.6, 0.8]),
                chunk("c", 0, vec![0.0, 1.0]),
                chunk("d", 0, Vec::new()),
            ])
            .expect("add");

        let hits = store.search(&[1.0, 0.0], 2, -1.0).expect("search");
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["a_0", "b_0"]);
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].document_id, "a");
    }

    #[test]
    fn unembedded_chunks_are_never_returned() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        store.add_chunks(vec![chunk("d", 0, Vec::new())]).expect("add");
        assert!(store.search(&[1.0], 10, -1.0).expect("search").is_empty());
    }

    #[test]
    fn raising_the_threshold_never_adds_results() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        let chunks = (0..12)
            .map(|i| {
                let angle = i as f32 * 0.25;
                chunk(&format!("doc{i}"), 0, vec![angle.cos(), angle.sin()])
            })
            .collect();
        store.add_chunks(chunks).expect("add");

        let mut previous: Option<Vec<String>> = None;
        for threshold in [-1.0, -0.5, 0.0, 0.3, 0.6, 0.9, 1.0] {
            let ids: Vec<String> = store
                .search(&[1.0, 0.0], 100, threshold)
                .expect("search")
                .into_iter()
                .map(|h| {
                    assert!(h.score >= threshold);
                    h.chunk.id
                })
                .collect();
            if let Some(prev) = &previous {
                assert!(ids.iter().all(|id| prev.contains(id)));
            }
            previous = Some(ids);
        }
    }

    #[test]
    fn equal_scores_keep_id_order() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        store
            .add_chunks(vec![
                chunk("b", 0, vec![1.0, 0.0]),
                chunk("a", 0, vec![2.0, 0.0]),
                chunk("c", 0, vec![3.0, 0.0]),
            ])
            .expect("add");

        let ids: Vec<String> = store
            .search(&[1.0, 0.0], 3, 0.0)
            .expect("search")
            .into_iter()
            .map(|h| h.chunk.id)
            .collect();
        assert_eq!(ids, vec!["a_0", "b_0", "c_0"]);
    }

    #[test]
    fn delete_removes_every_chunk_of_a_document() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        store
            .add_chunks(vec![
                chunk("a", 0, vec![1.0]),
                chunk("a", 1, vec![1.0]),
                chunk("b", 0, vec![1.0]),
            ])
            .expect("add");

        assert_eq!(store.delete_by_document_id("a").expect("delete"), 2);
        assert_eq!(store.delete_by_document_id("a").expect("delete again"), 0);
        let hits = store.search(&[1.0], 10, -1.0).expect("search");
        assert!(hits.iter().all(|h| h.document_id != "a"));
        assert_eq!(store.stats().expect("stats").chunks, 1);
    }

    #[test]
    fn replace_document_swaps_versions() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        store
            .add_chunks(vec![chunk("old", 0, vec![1.0]), chunk("old", 1, vec![1.0])])
            .expect("add");

        let summary = store
            .replace_document(Some("old"), vec![chunk("new", 0, vec![1.0])])
            .expect("replace");

        assert_eq!(
            summary,
            ReplaceSummary {
                removed: 2,
                added: 1
            }
        );
        assert!(store.chunks_for_document("old").expect("old").is_empty());
        assert_eq!(store.chunks_for_document("new").expect("new").len(), 1);
    }

    #[test]
    fn reopening_rebuilds_the_mirror_from_disk() {
        let dir = TempDir::new().expect("tempdir");
        {
            let store = open(&dir);
            store
                .add_chunks(vec![chunk("a", 0, vec![0.5, 0.5]), chunk("b", 0, vec![1.0, 0.0])])
                .expect("add");
            store.delete_by_document_id("b").expect("delete");
        }

        let store = open(&dir);
        assert_eq!(
            store.stats().expect("stats"),
            StoreStats {
                documents: 1,
                chunks: 1
            }
        );
        let restored = store.get("a_0").expect("get").expect("chunk a_0");
        assert_eq!(restored.embedding, vec![0.5, 0.5]);
    }

    #[test]
    fn concurrent_searches_see_whole_versions_only() {
        const VERSIONS: usize = 40;
        const PER_VERSION: usize = 3;
        const PER_BATCH: usize = 4;

        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        let version = |n: usize| -> Vec<Chunk> {
            (0..PER_VERSION)
                .map(|i| chunk(&format!("v{n}"), i, vec![1.0, i as f32]))
                .collect()
        };
        store.add_chunks(version(0)).expect("seed");

        std::thread::scope(|scope| {
            let replacer = store.clone();
            scope.spawn(move || {
                for n in 1..=VERSIONS {
                    replacer
                        .replace_document(Some(format!("v{}", n - 1).as_str()), version(n))
                        .expect("replace");
                }
            });
            let adder = store.clone();
            scope.spawn(move || {
                for n in 0..VERSIONS {
                    let batch = (0..PER_BATCH)
                        .map(|i| chunk(&format!("batch{n}"), i, vec![1.0, 1.0]))
                        .collect();
                    adder.add_chunks(batch).expect("add");
                }
            });

            for _ in 0..2 {
                let reader = store.clone();
                scope.spawn(move || {
                    for _ in 0..200 {
                        let hits = reader.search(&[1.0, 0.5], 10_000, -1.0).expect("search");
                        let mut per_doc: BTreeMap<&str, usize> = BTreeMap::new();
                        for hit in &hits {
                            *per_doc.entry(hit.document_id.as_str()).or_default() += 1;
                        }
                        let versions: Vec<_> =
                            per_doc.keys().filter(|id| id.starts_with('v')).collect();
                        assert_eq!(versions.len(), 1, "saw {versions:?}");
                        for (id, count) in &per_doc {
                            let expected = if id.starts_with('v') { PER_VERSION } else { PER_BATCH };
                            assert_eq!(*count, expected, "partial document {id}");
                        }
                    }
                });
            }
        });

        let ids = store.document_ids().expect("ids");
        assert!(ids.contains(&format!("v{VERSIONS}")));
        assert_eq!(ids.len(), VERSIONS + 1);
    }

    #[test]
    fn empty_query_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let store = open(&dir);
        assert!(matches!(
            store.search(&[], 5, 0.0),
            Err(VectorStoreError::EmptyInput(_))
        ));
    }
}
