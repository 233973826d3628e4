//! Applying indexer output to the vector store off the async threads.

use crate::error::{IndexerError, Result};
use crate::indexer::IndexUpdate;
use recall_chunker::Chunk;
use recall_vector_store::{ReplaceSummary, VectorStore};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Outcome of [`sync_directory`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectorySync {
    pub files: usize,
    pub chunks: usize,
    /// Stored documents that no indexed file produces any more
    pub pruned_documents: usize,
}

/// Absorb one watcher update: a reindexed file replaces its previous chunks, a removed
/// file loses them.
pub async fn apply_update(store: &VectorStore, update: IndexUpdate) -> Result<ReplaceSummary> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || -> Result<ReplaceSummary> {
        let summary = match update {
            IndexUpdate::Reindexed {
                path,
                previous_document_id,
                chunks,
            } => {
                let summary = store.replace_document(previous_document_id.as_deref(), chunks)?;
                log::info!(
                    "Updated {}: {} chunks removed, {} added",
                    path.display(),
                    summary.removed,
                    summary.added
                );
                summary
            }
            IndexUpdate::Removed {
                path,
                document_id: Some(document_id),
            } => {
                let removed = store.delete_by_document_id(&document_id)?;
                log::info!("Removed {} ({removed} chunks)", path.display());
                ReplaceSummary { removed, added: 0 }
            }
            IndexUpdate::Removed {
                path,
                document_id: None,
            } => {
                log::debug!("Removed {} was never indexed", path.display());
                ReplaceSummary::default()
            }
        };
        Ok(summary)
    })
    .await
    .map_err(IndexerError::join)?
}

/// Upsert already-embedded chunks.
pub async fn store_chunks(store: &VectorStore, chunks: Vec<Chunk>) -> Result<usize> {
    let store = store.clone();
    let added = tokio::task::spawn_blocking(move || store.add_chunks(chunks))
        .await
        .map_err(IndexerError::join)??;
    Ok(added)
}

/// Make the store mirror a directory scan: each file's chunks replace whatever the
/// store held for that document, and documents absent from the scan are deleted.
pub async fn sync_directory(
    store: &VectorStore,
    indexed: BTreeMap<PathBuf, Vec<Chunk>>,
) -> Result<DirectorySync> {
    let store = store.clone();
    tokio::task::spawn_blocking(move || -> Result<DirectorySync> {
        let mut sync = DirectorySync {
            files: indexed.len(),
            ..Default::default()
        };
        let mut live = BTreeSet::new();

        for chunks in indexed.into_values() {
            live.extend(chunks.iter().map(|c| c.document_id.clone()));
            sync.chunks += store.replace_document(None, chunks)?.added;
        }
        for stale in store.document_ids()?.difference(&live) {
            store.delete_by_document_id(stale)?;
            sync.pruned_documents += 1;
        }

        if sync.pruned_documents > 0 {
            log::info!("Pruned {} stale documents", sync.pruned_documents);
        }
        Ok(sync)
    })
    .await
    .map_err(IndexerError::join)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn chunk(doc: &str, index: usize) -> Chunk {
        let mut chunk = Chunk::new(doc, "notes.txt", index, format!("{doc} {index}"));
        chunk.embedding = vec![1.0, 0.0];
        chunk
    }

    #[tokio::test]
    async fn reindex_replaces_the_previous_version() {
        let dir = TempDir::new().expect("tempdir");
        let store = VectorStore::open(dir.path().join("v.redb")).expect("store");
        store_chunks(&store, vec![chunk("v1", 0), chunk("v1", 1)])
            .await
            .expect("seed");

        let summary = apply_update(
            &store,
            IndexUpdate::Reindexed {
                path: PathBuf::from("notes.txt"),
                previous_document_id: Some("v1".into()),
                chunks: vec![chunk("v2", 0)],
            },
        )
        .await
        .expect("apply");

        assert_eq!(summary, ReplaceSummary { removed: 2, added: 1 });
        let hits = store.search(&[1.0, 0.0], 10, 0.0).expect("search");
        assert!(hits.iter().all(|h| h.document_id == "v2"));
    }

    #[tokio::test]
    async fn directory_sync_prunes_documents_missing_from_the_scan() {
        let dir = TempDir::new().expect("tempdir");
        let store = VectorStore::open(dir.path().join("v.redb")).expect("store");
        store_chunks(&store, vec![chunk("deleted", 0), chunk("kept", 0)])
            .await
            .expect("seed");

        let mut indexed = BTreeMap::new();
        indexed.insert(PathBuf::from("kept.txt"), vec![chunk("kept", 0), chunk("kept", 1)]);
        indexed.insert(PathBuf::from("new.txt"), vec![chunk("new", 0)]);

        let sync = sync_directory(&store, indexed).await.expect("sync");

        assert_eq!(
            sync,
            DirectorySync {
                files: 2,
                chunks: 3,
                pruned_documents: 1
            }
        );
        let ids: Vec<String> = store.document_ids().expect("ids").into_iter().collect();
        assert_eq!(ids, vec!["kept", "new"]);
    }

    #[tokio::test]
    async fn removal_deletes_document_chunks() {
        let dir = TempDir::new().expect("tempdir");
        let store = VectorStore::open(dir.path().join("v.redb")).expect("store");
        store_chunks(&store, vec![chunk("gone", 0), chunk("kept", 0)])
            .await
            .expect("seed");

        apply_update(
            &store,
            IndexUpdate::Removed {
                path: PathBuf::from("gone.txt"),
                document_id: Some("gone".into()),
            },
        )
        .await
        .expect("apply");

        let stats = store.stats().expect("stats");
        assert_eq!((stats.documents, stats.chunks), (1, 1));
    }
}
