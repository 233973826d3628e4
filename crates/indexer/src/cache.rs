//! Content-addressed on-disk cache of parsed documents and embedded chunks.
//!
//! One file pair per content hash: `<hash>.doc` and `<hash>.chunks`, each a bincode
//! envelope carrying [`CACHE_SCHEMA_VERSION`]. Anything unreadable or from another
//! schema version is a miss.

use crate::error::Result;
use log::debug;
use recall_chunker::{Chunk, Document};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub const CACHE_SCHEMA_VERSION: u32 = 1;

const DOC_EXT: &str = "doc";
const CHUNKS_EXT: &str = "chunks";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    schema_version: u32,
    payload: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct IndexCache {
    dir: PathBuf,
}

impl IndexCache {
    /// Use `dir` as the cache root, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn document_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{DOC_EXT}"))
    }

    pub fn chunks_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{hash}.{CHUNKS_EXT}"))
    }

    pub fn load_document(&self, hash: &str) -> Option<Document> {
        read_envelope(&self.document_path(hash))
    }

    pub fn load_chunks(&self, hash: &str) -> Option<Vec<Chunk>> {
        read_envelope(&self.chunks_path(hash))
    }

    /// Persist chunks, then the document, each through a temp file and rename.
    ///
    /// A `.doc` file therefore never exists without the matching `.chunks` file
    /// having been written first.
    pub fn store(&self, doc: &Document, chunks: &[Chunk]) -> Result<()> {
        write_envelope(&self.chunks_path(&doc.hash), &chunks)?;
        write_envelope(&self.document_path(&doc.hash), doc)?;
        debug!(
            "Cached {} chunks for {} ({})",
            chunks.len(),
            doc.file_path.display(),
            doc.hash
        );
        Ok(())
    }

    /// Number of cached documents.
    pub fn document_count(&self) -> Result<usize> {
        let mut count = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == DOC_EXT) {
                count += 1;
            }
        }
        Ok(count)
    }
}

fn read_envelope<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            debug!("Cache read failed for {}: {e}", path.display());
            return None;
        }
    };
    match bincode::deserialize::<Envelope<T>>(&bytes) {
        Ok(envelope) if envelope.schema_version == CACHE_SCHEMA_VERSION => Some(envelope.payload),
        Ok(envelope) => {
            debug!(
                "Ignoring cache entry {} with schema version {}",
                path.display(),
                envelope.schema_version
            );
            None
        }
        Err(e) => {
            debug!("Ignoring unreadable cache entry {}: {e}", path.display());
            None
        }
    }
}

fn write_envelope<T: Serialize>(path: &Path, payload: &T) -> Result<()> {
    let bytes = bincode::serialize(&EnvelopeRef {
        schema_version: CACHE_SCHEMA_VERSION,
        payload,
    })?;
    let tmp = path.with_extension(format!(
        "{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    std::fs::write(&tmp, bytes)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
