use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Fixed metadata captured when a file is parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    /// Lower-cased extension including the leading dot (`".pdf"`), empty when absent
    pub extension: String,
    pub size_bytes: u64,
}

/// A parsed document.
///
/// `id` and `hash` are the same content digest: a document's identity changes
/// whenever its bytes change, and a new `Document` supersedes the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub file_path: PathBuf,
    pub content: String,
    pub hash: String,
    pub file_mod_time: SystemTime,
    pub parsed_at: SystemTime,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(
        file_path: impl Into<PathBuf>,
        content: String,
        hash: String,
        file_mod_time: SystemTime,
        metadata: DocumentMetadata,
    ) -> Self {
        Self {
            id: hash.clone(),
            file_path: file_path.into(),
            content,
            hash,
            file_mod_time,
            parsed_at: SystemTime::now(),
            metadata,
        }
    }
}

/// Where a chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: PathBuf,
    pub document_id: String,
    pub chunk_index: usize,
}

/// A bounded fragment of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub content: String,
    /// Empty until the embedding stage completes
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub index: usize,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create an unembedded chunk with its deterministic id.
    pub fn new(
        document_id: impl Into<String>,
        source: impl AsRef<Path>,
        index: usize,
        content: String,
    ) -> Self {
        let document_id = document_id.into();
        Self {
            id: Self::derive_id(&document_id, index),
            metadata: ChunkMetadata {
                source: source.as_ref().to_path_buf(),
                document_id: document_id.clone(),
                chunk_index: index,
            },
            document_id,
            content,
            embedding: Vec::new(),
            index,
        }
    }

    /// `"<document_id>_<index>"`
    #[must_use]
    pub fn derive_id(document_id: &str, index: usize) -> String {
        format!("{document_id}_{index}")
    }

    /// Fill in the id if a caller built the chunk by hand.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            self.id = Self::derive_id(&self.document_id, self.index);
        }
    }

    #[must_use]
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}
