use crate::config::{ChunkerConfig, ChunkingMethod};
use crate::error::{ChunkerError, Result};
use crate::fixed::split_fixed;
use crate::recursive::split_recursive;
use crate::types::{Chunk, Document};
use std::path::Path;

/// Splits document text into chunks according to a validated policy
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    /// Create a chunker, rejecting policies that cannot make progress.
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a parsed document. Chunks carry the document id and source path but no
    /// embedding yet; a document that yields no chunk at all is an error.
    pub fn chunk_document(&self, doc: &Document) -> Result<Vec<Chunk>> {
        let chunks = self.chunk_str(&doc.content, &doc.id, &doc.file_path);
        if chunks.is_empty() {
            return Err(ChunkerError::empty_input(format!(
                "no chunks produced from {}",
                doc.file_path.display()
            )));
        }
        Ok(chunks)
    }

    /// Chunk raw text on behalf of `document_id`.
    ///
    /// Pieces shorter than `min_chunk_size` (after trimming) are dropped and the
    /// survivors are numbered `0..n`, so ids stay dense for a given content version.
    pub fn chunk_str(&self, text: &str, document_id: &str, source: &Path) -> Vec<Chunk> {
        let pieces = match self.config.method {
            ChunkingMethod::Fixed => {
                split_fixed(text, self.config.chunk_size, self.config.stride())
            }
            ChunkingMethod::Recursive => {
                split_recursive(text, self.config.chunk_size, self.config.overlap_words())
            }
        };
        let produced = pieces.len();

        let chunks: Vec<Chunk> = pieces
            .into_iter()
            .filter(|piece| piece.trim().chars().count() >= self.config.min_chunk_size)
            .enumerate()
            .map(|(index, content)| Chunk::new(document_id, source, index, content))
            .collect();

        if chunks.len() < produced {
            log::debug!(
                "Dropped {} undersized chunks from {}",
                produced - chunks.len(),
                source.display()
            );
        }
        chunks
    }
}
