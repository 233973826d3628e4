use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// How document text is split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChunkingMethod {
    /// Sliding window of `chunk_size` code points
    Fixed,
    /// Paragraphs, then sentences, greedily packed
    #[default]
    Recursive,
}

impl ChunkingMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Recursive => "recursive",
        }
    }
}

/// Chunking policy. All sizes are measured in Unicode code points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    pub method: ChunkingMethod,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Chunks whose trimmed content is shorter than this are dropped
    pub min_chunk_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            method: ChunkingMethod::Recursive,
            chunk_size: 512,
            chunk_overlap: 128,
            min_chunk_size: 50,
        }
    }
}

impl ChunkerConfig {
    pub fn fixed(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            method: ChunkingMethod::Fixed,
            chunk_size,
            chunk_overlap,
            min_chunk_size: 0,
        }
    }

    pub fn recursive(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            method: ChunkingMethod::Recursive,
            chunk_size,
            chunk_overlap,
            min_chunk_size: 0,
        }
    }

    #[must_use]
    pub const fn with_min_chunk_size(mut self, min_chunk_size: usize) -> Self {
        self.min_chunk_size = min_chunk_size;
        self
    }

    /// Reject policies that cannot make progress.
    ///
    /// A fixed window with `chunk_overlap >= chunk_size` has a non-positive stride.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be positive"));
        }
        if self.method == ChunkingMethod::Fixed && self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({}) for fixed chunking",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Window advance for fixed chunking. Only meaningful after `validate`.
    pub(crate) const fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap)
    }

    /// Number of trailing words carried into the next recursive chunk.
    pub(crate) const fn overlap_words(&self) -> usize {
        self.chunk_overlap / 10
    }
}
