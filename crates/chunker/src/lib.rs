//! # Recall Chunker
//!
//! Document and chunk types shared by the indexing pipeline, and the two chunking
//! policies used to cut document text into embeddable fragments.
//!
//! ## Policies
//!
//! - **fixed**: a `chunk_size` window sliding by `chunk_size - chunk_overlap` code points
//! - **recursive**: paragraphs, then sentences, packed greedily with a word-level overlap
//!
//! ## Example
//!
//! ```
//! use recall_chunker::{Chunker, ChunkerConfig};
//! use std::path::Path;
//!
//! let chunker = Chunker::new(ChunkerConfig::fixed(20, 5)).unwrap();
//! let chunks = chunker.chunk_str("The sky is blue. Grass is green.", "doc", Path::new("a.txt"));
//! assert_eq!(chunks[0].id, "doc_0");
//! ```

mod chunker;
mod config;
mod error;
mod fixed;
mod recursive;
mod types;

pub use chunker::Chunker;
pub use config::{ChunkerConfig, ChunkingMethod};
pub use error::{ChunkerError, Result};
pub use types::{Chunk, ChunkMetadata, Document, DocumentMetadata};
