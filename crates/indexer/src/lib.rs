//! # Recall Indexer
//!
//! Incremental, content-addressed indexing of a document folder.
//!
//! ## Pipeline
//!
//! ```text
//! Directory / watcher event
//!     │
//!     ├──> Content hash + mtime ──(unchanged)──> cached chunks
//!     │
//!     ├──> Parser (txt, md, pdf)
//!     │      └─> Document
//!     │
//!     ├──> Chunker ──> Embedder
//!     │      └─> Embedded chunks ──> <cache>/<hash>.chunks, <hash>.doc
//!     │
//!     └──> IndexUpdate ──> sync::apply_update ──> VectorStore
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use recall_indexer::{Indexer, IndexerConfig};
//! use recall_vector_store::{Embedder, EmbedderConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let embedder = Arc::new(Embedder::from_config(&EmbedderConfig::default())?);
//!     let indexer = Indexer::new(IndexerConfig::default(), embedder)?;
//!     let files = indexer.index_directory("./docs").await?;
//!
//!     println!("Indexed {} files", files.len());
//!     Ok(())
//! }
//! ```

mod cache;
mod error;
mod hash;
mod indexer;
mod parser;
pub mod sync;
mod watcher;

pub use cache::{IndexCache, CACHE_SCHEMA_VERSION};
pub use error::{IndexerError, Result};
pub use hash::{content_hash, file_hash};
pub use indexer::{IndexUpdate, Indexer, IndexerConfig};
pub use parser::{FormatHandler, ParserRegistry, PdfHandler, TextHandler};
pub use watcher::{FileWatcher, WatcherConfig};
