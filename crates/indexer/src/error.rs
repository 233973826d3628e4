use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to parse {}: {message}", path.display())]
    ParseError { path: PathBuf, message: String },

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] recall_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] recall_vector_store::VectorStoreError),

    #[error("Cache serialization error: {0}")]
    CacheError(#[from] bincode::Error),

    #[error("Watcher error: {0}")]
    WatcherError(#[from] notify::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::ParseError {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn join(err: tokio::task::JoinError) -> Self {
        Self::Other(format!("blocking task failed: {err}"))
    }
}
