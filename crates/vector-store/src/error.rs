use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("Embedding provider error: {0}")]
    ProviderError(String),

    #[error("Embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Vector store lock poisoned")]
    LockPoisoned,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VectorStoreError {
    pub(crate) fn database(context: &str, err: impl std::fmt::Display) -> Self {
        Self::DatabaseError(format!("{context}: {err}"))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::ProviderError(message.into())
    }

    /// Provider failures and timeouts, as opposed to local storage problems.
    #[must_use]
    pub const fn is_provider_failure(&self) -> bool {
        matches!(self, Self::ProviderError(_) | Self::Timeout(_))
    }
}
