use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkerError {
    #[error("Invalid chunking configuration: {0}")]
    InvalidConfig(String),

    #[error("Nothing to chunk: {0}")]
    EmptyInput(String),
}

impl ChunkerError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    pub fn empty_input(what: impl Into<String>) -> Self {
        Self::EmptyInput(what.into())
    }
}
