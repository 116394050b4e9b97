use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Resource already catalogued: {0}")]
    DuplicateResource(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(i64),

    #[error("Chunk size must be at least 1, got {0}")]
    InvalidChunkSize(usize),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Transfer failed: {0}")]
    Transfer(String),
}

pub type Result<T> = std::result::Result<T, Error>;
