use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("cache directory not found: {0}")]
    DirectoryNotFound(std::path::PathBuf),

    #[error("cache lock poisoned")]
    LockPoisoned,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
