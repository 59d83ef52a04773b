use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockError {
    /// The document handed to `import` is not a block document.
    #[error("Invalid block document: {0}")]
    Format(String),

    /// The durable slot could not be read or written.
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// `config.json` exists but cannot be used.
    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Block not found: {0}")]
    BlockNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Api Error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, BlockError>;
