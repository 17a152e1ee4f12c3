//! Error types for the fedsearch host.

/// Top-level error type of the host.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration file could not be parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid command-line arguments.
    #[error("usage error: {0}")]
    Usage(String),

    /// Search engine error.
    #[error(transparent)]
    Search(#[from] federated_search::SearchError),

    /// Output could not be rendered as JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
