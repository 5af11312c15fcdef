use thiserror::Error;

/// Result type for knowledge base operations
pub type Result<T> = std::result::Result<T, KnowledgeError>;

/// Errors that can occur while loading or saving the knowledge base
#[derive(Error, Debug)]
pub enum KnowledgeError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// The file is not valid JSON for the expected shape
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The file parsed but its layout is not one we understand
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl KnowledgeError {
    /// Create an invalid format error
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }
}
