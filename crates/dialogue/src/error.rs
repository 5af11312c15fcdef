use thiserror::Error;

pub type Result<T> = std::result::Result<T, DialogueError>;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] tramites_vector_store::VectorStoreError),

    #[error("Generator error: {0}")]
    Generator(#[from] crate::generator::GeneratorError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
