//! # Tramites Vector Store
//!
//! Sentence embeddings and cosine-similarity retrieval over procedure records.
//!
//! ## Architecture
//!
//! ```text
//! ProcedureRecord[]
//!     │
//!     ├──> Vectorizer (ONNX Runtime or stub)
//!     │      └─> embed("{title}. {description}")
//!     │
//!     ├──> EmbeddingCache (JSON on disk, keyed by model + text hash)
//!     │
//!     └──> ProcedureIndex
//!            └─> brute-force cosine, threshold + top_k
//!
//! SharedIndex: snapshot for search, swap on rebuild
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tramites_vector_store::{ProcedureIndex, Vectorizer, DEFAULT_THRESHOLD};
//!
//! # async fn run(records: Vec<tramites_knowledge::ProcedureRecord>) -> tramites_vector_store::Result<()> {
//! let index = ProcedureIndex::build(Arc::new(Vectorizer::stub(384)), records).await;
//! for hit in index.search("licencia de conducir", 1, DEFAULT_THRESHOLD).await? {
//!     println!("{}: {:.3}", hit.record.title(), hit.score);
//! }
//! # Ok(())
//! # }
//! ```

mod embedding_cache;
mod embeddings;
mod error;
mod index;
mod types;

pub use embedding_cache::EmbeddingCache;
pub use embeddings::{
    EmbeddingConfig, EmbeddingMode, Vectorizer, EMBEDDING_MODEL_ENV, EMBEDDING_MODE_ENV,
    MODEL_DIR_ENV,
};
pub use error::{Result, VectorStoreError};
pub use index::{ProcedureIndex, SharedIndex, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
pub use types::{IndexEntry, SearchHit};
