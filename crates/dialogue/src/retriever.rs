use async_trait::async_trait;
use tramites_knowledge::UNTITLED_PROCEDURE;
use tramites_vector_store::{ProcedureIndex, SearchHit, SharedIndex, VectorStoreError};

/// Semantic lookup over the procedure corpus
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> std::result::Result<Vec<SearchHit>, VectorStoreError>;

    /// Titles offered when a lookup cannot be completed
    fn suggestions(&self) -> Vec<String>;
}

fn index_titles(index: &ProcedureIndex) -> Vec<String> {
    index
        .entries()
        .iter()
        .map(|entry| match entry.title() {
            "" => UNTITLED_PROCEDURE.to_string(),
            title => title.to_string(),
        })
        .collect()
}

#[async_trait]
impl Retriever for ProcedureIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> std::result::Result<Vec<SearchHit>, VectorStoreError> {
        ProcedureIndex::search(self, query, top_k, threshold).await
    }

    fn suggestions(&self) -> Vec<String> {
        index_titles(self)
    }
}

#[async_trait]
impl Retriever for SharedIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> std::result::Result<Vec<SearchHit>, VectorStoreError> {
        SharedIndex::search(self, query, top_k, threshold).await
    }

    fn suggestions(&self) -> Vec<String> {
        index_titles(&self.snapshot())
    }
}
