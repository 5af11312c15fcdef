use crate::embedding_cache::EmbeddingCache;
use crate::embeddings::Vectorizer;
use crate::error::Result;
use crate::types::{IndexEntry, SearchHit};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tramites_knowledge::ProcedureRecord;

/// Minimum cosine similarity for a record to count as a match
pub const DEFAULT_THRESHOLD: f32 = 0.55;
pub const DEFAULT_TOP_K: usize = 1;

/// Immutable set of embedded procedures.
///
/// Entries keep the order of the records they were built from; that order breaks score ties.
#[derive(Debug)]
pub struct ProcedureIndex {
    vectorizer: Arc<Vectorizer>,
    entries: Vec<IndexEntry>,
}

impl ProcedureIndex {
    #[must_use]
    pub fn empty(vectorizer: Arc<Vectorizer>) -> Self {
        Self {
            vectorizer,
            entries: Vec::new(),
        }
    }

    /// Embed every record as `"{title}. {description}"`.
    ///
    /// If the batch cannot be embedded the whole build is abandoned and an empty index is
    /// returned; a partial index is never published.
    pub async fn build(vectorizer: Arc<Vectorizer>, records: Vec<ProcedureRecord>) -> Self {
        Self::build_with(vectorizer, records, None).await
    }

    /// Like [`ProcedureIndex::build`], reusing vectors persisted at `cache_path` and embedding
    /// only records whose text is not cached yet. The cache is rewritten afterwards; a failed
    /// write is logged and does not affect the index.
    pub async fn build_cached(
        vectorizer: Arc<Vectorizer>,
        records: Vec<ProcedureRecord>,
        cache_path: &Path,
    ) -> Self {
        let mut cache =
            EmbeddingCache::load(cache_path, vectorizer.model(), vectorizer.dimension()).await;
        let index = Self::build_with(vectorizer, records, Some(&mut cache)).await;
        if !index.is_empty() {
            cache.retain_texts(index.entries.iter().map(IndexEntry::text));
            if let Err(e) = cache.save().await {
                log::warn!(
                    "Failed to write embedding cache {}: {e}",
                    cache.path().display()
                );
            }
        }
        index
    }

    async fn build_with(
        vectorizer: Arc<Vectorizer>,
        records: Vec<ProcedureRecord>,
        mut cache: Option<&mut EmbeddingCache>,
    ) -> Self {
        if records.is_empty() {
            log::warn!("Building index from an empty knowledge base");
            return Self::empty(vectorizer);
        }

        let texts: Vec<String> = records.iter().map(IndexEntry::embedded_text).collect();
        let mut vectors: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| {
                cache
                    .as_deref()
                    .and_then(|cache| cache.get(text))
                    .map(<[f32]>::to_vec)
            })
            .collect();
        let missing: Vec<usize> = (0..texts.len()).filter(|&i| vectors[i].is_none()).collect();

        if !missing.is_empty() {
            let batch: Vec<&str> = missing.iter().map(|&i| texts[i].as_str()).collect();
            match vectorizer.embed_batch(batch).await {
                Ok(embedded) if embedded.len() == missing.len() => {
                    for (i, vector) in missing.iter().copied().zip(embedded) {
                        if let Some(cache) = cache.as_deref_mut() {
                            cache.insert(&texts[i], vector.clone());
                        }
                        vectors[i] = Some(vector);
                    }
                }
                Ok(embedded) => {
                    log::error!(
                        "Embedding returned {} vectors for {} records; index left empty",
                        embedded.len(),
                        missing.len()
                    );
                    return Self::empty(vectorizer);
                }
                Err(e) => {
                    log::error!("Failed to embed knowledge base; index left empty: {e}");
                    return Self::empty(vectorizer);
                }
            }
        }
        log::debug!(
            "{} of {} procedure embeddings reused from cache",
            texts.len() - missing.len(),
            texts.len()
        );
        let vectors: Vec<Vec<f32>> = vectors.into_iter().flatten().collect();

        let entries: Vec<IndexEntry> = records
            .into_iter()
            .zip(texts)
            .zip(vectors)
            .map(|((record, text), vector)| IndexEntry::new(Arc::new(record), text, vector))
            .collect();

        log::info!(
            "Indexed {} procedures with model '{}' (dim {})",
            entries.len(),
            vectorizer.model(),
            vectorizer.dimension()
        );

        Self {
            vectorizer,
            entries,
        }
    }

    /// Up to `top_k` entries with similarity >= `threshold`, best first.
    ///
    /// An empty result is the "no match" signal, not an error.
    pub async fn search(&self, query: &str, top_k: usize, threshold: f32) -> Result<Vec<SearchHit>> {
        if self.entries.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.vectorizer.embed(query).await?;

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let score = Vectorizer::cosine_similarity(&query_vector, entry.vector());
                log::debug!("similarity {:.4} for '{}'", score, entry.title());
                (idx, score)
            })
            .filter(|(_, score)| *score >= threshold)
            .collect();

        // sort_by is stable: equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .map(|(idx, score)| SearchHit {
                record: self.entries[idx].record().clone(),
                score,
            })
            .collect();

        log::debug!(
            "Search '{}' (top_k {}, threshold {:.2}) -> {} hits",
            query,
            top_k,
            threshold,
            hits.len()
        );
        Ok(hits)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[must_use]
    pub fn vectorizer(&self) -> &Arc<Vectorizer> {
        &self.vectorizer
    }
}

/// Index handle shared by request handlers and the reindex path.
///
/// Searches run against a snapshot taken under a momentary read lock; rebuilds happen off-lock
/// and are published with a single pointer swap, so a search never observes a half-built index.
#[derive(Debug)]
pub struct SharedIndex {
    current: RwLock<Arc<ProcedureIndex>>,
    cache_path: Option<PathBuf>,
}

impl SharedIndex {
    #[must_use]
    pub fn new(index: ProcedureIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            cache_path: None,
        }
    }

    /// Builder: rebuilds reuse and refresh the embedding cache at `path`
    #[must_use]
    pub fn with_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<ProcedureIndex> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn publish(&self, index: ProcedureIndex) {
        let index = Arc::new(index);
        match self.current.write() {
            Ok(mut guard) => *guard = index,
            Err(poisoned) => *poisoned.into_inner() = index,
        }
    }

    /// Build a new index with the current vectorizer and publish it. Returns the entry count.
    pub async fn rebuild(&self, records: Vec<ProcedureRecord>) -> usize {
        let vectorizer = self.snapshot().vectorizer().clone();
        let index = match &self.cache_path {
            Some(path) => ProcedureIndex::build_cached(vectorizer, records, path).await,
            None => ProcedureIndex::build(vectorizer, records).await,
        };
        let count = index.len();
        self.publish(index);
        count
    }

    pub async fn search(&self, query: &str, top_k: usize, threshold: f32) -> Result<Vec<SearchHit>> {
        self.snapshot().search(query, top_k, threshold).await
    }
}
