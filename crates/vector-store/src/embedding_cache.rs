//! Persisted procedure embeddings.
//!
//! One JSON file per knowledge base, keyed by a hash of the embedded text and stamped with the
//! model id and dimension. A file written by another model is ignored, so switching models
//! re-embeds everything once.

use crate::embeddings::fnv1a_64;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const CACHE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    model: String,
    dimension: usize,
    vectors: BTreeMap<String, Vec<f32>>,
}

#[derive(Debug)]
pub struct EmbeddingCache {
    path: PathBuf,
    model: String,
    dimension: usize,
    vectors: BTreeMap<String, Vec<f32>>,
    dirty: bool,
}

impl EmbeddingCache {
    /// Empty cache for `model` that will be saved to `path`
    pub fn new(path: impl AsRef<Path>, model: &str, dimension: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            model: model.to_string(),
            dimension,
            vectors: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Read the cache at `path`. Missing, unreadable or foreign files start empty.
    pub async fn load(path: impl AsRef<Path>, model: &str, dimension: usize) -> Self {
        let mut cache = Self::new(path, model, dimension);
        let bytes = match tokio::fs::read(&cache.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return cache,
            Err(err) => {
                log::warn!(
                    "Ignoring embedding cache {}: {err}",
                    cache.path.display()
                );
                return cache;
            }
        };

        let file: CacheFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(err) => {
                log::warn!(
                    "Embedding cache {} is corrupt, rebuilding: {err}",
                    cache.path.display()
                );
                return cache;
            }
        };
        if file.version != CACHE_VERSION || file.model != model || file.dimension != dimension {
            log::info!(
                "Embedding cache {} was written for model '{}' (dim {}); rebuilding for '{model}'",
                cache.path.display(),
                file.model,
                file.dimension
            );
            return cache;
        }

        cache.vectors = file
            .vectors
            .into_iter()
            .filter(|(_, vector)| vector.len() == dimension)
            .collect();
        log::debug!(
            "Loaded {} cached embeddings from {}",
            cache.vectors.len(),
            cache.path.display()
        );
        cache
    }

    /// Cache key of an embedded text
    #[must_use]
    pub fn key(text: &str) -> String {
        format!("{:016x}", fnv1a_64(text.as_bytes()))
    }

    #[must_use]
    pub fn get(&self, text: &str) -> Option<&[f32]> {
        self.vectors.get(&Self::key(text)).map(Vec::as_slice)
    }

    pub fn insert(&mut self, text: &str, vector: Vec<f32>) {
        if vector.len() != self.dimension {
            return;
        }
        self.vectors.insert(Self::key(text), vector);
        self.dirty = true;
    }

    /// Drop vectors whose text is no longer in the knowledge base
    pub fn retain_texts<'a>(&mut self, texts: impl IntoIterator<Item = &'a str>) {
        let live: HashSet<String> = texts.into_iter().map(Self::key).collect();
        let before = self.vectors.len();
        self.vectors.retain(|key, _| live.contains(key));
        if self.vectors.len() != before {
            self.dirty = true;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the cache if anything changed since it was loaded
    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let file = CacheFile {
            version: CACHE_VERSION,
            model: self.model.clone(),
            dimension: self.dimension,
            vectors: self.vectors.clone(),
        };
        let bytes = serde_json::to_vec(&file)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        self.dirty = false;
        log::debug!(
            "Saved {} embeddings to {}",
            self.vectors.len(),
            self.path.display()
        );
        Ok(())
    }
}
