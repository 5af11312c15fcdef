use crate::error::{KnowledgeError, Result};
use crate::store::KnowledgeStore;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// The list of procedure pages the knowledge base is expected to cover.
///
/// Two layouts exist on disk: a plain array of URLs (written by the URL discovery crawl) and
/// an object keyed by procedure slug with `{ "url": ... }` values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcedureUrls {
    urls: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUrls {
    List(Vec<String>),
    Keyed(serde_json::Map<String, serde_json::Value>),
}

impl ProcedureUrls {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            log::info!("Procedure URL list not found at {}", path.display());
            return Ok(Self::default());
        }
        let bytes = tokio::fs::read(path).await?;
        let urls = Self::parse(&bytes)?;
        log::info!("Loaded {} procedure URLs", urls.len());
        Ok(urls)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let urls = match serde_json::from_slice::<RawUrls>(bytes)? {
            RawUrls::List(urls) => urls,
            RawUrls::Keyed(map) => map
                .into_iter()
                .map(|(key, value)| {
                    value
                        .get("url")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            KnowledgeError::invalid_format(format!(
                                "procedure URL entry '{key}' has no \"url\" string"
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Self { urls })
    }

    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// URLs with no knowledge base entry yet, in list order
    pub fn missing_from(&self, store: &impl KnowledgeStore) -> Vec<&str> {
        let known: HashSet<&str> = store.records().iter().map(|r| r.id.as_str()).collect();
        self.urls
            .iter()
            .map(String::as_str)
            .filter(|url| !known.contains(url))
            .collect()
    }
}
