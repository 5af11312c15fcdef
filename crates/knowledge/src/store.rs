use crate::error::{KnowledgeError, Result};
use crate::types::ProcedureRecord;
use std::path::{Path, PathBuf};

/// Title shown in suggestion lists for records that have none
pub const UNTITLED_PROCEDURE: &str = "Trámite sin título";

/// Read/write access to the procedure knowledge base.
///
/// The conversation core only reads from it; writes belong to whoever scrapes procedure
/// pages.
pub trait KnowledgeStore {
    fn records(&self) -> &[ProcedureRecord];

    fn get(&self, id: &str) -> Option<&ProcedureRecord> {
        self.records().iter().find(|record| record.id == id)
    }

    /// Insert or replace by id, keeping the original position on replace
    fn put(&mut self, record: ProcedureRecord);

    fn len(&self) -> usize {
        self.records().len()
    }

    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Titles offered to the user when a lookup cannot be completed
    fn suggestions(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|record| match record.title() {
                "" => UNTITLED_PROCEDURE.to_string(),
                title => title.to_string(),
            })
            .collect()
    }
}

/// Knowledge base persisted as a JSON array of scraped entries
#[derive(Debug, Clone, Default)]
pub struct JsonKnowledgeBase {
    path: PathBuf,
    records: Vec<ProcedureRecord>,
}

impl JsonKnowledgeBase {
    /// Empty base that will be saved to `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            records: Vec::new(),
        }
    }

    /// Load the base from disk. A missing file yields an empty base.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            log::info!(
                "Knowledge base file not found at {}; starting with an empty base",
                path.display()
            );
            return Ok(Self::new(path));
        }

        let bytes = tokio::fs::read(path).await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        let serde_json::Value::Array(entries) = value else {
            return Err(KnowledgeError::invalid_format(format!(
                "{} must contain a JSON array of procedures",
                path.display()
            )));
        };

        let total = entries.len();
        let records: Vec<ProcedureRecord> = entries
            .into_iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                let url = entry
                    .get("url")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string);
                match serde_json::from_value::<ProcedureRecord>(entry) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        log::warn!(
                            "Skipping knowledge base entry #{position} ({}): {err}",
                            url.as_deref().unwrap_or("no url")
                        );
                        None
                    }
                }
            })
            .collect();
        if records.len() < total {
            log::warn!(
                "{} of {total} entries in {} could not be decoded",
                total - records.len(),
                path.display()
            );
        }
        log::info!(
            "Loaded {} entries from knowledge base {}",
            records.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(&self.records)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        log::info!(
            "Knowledge base saved to {} with {} entries",
            self.path.display(),
            self.records.len()
        );
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn into_records(self) -> Vec<ProcedureRecord> {
        self.records
    }
}

impl KnowledgeStore for JsonKnowledgeBase {
    fn records(&self) -> &[ProcedureRecord] {
        &self.records
    }

    fn put(&mut self, record: ProcedureRecord) {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }
}
