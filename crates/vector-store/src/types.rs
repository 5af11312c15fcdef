use std::sync::Arc;
use tramites_knowledge::ProcedureRecord;

/// One indexed procedure: the record, the text that was embedded and its vector
#[derive(Debug, Clone)]
pub struct IndexEntry {
    record: Arc<ProcedureRecord>,
    text: String,
    vector: Vec<f32>,
}

impl IndexEntry {
    pub(crate) fn new(record: Arc<ProcedureRecord>, text: String, vector: Vec<f32>) -> Self {
        Self {
            record,
            text,
            vector,
        }
    }

    /// Text embedded for a record: `"{title}. {description}"`, nothing else
    #[must_use]
    pub fn embedded_text(record: &ProcedureRecord) -> String {
        format!("{}. {}", record.data.title, record.data.description)
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        self.record.title()
    }

    #[must_use]
    pub fn record(&self) -> &Arc<ProcedureRecord> {
        &self.record
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }
}

/// A record that cleared the similarity threshold
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub record: Arc<ProcedureRecord>,
    pub score: f32,
}
