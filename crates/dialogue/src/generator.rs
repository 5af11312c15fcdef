use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One prior message handed to the Generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub text: String,
}

impl HistoryMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error("Generator is not configured: {0}")]
    NotConfigured(String),

    #[error("Generator request failed: {0}")]
    Transport(String),

    #[error("Generator returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Generator response is malformed: {0}")]
    Malformed(String),
}

/// Free-text fallback used when retrieval has no confident answer.
///
/// Implementations must bound every call with a timeout and report failure instead of
/// retrying.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn complete(
        &self,
        query: &str,
        history: &[HistoryMessage],
    ) -> std::result::Result<String, GeneratorError>;
}
