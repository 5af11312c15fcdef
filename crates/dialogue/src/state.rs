use crate::error::Result;
use crate::generator::HistoryMessage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tramites_knowledge::ProcedureRecord;
use tramites_protocol::{PendingSelection, Turn, TurnRequest};

/// Turns kept in a conversation's history
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Context of one conversation.
///
/// Owned by exactly one session and only replaced by the resolver once a turn completes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueState {
    #[serde(default)]
    pub active_record: Option<ProcedureRecord>,
    #[serde(default)]
    pub pending_selection: Option<PendingSelection>,
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl DialogueState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a transport request into its message and the state it carries
    #[must_use]
    pub fn from_request(request: TurnRequest) -> (String, Self) {
        let state = Self {
            active_record: request.active_record,
            pending_selection: request.pending_selection,
            history: request.history,
        };
        (request.message, state)
    }

    /// Append a completed exchange, keeping only the last `limit` turns
    pub fn record_turn(&mut self, user: &str, assistant: &str, limit: usize) {
        self.history.push(Turn {
            user: user.to_string(),
            assistant: assistant.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        });
        if self.history.len() > limit {
            let excess = self.history.len() - limit;
            self.history.drain(..excess);
        }
    }

    /// The last `limit` turns as alternating user/assistant messages, oldest first
    #[must_use]
    pub fn history_messages(&self, limit: usize) -> Vec<HistoryMessage> {
        let start = self.history.len().saturating_sub(limit);
        self.history[start..]
            .iter()
            .flat_map(|turn| {
                [
                    HistoryMessage::user(turn.user.clone()),
                    HistoryMessage::assistant(turn.assistant.clone()),
                ]
            })
            .filter(|message| !message.text.trim().is_empty())
            .collect()
    }

    /// Drop the active procedure and any pending location choice
    pub fn clear_context(&mut self) {
        self.active_record = None;
        self.pending_selection = None;
    }

    /// Read a state file written by [`DialogueState::save`]. A missing file is a fresh state.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::new());
        }
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}
