//! Conversation transport contract shared by the dialogue engine, the HTTP server and the CLI.
//!
//! Field names on the wire are camelCase (`activeRecord`, `needsSelection`, ...); intents are
//! SCREAMING_SNAKE_CASE. The normalized record inside a structured answer keeps the
//! knowledge-base keys (`titulo`, `costo`, ...) that existing clients read.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tramites_knowledge::{Cost, FormEntry, LocationEntry, ProcedureRecord, TextOrList};

pub const TURN_SCHEMA_VERSION: u32 = 1;

/// Facet of a procedure the user is asking about
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Location,
    Cost,
    Forms,
    Requirements,
    Steps,
    Observations,
    General,
}

impl Intent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Location => "LOCATION",
            Self::Cost => "COST",
            Self::Forms => "FORMS",
            Self::Requirements => "REQUIREMENTS",
            Self::Steps => "STEPS",
            Self::Observations => "OBSERVATIONS",
            Self::General => "GENERAL",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome class of one turn
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Rendered from a retrieved or active record
    Answered,
    /// Numbered location list shown; waiting for a number
    AwaitingSelection,
    /// Number outside the offered range
    InvalidSelection,
    /// No confident match; the Generator answered
    Generated,
    /// Matched record had no usable title
    Incomplete,
    /// Generator failed on the final fallback
    Failed,
    /// Unexpected error caught at the turn boundary
    Internal,
}

impl TurnStatus {
    /// Failures reported to the caller as server-side errors
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Internal)
    }
}

/// One completed exchange
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
    /// RFC 3339
    pub timestamp: String,
}

/// A procedure with several offices, waiting for the user to pick one
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PendingSelection {
    pub record: ProcedureRecord,
    pub locations: Vec<LocationEntry>,
}

impl PendingSelection {
    #[must_use]
    pub fn for_record(record: ProcedureRecord) -> Self {
        let locations = record.data.location_options.clone();
        Self { record, locations }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[serde(alias = "mensaje")]
    pub message: String,
    #[serde(default)]
    pub active_record: Option<ProcedureRecord>,
    #[serde(default)]
    pub pending_selection: Option<PendingSelection>,
    #[serde(default)]
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub text: String,
    pub intent: Option<Intent>,
    pub structured_answer: Option<StructuredAnswer>,
    pub needs_selection: bool,
    #[serde(default)]
    pub location_options: Vec<LocationEntry>,
    /// Procedure titles offered when a match could not be completed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl TurnResponse {
    /// Plain text answer with no procedure attached
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct StructuredAnswer {
    pub intent: Intent,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "info")]
    pub record: NormalizedRecord,
}

/// Every procedure field with defaults substituted for missing values
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct NormalizedRecord {
    pub url: String,
    pub titulo: String,
    pub descripcion: String,
    pub requisitos: TextOrList,
    pub costo: Cost,
    pub pasos: TextOrList,
    pub observaciones: TextOrList,
    pub formularios: Vec<FormEntry>,
    pub direccion: String,
    pub horarios: String,
    pub telefono: String,
    pub email: String,
    pub responsable: String,
    pub opciones_ubicacion: Vec<LocationEntry>,
    pub modalidad: String,
    pub mapa_url: String,
    pub sitio: String,
    pub coordenadas: String,
}

/// `POST /api/chat` body
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ChatRequest {
    #[serde(alias = "mensaje", default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ReindexReport {
    pub records: usize,
    pub indexed: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            hint: None,
        }
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// JSON Schemas of the turn request and response, keyed by type name
pub fn turn_schemas() -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "schemaVersion": TURN_SCHEMA_VERSION,
        "TurnRequest": serde_json::to_value(schemars::schema_for!(TurnRequest))?,
        "TurnResponse": serde_json::to_value(schemars::schema_for!(TurnResponse))?,
    }))
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn response_uses_camel_case_and_screaming_intents() {
        let response = TurnResponse {
            text: "hola".to_string(),
            intent: Some(Intent::Requirements),
            needs_selection: true,
            ..TurnResponse::default()
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "text": "hola",
                "intent": "REQUIREMENTS",
                "structuredAnswer": null,
                "needsSelection": true,
                "locationOptions": []
            })
        );
    }

    #[test]
    fn request_accepts_minimal_and_legacy_bodies() {
        let minimal: TurnRequest = serde_json::from_value(json!({"message": "hola"})).unwrap();
        assert_eq!(minimal.message, "hola");
        assert!(minimal.active_record.is_none());
        assert!(minimal.history.is_empty());

        let legacy: ChatRequest = serde_json::from_value(json!({"mensaje": "costo"})).unwrap();
        assert_eq!(legacy.message, "costo");
    }

    #[test]
    fn request_round_trips_pending_selection() {
        let raw = json!({
            "message": "2",
            "activeRecord": null,
            "pendingSelection": {
                "record": {"url": "https://x/tramite", "data": {"titulo": "Licencia"}},
                "locations": [{"nombre": "Centro", "direccion": "Calle 1"}]
            },
            "history": [{"user": "a", "assistant": "b", "timestamp": "2025-01-01T00:00:00Z"}]
        });
        let request: TurnRequest = serde_json::from_value(raw).unwrap();
        let pending = request.pending_selection.as_ref().unwrap();
        assert_eq!(pending.record.title(), "Licencia");
        assert_eq!(pending.locations[0].name(), Some("Centro"));
        assert_eq!(request.history.len(), 1);
    }

    #[test]
    fn failure_statuses() {
        assert!(TurnStatus::Failed.is_failure());
        assert!(TurnStatus::Internal.is_failure());
        assert!(!TurnStatus::Generated.is_failure());
        assert!(!TurnStatus::InvalidSelection.is_failure());
        assert_eq!(serialize_json(&TurnStatus::AwaitingSelection).unwrap(), "\"awaiting_selection\"");
    }

    #[test]
    fn schemas_cover_both_turn_types() {
        let schemas = turn_schemas().unwrap();
        assert!(schemas.get("TurnRequest").is_some());
        assert!(schemas.get("TurnResponse").is_some());
    }
}
