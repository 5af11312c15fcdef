use crate::http_api::{build_response, error_body, SESSION_HEADER};
use crate::moderation::{Moderator, TOXIC_REPLY};
use crate::print_stdout;
use crate::sessions::SessionRegistry;
use anyhow::Result;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tramites_dialogue::{Resolver, TurnOutcome, TurnResponse, EMPTY_QUERY_PROMPT};
use tramites_knowledge::{JsonKnowledgeBase, KnowledgeStore};
use tramites_protocol::{ChatRequest, ReindexReport};
use tramites_vector_store::SharedIndex;

const MAX_SESSION_ID_LEN: usize = 128;
const HISTORY_CLEARED: &str = "Historial de conversación eliminado.";

/// Everything a request handler needs
pub(crate) struct AppState {
    pub resolver: Resolver,
    pub index: Arc<SharedIndex>,
    pub moderator: Arc<dyn Moderator>,
    pub sessions: SessionRegistry,
    pub knowledge_file: PathBuf,
}

pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(SESSION_HEADER)]);

    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/limpiar_historial", post(clear_history))
        .route("/api/reset", post(clear_history))
        .route("/api/reindex", post(reindex))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}

/// Serve on `bind`; `addrs` are the guarded resolutions of it
pub(crate) async fn serve(state: Arc<AppState>, bind: &str, addrs: &[SocketAddr]) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let local_addr = listener.local_addr()?;
    let base_url = format!("http://{local_addr}");

    print_stdout(&format!("Serving chat API: {base_url}/api/chat"))?;
    print_stdout(&format!("Health endpoint: {base_url}/health"))?;
    if addrs.iter().any(|addr| !addr.ip().is_loopback()) {
        let addrs = addrs
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        print_stdout(&format!(
            "Public bind enabled (--public). Resolved addresses: {addrs}"
        ))?;
    }
    print_stdout(&format!(
        "Try: curl -X POST {base_url}/api/chat -H 'Content-Type: application/json' -d '{{\"message\": \"requisitos licencia de conducir\"}}'"
    ))?;

    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn requested_session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_ID_LEN)
        .map(ToString::to_string)
}

async fn chat(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StatusCode> {
    let session_id =
        requested_session_id(&headers).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            let envelope = error_body("invalid_request", format!("Invalid JSON request: {err}"));
            return build_response(StatusCode::BAD_REQUEST, &envelope, Some(&session_id));
        }
    };

    let message = request.message.trim().to_string();
    if message.is_empty() {
        return build_response(
            StatusCode::BAD_REQUEST,
            &TurnResponse::text(EMPTY_QUERY_PROMPT),
            Some(&session_id),
        );
    }

    let verdict = app.moderator.assess(&message);
    if verdict.toxic {
        log::warn!(
            "Rejected message in session {session_id}: {}",
            verdict.reason.as_deref().unwrap_or("toxic")
        );
        return build_response(
            StatusCode::OK,
            &TurnResponse::text(TOXIC_REPLY),
            Some(&session_id),
        );
    }

    let handle = app.sessions.checkout(&session_id);
    let task_app = app.clone();
    let task_message = message.clone();
    let outcome = tokio::spawn(async move {
        let mut state = handle.lock_owned().await;
        task_app.resolver.handle_turn(&task_message, &mut state).await
    })
    .await
    .unwrap_or_else(|err| {
        log::error!("Turn aborted in session {session_id} for '{message}': {err}");
        TurnOutcome::internal()
    });

    let status = if outcome.status.is_failure() {
        log::error!(
            "Turn failed in session {session_id} for '{message}' (route {})",
            outcome.route
        );
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    build_response(status, &outcome.response, Some(&session_id))
}

async fn clear_history(
    State(app): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    let session_id = requested_session_id(&headers);
    if let Some(id) = session_id.as_deref() {
        if app.sessions.remove(id) {
            log::info!("Cleared session {id}");
        }
    }
    build_response(
        StatusCode::OK,
        &json!({ "mensaje": HISTORY_CLEARED }),
        session_id.as_deref(),
    )
}

async fn reindex(State(app): State<Arc<AppState>>) -> Result<Response, StatusCode> {
    let base = match JsonKnowledgeBase::load(&app.knowledge_file).await {
        Ok(base) => base,
        Err(err) => {
            log::error!(
                "Reindex failed to load {}: {err}",
                app.knowledge_file.display()
            );
            let envelope = error_body("reindex_failed", err.to_string());
            return build_response(StatusCode::INTERNAL_SERVER_ERROR, &envelope, None);
        }
    };

    let records = base.len();
    let indexed = app.index.rebuild(base.into_records()).await;
    log::info!("Reindexed {indexed} of {records} procedures");
    build_response(StatusCode::OK, &ReindexReport { records, indexed }, None)
}

async fn health(State(app): State<Arc<AppState>>) -> Result<Response, StatusCode> {
    build_response(
        StatusCode::OK,
        &json!({
            "status": "ok",
            "indexed": app.index.snapshot().len(),
            "sessions": app.sessions.len(),
        }),
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModerationConfig;
    use crate::moderation::KeywordModerator;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use tramites_dialogue::{Generator, GeneratorError, HistoryMessage, GENERATOR_APOLOGY};
    use tramites_knowledge::{ProcedureData, ProcedureRecord};
    use tramites_vector_store::{ProcedureIndex, Vectorizer};

    struct Offline;

    #[async_trait]
    impl Generator for Offline {
        async fn complete(
            &self,
            _query: &str,
            _history: &[HistoryMessage],
        ) -> Result<String, GeneratorError> {
            Err(GeneratorError::Transport("offline".to_string()))
        }
    }

    fn licencia() -> ProcedureRecord {
        let mut data = ProcedureData::titled("Licencia de Conducir", "Obtener la licencia");
        data.requirements = vec!["DNI", "Certificado médico"].into();
        ProcedureRecord::new("https://x/licencia", data)
    }

    struct TestServer {
        base_url: String,
        app: Arc<AppState>,
        client: reqwest::Client,
        _dir: TempDir,
    }

    async fn start() -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let vectorizer = Arc::new(Vectorizer::stub(384));
        let index = Arc::new(SharedIndex::new(
            ProcedureIndex::build(vectorizer, vec![licencia()]).await,
        ));
        let app = Arc::new(AppState {
            resolver: Resolver::new(index.clone(), Arc::new(Offline)),
            index,
            moderator: Arc::new(KeywordModerator::new(&ModerationConfig::default()).unwrap()),
            sessions: SessionRegistry::new(Duration::from_secs(60), 16),
            knowledge_file: dir.path().join("kb.json"),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let served = router(app.clone());
        tokio::spawn(async move {
            axum::serve(listener, served).await.unwrap();
        });

        TestServer {
            base_url,
            app,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    impl TestServer {
        async fn chat(&self, session: &str, message: &str) -> (StatusCode, Value) {
            let response = self
                .client
                .post(format!("{}/api/chat", self.base_url))
                .header(SESSION_HEADER, session)
                .json(&json!({ "message": message }))
                .send()
                .await
                .unwrap();
            let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
            (status, response.json().await.unwrap())
        }
    }

    #[tokio::test]
    async fn empty_message_is_a_bad_request() {
        let server = start().await;
        let (status, body) = server.chat("s1", "   ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["text"], EMPTY_QUERY_PROMPT);
    }

    #[tokio::test]
    async fn toxic_message_is_rejected_without_touching_history() {
        let server = start().await;
        let (status, body) = server.chat("s1", "sos un idiota").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], TOXIC_REPLY);

        let handle = server.app.sessions.checkout("s1");
        assert!(handle.lock().await.history.is_empty());
    }

    #[tokio::test]
    async fn conversation_keeps_context_per_session() {
        let server = start().await;
        let (status, body) = server
            .chat("s1", "Licencia de Conducir. Obtener la licencia")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "GENERAL");
        assert_eq!(
            body["structuredAnswer"]["info"]["titulo"],
            "Licencia de Conducir"
        );

        let (_, body) = server.chat("s1", "requisitos").await;
        assert_eq!(body["intent"], "REQUIREMENTS");
        assert!(body["text"].as_str().unwrap().contains("Certificado médico"));

        // another session has no active procedure, so the generator is asked and fails
        let (status, body) = server.chat("s2", "requisitos").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["text"], GENERATOR_APOLOGY);
    }

    #[tokio::test]
    async fn concurrent_turns_of_one_session_are_all_recorded() {
        let server = start().await;
        let query = "Licencia de Conducir. Obtener la licencia";
        let (a, b, c, d) = tokio::join!(
            server.chat("s1", query),
            server.chat("s1", query),
            server.chat("s1", "requisitos"),
            server.chat("s2", query),
        );
        assert_eq!(a.0, StatusCode::OK);
        assert_eq!(b.0, StatusCode::OK);
        assert_eq!(d.0, StatusCode::OK);
        // "requisitos" may run before any lookup in s1 and fall through to the failing generator
        let s1_turns = if c.0 == StatusCode::OK { 3 } else { 2 };

        let handle = server.app.sessions.checkout("s1");
        let state = handle.lock().await;
        assert_eq!(state.history.len(), s1_turns);
        assert_eq!(
            state.active_record.as_ref().map(|record| record.title()),
            Some("Licencia de Conducir")
        );
    }

    #[tokio::test]
    async fn session_id_is_generated_and_echoed() {
        let server = start().await;
        let response = server
            .client
            .post(format!("{}/api/chat", server.base_url))
            .json(&json!({ "mensaje": "Licencia de Conducir. Obtener la licencia" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap()
            .to_string();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn clearing_history_drops_the_session() {
        let server = start().await;
        server
            .chat("s1", "Licencia de Conducir. Obtener la licencia")
            .await;
        assert_eq!(server.app.sessions.len(), 1);

        let response = server
            .client
            .post(format!("{}/api/limpiar_historial", server.base_url))
            .header(SESSION_HEADER, "s1")
            .send()
            .await
            .unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["mensaje"], HISTORY_CLEARED);
        assert_eq!(server.app.sessions.len(), 0);
    }

    #[tokio::test]
    async fn reindex_publishes_the_file_contents() {
        let server = start().await;
        let kb = json!([
            { "url": "https://x/partida", "data": { "titulo": "Partida de Nacimiento", "descripcion": "Solicitud de partida" } },
            { "url": "https://x/cedula", "data": { "titulo": "Cédula", "descripcion": "Emisión de cédula" } }
        ]);
        tokio::fs::write(&server.app.knowledge_file, kb.to_string())
            .await
            .unwrap();

        let response = server
            .client
            .post(format!("{}/api/reindex", server.base_url))
            .send()
            .await
            .unwrap();
        let report: ReindexReport = response.json().await.unwrap();
        assert_eq!(
            report,
            ReindexReport {
                records: 2,
                indexed: 2
            }
        );

        let health: Value = server
            .client
            .get(format!("{}/health", server.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["indexed"], 2);
    }

    #[tokio::test]
    async fn malformed_knowledge_base_fails_reindex() {
        let server = start().await;
        tokio::fs::write(&server.app.knowledge_file, "{\"not\": \"an array\"}")
            .await
            .unwrap();

        let response = server
            .client
            .post(format!("{}/api/reindex", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "reindex_failed");
        assert_eq!(server.app.index.snapshot().len(), 1);
    }
}
