use axum::{
    body::Body,
    http::{HeaderValue, Response as HttpResponse, StatusCode},
    response::Response,
};
use serde::Serialize;
use tramites_protocol::{serialize_json, ErrorEnvelope};

pub(crate) const SESSION_HEADER: &str = "x-session-id";

pub(crate) fn error_body(code: &str, message: impl Into<String>) -> ErrorEnvelope {
    let envelope = ErrorEnvelope::new(code, message);
    match code {
        "invalid_request" => envelope
            .with_hint("Send a JSON body like {\"message\": \"requisitos de la licencia\"}."),
        "reindex_failed" => {
            envelope.with_hint("Check that the knowledge base file exists and is a JSON array.")
        }
        _ => envelope,
    }
}

/// JSON response, echoing the session id when there is one
pub(crate) fn build_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    session_id: Option<&str>,
) -> Result<Response, StatusCode> {
    let bytes = serialize_json(body)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .into_bytes();

    let mut builder = HttpResponse::builder()
        .status(status)
        .header("content-type", "application/json");

    if let Some(id) = session_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        builder = builder.header(SESSION_HEADER, id);
    }

    Ok(builder
        .body(Body::from(bytes))
        .expect("valid HTTP response"))
}
