use crate::config::GeneratorConfig;
use anyhow::{Context as AnyhowContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tramites_dialogue::{Generator, GeneratorError, HistoryMessage};

pub(crate) const SYSTEM_PROMPT: &str = "Sos un asistente virtual especializado exclusivamente en trámites del Gobierno de Formosa, Argentina. \
Respondé solo consultas sobre esos trámites: requisitos, costos, ubicación, horarios, formularios, pasos y observaciones. \
No inventes datos: si no conocés la respuesta, indicá que no tenés esa información y sugerí consultar el sitio oficial. \
Si la consulta no está relacionada con trámites de Formosa, respondé exactamente: \
\"Este asistente solo responde consultas relacionadas a trámites del Gobierno de Formosa. No puedo ayudarte con eso.\" \
Respondé en español rioplatense, de forma breve y cordial.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenRouter (or any OpenAI-compatible endpoint)
pub(crate) struct OpenRouterGenerator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl OpenRouterGenerator {
    pub(crate) fn new(config: &GeneratorConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn request_body<'a>(
        &'a self,
        query: &'a str,
        history: &'a [HistoryMessage],
    ) -> CompletionRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT,
        });
        messages.extend(history.iter().map(|message| ChatMessage {
            role: message.role.as_str(),
            content: &message.text,
        }));
        messages.push(ChatMessage {
            role: "user",
            content: query,
        });
        CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

#[async_trait]
impl Generator for OpenRouterGenerator {
    async fn complete(
        &self,
        query: &str,
        history: &[HistoryMessage],
    ) -> std::result::Result<String, GeneratorError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GeneratorError::NotConfigured(format!(
                "{} is not set",
                crate::config::API_KEY_ENV
            )));
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&self.request_body(query, history))
            .send()
            .await
            .map_err(|err| GeneratorError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CompletionResponse = response
            .json()
            .await
            .map_err(|err| GeneratorError::Malformed(err.to_string()))?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| {
                GeneratorError::Malformed("missing choices[0].message.content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer, api_key: Option<&str>) -> OpenRouterGenerator {
        OpenRouterGenerator::new(&GeneratorConfig {
            endpoint: format!("{}/api/v1/chat/completions", server.uri()),
            timeout_secs: 5,
            api_key: api_key.map(ToString::to_string),
            ..GeneratorConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn returns_the_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Hola!  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let history = vec![
            HistoryMessage::user("requisitos"),
            HistoryMessage::assistant("DNI"),
        ];
        let text = generator(&server, Some("secret"))
            .complete("gracias", &history)
            .await
            .unwrap();
        assert_eq!(text, "Hola!");

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "google/gemini-2.0-flash-exp:free");
        assert_eq!(body["max_tokens"], 1000);
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(body["messages"][3]["content"], "gracias");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = generator(&server, Some("secret"))
            .complete("hola", &[])
            .await
            .unwrap_err();
        match err {
            GeneratorError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn slow_upstream_times_out_as_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(std::time::Duration::from_secs(3))
                    .set_body_json(json!({
                        "choices": [{ "message": { "content": "tarde" } }]
                    })),
            )
            .mount(&server)
            .await;

        let generator = OpenRouterGenerator::new(&GeneratorConfig {
            endpoint: format!("{}/api/v1/chat/completions", server.uri()),
            timeout_secs: 1,
            api_key: Some("secret".to_string()),
            ..GeneratorConfig::default()
        })
        .unwrap();

        let started = std::time::Instant::now();
        let err = generator.complete("hola", &[]).await.unwrap_err();
        assert!(matches!(err, GeneratorError::Transport(_)), "{err}");
        assert!(started.elapsed() < std::time::Duration::from_secs(3));
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = generator(&server, Some("secret"))
            .complete("hola", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::Malformed(_)));
    }

    #[tokio::test]
    async fn missing_key_never_calls_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = generator(&server, None)
            .complete("hola", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GeneratorError::NotConfigured(_)));
    }
}
