use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tramites_dialogue::{SearchParams, DEFAULT_HISTORY_LIMIT};
use tramites_vector_store::{EmbeddingConfig, DEFAULT_THRESHOLD, DEFAULT_TOP_K};

pub(crate) const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Settings for one process, read from an optional TOML file.
///
/// Precedence is defaults < file < environment < command-line flags. The caller applies
/// the flags after [`AppConfig::load`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub knowledge: KnowledgeConfig,
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
    pub generator: GeneratorConfig,
    pub dialogue: DialogueConfig,
    pub moderation: ModerationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct KnowledgeConfig {
    pub base_file: PathBuf,
    pub urls_file: PathBuf,
    /// Persisted procedure embeddings, reused across restarts and reindexes
    pub embeddings_file: PathBuf,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            base_file: PathBuf::from("data/tramites_knowledge_base.json"),
            urls_file: PathBuf::from("data/tramites_urls.json"),
            embeddings_file: PathBuf::from("data/tramites_embeddings.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RetrievalConfig {
    pub threshold: f32,
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl RetrievalConfig {
    pub(crate) fn search_params(self) -> SearchParams {
        SearchParams {
            top_k: self.top_k.max(1),
            threshold: self.threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GeneratorConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Only ever taken from the environment
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "google/gemini-2.0-flash-exp:free".to_string(),
            timeout_secs: 45,
            max_tokens: 1000,
            temperature: 0.5,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DialogueConfig {
    pub history_limit: usize,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ModerationConfig {
    pub forbidden: Vec<String>,
    pub whitelist: Vec<String>,
}

const FORBIDDEN_WORDS: &[&str] = &[
    "pelotudo",
    "boludo",
    "idiota",
    "estúpido",
    "imbécil",
    "cabrón",
    "hijo de puta",
    "concha",
    "mierda",
    "puto",
    "culiao",
    "forro",
    "carajo",
    "puta",
    "pelotuda",
    "boluda",
    "tarado",
    "tarada",
    "gil",
    "conchudo",
    "chupapija",
    "trolazo",
    "cagón",
    "cagona",
    "mierdoso",
    "pelotudazo",
    "ortiva",
    "orto",
    "reventado",
    "choto",
    "chota",
    "pajero",
    "pajera",
    "capo",
    "capo de mierda",
    "negro de mierda",
    "vago",
    "vaga",
    "hijueputa",
    "nderakore",
    "kyhyje",
    "mita'i",
    "pajagua",
    "kuña kue",
    "mbarete",
    "porombo",
    "japu",
    "kaigue",
    "ñemby",
    "que me importa",
    "inutil",
    "asqueroso",
    "bobo",
    "payaso",
    "pendejo",
    "bobito",
    "la puta madre",
    "negro",
    "negra",
];

const WHITELIST: &[&str] = &[
    "trámite",
    "solicitud",
    "documento",
    "ciudadano",
    "provincia",
    "formosa",
    "oficial",
    "quiero hacerle",
    "me gustaria hacer",
];

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            forbidden: FORBIDDEN_WORDS.iter().map(ToString::to_string).collect(),
            whitelist: WHITELIST.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ServerConfig {
    pub bind: String,
    pub public: bool,
    pub session_ttl_secs: u64,
    pub session_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            public: false,
            session_ttl_secs: 3600,
            session_capacity: 1024,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given, then with the environment
    pub(crate) async fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::parse(&raw)
                    .with_context(|| format!("Invalid config file {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    pub(crate) fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_env(&mut self) -> Result<()> {
        self.embedding
            .apply_env()
            .context("Invalid embedding environment")?;
        self.generator.api_key = env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tramites_vector_store::EmbeddingMode;

    #[test]
    fn defaults_match_the_deployment() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.retrieval.threshold, 0.55);
        assert_eq!(config.retrieval.top_k, 1);
        assert_eq!(
            config.knowledge.embeddings_file,
            PathBuf::from("data/tramites_embeddings.json")
        );
        assert_eq!(config.generator.timeout_secs, 45);
        assert_eq!(config.dialogue.history_limit, 10);
        assert_eq!(config.embedding.dimension, 384);
        assert!(config.moderation.forbidden.iter().any(|w| w == "hijo de puta"));
        assert!(config.moderation.whitelist.iter().any(|w| w == "formosa"));
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let config = AppConfig::parse(
            r#"
[retrieval]
threshold = 0.7

[embedding]
mode = "stub"

[server]
bind = "127.0.0.1:8080"
"#,
        )
        .unwrap();

        assert_eq!(config.retrieval.threshold, 0.7);
        assert_eq!(config.retrieval.top_k, 1);
        assert_eq!(config.embedding.mode, EmbeddingMode::Stub);
        assert_eq!(config.embedding.max_batch, 32);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.session_capacity, 1024);
        assert_eq!(config.knowledge, KnowledgeConfig::default());
    }

    #[test]
    fn api_key_is_never_read_from_the_file() {
        let config = AppConfig::parse(
            r#"
[generator]
api_key = "from-file"
model = "other/model"
"#,
        )
        .unwrap();
        assert_eq!(config.generator.api_key, None);
        assert_eq!(config.generator.model, "other/model");
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(AppConfig::parse("[retrieval]\nthreshold = \"high\"").is_err());
        assert!(AppConfig::parse("").is_ok());
    }

    #[test]
    fn search_params_never_ask_for_zero_hits() {
        let params = RetrievalConfig {
            threshold: 0.4,
            top_k: 0,
        }
        .search_params();
        assert_eq!(params.top_k, 1);
        assert_eq!(params.threshold, 0.4);
    }

    #[tokio::test]
    async fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("nope.toml")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
