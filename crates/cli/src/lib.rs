use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use config::AppConfig;
use flags::EmbedMode;
use moderation::{KeywordModerator, Moderator, TOXIC_REPLY};
use openrouter::OpenRouterGenerator;
use serde::Serialize;
use server::AppState;
use sessions::SessionRegistry;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tramites_dialogue::{DialogueState, Resolver, TurnOutcome, TurnResponse, TurnStatus};
use tramites_knowledge::{JsonKnowledgeBase, ProcedureRecord, ProcedureUrls};
use tramites_protocol::{serialize_json, TurnRequest};
use tramites_vector_store::{ProcedureIndex, SharedIndex, Vectorizer};

mod config;
mod flags;
mod http_api;
mod moderation;
mod openrouter;
mod server;
mod server_security;
mod sessions;

pub(crate) fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "tramites")]
#[command(about = "Assistant for Formosa government procedures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Knowledge base JSON file (overrides knowledge.base_file)
    #[arg(long, global = true)]
    knowledge_base: Option<PathBuf>,

    /// Override embedding backend in this process
    #[arg(long, global = true, value_enum)]
    embed_mode: Option<EmbedMode>,

    /// Override embedding model id
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Model directory (overrides TRAMITES_MODEL_DIR)
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the chat API over HTTP (POST /api/chat)
    ServeHttp(ServeArgs),

    /// Answer one message, optionally carrying conversation state in a file
    Ask(AskArgs),

    /// Build the procedure index and optionally score a query against it
    Index(IndexArgs),

    /// Print the JSON Schema of turn requests and responses
    Schema,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to bind (default from config: 127.0.0.1:5000)
    #[arg(long)]
    bind: Option<String>,

    /// Allow binding to non-loopback addresses
    #[arg(long)]
    public: bool,
}

#[derive(Args)]
struct AskArgs {
    /// User message
    #[arg(required_unless_present = "request", conflicts_with = "request")]
    message: Option<String>,

    /// JSON file holding the conversation state between invocations
    #[arg(long, conflicts_with = "request")]
    state: Option<PathBuf>,

    /// Turn request JSON (message plus the context it carries); the updated context is
    /// printed under "state"
    #[arg(long)]
    request: Option<PathBuf>,
}

#[derive(Args)]
struct IndexArgs {
    /// Query to score against the index
    #[arg(long)]
    query: Option<String>,
}

#[derive(Serialize)]
struct AskOutput {
    status: TurnStatus,
    route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    moderation: Option<String>,
    response: TurnResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<DialogueState>,
}

#[derive(Serialize)]
struct IndexOutput {
    records: usize,
    indexed: usize,
    model: String,
    dimension: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    hits: Vec<ScoredHit>,
}

#[derive(Serialize)]
struct ScoredHit {
    id: String,
    title: String,
    score: f32,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(mode) = self.embed_mode {
            config.embedding.mode = mode.as_domain();
        }
        if let Some(model) = &self.embed_model {
            config.embedding.model = model.trim().to_ascii_lowercase();
        }
        if let Some(dir) = &self.model_dir {
            config.embedding.model_dir = dir.clone();
        }
        if let Some(path) = &self.knowledge_base {
            config.knowledge.base_file = path.clone();
        }
    }
}

pub async fn main_entry() -> Result<()> {
    // A missing .env is normal outside development.
    dotenvy::dotenv().ok();

    let mut cli = Cli::parse();

    // Keep stdout clean for JSON output
    if matches!(
        cli.command,
        Commands::Ask(_) | Commands::Index(_) | Commands::Schema
    ) && !cli.verbose
    {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // ort is extremely noisy below verbose
    if !cli.verbose {
        builder.filter_module("ort", log::LevelFilter::Off);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref()).await?;
    cli.apply_overrides(&mut config);

    match cli.command {
        Commands::ServeHttp(args) => serve_http(args, config).await?,
        Commands::Ask(args) => run_ask(args, config).await?,
        Commands::Index(args) => run_index(args, config).await?,
        Commands::Schema => run_schema()?,
    }

    Ok(())
}

async fn load_records(config: &AppConfig) -> Vec<ProcedureRecord> {
    let path = &config.knowledge.base_file;
    let base = match JsonKnowledgeBase::load(path).await {
        Ok(base) => base,
        Err(err) => {
            log::error!(
                "Failed to load knowledge base {}: {err}; starting with no procedures",
                path.display()
            );
            return Vec::new();
        }
    };

    match ProcedureUrls::load(&config.knowledge.urls_file).await {
        Ok(urls) => {
            let missing = urls.missing_from(&base);
            if !missing.is_empty() {
                log::warn!(
                    "{} of {} procedure URLs have no knowledge base entry yet",
                    missing.len(),
                    urls.len()
                );
                for url in missing {
                    log::debug!("Missing procedure: {url}");
                }
            }
        }
        Err(err) => log::warn!(
            "Ignoring procedure URL list {}: {err}",
            config.knowledge.urls_file.display()
        ),
    }

    base.into_records()
}

async fn build_index(config: &AppConfig) -> Result<(usize, ProcedureIndex)> {
    let vectorizer = Arc::new(
        Vectorizer::from_config(&config.embedding)
            .context("Failed to initialise the embedding model")?,
    );
    let records = load_records(config).await;
    let count = records.len();

    let started = Instant::now();
    let index =
        ProcedureIndex::build_cached(vectorizer, records, &config.knowledge.embeddings_file).await;
    log::info!(
        "Indexed {} of {count} procedures in {:.2?}",
        index.len(),
        started.elapsed()
    );
    Ok((count, index))
}

fn build_resolver(config: &AppConfig, index: Arc<SharedIndex>) -> Result<Resolver> {
    let generator = Arc::new(OpenRouterGenerator::new(&config.generator)?);
    if config.generator.api_key.is_none() {
        log::warn!(
            "{} is not set; questions without a matching procedure will fail",
            config::API_KEY_ENV
        );
    }
    Ok(Resolver::new(index, generator)
        .with_params(config.retrieval.search_params())
        .with_history_limit(config.dialogue.history_limit))
}

async fn serve_http(args: ServeArgs, mut config: AppConfig) -> Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config.server.public |= args.public;
    let addrs =
        server_security::resolve_guarded_bind_addrs(&config.server.bind, config.server.public)
            .await?;

    let (_, index) = build_index(&config).await?;
    let index =
        Arc::new(SharedIndex::new(index).with_cache(&config.knowledge.embeddings_file));
    let state = Arc::new(AppState {
        resolver: build_resolver(&config, index.clone())?,
        index,
        moderator: Arc::new(KeywordModerator::new(&config.moderation)?),
        sessions: SessionRegistry::new(
            Duration::from_secs(config.server.session_ttl_secs),
            config.server.session_capacity,
        ),
        knowledge_file: config.knowledge.base_file.clone(),
    });

    server::serve(state, &config.server.bind, &addrs).await
}

async fn load_state(path: Option<&Path>) -> Result<DialogueState> {
    match path {
        Some(path) => DialogueState::load(path)
            .await
            .with_context(|| format!("Failed to read state file {}", path.display())),
        None => Ok(DialogueState::new()),
    }
}

async fn read_request(path: &Path) -> Result<(String, DialogueState)> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read request file {}", path.display()))?;
    let request: TurnRequest = serde_json::from_slice(&bytes)
        .with_context(|| format!("Invalid turn request in {}", path.display()))?;
    Ok(DialogueState::from_request(request))
}

/// Run one turn on its own task. A panic leaves `state` untouched and yields an internal error.
async fn run_turn(resolver: Arc<Resolver>, message: String, state: &mut DialogueState) -> TurnOutcome {
    let mut working = state.clone();
    let task = tokio::spawn(async move {
        let outcome = resolver.handle_turn(&message, &mut working).await;
        (outcome, working)
    });
    match task.await {
        Ok((outcome, next)) => {
            *state = next;
            outcome
        }
        Err(err) => {
            log::error!("Turn aborted: {err}");
            TurnOutcome::internal()
        }
    }
}

async fn run_ask(args: AskArgs, config: AppConfig) -> Result<()> {
    let echo_state = args.request.is_some();
    let (message, mut state) = match (&args.request, args.message) {
        (Some(path), _) => read_request(path).await?,
        (None, Some(message)) => (message, load_state(args.state.as_deref()).await?),
        (None, None) => anyhow::bail!("A message or --request file is required"),
    };

    let verdict = KeywordModerator::new(&config.moderation)?.assess(&message);
    if verdict.toxic {
        let output = AskOutput {
            status: TurnStatus::Answered,
            route: "moderation".to_string(),
            moderation: verdict.reason,
            response: TurnResponse::text(TOXIC_REPLY),
            state: echo_state.then_some(state),
        };
        return print_stdout(&serialize_json(&output)?);
    }

    let (_, index) = build_index(&config).await?;
    let resolver = Arc::new(build_resolver(&config, Arc::new(SharedIndex::new(index)))?);
    let outcome = run_turn(resolver, message, &mut state).await;

    if let Some(path) = &args.state {
        state
            .save(path)
            .await
            .with_context(|| format!("Failed to write state file {}", path.display()))?;
    }

    let failed = outcome.status.is_failure();
    let route = outcome.route;
    print_stdout(&serialize_json(&AskOutput {
        status: outcome.status,
        route: route.to_string(),
        moderation: None,
        response: outcome.response,
        state: echo_state.then_some(state),
    })?)?;

    if failed {
        anyhow::bail!("Turn failed (route {route})");
    }
    Ok(())
}

async fn run_index(args: IndexArgs, config: AppConfig) -> Result<()> {
    let (records, index) = build_index(&config).await?;

    let mut hits = Vec::new();
    if let Some(query) = args.query.as_deref() {
        let vector = index.vectorizer().embed(query).await?;
        hits = index
            .entries()
            .iter()
            .map(|entry| ScoredHit {
                id: entry.id().to_string(),
                title: entry.title().to_string(),
                score: Vectorizer::cosine_similarity(&vector, entry.vector()),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    }

    let output = IndexOutput {
        records,
        indexed: index.len(),
        model: index.vectorizer().model().to_string(),
        dimension: index.vectorizer().dimension(),
        hits,
    };
    print_stdout(&serde_json::to_string_pretty(&output)?)
}

fn run_schema() -> Result<()> {
    let schemas = tramites_protocol::turn_schemas()?;
    print_stdout(&serde_json::to_string_pretty(&schemas)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use tramites_dialogue::{Generator, GeneratorError, HistoryMessage, Retriever};
    use tramites_vector_store::{SearchHit, VectorStoreError};

    struct Exploding;

    #[async_trait]
    impl Retriever for Exploding {
        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
            _threshold: f32,
        ) -> std::result::Result<Vec<SearchHit>, VectorStoreError> {
            panic!("index corrupted");
        }

        fn suggestions(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[async_trait]
    impl Generator for Exploding {
        async fn complete(
            &self,
            _query: &str,
            _history: &[HistoryMessage],
        ) -> std::result::Result<String, GeneratorError> {
            panic!("generator corrupted");
        }
    }

    #[tokio::test]
    async fn panicking_turn_is_internal_and_keeps_state() {
        let resolver = Arc::new(Resolver::new(Arc::new(Exploding), Arc::new(Exploding)));
        let mut state = DialogueState::new();
        state.record_turn("hola", "buenas", 10);
        let before = state.clone();

        let outcome = run_turn(resolver, "licencia de conducir".to_string(), &mut state).await;
        assert_eq!(outcome.status, TurnStatus::Internal);
        assert_eq!(outcome.route.as_str(), "internal");
        assert_eq!(state, before);
    }
}
