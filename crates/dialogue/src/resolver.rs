use crate::format::Formatter;
use crate::generator::Generator;
use crate::intent::IntentClassifier;
use crate::maps::map_link;
use crate::retriever::Retriever;
use crate::state::{DialogueState, DEFAULT_HISTORY_LIMIT};
use std::fmt;
use std::sync::Arc;
use tramites_knowledge::ProcedureRecord;
use tramites_protocol::{Intent, PendingSelection, TurnResponse, TurnStatus};
use tramites_vector_store::{DEFAULT_THRESHOLD, DEFAULT_TOP_K};

pub const EMPTY_QUERY_PROMPT: &str = "Por favor, escribí tu consulta.";
pub const INVALID_OPTION: &str =
    "Opción no válida. Respondé con el número de una de las ubicaciones de la lista.";
pub const INCOMPLETE_APOLOGY: &str = "Encontré algo relacionado, pero no pude obtener la información completa del trámite en este momento. Por favor, intentá de nuevo más tarde o sé más específico.";
pub const GENERATOR_APOLOGY: &str =
    "Hubo un problema técnico al generar la respuesta. Intentá de nuevo más tarde.";
pub const INTERNAL_APOLOGY: &str = "Ocurrió un error inesperado. Por favor, intentá de nuevo.";

/// Queries shorter than this stay on the active procedure even without a facet keyword
const SHORT_QUERY_TOKENS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub top_k: usize,
    pub threshold: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Path a turn took through the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    EmptyQuery,
    Selection,
    ContextContinuation,
    NewLookup,
    MultiLocation,
    NoMatch,
    /// Index lookup failed; the Generator answered instead
    RetrievalFallback,
    Internal,
}

impl Route {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyQuery => "empty_query",
            Self::Selection => "selection",
            Self::ContextContinuation => "context_continuation",
            Self::NewLookup => "new_lookup",
            Self::MultiLocation => "multi_location",
            Self::NoMatch => "no_match",
            Self::RetrievalFallback => "retrieval_fallback",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    pub route: Route,
    pub response: TurnResponse,
}

impl TurnOutcome {
    fn new(status: TurnStatus, route: Route, response: TurnResponse) -> Self {
        Self {
            status,
            route,
            response,
        }
    }

    /// Generic apology for a turn that could not run to completion
    #[must_use]
    pub fn internal() -> Self {
        Self::new(
            TurnStatus::Internal,
            Route::Internal,
            TurnResponse::text(INTERNAL_APOLOGY),
        )
    }
}

/// Decides, per turn, whether to answer from the active procedure, look one up, ask the user
/// to pick an office, or defer to the Generator.
pub struct Resolver {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    params: SearchParams,
    history_limit: usize,
}

impl Resolver {
    pub fn new(retriever: Arc<dyn Retriever>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
            params: SearchParams::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub const fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub const fn params(&self) -> SearchParams {
        self.params
    }

    /// Run one turn against `state`.
    ///
    /// The state is replaced only when the turn succeeds; after a Generator failure it is
    /// exactly what it was before the call.
    pub async fn handle_turn(&self, query: &str, state: &mut DialogueState) -> TurnOutcome {
        let query = query.trim();
        if query.is_empty() {
            return TurnOutcome::new(
                TurnStatus::Answered,
                Route::EmptyQuery,
                TurnResponse::text(EMPTY_QUERY_PROMPT),
            );
        }

        let mut next = state.clone();
        let outcome = self.resolve(query, &mut next).await;
        log::info!(
            "Turn resolved via {} (status {:?}, intent {})",
            outcome.route,
            outcome.status,
            outcome
                .response
                .intent
                .map_or("none", Intent::as_str)
        );

        if !outcome.status.is_failure() {
            next.record_turn(query, &outcome.response.text, self.history_limit);
            *state = next;
        }
        outcome
    }

    async fn resolve(&self, query: &str, state: &mut DialogueState) -> TurnOutcome {
        let intent = IntentClassifier::classify(query);

        if let Some(choice) = parse_choice(query) {
            if let Some(pending) = state.pending_selection.take() {
                return Self::select(choice, pending, state);
            }
        }

        if let Some(active) = state.active_record.clone() {
            let continues = intent != Intent::General
                || IntentClassifier::token_count(query) < SHORT_QUERY_TOKENS;
            if continues {
                log::debug!("Continuing with active procedure '{}'", active.title());
                if intent == Intent::Location && active.needs_location_choice() {
                    return Self::prompt_location(active, intent, state);
                }
                return Self::answer(&active, intent, Route::ContextContinuation);
            }
        }

        self.lookup(query, intent, state).await
    }

    fn select(choice: usize, pending: PendingSelection, state: &mut DialogueState) -> TurnOutcome {
        let count = pending.locations.len();
        let Some(index) = choice.checked_sub(1).filter(|idx| *idx < count) else {
            log::info!("Selection {choice} outside 1..={count}");
            let response = TurnResponse {
                text: INVALID_OPTION.to_string(),
                intent: Some(Intent::Location),
                needs_selection: true,
                location_options: pending.locations.clone(),
                ..TurnResponse::default()
            };
            state.pending_selection = Some(pending);
            return TurnOutcome::new(TurnStatus::InvalidSelection, Route::Selection, response);
        };

        let mut merged = pending
            .record
            .with_location(index, &pending.locations[index]);
        merged.data.map_url = merged.data.contact.address().map(map_link);
        log::info!(
            "Location {choice} of {count} selected for '{}'",
            merged.title()
        );

        state.active_record = Some(merged.clone());
        Self::answer(&merged, Intent::Location, Route::Selection)
    }

    async fn lookup(&self, query: &str, intent: Intent, state: &mut DialogueState) -> TurnOutcome {
        let hits = match self
            .retriever
            .search(query, self.params.top_k, self.params.threshold)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                log::error!("Index search failed for '{query}', deferring to the generator: {e}");
                return self.generate(query, state, Route::RetrievalFallback).await;
            }
        };

        let Some(top) = hits.into_iter().next() else {
            state.clear_context();
            return self.generate(query, state, Route::NoMatch).await;
        };

        if top.record.title().is_empty() {
            log::warn!(
                "Matched procedure {} (score {:.3}) has no title",
                top.record.id,
                top.score
            );
            let response = TurnResponse {
                text: INCOMPLETE_APOLOGY.to_string(),
                suggestions: self.retriever.suggestions(),
                ..TurnResponse::default()
            };
            return TurnOutcome::new(TurnStatus::Incomplete, Route::NewLookup, response);
        }

        log::debug!("Matched '{}' with score {:.3}", top.record.title(), top.score);
        let record = match &state.active_record {
            Some(active) if active.id == top.record.id && active.data.selected_location.is_some() => {
                active.clone()
            }
            _ => (*top.record).clone(),
        };

        state.pending_selection = None;
        if record.needs_location_choice() {
            return Self::prompt_location(record, intent, state);
        }

        state.active_record = Some(record.clone());
        Self::answer(&record, intent, Route::NewLookup)
    }

    fn prompt_location(
        record: ProcedureRecord,
        intent: Intent,
        state: &mut DialogueState,
    ) -> TurnOutcome {
        let response = TurnResponse {
            text: Formatter::location_choices(&record),
            intent: Some(intent),
            structured_answer: None,
            needs_selection: true,
            location_options: record.data.location_options.clone(),
            suggestions: Vec::new(),
        };
        state.pending_selection = Some(PendingSelection::for_record(record.clone()));
        state.active_record = Some(record);
        TurnOutcome::new(
            TurnStatus::AwaitingSelection,
            Route::MultiLocation,
            response,
        )
    }

    fn answer(record: &ProcedureRecord, intent: Intent, route: Route) -> TurnOutcome {
        let formatted = Formatter::render(record, intent);
        let response = TurnResponse {
            text: formatted.text,
            intent: Some(intent),
            structured_answer: Some(formatted.structured),
            ..TurnResponse::default()
        };
        TurnOutcome::new(TurnStatus::Answered, route, response)
    }

    async fn generate(&self, query: &str, state: &DialogueState, route: Route) -> TurnOutcome {
        let history = state.history_messages(self.history_limit);
        match self.generator.complete(query, &history).await {
            Ok(text) => TurnOutcome::new(TurnStatus::Generated, route, TurnResponse::text(text)),
            Err(e) => {
                log::error!("Generator failed for '{query}': {e}");
                TurnOutcome::new(
                    TurnStatus::Failed,
                    route,
                    TurnResponse::text(GENERATOR_APOLOGY),
                )
            }
        }
    }
}

/// A query made only of ASCII digits, as a 1-based choice. Oversized numbers saturate and
/// land out of range.
fn parse_choice(query: &str) -> Option<usize> {
    if query.is_empty() || !query.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(query.parse().unwrap_or(usize::MAX))
}
