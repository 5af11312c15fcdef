//! # Tramites Dialogue
//!
//! Contextual resolution of procedure questions across turns.
//!
//! ```text
//! query + DialogueState
//!     │
//!     ├──> pending location choice + numeric reply ──> merge office, answer LOCATION
//!     ├──> active procedure + facet (or short) query ──> Formatter
//!     └──> Retriever::search
//!            ├─> hit with several offices ──> numbered list, wait for a number
//!            ├─> hit ──> Formatter
//!            └─> no hit / lookup error ──> Generator
//! ```
//!
//! The resolver works on a copy of the state and publishes it only when the turn completes.

mod error;
mod format;
mod generator;
mod intent;
mod maps;
mod resolver;
mod retriever;
mod state;

pub use error::{DialogueError, Result};
pub use format::{normalize, FormattedAnswer, Formatter, ADDRESS_UNAVAILABLE, UNTITLED};
pub use generator::{Generator, GeneratorError, HistoryMessage, Role};
pub use intent::{IntentClassifier, INTENT_TABLE};
pub use maps::{map_link, CITY};
pub use resolver::{
    Resolver, Route, SearchParams, TurnOutcome, EMPTY_QUERY_PROMPT, GENERATOR_APOLOGY,
    INCOMPLETE_APOLOGY, INTERNAL_APOLOGY, INVALID_OPTION,
};
pub use retriever::Retriever;
pub use state::{DialogueState, DEFAULT_HISTORY_LIMIT};

pub use tramites_protocol::{Intent, TurnResponse, TurnStatus};
