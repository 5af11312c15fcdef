//! # Trámites Knowledge
//!
//! Structured procedure records and the JSON knowledge base that holds them.
//!
//! Records are produced by an external scraper and keep its Spanish keys on disk
//! (`titulo`, `requisitos`, `opciones_ubicacion`, ...). In Rust they are plain typed
//! structs: optional fields are `Option`, blank strings count as absent, and the
//! free-form shapes (`costo`, `requisitos`, `observaciones`) are explicit enums.

mod error;
mod store;
mod types;
mod urls;

pub use error::{KnowledgeError, Result};
pub use store::{JsonKnowledgeBase, KnowledgeStore, UNTITLED_PROCEDURE};
pub use types::{
    ContactDetails, Cost, CostItem, FormEntry, LocationEntry, ProcedureData, ProcedureRecord,
    TextOrList, COST_UNSPECIFIED, UNKNOWN_CATEGORY,
};
pub use urls::ProcedureUrls;
