//! Evidence retrieval
//!
//! Provides:
//! - Table-driven query expansion (synonyms, abbreviations, symptom mapping)
//! - Topic-shaped query templates
//! - Patient-context re-ranking with an inspectable score breakdown
//! - The multi-stage retriever tying them to the document index

mod expander;
mod rerank;
mod retriever;
mod templates;

pub use expander::{ExpansionTable, QueryExpander, RawTable, DEFAULT_MAX_VARIANTS};
pub use rerank::{
    age_match, compare_results, condition_overlap, gender_match, rerank, score, Reranked,
};
pub use retriever::{Retrieval, RetrievalMode, Retriever};
pub use templates::{condition_query, medication_query, symptom_query, treatment_query};
