//! Medrag Core Library
//!
//! Retrieval and drug-safety core for patient-aware medical consultations.
//!
//! # Features
//! - Dense document index with exact inner-product search and HNSW acceleration
//! - Medical query expansion (synonyms, abbreviations, symptom-to-condition)
//! - Multi-stage retrieval with patient-context re-ranking and keyword fallback
//! - Typed knowledge graph of drugs, drug classes and conditions
//! - Interaction and contraindication analysis over the graph

pub mod config;
pub mod embed;
pub mod error;
pub mod graph;
pub mod index;
pub mod search;
pub mod service;
pub mod types;

pub use config::{Config, EmbeddingProvider, EmbeddingServiceConfig, RerankWeights, RetrievalConfig};
pub use embed::{embedder_from_config, Embedder, HashingEmbedder, HttpEmbedder};
pub use error::{Error, MedRagError, Result};
pub use graph::{
    DrugResolver, FindingKind, GraphEdge, GraphNode, GraphSnapshot, InteractionAnalyzer,
    InteractionFinding, KnowledgeGraph, NodeKey, NodeKind, Severity, StaticResolver,
};
pub use index::{DocumentIndex, IndexOptions, IndexStats};
pub use search::{ExpansionTable, QueryExpander, Retrieval, RetrievalMode, Retriever};
pub use service::{
    ConsultationReport, ConsultationRequest, ConsultationService, KnowledgeBase, SnapshotStore,
};
pub use types::{
    AgeRange, DocumentMetadata, DocumentRecord, Gender, PatientContext, ScoreBreakdown,
    ScoredResult,
};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "medrag";
