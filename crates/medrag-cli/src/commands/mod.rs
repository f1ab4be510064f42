//! CLI command handlers

pub mod consult;
pub mod graph;
pub mod index;
pub mod interactions;
pub mod search;

use medrag_core::{embedder_from_config, Config, ConsultationService, KnowledgeBase, SnapshotStore};
use std::sync::Arc;

/// Load snapshots once and wire up the request handler
pub fn open_service(config: &Config) -> anyhow::Result<ConsultationService> {
    let base = KnowledgeBase::load(config)?;
    let embedder = embedder_from_config(&config.embedding)?;
    Ok(ConsultationService::new(
        Arc::new(SnapshotStore::new(base)),
        embedder,
        config.clone(),
    ))
}
