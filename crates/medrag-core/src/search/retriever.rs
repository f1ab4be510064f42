//! Multi-stage retrieval: expand, coarse search, context rerank, truncate

use super::expander::QueryExpander;
use super::rerank::rerank;
use crate::config::RetrievalConfig;
use crate::embed::Embedder;
use crate::error::{MedRagError, Result};
use crate::index::{compare_hits, DocumentIndex};
use crate::types::{DocumentRecord, PatientContext, ScoredResult};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the coarse stage produced its candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Vector similarity over encoded query variants
    Semantic,
    /// Encoding failed; lexical scoring over document text
    KeywordFallback,
    /// No index loaded
    Unavailable,
}

/// Ranked evidence plus how it was obtained
#[derive(Debug, Clone, Serialize)]
pub struct Retrieval {
    pub results: Vec<ScoredResult>,
    pub mode: RetrievalMode,
    /// True when the soft deadline cut a stage short
    pub partial: bool,
    /// Query variants actually searched, original first
    pub variants: Vec<String>,
}

impl Retrieval {
    fn empty(mode: RetrievalMode, variants: Vec<String>) -> Self {
        Self {
            results: Vec::new(),
            mode,
            partial: false,
            variants,
        }
    }
}

/// Per-request retrieval pipeline over shared read-only state
pub struct Retriever<'a> {
    index: Option<&'a DocumentIndex>,
    embedder: &'a dyn Embedder,
    expander: &'a QueryExpander,
    config: &'a RetrievalConfig,
}

impl<'a> Retriever<'a> {
    pub fn new(
        index: Option<&'a DocumentIndex>,
        embedder: &'a dyn Embedder,
        expander: &'a QueryExpander,
        config: &'a RetrievalConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            expander,
            config,
        }
    }

    /// Ranked results, at most `top_k` of them
    pub async fn retrieve(
        &self,
        query: &str,
        ctx: &PatientContext,
        top_k: i64,
    ) -> Result<Vec<ScoredResult>> {
        Ok(self.retrieve_detailed(query, ctx, top_k).await?.results)
    }

    pub async fn retrieve_detailed(
        &self,
        query: &str,
        ctx: &PatientContext,
        top_k: i64,
    ) -> Result<Retrieval> {
        if top_k <= 0 {
            return Err(MedRagError::InvalidArgument(format!(
                "top_k must be positive, got {}",
                top_k
            )));
        }
        if top_k as u64 > self.config.max_top_k as u64 {
            return Err(MedRagError::InvalidArgument(format!(
                "top_k must be at most {}, got {}",
                self.config.max_top_k, top_k
            )));
        }
        if query.trim().is_empty() {
            return Err(MedRagError::InvalidArgument(
                "query text is empty".to_string(),
            ));
        }
        let top_k = top_k as usize;

        let Some(index) = self.index else {
            tracing::warn!("No document index loaded, semantic search unavailable");
            let variants = vec![query.trim().to_string()];
            return Ok(Retrieval::empty(RetrievalMode::Unavailable, variants));
        };

        let variants = self.expander.expand(query);
        if index.is_empty() {
            return Ok(Retrieval::empty(RetrievalMode::Semantic, variants));
        }

        let start = Instant::now();
        let deadline = start + Duration::from_millis(self.config.timeout_ms);
        let per_variant = self.config.candidates_per_variant();
        let mut partial = false;

        let encoded = self.encode_variants(&variants, index.dimension(), deadline).await;
        let (mode, candidates) = match encoded {
            Some(vectors) => {
                let mut hits = Vec::new();
                for (i, vector) in vectors.iter().enumerate() {
                    if i > 0 && Instant::now() >= deadline {
                        tracing::warn!(
                            "Search deadline reached after {} of {} variants",
                            i,
                            vectors.len()
                        );
                        partial = true;
                        break;
                    }
                    if let Some(v) = vector {
                        hits.push(index.search(v, per_variant)?);
                    }
                }
                (RetrievalMode::Semantic, merge(hits))
            }
            None => {
                tracing::warn!("Query encoding failed, falling back to keyword search");
                let hits = variants
                    .iter()
                    .map(|v| index.keyword_search(v, per_variant))
                    .collect();
                (RetrievalMode::KeywordFallback, merge(hits))
            }
        };

        let candidate_count = candidates.len();
        let reranked = rerank(candidates, ctx, self.config, Some(deadline), top_k);
        let mut results = reranked.results;
        results.truncate(top_k);

        tracing::debug!(
            "Retrieved {} results from {} candidates ({:?}) in {}ms",
            results.len(),
            candidate_count,
            mode,
            start.elapsed().as_millis()
        );

        Ok(Retrieval {
            results,
            mode,
            partial: partial || reranked.partial,
            variants,
        })
    }

    /// Encode every variant concurrently under the soft deadline.
    /// Returns `None` when the original query could not be encoded; other
    /// variants that fail are skipped.
    async fn encode_variants(
        &self,
        variants: &[String],
        dimension: usize,
        deadline: Instant,
    ) -> Option<Vec<Option<Vec<f32>>>> {
        let budget = deadline.saturating_duration_since(Instant::now());
        let jobs = variants.iter().map(|v| self.embedder.embed(v));

        let outcomes = match tokio::time::timeout(budget, join_all(jobs)).await {
            Ok(outcomes) => outcomes,
            Err(_) => {
                tracing::warn!("Query encoding exceeded {}ms budget", budget.as_millis());
                return None;
            }
        };

        let vectors: Vec<Option<Vec<f32>>> = outcomes
            .into_iter()
            .zip(variants)
            .map(|(outcome, variant)| match outcome {
                Ok(v) if v.len() == dimension => Some(v),
                Ok(v) => {
                    tracing::warn!(
                        "Encoder returned dimension {} for '{}', index expects {}",
                        v.len(),
                        variant,
                        dimension
                    );
                    None
                }
                Err(e) => {
                    tracing::warn!("Failed to encode '{}': {}", variant, e);
                    None
                }
            })
            .collect();

        match vectors.first() {
            Some(Some(_)) => Some(vectors),
            _ => None,
        }
    }
}

/// Union hits across variants, keeping each document's best similarity,
/// ordered by similarity desc then id asc.
fn merge(hit_lists: Vec<Vec<(Arc<DocumentRecord>, f32)>>) -> Vec<(Arc<DocumentRecord>, f32)> {
    let mut best: HashMap<String, (Arc<DocumentRecord>, f32)> = HashMap::new();
    for (doc, sim) in hit_lists.into_iter().flatten() {
        let entry = best.entry(doc.id.clone()).or_insert((Arc::clone(&doc), sim));
        if sim > entry.1 {
            entry.1 = sim;
        }
    }
    let mut merged: Vec<(Arc<DocumentRecord>, f32)> = best.into_values().collect();
    merged.sort_by(|a, b| compare_hits((a.0.id.as_str(), a.1), (b.0.id.as_str(), b.1)));
    merged
}
