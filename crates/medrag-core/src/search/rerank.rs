//! Patient-context re-ranking
//!
//! The context-adjusted score is a weighted sum of five components. All
//! weights live in [`RetrievalConfig`], so scoring can be tested apart from
//! the search plumbing.

use crate::config::RetrievalConfig;
use crate::types::{DocumentRecord, Gender, PatientContext, ScoreBreakdown, ScoredResult};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// Fraction of the patient's conditions present in the document's tags.
/// Zero when the patient has no known conditions.
pub fn condition_overlap(doc: &DocumentRecord, ctx: &PatientContext) -> f64 {
    if ctx.conditions.is_empty() {
        return 0.0;
    }
    let hits = ctx
        .conditions
        .iter()
        .filter(|c| doc.metadata.condition_tags.iter().any(|t| t == *c))
        .count();
    hits as f64 / ctx.conditions.len() as f64
}

/// 1 on match or unspecified range, `-penalty` on mismatch, 0 when the age is unknown
pub fn age_match(doc: &DocumentRecord, ctx: &PatientContext, penalty: f64) -> f64 {
    let Some(age) = ctx.age else {
        return 0.0;
    };
    match doc.metadata.age_range {
        None => 1.0,
        Some(range) if range.contains(age) => 1.0,
        Some(_) => -penalty,
    }
}

pub fn gender_match(doc: &DocumentRecord, ctx: &PatientContext, penalty: f64) -> f64 {
    if ctx.gender == Gender::Unknown {
        return 0.0;
    }
    match doc.metadata.gender {
        None | Some(Gender::Unknown) => 1.0,
        Some(g) if g == ctx.gender => 1.0,
        Some(_) => -penalty,
    }
}

/// Weighted score components for one candidate
pub fn score(
    doc: &DocumentRecord,
    raw_similarity: f32,
    ctx: &PatientContext,
    config: &RetrievalConfig,
) -> ScoreBreakdown {
    let w = &config.weights;
    let similarity = if raw_similarity.is_finite() {
        (raw_similarity as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    ScoreBreakdown {
        similarity: w.similarity * similarity,
        condition: w.condition * condition_overlap(doc, ctx),
        age: w.age * age_match(doc, ctx, w.age_mismatch_penalty),
        gender: w.gender * gender_match(doc, ctx, w.gender_mismatch_penalty),
        domain_priority: w.domain * config.domain_priority(&doc.domain),
    }
}

/// Final ordering: score desc, raw similarity desc, id asc
pub fn compare_results(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.raw_similarity.total_cmp(&a.raw_similarity))
        .then_with(|| a.document.id.cmp(&b.document.id))
}

/// Outcome of a rerank pass
#[derive(Debug, Clone)]
pub struct Reranked {
    pub results: Vec<ScoredResult>,
    /// True when the deadline passed before every candidate was scored
    pub partial: bool,
}

/// Score candidates in the order given and sort them. Candidates are
/// expected best-raw-similarity first, so a pass cut short by `deadline`
/// keeps the strongest coarse matches. At least `floor` candidates are
/// always scored.
pub fn rerank(
    candidates: Vec<(Arc<DocumentRecord>, f32)>,
    ctx: &PatientContext,
    config: &RetrievalConfig,
    deadline: Option<Instant>,
    floor: usize,
) -> Reranked {
    let total = candidates.len();
    let mut results = Vec::with_capacity(total);
    let mut partial = false;

    for (document, raw_similarity) in candidates {
        if results.len() >= floor && deadline.is_some_and(|d| Instant::now() >= d) {
            partial = true;
            break;
        }
        let breakdown = score(&document, raw_similarity, ctx, config);
        results.push(ScoredResult {
            document,
            raw_similarity,
            score: breakdown.total(),
            breakdown,
        });
    }

    if partial {
        tracing::warn!(
            "Rerank deadline reached after {} of {} candidates",
            results.len(),
            total
        );
    }

    results.sort_by(compare_results);
    Reranked { results, partial }
}
