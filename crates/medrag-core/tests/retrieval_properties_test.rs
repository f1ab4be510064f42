//! Integration tests for the retrieval pipeline
//!
//! Tests:
//! 1. Determinism of ranked output
//! 2. Snapshot save/load round-trip
//! 3. Prefix stability when top_k grows
//! 4. Patient-context neutrality for unspecified ranges
//! 5. Empty corpus behaviour
//! 6. Prefix stability on corpora larger than the candidate pool

use medrag_core::config::RetrievalConfig;
use medrag_core::search::{ExpansionTable, RawTable};
use medrag_core::{
    AgeRange, DocumentIndex, DocumentMetadata, DocumentRecord, Gender, HashingEmbedder,
    PatientContext, QueryExpander, RetrievalMode, Retriever, ScoredResult,
};
use proptest::prelude::*;
use tempfile::TempDir;

const DIMS: usize = 96;

const PASSAGES: &[&str] = &[
    "Hypertension treatment with ACE inhibitors in older adults",
    "Fever and cough in children: when to seek care",
    "Warfarin and aspirin together raise bleeding risk",
    "Type 2 diabetes first-line therapy with metformin",
    "Chest pain triage for suspected heart attack",
    "Headache red flags and migraine management",
    "Shortness of breath in asthma exacerbations",
    "Pregnancy and safe analgesic choices",
    "Kidney function monitoring on lisinopril",
    "Statins and muscle pain reports",
];

const DOMAINS: &[&str] = &["pubmed", "who_guidelines", "pharmacology", "general_literature"];

const QUERY_WORDS: &[&str] = &[
    "fever", "high bp", "chest pain", "diabetes", "bleeding", "headache", "sob", "kidney",
    "pregnancy", "muscle pain",
];

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn corpus(embedder: &HashingEmbedder, size: usize) -> Vec<DocumentRecord> {
    (0..size)
        .map(|i| {
            let text = format!("{} (record {})", PASSAGES[i % PASSAGES.len()], i);
            let age_range = match i % 4 {
                0 => None,
                1 => Some(AgeRange::new(Some(0), Some(17))),
                2 => Some(AgeRange::new(Some(18), Some(64))),
                _ => Some(AgeRange::new(Some(65), None)),
            };
            let gender = match i % 5 {
                0 => Some(Gender::Female),
                1 => Some(Gender::Male),
                _ => None,
            };
            let metadata = DocumentMetadata {
                age_range,
                gender,
                condition_tags: vec![["hypertension", "type_2_diabetes", "asthma"][i % 3].to_string()],
                ..Default::default()
            };
            DocumentRecord::new(format!("doc-{:03}", i), DOMAINS[i % DOMAINS.len()], text.clone())
                .with_embedding(embedder.encode(&text))
                .with_metadata(metadata)
        })
        .collect()
}

fn ids(results: &[ScoredResult]) -> Vec<String> {
    results.iter().map(|r| r.id().to_string()).collect()
}

#[tokio::test]
async fn test_repeated_retrieval_is_byte_identical() {
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::build(corpus(&embedder, 40)).unwrap();
    let expander = QueryExpander::default();
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);
    let ctx = PatientContext::unknown()
        .with_age(70)
        .with_gender(Gender::Male)
        .with_condition("Hypertension");

    let first = retriever.retrieve("high bp in elderly", &ctx, 8).await.unwrap();
    let second = retriever.retrieve("high bp in elderly", &ctx, 8).await.unwrap();

    assert_eq!(first.len(), 8);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_results_never_expose_embeddings() {
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::build(corpus(&embedder, 12)).unwrap();
    let expander = QueryExpander::default();
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);

    let results = retriever
        .retrieve("fever", &PatientContext::unknown(), 3)
        .await
        .unwrap();
    let json = serde_json::to_string(&results).unwrap();
    assert!(!json.contains("embedding"));
    assert!(json.contains("breakdown"));
}

#[test]
fn test_snapshot_round_trip_preserves_search() {
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::build(corpus(&embedder, 30)).unwrap();
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("index");
    index.save(&dir).unwrap();

    let loaded = DocumentIndex::load(&dir).unwrap();
    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.dimension(), index.dimension());

    for query in QUERY_WORDS {
        let vector = embedder.encode(query);
        let before = index.search(&vector, 10).unwrap();
        let after = loaded.search(&vector, 10).unwrap();
        assert_eq!(before.len(), after.len());
        for ((a, sa), (b, sb)) in before.iter().zip(after.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(sa.to_bits(), sb.to_bits());
            assert_eq!(a.metadata, b.metadata);
            let bits_a: Vec<u32> = a.embedding.iter().map(|v| v.to_bits()).collect();
            let bits_b: Vec<u32> = b.embedding.iter().map(|v| v.to_bits()).collect();
            assert_eq!(bits_a, bits_b);
        }
    }
}

#[tokio::test]
async fn test_context_neutrality_for_unspecified_range() {
    let embedder = HashingEmbedder::new(DIMS);
    let text = "Paracetamol dosing for fever";
    let record = |id: &str, range: Option<AgeRange>| {
        DocumentRecord::new(id, "pubmed", text)
            .with_embedding(embedder.encode(text))
            .with_metadata(DocumentMetadata {
                age_range: range,
                ..Default::default()
            })
    };
    let index = DocumentIndex::build(vec![
        record("excludes", Some(AgeRange::new(Some(0), Some(12)))),
        record("includes", Some(AgeRange::new(Some(18), Some(60)))),
        record("unspecified", None),
    ])
    .unwrap();
    let expander = QueryExpander::default();
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);

    let adult = PatientContext::unknown().with_age(35);
    let results = retriever.retrieve("fever", &adult, 3).await.unwrap();
    let score = |id: &str| results.iter().find(|r| r.id() == id).unwrap().score;

    assert_eq!(score("unspecified"), score("includes"));
    assert!(score("excludes") < score("includes"));
    assert_eq!(results.last().unwrap().id(), "excludes");

    let unknown = retriever
        .retrieve("fever", &PatientContext::unknown(), 3)
        .await
        .unwrap();
    let first = unknown[0].score;
    assert!(unknown.iter().all(|r| r.score == first));
    assert_eq!(ids(&unknown), vec!["excludes", "includes", "unspecified"]);
}

#[tokio::test]
async fn test_empty_corpus_returns_empty_sequence() {
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::empty(DIMS);
    let expander = QueryExpander::default();
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);

    let ctx = PatientContext::unknown().with_age(30);
    let retrieval = retriever.retrieve_detailed("fever", &ctx, 5).await.unwrap();
    assert!(retrieval.results.is_empty());
    assert_eq!(retrieval.mode, RetrievalMode::Semantic);
}

/// Unit vector at `angle` radians from `query`, rotating toward basis axis `axis`
fn rotated(query: &[f32], axis: usize, angle: f32) -> Vec<f32> {
    let mut orthogonal = vec![0.0f32; query.len()];
    orthogonal[axis] = 1.0;
    let along: f32 = query[axis];
    for (o, q) in orthogonal.iter_mut().zip(query) {
        *o -= along * q;
    }
    let norm: f32 = orthogonal.iter().map(|x| x * x).sum::<f32>().sqrt();
    query
        .iter()
        .zip(&orthogonal)
        .map(|(q, o)| angle.cos() * q + angle.sin() * o / norm)
        .collect()
}

/// 100 untagged close neighbours plus 10 condition-tagged guideline
/// records sitting just outside them.
fn crowded_corpus(embedder: &HashingEmbedder, query: &str) -> DocumentIndex {
    let q = embedder.encode(query);
    let axis = q
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
        .map(|(i, _)| i)
        .unwrap();

    let mut records: Vec<DocumentRecord> = (0..100)
        .map(|i| {
            DocumentRecord::new(format!("top-{:03}", i), "general_literature", format!("near {}", i))
                .with_embedding(rotated(&q, axis, 0.001 * i as f32))
        })
        .collect();
    records.extend((0..10).map(|i| {
        DocumentRecord::new(format!("who-{:03}", i), "who_guidelines", format!("guideline {}", i))
            .with_embedding(rotated(&q, axis, 0.2 + 0.001 * i as f32))
            .with_metadata(DocumentMetadata {
                condition_tags: vec!["asthma".to_string()],
                ..Default::default()
            })
    }));
    DocumentIndex::build(records).unwrap()
}

#[tokio::test]
async fn test_prefix_stable_past_candidate_pool() {
    let embedder = HashingEmbedder::new(DIMS);
    let index = crowded_corpus(&embedder, "wheeze");
    let expander = QueryExpander::new(ExpansionTable::from_raw(RawTable::default()), 5);
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);
    let ctx = PatientContext::unknown().with_condition("asthma");

    let crossover = (config.candidate_pool / config.overfetch_factor) as i64;
    let mut previous = retriever.retrieve("wheeze", &ctx, crossover - 2).await.unwrap();
    for k in (crossover - 1)..=(crossover + 3) {
        let current = retriever.retrieve("wheeze", &ctx, k).await.unwrap();
        assert_eq!(current.len() as i64, k);
        assert_eq!(ids(&previous), ids(&current[..previous.len()]), "k = {}", k);
        previous = current;
    }
    assert!(previous[0].id().starts_with("who-"));
}

#[tokio::test]
async fn test_top_k_above_limit_is_rejected() {
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::build(corpus(&embedder, 10)).unwrap();
    let expander = QueryExpander::default();
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);

    let limit = config.max_top_k as i64;
    assert!(retriever.retrieve("fever", &PatientContext::unknown(), limit).await.is_ok());
    let err = retriever
        .retrieve("fever", &PatientContext::unknown(), limit + 1)
        .await
        .unwrap_err();
    assert!(matches!(err, medrag_core::MedRagError::InvalidArgument(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_growing_top_k_keeps_prefix(
        word in 0..QUERY_WORDS.len(),
        k in 1i64..20,
        age in proptest::option::of(0u32..95),
    ) {
        let embedder = HashingEmbedder::new(DIMS);
        let index = DocumentIndex::build(corpus(&embedder, 40)).unwrap();
        let expander = QueryExpander::default();
        let config = RetrievalConfig::default();
        let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);
        let mut ctx = PatientContext::unknown().with_condition("asthma");
        ctx.age = age;

        let rt = runtime();
        let smaller = rt.block_on(retriever.retrieve(QUERY_WORDS[word], &ctx, k)).unwrap();
        let larger = rt.block_on(retriever.retrieve(QUERY_WORDS[word], &ctx, k + 1)).unwrap();

        prop_assert_eq!(smaller.len() as i64, k);
        prop_assert_eq!(larger.len() as i64, k + 1);
        prop_assert_eq!(ids(&smaller), ids(&larger[..smaller.len()]));
    }

    #[test]
    fn prop_results_sorted_by_adjusted_score(word in 0..QUERY_WORDS.len(), k in 1i64..30) {
        let embedder = HashingEmbedder::new(DIMS);
        let index = DocumentIndex::build(corpus(&embedder, 40)).unwrap();
        let expander = QueryExpander::default();
        let config = RetrievalConfig::default();
        let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);

        let results = runtime()
            .block_on(retriever.retrieve(QUERY_WORDS[word], &PatientContext::unknown(), k))
            .unwrap();
        prop_assert!(results.len() as i64 <= k);
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
