//! Search performance benchmarks
//!
//! Measures performance of:
//! - Exact and HNSW-accelerated index search
//! - Keyword fallback scoring
//! - Full retrieval with expansion and context rerank

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use medrag_core::config::RetrievalConfig;
use medrag_core::{
    AgeRange, DocumentIndex, DocumentMetadata, DocumentRecord, Gender, HashingEmbedder, IndexOptions,
    PatientContext, QueryExpander, Retriever,
};

const DIMS: usize = 128;

const DOMAINS: &[&str] = &["pubmed", "who_guidelines", "pharmacology", "cardiology", "pediatrics"];

const PASSAGES: &[&str] = &[
    "Hypertension management with ACE inhibitors and lifestyle modification",
    "Fever in children: paracetamol dosing and warning signs",
    "Warfarin therapy requires regular INR monitoring to limit bleeding",
    "Metformin is first-line therapy for type 2 diabetes",
    "Chest pain evaluation for acute coronary syndrome",
    "Migraine prophylaxis with beta blockers",
    "Community-acquired pneumonia antibiotic selection",
    "Statin therapy reduces cardiovascular events in high-risk adults",
];

fn corpus(size: usize, embedder: &HashingEmbedder) -> Vec<DocumentRecord> {
    (0..size)
        .map(|i| {
            let text = format!("{} (study {})", PASSAGES[i % PASSAGES.len()], i);
            let metadata = DocumentMetadata {
                age_range: Some(AgeRange::new(Some((i % 5) as u32 * 10), None)),
                condition_tags: vec!["hypertension".to_string()],
                ..Default::default()
            };
            DocumentRecord::new(format!("doc-{:05}", i), DOMAINS[i % DOMAINS.len()], text.clone())
                .with_embedding(embedder.encode(&text))
                .with_metadata(metadata)
        })
        .collect()
}

fn bench_index_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_search");
    let embedder = HashingEmbedder::new(DIMS);
    let query = embedder.encode("blood pressure medication");

    for size in [500, 5_000] {
        let index = DocumentIndex::build(corpus(size, &embedder)).unwrap();
        group.bench_with_input(BenchmarkId::new("default", size), &index, |b, index| {
            b.iter(|| index.search(black_box(&query), black_box(100)).unwrap());
        });

        let exact = DocumentIndex::build_with(
            corpus(size, &embedder),
            IndexOptions {
                ann_threshold: usize::MAX,
            },
        )
        .unwrap();
        group.bench_with_input(BenchmarkId::new("exact", size), &exact, |b, index| {
            b.iter(|| index.search(black_box(&query), black_box(100)).unwrap());
        });
    }

    group.finish();
}

fn bench_keyword_search(c: &mut Criterion) {
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::build(corpus(2_000, &embedder)).unwrap();

    c.bench_function("keyword_search", |b| {
        b.iter(|| index.keyword_search(black_box("warfarin bleeding monitoring"), black_box(20)));
    });
}

fn bench_retrieve(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let embedder = HashingEmbedder::new(DIMS);
    let index = DocumentIndex::build(corpus(2_000, &embedder)).unwrap();
    let expander = QueryExpander::default();
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(Some(&index), &embedder, &expander, &config);
    let ctx = PatientContext::unknown()
        .with_age(45)
        .with_gender(Gender::Female)
        .with_condition("hypertension");

    let mut group = c.benchmark_group("retrieve");
    for top_k in [5i64, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(top_k), &top_k, |b, &top_k| {
            b.iter(|| {
                runtime
                    .block_on(retriever.retrieve(black_box("high bp meds"), &ctx, top_k))
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_index_search, bench_keyword_search, bench_retrieve);
criterion_main!(benches);
