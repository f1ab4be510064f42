//! HNSW approximate nearest neighbor graph over document embeddings

use crate::embed::dot;
use crate::types::DocumentRecord;
use instant_distance::{Builder, HnswMap, Search};
use std::sync::Arc;

/// Fixed seed so rebuilding from the same snapshot yields the same graph
const HNSW_SEED: u64 = 0x6d65_6472_6167;

/// Wrapper for unit-length f32 vectors implementing instant_distance::Point
#[derive(Clone)]
struct EmbeddingPoint {
    values: Vec<f32>,
}

impl instant_distance::Point for EmbeddingPoint {
    fn distance(&self, other: &Self) -> f32 {
        // Vectors are unit-normalized, so cosine distance is 1 - inner product
        1.0 - dot(&self.values, &other.values)
    }
}

/// HNSW map from embedding to record position
pub struct AnnIndex {
    map: HnswMap<EmbeddingPoint, usize>,
    len: usize,
}

impl AnnIndex {
    /// Build over the given records. Returns `None` when the corpus is below
    /// `threshold`, where exact search is fast enough.
    pub fn build(records: &[Arc<DocumentRecord>], threshold: usize) -> Option<Self> {
        let count = records.len();
        if count == 0 || count < threshold {
            tracing::debug!(
                "Skipping ANN index build: {} embeddings < {} threshold",
                count,
                threshold
            );
            return None;
        }

        let (points, positions): (Vec<EmbeddingPoint>, Vec<usize>) = records
            .iter()
            .enumerate()
            .map(|(pos, r)| {
                (
                    EmbeddingPoint {
                        values: r.embedding.clone(),
                    },
                    pos,
                )
            })
            .unzip();

        let map = Builder::default().seed(HNSW_SEED).build(points, positions);
        tracing::info!("Built ANN index with {} embeddings", count);
        Some(Self { map, len: count })
    }

    /// Candidate record positions nearest to `query`, at most `k` of them
    pub fn candidates(&self, query: &[f32], k: usize) -> Vec<usize> {
        let point = EmbeddingPoint {
            values: query.to_vec(),
        };
        let mut search = Search::default();
        self.map
            .search(&point, &mut search)
            .take(k)
            .map(|item| *item.value)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
