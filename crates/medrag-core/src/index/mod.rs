//! Document index
//!
//! Holds one unit-normalized embedding plus metadata per literature chunk.
//! Search is exact inner product below the ANN threshold; above it an HNSW
//! graph proposes candidates that are then rescored exactly, so ordering is
//! always by (similarity desc, id asc).

mod ann;
mod keyword;
mod snapshot;

pub use keyword::{tokenize, KeywordIndex};
pub use snapshot::{IndexManifest, SNAPSHOT_FORMAT_VERSION};

use crate::embed::{dot, l2_normalize};
use crate::error::{MedRagError, Result};
use crate::types::DocumentRecord;
use ann::AnnIndex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Extra candidates pulled from the HNSW graph before exact rescoring
const ANN_CANDIDATE_FACTOR: usize = 4;
const ANN_MIN_CANDIDATES: usize = 64;

/// Build-time options
#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    /// Record count at or above which the HNSW graph is built
    pub ann_threshold: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            ann_threshold: 1000,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_documents: usize,
    pub dimension: usize,
    pub ann_built: bool,
    pub domains: BTreeMap<String, usize>,
}

/// Immutable in-memory document index
pub struct DocumentIndex {
    dimension: usize,
    records: Vec<Arc<DocumentRecord>>,
    by_id: HashMap<String, usize>,
    ann: Option<AnnIndex>,
    keyword: KeywordIndex,
}

impl DocumentIndex {
    /// Build an index with default options
    pub fn build(records: Vec<DocumentRecord>) -> Result<Self> {
        Self::build_with(records, IndexOptions::default())
    }

    /// Validate, normalize and index a set of records.
    /// Fails on mismatched dimensionality or duplicate ids.
    pub fn build_with(records: Vec<DocumentRecord>, options: IndexOptions) -> Result<Self> {
        let dimension = records.first().map(|r| r.embedding.len()).unwrap_or(0);

        let mut prepared = Vec::with_capacity(records.len());
        for mut record in records {
            record.validate()?;
            if record.embedding.len() != dimension {
                return Err(MedRagError::IndexBuild(format!(
                    "record '{}' has dimension {}, expected {}",
                    record.id,
                    record.embedding.len(),
                    dimension
                )));
            }
            l2_normalize(&mut record.embedding);
            prepared.push(record);
        }

        let index = Self::assemble(dimension, prepared, options)
            .map_err(|e| match e {
                MedRagError::IndexLoad(msg) => MedRagError::IndexBuild(msg),
                other => other,
            })?;
        tracing::info!(
            "Built document index: {} records, dimension {}",
            index.len(),
            index.dimension
        );
        Ok(index)
    }

    /// An index with no records
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            records: Vec::new(),
            by_id: HashMap::new(),
            ann: None,
            keyword: KeywordIndex::default(),
        }
    }

    /// Wire up lookup structures over already-validated records, keeping
    /// their embeddings bit-for-bit.
    fn assemble(
        dimension: usize,
        records: Vec<DocumentRecord>,
        options: IndexOptions,
    ) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        for (pos, record) in records.iter().enumerate() {
            if by_id.insert(record.id.clone(), pos).is_some() {
                return Err(MedRagError::IndexLoad(format!(
                    "duplicate document id '{}'",
                    record.id
                )));
            }
        }

        let records: Vec<Arc<DocumentRecord>> = records.into_iter().map(Arc::new).collect();
        let ann = AnnIndex::build(&records, options.ann_threshold);
        let keyword = KeywordIndex::build(records.iter().map(|r| r.text.as_str()));

        Ok(Self {
            dimension,
            records,
            by_id,
            ann,
            keyword,
        })
    }

    /// Up to `k` records most similar to `query`, ordered by similarity
    /// descending then id ascending.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Arc<DocumentRecord>, f32)>> {
        if k == 0 || self.records.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(MedRagError::InvalidArgument(format!(
                "query vector has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut q = query.to_vec();
        l2_normalize(&mut q);

        let positions: Vec<usize> = match &self.ann {
            Some(ann) if k < self.records.len() => {
                let want = (k * ANN_CANDIDATE_FACTOR).max(ANN_MIN_CANDIDATES);
                ann.candidates(&q, want)
            }
            _ => (0..self.records.len()).collect(),
        };

        let scored = positions
            .into_iter()
            .map(|pos| (pos, dot(&q, &self.records[pos].embedding)))
            .collect();
        Ok(self.rank(scored, k))
    }

    /// Lexical fallback search over document text
    pub fn keyword_search(&self, query: &str, k: usize) -> Vec<(Arc<DocumentRecord>, f32)> {
        if k == 0 {
            return Vec::new();
        }
        self.rank(self.keyword.score(query), k)
    }

    fn rank(&self, mut scored: Vec<(usize, f32)>, k: usize) -> Vec<(Arc<DocumentRecord>, f32)> {
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| self.records[a.0].id.cmp(&self.records[b.0].id))
        });
        scored
            .into_iter()
            .take(k)
            .map(|(pos, sim)| (Arc::clone(&self.records[pos]), sim))
            .collect()
    }

    /// Look up a record by id
    pub fn get(&self, id: &str) -> Option<Arc<DocumentRecord>> {
        self.by_id.get(id).map(|&pos| Arc::clone(&self.records[pos]))
    }

    /// Records in storage order
    pub fn records(&self) -> &[Arc<DocumentRecord>] {
        &self.records
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let mut domains = BTreeMap::new();
        for r in &self.records {
            *domains.entry(r.domain.clone()).or_insert(0) += 1;
        }
        IndexStats {
            total_documents: self.records.len(),
            dimension: self.dimension,
            ann_built: self.ann.is_some(),
            domains,
        }
    }
}

/// Order by similarity descending, then id ascending
pub(crate) fn compare_hits(a: (&str, f32), b: (&str, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}
