//! Configuration management

use crate::error::{MedRagError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the persisted document index snapshot
    #[serde(default = "default_index_dir")]
    pub index_dir: Option<PathBuf>,

    /// Knowledge graph snapshot (JSON). The built-in seed ontology is used when unset.
    #[serde(default = "default_graph_path")]
    pub graph_path: Option<PathBuf>,

    /// Optional YAML override for the query expansion term table
    #[serde(default)]
    pub expansion_table: Option<PathBuf>,

    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingServiceConfig,

    /// Retrieval and re-ranking parameters
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_dir: default_index_dir(),
            graph_path: default_graph_path(),
            expansion_table: None,
            embedding: EmbeddingServiceConfig::default(),
            retrieval: RetrievalConfig::default(),
        }
    }
}

fn default_index_dir() -> Option<PathBuf> {
    std::env::var("MEDRAG_INDEX_DIR").ok().map(PathBuf::from)
}

fn default_graph_path() -> Option<PathBuf> {
    std::env::var("MEDRAG_GRAPH_PATH").ok().map(PathBuf::from)
}

/// Which encoder backs query embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/v1/embeddings` service
    Http,
    /// Local feature-hashing encoder (no model, deterministic)
    Hashing,
}

/// Embedding service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingServiceConfig {
    #[serde(default = "default_provider")]
    pub provider: EmbeddingProvider,

    /// Base URL of the embedding service
    #[serde(default = "default_embedding_url")]
    pub url: String,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimensions
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingServiceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            api_key: std::env::var("MEDRAG_EMBEDDING_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_provider() -> EmbeddingProvider {
    match std::env::var("MEDRAG_EMBEDDER").as_deref() {
        Ok("http") => EmbeddingProvider::Http,
        _ => EmbeddingProvider::Hashing,
    }
}

fn default_embedding_url() -> String {
    std::env::var("MEDRAG_EMBEDDING_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("MEDRAG_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "sentence-transformers/all-MiniLM-L6-v2".to_string())
}

fn default_dimensions() -> usize {
    std::env::var("MEDRAG_EMBEDDING_DIMS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(384)
}

fn default_timeout() -> u64 {
    30
}

/// Re-ranking weights. The context-adjusted score is
/// `similarity * sim + condition * overlap + age * age_match + gender * gender_match + domain * priority`,
/// where a mismatch contributes `-penalty` in place of the match value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RerankWeights {
    pub similarity: f64,
    pub condition: f64,
    pub age: f64,
    pub gender: f64,
    pub domain: f64,
    /// Match value applied when the patient's age falls outside the document's range
    pub age_mismatch_penalty: f64,
    /// Match value applied when the patient's gender differs from the document's
    pub gender_mismatch_penalty: f64,
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            similarity: 0.60,
            condition: 0.15,
            age: 0.10,
            gender: 0.05,
            domain: 0.10,
            age_mismatch_penalty: 1.0,
            gender_mismatch_penalty: 1.0,
        }
    }
}

/// Retrieval pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Coarse-search over-fetch multiplier applied to `max_top_k`
    #[serde(default = "default_overfetch")]
    pub overfetch_factor: usize,

    /// Minimum number of coarse candidates per variant
    #[serde(default = "default_candidate_pool")]
    pub candidate_pool: usize,

    /// Largest `top_k` a caller may request
    #[serde(default = "default_max_top_k")]
    pub max_top_k: usize,

    /// Maximum number of expanded query variants (original included)
    #[serde(default = "default_max_variants")]
    pub max_variants: usize,

    /// Soft deadline for encode + search + rerank, in milliseconds
    #[serde(default = "default_retrieval_timeout")]
    pub timeout_ms: u64,

    /// Record count above which the HNSW graph is built
    #[serde(default = "default_ann_threshold")]
    pub ann_threshold: usize,

    #[serde(default)]
    pub weights: RerankWeights,

    /// Static clinical-authority priority per domain tag, in [0, 1]
    #[serde(default = "default_domain_priorities")]
    pub domain_priorities: BTreeMap<String, f64>,

    /// Priority for domains missing from `domain_priorities`
    #[serde(default = "default_domain_priority")]
    pub default_domain_priority: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            overfetch_factor: default_overfetch(),
            candidate_pool: default_candidate_pool(),
            max_top_k: default_max_top_k(),
            max_variants: default_max_variants(),
            timeout_ms: default_retrieval_timeout(),
            ann_threshold: default_ann_threshold(),
            weights: RerankWeights::default(),
            domain_priorities: default_domain_priorities(),
            default_domain_priority: default_domain_priority(),
        }
    }
}

impl RetrievalConfig {
    /// Priority for a (normalized) domain tag
    pub fn domain_priority(&self, domain: &str) -> f64 {
        self.domain_priorities
            .get(domain)
            .copied()
            .unwrap_or(self.default_domain_priority)
    }

    /// Number of coarse candidates requested per variant. Independent of
    /// the caller's `top_k`, so a larger `top_k` never admits documents a
    /// smaller one could not see.
    pub fn candidates_per_variant(&self) -> usize {
        self.max_top_k
            .saturating_mul(self.overfetch_factor.max(2))
            .max(self.candidate_pool)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_variants == 0 {
            return Err(MedRagError::Config("max_variants must be at least 1".into()));
        }
        if self.max_top_k == 0 {
            return Err(MedRagError::Config("max_top_k must be at least 1".into()));
        }
        if self.overfetch_factor < 2 {
            return Err(MedRagError::Config(
                "overfetch_factor must be at least 2".into(),
            ));
        }
        let w = &self.weights;
        let all = [
            w.similarity,
            w.condition,
            w.age,
            w.gender,
            w.domain,
            w.age_mismatch_penalty,
            w.gender_mismatch_penalty,
        ];
        if all.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(MedRagError::Config(
                "re-ranking weights must be finite and non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn default_overfetch() -> usize {
    4
}

fn default_candidate_pool() -> usize {
    100
}

fn default_max_top_k() -> usize {
    50
}

fn default_max_variants() -> usize {
    5
}

fn default_retrieval_timeout() -> u64 {
    5_000
}

fn default_ann_threshold() -> usize {
    1000
}

fn default_domain_priority() -> f64 {
    0.5
}

fn default_domain_priorities() -> BTreeMap<String, f64> {
    [
        ("who_guidelines", 1.0),
        ("clinical_guidelines", 0.9),
        ("drug_monographs", 0.85),
        ("pharmacology", 0.8),
        ("pubmed", 0.7),
        ("general_literature", 0.5),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults if absent
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.retrieval.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_pool_covers_max_top_k() {
        let mut config = RetrievalConfig::default();
        assert_eq!(config.candidates_per_variant(), 200);

        config.max_top_k = 10;
        assert_eq!(config.candidates_per_variant(), 100);
    }

    #[test]
    fn test_zero_max_top_k_is_rejected() {
        let config = RetrievalConfig {
            max_top_k: 0,
            ..RetrievalConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_domain_priority_lookup() {
        let config = RetrievalConfig::default();
        assert!(config.domain_priority("who_guidelines") > config.domain_priority("pubmed"));
        assert_eq!(config.domain_priority("unlisted"), 0.5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "retrieval:\n  max_variants: 3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.retrieval.max_variants, 3);
        assert_eq!(config.retrieval.overfetch_factor, 4);
        assert_eq!(config.retrieval.weights, RerankWeights::default());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let mut config = RetrievalConfig::default();
        config.weights.condition = -0.1;
        assert!(matches!(config.validate(), Err(MedRagError::Config(_))));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&temp.path().join("absent.yml")).unwrap();
        assert_eq!(config.retrieval.max_variants, 5);
    }
}
