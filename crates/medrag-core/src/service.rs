//! Consultation entry point over immutable, swappable snapshots
//!
//! The document index, knowledge graph and expansion table are loaded once
//! into a [`KnowledgeBase`]. Requests take an `Arc` to the current base and
//! run against it to completion, even if a rebuilt base is swapped in.

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::{MedRagError, Result};
use crate::graph::{seed, DrugResolver, InteractionAnalyzer, InteractionFinding, KnowledgeGraph};
use crate::index::{DocumentIndex, IndexOptions};
use crate::search::{ExpansionTable, QueryExpander, Retrieval, RetrievalMode, Retriever};
use crate::types::{Gender, PatientContext, ScoredResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// Read-only state shared by every request
pub struct KnowledgeBase {
    /// `None` when no index snapshot could be loaded
    pub index: Option<DocumentIndex>,
    pub graph: KnowledgeGraph,
    pub expander: QueryExpander,
}

impl KnowledgeBase {
    pub fn new(index: Option<DocumentIndex>, graph: KnowledgeGraph, expander: QueryExpander) -> Self {
        Self {
            index,
            graph,
            expander,
        }
    }

    /// Startup loader. An unusable index snapshot disables semantic search
    /// with a warning; graph and expansion table failures are returned.
    pub fn load(config: &Config) -> Result<Self> {
        let index = match &config.index_dir {
            Some(dir) => {
                let options = IndexOptions {
                    ann_threshold: config.retrieval.ann_threshold,
                };
                match DocumentIndex::load_with_dimension(dir, config.embedding.dimensions, options) {
                    Ok(index) => Some(index),
                    Err(e) => {
                        tracing::warn!("Semantic search disabled: {}", e);
                        None
                    }
                }
            }
            None => {
                tracing::warn!("No index directory configured, semantic search disabled");
                None
            }
        };

        let graph = Self::load_graph(config)?;

        let table = match &config.expansion_table {
            Some(path) => ExpansionTable::load(path)?,
            None => ExpansionTable::default(),
        };
        let expander = QueryExpander::new(table, config.retrieval.max_variants);

        Ok(Self::new(index, graph, expander))
    }

    /// Configured graph snapshot, or the built-in ontology when none is set
    pub fn load_graph(config: &Config) -> Result<KnowledgeGraph> {
        match &config.graph_path {
            Some(path) => KnowledgeGraph::load(path),
            None => seed::default_graph(),
        }
    }
}

/// Holder for the current snapshot; replacing it never disturbs readers
pub struct SnapshotStore {
    current: RwLock<Arc<KnowledgeBase>>,
}

impl SnapshotStore {
    pub fn new(base: KnowledgeBase) -> Self {
        Self {
            current: RwLock::new(Arc::new(base)),
        }
    }

    pub fn current(&self) -> Arc<KnowledgeBase> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swap in a rebuilt snapshot, returning the previous one
    pub fn replace(&self, base: KnowledgeBase) -> Arc<KnowledgeBase> {
        let next = Arc::new(base);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

fn default_top_k() -> i64 {
    5
}

/// Raw consultation input as received at the boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub query: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default = "default_top_k")]
    pub top_k: i64,
}

impl ConsultationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            age: None,
            gender: String::new(),
            conditions: Vec::new(),
            medications: Vec::new(),
            top_k: default_top_k(),
        }
    }

    /// Typed patient context; rejects negative ages and unknown gender values
    pub fn patient_context(&self) -> Result<PatientContext> {
        let mut ctx = PatientContext::unknown()
            .with_gender(Gender::parse(&self.gender)?)
            .with_conditions(&self.conditions);
        if let Some(age) = self.age {
            let age = u32::try_from(age).map_err(|_| {
                MedRagError::InvalidArgument(format!("age must be non-negative, got {}", age))
            })?;
            ctx = ctx.with_age(age);
        }
        Ok(ctx)
    }

    fn has_medications(&self) -> bool {
        self.medications.iter().any(|m| !m.trim().is_empty())
    }
}

/// Structured output handed to the advice generator
#[derive(Debug, Clone, Serialize)]
pub struct ConsultationReport {
    pub evidence: Vec<ScoredResult>,
    pub findings: Vec<InteractionFinding>,
    pub mode: RetrievalMode,
    pub partial: bool,
    pub variants: Vec<String>,
}

/// Request handler: retrieval and interaction analysis over the current snapshot
pub struct ConsultationService {
    store: Arc<SnapshotStore>,
    embedder: Arc<dyn Embedder>,
    config: Config,
    resolver: Option<Arc<dyn DrugResolver>>,
}

impl ConsultationService {
    pub fn new(store: Arc<SnapshotStore>, embedder: Arc<dyn Embedder>, config: Config) -> Self {
        Self {
            store,
            embedder,
            config,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn DrugResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Ranked evidence for a query and patient context
    pub async fn search(&self, query: &str, ctx: &PatientContext, top_k: i64) -> Result<Retrieval> {
        let base = self.store.current();
        self.retrieve_on(&base, query, ctx, top_k).await
    }

    /// Safety findings for a medication list. The list must not be empty.
    pub fn interactions<S, C>(&self, medications: &[S], conditions: &[C]) -> Result<Vec<InteractionFinding>>
    where
        S: AsRef<str>,
        C: AsRef<str>,
    {
        let base = self.store.current();
        self.analyze_on(&base, medications, conditions)
    }

    /// Evidence and findings together. Analysis is skipped when no
    /// medications are supplied; retrieval failures fail the request.
    pub async fn consult(&self, request: &ConsultationRequest) -> Result<ConsultationReport> {
        let ctx = request.patient_context()?;
        let base = self.store.current();

        let retrieval = self.retrieve_on(&base, &request.query, &ctx, request.top_k);
        let analysis = async {
            if request.has_medications() {
                self.analyze_on(&base, &request.medications, &request.conditions)
            } else {
                tracing::debug!("No medications supplied, skipping interaction analysis");
                Ok(Vec::new())
            }
        };
        let (retrieval, findings) = tokio::join!(retrieval, analysis);
        let retrieval = retrieval?;
        let findings = findings?;

        tracing::debug!(
            "Consultation produced {} evidence passages and {} findings",
            retrieval.results.len(),
            findings.len()
        );

        Ok(ConsultationReport {
            evidence: retrieval.results,
            findings,
            mode: retrieval.mode,
            partial: retrieval.partial,
            variants: retrieval.variants,
        })
    }

    async fn retrieve_on(
        &self,
        base: &KnowledgeBase,
        query: &str,
        ctx: &PatientContext,
        top_k: i64,
    ) -> Result<Retrieval> {
        Retriever::new(
            base.index.as_ref(),
            self.embedder.as_ref(),
            &base.expander,
            &self.config.retrieval,
        )
        .retrieve_detailed(query, ctx, top_k)
        .await
    }

    fn analyze_on<S, C>(
        &self,
        base: &KnowledgeBase,
        medications: &[S],
        conditions: &[C],
    ) -> Result<Vec<InteractionFinding>>
    where
        S: AsRef<str>,
        C: AsRef<str>,
    {
        let mut analyzer = InteractionAnalyzer::new(&base.graph);
        if let Some(resolver) = self.resolver.as_deref() {
            analyzer = analyzer.with_resolver(resolver);
        }
        analyzer.analyze(medications, conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashingEmbedder;
    use crate::graph::{FindingKind, Severity};
    use crate::types::DocumentRecord;

    const DIMS: usize = 64;

    fn corpus_index(embedder: &HashingEmbedder) -> DocumentIndex {
        let texts = [
            ("d1", "pubmed", "warfarin and aspirin increase bleeding risk"),
            ("d2", "who_guidelines", "fever management in adults with paracetamol"),
            ("d3", "pharmacology", "metformin dosing in type 2 diabetes"),
        ];
        let records = texts
            .iter()
            .map(|(id, domain, text)| {
                DocumentRecord::new(*id, *domain, *text).with_embedding(embedder.encode(text))
            })
            .collect();
        DocumentIndex::build(records).unwrap()
    }

    fn service(with_index: bool) -> ConsultationService {
        let embedder = HashingEmbedder::new(DIMS);
        let index = with_index.then(|| corpus_index(&embedder));
        let base = KnowledgeBase::new(
            index,
            seed::default_graph().unwrap(),
            QueryExpander::default(),
        );
        ConsultationService::new(
            Arc::new(SnapshotStore::new(base)),
            Arc::new(embedder),
            Config::default(),
        )
    }

    #[test]
    fn test_request_validation() {
        let mut request = ConsultationRequest::new("fever");
        request.age = Some(-3);
        assert!(matches!(
            request.patient_context(),
            Err(MedRagError::InvalidArgument(_))
        ));

        request.age = Some(40);
        request.gender = "robot".to_string();
        assert!(matches!(
            request.patient_context(),
            Err(MedRagError::InvalidArgument(_))
        ));

        request.gender = "F".to_string();
        request.conditions = vec!["Type 2 Diabetes".to_string()];
        let ctx = request.patient_context().unwrap();
        assert_eq!(ctx.age, Some(40));
        assert_eq!(ctx.gender, Gender::Female);
        assert!(ctx.conditions.contains("type_2_diabetes"));
    }

    #[tokio::test]
    async fn test_consult_returns_evidence_and_findings() {
        let service = service(true);
        let mut request = ConsultationRequest::new("bleeding risk with warfarin");
        request.medications = vec!["warfarin".to_string(), "aspirin".to_string()];
        request.top_k = 2;

        let report = service.consult(&request).await.unwrap();
        assert_eq!(report.mode, RetrievalMode::Semantic);
        assert!(!report.evidence.is_empty());
        assert!(report.evidence.len() <= 2);
        assert_eq!(report.findings[0].kind, FindingKind::Interaction);
        assert_eq!(report.findings[0].severity, Severity::Severe);
    }

    #[tokio::test]
    async fn test_missing_index_still_checks_interactions() {
        let service = service(false);
        let mut request = ConsultationRequest::new("fever");
        request.medications = vec!["warfarin".to_string(), "aspirin".to_string()];

        let report = service.consult(&request).await.unwrap();
        assert_eq!(report.mode, RetrievalMode::Unavailable);
        assert!(report.evidence.is_empty());
        assert!(!report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_no_medications_skips_analysis() {
        let service = service(true);
        let report = service
            .consult(&ConsultationRequest::new("fever"))
            .await
            .unwrap();
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_top_k_rejected() {
        let service = service(true);
        let mut request = ConsultationRequest::new("fever");
        request.top_k = 0;
        assert!(matches!(
            service.consult(&request).await,
            Err(MedRagError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_replace_keeps_acquired_snapshot() {
        let store = SnapshotStore::new(KnowledgeBase::new(
            None,
            seed::default_graph().unwrap(),
            QueryExpander::default(),
        ));
        let before = store.current();
        let previous = store.replace(KnowledgeBase::new(
            Some(DocumentIndex::empty(DIMS)),
            KnowledgeGraph::new(),
            QueryExpander::default(),
        ));

        assert!(Arc::ptr_eq(&before, &previous));
        assert!(before.index.is_none());
        assert!(before.graph.node_count() > 0);
        assert!(store.current().index.is_some());
        assert_eq!(store.current().graph.node_count(), 0);
    }

    #[test]
    fn test_load_without_index_dir() {
        let mut config = Config::default();
        config.index_dir = None;
        config.graph_path = None;
        let base = KnowledgeBase::load(&config).unwrap();
        assert!(base.index.is_none());
        assert!(base.graph.node_count() > 0);
    }

    #[test]
    fn test_load_with_broken_index_dir_degrades() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.index_dir = Some(dir.path().join("missing"));
        config.graph_path = None;
        let base = KnowledgeBase::load(&config).unwrap();
        assert!(base.index.is_none());
    }

    #[test]
    fn test_load_with_invalid_graph_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{"nodes": [{"kind": "drug", "name": "ibuprofen", "classes": ["nsaids"]}]}"#,
        )
        .unwrap();
        let mut config = Config::default();
        config.index_dir = None;
        config.graph_path = Some(path);
        assert!(matches!(
            KnowledgeBase::load(&config),
            Err(MedRagError::DanglingEdge(_))
        ));
    }
}
