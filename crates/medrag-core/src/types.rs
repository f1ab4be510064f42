//! Record shapes shared by the index, the retriever and the consultation boundary

use crate::error::{MedRagError, Result};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Normalize a medical term (condition name, tag) to its canonical key form:
/// lowercase, trimmed, inner whitespace and hyphens collapsed to `_`.
pub fn normalize_term(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    let mut pending_sep = false;
    for ch in term.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = !out.is_empty();
            continue;
        }
        if pending_sep {
            out.push('_');
            pending_sep = false;
        }
        out.extend(ch.to_lowercase());
    }
    out
}

/// Patient gender, as supplied at the boundary or declared on a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Unknown
    }
}

impl Gender {
    /// Parse a boundary value. Empty input means unknown; anything
    /// outside the recognized set is rejected.
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Gender::Male),
            "f" | "female" => Ok(Gender::Female),
            "" | "u" | "unknown" => Ok(Gender::Unknown),
            other => Err(MedRagError::InvalidArgument(format!(
                "unrecognized gender value '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive age bounds a passage applies to. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AgeRange {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl AgeRange {
    pub fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, age: u32) -> bool {
        self.min.map_or(true, |min| age >= min) && self.max.map_or(true, |max| age <= max)
    }

    /// True when neither bound is set
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Citation and applicability metadata attached to an indexed passage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Passage or article title
    #[serde(default)]
    pub title: Option<String>,

    /// Source citation (journal reference, guideline name, ...)
    #[serde(default)]
    pub citation: Option<String>,

    /// Link to the source, if the ingestion pipeline recorded one
    #[serde(default)]
    pub source_url: Option<String>,

    #[serde(default)]
    pub publication_year: Option<u16>,

    /// Applicable age range; `None` means the passage is not age-specific
    #[serde(default)]
    pub age_range: Option<AgeRange>,

    /// Applicable gender; `None` means any
    #[serde(default)]
    pub gender: Option<Gender>,

    /// Normalized condition tags
    #[serde(default)]
    pub condition_tags: Vec<String>,
}

/// One indexed literature chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub domain: String,
    pub text: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl DocumentRecord {
    pub fn new(id: impl Into<String>, domain: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: domain.into(),
            text: text.into(),
            embedding: Vec::new(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Ingestion-boundary validation. Normalizes condition tags and the
    /// domain tag in place, rejects structurally broken records.
    pub fn validate(&mut self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(MedRagError::IndexBuild("record with empty id".to_string()));
        }
        if self.text.trim().is_empty() {
            return Err(MedRagError::IndexBuild(format!(
                "record '{}' has empty text",
                self.id
            )));
        }
        if self.embedding.is_empty() {
            return Err(MedRagError::IndexBuild(format!(
                "record '{}' has no embedding",
                self.id
            )));
        }
        if self.embedding.iter().any(|v| !v.is_finite()) {
            return Err(MedRagError::IndexBuild(format!(
                "record '{}' has non-finite embedding values",
                self.id
            )));
        }
        if let Some(AgeRange {
            min: Some(min),
            max: Some(max),
        }) = self.metadata.age_range
        {
            if min > max {
                return Err(MedRagError::IndexBuild(format!(
                    "record '{}' has inverted age range {}..{}",
                    self.id, min, max
                )));
            }
        }

        self.domain = normalize_term(&self.domain);
        let mut tags: Vec<String> = self
            .metadata
            .condition_tags
            .iter()
            .map(|t| normalize_term(t))
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();
        self.metadata.condition_tags = tags;
        Ok(())
    }

    /// Title when present, otherwise the id
    pub fn display_title(&self) -> &str {
        self.metadata.title.as_deref().unwrap_or(&self.id)
    }
}

/// Per-request patient information. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatientContext {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub conditions: BTreeSet<String>,
}

impl PatientContext {
    /// Context with every field unknown
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        let key = normalize_term(condition);
        if !key.is_empty() {
            self.conditions.insert(key);
        }
        self
    }

    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for c in conditions {
            self = self.with_condition(c.as_ref());
        }
        self
    }
}

/// Weighted components that sum to a result's context-adjusted score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub similarity: f64,
    pub condition: f64,
    pub age: f64,
    pub gender: f64,
    pub domain_priority: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.similarity + self.condition + self.age + self.gender + self.domain_priority
    }
}

/// A retrieved passage with its scores. Serializes without the embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    #[serde(serialize_with = "serialize_evidence")]
    pub document: Arc<DocumentRecord>,
    /// Raw similarity from the coarse stage (cosine, or keyword score on fallback)
    pub raw_similarity: f32,
    /// Context-adjusted score
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredResult {
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

fn serialize_evidence<S>(document: &Arc<DocumentRecord>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    #[derive(Serialize)]
    struct Evidence<'a> {
        id: &'a str,
        domain: &'a str,
        text: &'a str,
        metadata: &'a DocumentMetadata,
    }

    Evidence {
        id: &document.id,
        domain: &document.domain,
        text: &document.text,
        metadata: &document.metadata,
    }
    .serialize(serializer)
}
