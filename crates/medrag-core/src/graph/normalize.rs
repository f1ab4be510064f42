//! Free-text medication name cleanup and the external resolver seam

use crate::error::Result;
use crate::types::normalize_term;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref DOSAGE_RE: Regex =
        Regex::new(r"\b\d+(?:\.\d+)?\s*(?:mg|mcg|g|ml|iu|units?)?\b").unwrap();
    static ref FORM_RE: Regex = Regex::new(
        r"\b(?:tablets?|capsules?|syrup|injection|cream|ointment|suspension|solution)\b"
    )
    .unwrap();
}

/// Lowercase, drop dosage tokens (`500`, `500mg`, `10 mg`) and dosage
/// forms, collapse whitespace. Returns display form with spaces.
pub fn normalize_drug_name(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let without_dose = DOSAGE_RE.replace_all(&lower, " ");
    let without_form = FORM_RE.replace_all(&without_dose, " ");
    without_form.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Boundary to an external drug-name lookup service
pub trait DrugResolver: Send + Sync {
    /// Canonical drug name for free text, `Ok(None)` when unknown.
    /// Errors mean the service is unavailable; callers fall back to local matching.
    fn resolve(&self, raw: &str) -> Result<Option<String>>;
}

/// In-memory resolver over a fixed name table, keyed by normalized name
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    names: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, raw: &str, canonical: &str) -> Self {
        self.names
            .insert(normalize_term(&normalize_drug_name(raw)), canonical.to_string());
        self
    }
}

impl DrugResolver for StaticResolver {
    fn resolve(&self, raw: &str) -> Result<Option<String>> {
        Ok(self
            .names
            .get(&normalize_term(&normalize_drug_name(raw)))
            .cloned())
    }
}
