//! Table-driven query expansion
//!
//! Produces a short, deterministic list of query variants: the original
//! text, then synonym/abbreviation substitutions, then conditions implied
//! by recognized symptoms.

use crate::error::{MedRagError, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Default cap on variants, original included
pub const DEFAULT_MAX_VARIANTS: usize = 5;

const BUILTIN_SYNONYMS: &[(&str, &[&str])] = &[
    ("htn", &["hypertension"]),
    ("hypertension", &["high blood pressure"]),
    ("high blood pressure", &["hypertension"]),
    ("bp", &["blood pressure"]),
    ("dm", &["diabetes mellitus"]),
    ("t2dm", &["type 2 diabetes"]),
    ("diabetes", &["diabetes mellitus", "hyperglycemia"]),
    ("mi", &["myocardial infarction"]),
    ("heart attack", &["myocardial infarction"]),
    ("chf", &["congestive heart failure"]),
    ("afib", &["atrial fibrillation"]),
    ("af", &["atrial fibrillation"]),
    ("copd", &["chronic obstructive pulmonary disease"]),
    ("uti", &["urinary tract infection"]),
    ("ckd", &["chronic kidney disease"]),
    ("gerd", &["gastroesophageal reflux disease"]),
    ("heartburn", &["gastroesophageal reflux"]),
    ("nsaid", &["non steroidal anti inflammatory drug"]),
    ("nsaids", &["non steroidal anti inflammatory drugs"]),
    ("ace inhibitor", &["angiotensin converting enzyme inhibitor"]),
    ("arb", &["angiotensin receptor blocker"]),
    ("ssri", &["selective serotonin reuptake inhibitor"]),
    ("ppi", &["proton pump inhibitor"]),
    ("paracetamol", &["acetaminophen"]),
    ("acetaminophen", &["paracetamol"]),
    ("fever", &["pyrexia"]),
    ("high temperature", &["fever"]),
    ("stroke", &["cerebrovascular accident"]),
    ("blood thinner", &["anticoagulant"]),
    ("painkiller", &["analgesic"]),
    ("tb", &["tuberculosis"]),
];

const BUILTIN_SYMPTOMS: &[(&str, &[&str])] = &[
    ("fever", &["infection", "influenza"]),
    ("cough", &["respiratory infection", "asthma"]),
    ("wheezing", &["asthma", "chronic obstructive pulmonary disease"]),
    ("shortness of breath", &["asthma", "heart failure"]),
    ("chest pain", &["angina", "myocardial infarction"]),
    ("headache", &["migraine", "hypertension"]),
    ("dizziness", &["hypotension", "vertigo"]),
    ("fatigue", &["anemia", "hypothyroidism"]),
    ("frequent urination", &["diabetes mellitus", "urinary tract infection"]),
    ("excessive thirst", &["diabetes mellitus"]),
    ("joint pain", &["arthritis"]),
    ("palpitations", &["atrial fibrillation"]),
    ("swelling", &["heart failure", "kidney disease"]),
    ("rash", &["allergic reaction", "dermatitis"]),
    ("nausea", &["gastroenteritis"]),
    ("diarrhea", &["gastroenteritis"]),
    ("heartburn", &["gastroesophageal reflux disease"]),
    ("bleeding", &["coagulopathy"]),
];

lazy_static! {
    static ref BUILTIN_TABLE: ExpansionTable = ExpansionTable::from_raw(RawTable {
        synonyms: to_map(BUILTIN_SYNONYMS),
        symptoms: to_map(BUILTIN_SYMPTOMS),
    });
}

fn to_map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
        .collect()
}

/// Serialized form of the table (YAML override file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTable {
    /// term -> replacement phrases
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
    /// symptom -> implied conditions
    #[serde(default)]
    pub symptoms: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
struct Entry {
    phrase: Vec<String>,
    targets: Vec<String>,
}

/// Medical term table: synonyms/abbreviations plus a symptom vocabulary
#[derive(Debug, Clone)]
pub struct ExpansionTable {
    synonyms: Vec<Entry>,
    symptoms: Vec<Entry>,
}

impl Default for ExpansionTable {
    fn default() -> Self {
        BUILTIN_TABLE.clone()
    }
}

impl ExpansionTable {
    pub fn from_raw(raw: RawTable) -> Self {
        Self {
            synonyms: compile(raw.synonyms),
            symptoms: compile(raw.symptoms),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let raw: RawTable = serde_yaml::from_str(text)?;
        Ok(Self::from_raw(raw))
    }

    /// Load a YAML table, replacing the built-in one entirely
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            MedRagError::Config(format!("cannot read expansion table {}: {}", path.display(), e))
        })?;
        let table = Self::from_yaml(&text)?;
        tracing::info!(
            "Loaded expansion table from {}: {} synonyms, {} symptoms",
            path.display(),
            table.synonyms.len(),
            table.symptoms.len()
        );
        Ok(table)
    }

    pub fn synonym_count(&self) -> usize {
        self.synonyms.len()
    }

    pub fn symptom_count(&self) -> usize {
        self.symptoms.len()
    }
}

/// Tokenize keys, drop empties and order longest phrase first so
/// multi-word terms win over their prefixes at the same position.
fn compile(map: BTreeMap<String, Vec<String>>) -> Vec<Entry> {
    let mut entries: Vec<Entry> = map
        .into_iter()
        .filter_map(|(key, targets)| {
            let phrase = words(&key);
            let targets: Vec<String> = targets
                .iter()
                .map(|t| words(t).join(" "))
                .filter(|t| !t.is_empty())
                .collect();
            if phrase.is_empty() || targets.is_empty() {
                None
            } else {
                Some(Entry { phrase, targets })
            }
        })
        .collect();
    entries.sort_by(|a, b| {
        b.phrase
            .len()
            .cmp(&a.phrase.len())
            .then_with(|| a.phrase.cmp(&b.phrase))
    });
    entries
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Every `(start, entry)` where the entry's phrase occurs in `tokens`,
/// scanning left to right, longest phrase first at each position.
fn matches<'a>(tokens: &[String], entries: &'a [Entry]) -> Vec<(usize, &'a Entry)> {
    let mut found = Vec::new();
    for start in 0..tokens.len() {
        for entry in entries {
            let end = start + entry.phrase.len();
            if end <= tokens.len() && tokens[start..end] == entry.phrase[..] {
                found.push((start, entry));
            }
        }
    }
    found
}

/// Expands raw query text into search variants
#[derive(Debug, Clone)]
pub struct QueryExpander {
    table: ExpansionTable,
    max_variants: usize,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self::new(ExpansionTable::default(), DEFAULT_MAX_VARIANTS)
    }
}

impl QueryExpander {
    pub fn new(table: ExpansionTable, max_variants: usize) -> Self {
        Self {
            table,
            max_variants: max_variants.max(1),
        }
    }

    pub fn max_variants(&self) -> usize {
        self.max_variants
    }

    /// Ordered variants, original first, case-insensitively unique and
    /// capped at `max_variants`.
    pub fn expand(&self, query: &str) -> Vec<String> {
        let original = query.trim().to_string();
        let mut seen: HashSet<String> = HashSet::new();
        let mut variants = Vec::with_capacity(self.max_variants);
        seen.insert(original.to_lowercase());
        variants.push(original);

        let tokens = words(query);
        let mut candidates = Vec::new();

        for (start, entry) in matches(&tokens, &self.table.synonyms) {
            let end = start + entry.phrase.len();
            for target in &entry.targets {
                let mut parts: Vec<&str> = tokens[..start].iter().map(String::as_str).collect();
                parts.push(target.as_str());
                parts.extend(tokens[end..].iter().map(String::as_str));
                candidates.push(parts.join(" "));
            }
        }

        for (_, entry) in matches(&tokens, &self.table.symptoms) {
            candidates.extend(entry.targets.iter().cloned());
        }

        for candidate in candidates {
            if variants.len() >= self.max_variants {
                break;
            }
            if seen.insert(candidate.to_lowercase()) {
                variants.push(candidate);
            }
        }

        tracing::debug!("Expanded query into {} variants", variants.len());
        variants
    }
}
