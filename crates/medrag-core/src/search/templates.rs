//! Topic-shaped query builders
//!
//! Each builder pads the caller's terms with domain vocabulary so the
//! resulting text lands near the right region of the embedding space.

const MEDICATION_TERMS: &[&str] = &[
    "medication",
    "treatment",
    "dosage",
    "side effects",
    "contraindications",
    "drug interaction",
    "pharmacology",
];

const CONDITION_TERMS: &[&str] = &[
    "treatment",
    "management",
    "therapy",
    "diagnosis",
    "clinical",
    "patient",
    "symptoms",
    "prevention",
];

const SYMPTOM_TERMS: &[&str] = &[
    "symptoms",
    "diagnosis",
    "clinical",
    "manifestation",
    "signs",
    "presentation",
    "condition",
    "disease",
];

const TREATMENT_TERMS: &[&str] = &[
    "treatment",
    "therapy",
    "intervention",
    "protocol",
    "management",
    "clinical guidelines",
];

fn join_terms<S: AsRef<str>>(head: &[S], tail: &[&str]) -> String {
    head.iter()
        .map(|s| s.as_ref().trim())
        .filter(|s| !s.is_empty())
        .chain(tail.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Query about a list of medications
pub fn medication_query<S: AsRef<str>>(medications: &[S]) -> String {
    join_terms(medications, MEDICATION_TERMS)
}

/// Query about a condition, optionally with presenting symptoms
pub fn condition_query<S: AsRef<str>>(condition: &str, symptoms: &[S]) -> String {
    let mut head: Vec<&str> = vec![condition];
    head.extend(symptoms.iter().map(|s| s.as_ref()));
    join_terms(&head, CONDITION_TERMS)
}

pub fn symptom_query<S: AsRef<str>>(symptoms: &[S]) -> String {
    join_terms(symptoms, SYMPTOM_TERMS)
}

pub fn treatment_query(treatment: &str) -> String {
    join_terms(&[treatment], TREATMENT_TERMS)
}
