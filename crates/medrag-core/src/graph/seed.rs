//! Built-in drug ontology used when no graph snapshot is configured

use super::model::{GraphEdge, GraphNode, NodeKey, Severity};
use super::KnowledgeGraph;
use crate::error::Result;
use std::collections::BTreeSet;

struct DrugSeed {
    name: &'static str,
    aliases: &'static [&'static str],
    classes: &'static [&'static str],
    monitoring: &'static [&'static str],
    treats: &'static [&'static str],
    contraindicated: &'static [&'static str],
}

const DRUGS: &[DrugSeed] = &[
    DrugSeed {
        name: "aspirin",
        aliases: &["acetylsalicylic acid", "asa"],
        classes: &["antiplatelet", "analgesic", "anti_inflammatory"],
        monitoring: &[],
        treats: &["cardiovascular_disease", "pain", "inflammation", "stroke_prevention"],
        contraindicated: &["active_bleeding", "severe_asthma", "children_under_16"],
    },
    DrugSeed {
        name: "metformin",
        aliases: &["glucophage"],
        classes: &["antidiabetic", "biguanide"],
        monitoring: &["kidney_function", "B12_levels", "blood_glucose"],
        treats: &["type2_diabetes", "prediabetes", "pcos"],
        contraindicated: &["severe_kidney_disease", "liver_disease", "heart_failure"],
    },
    DrugSeed {
        name: "lisinopril",
        aliases: &["zestril", "prinivil"],
        classes: &["ace_inhibitor", "antihypertensive"],
        monitoring: &["kidney_function", "potassium", "blood_pressure"],
        treats: &["hypertension", "heart_failure", "diabetic_nephropathy"],
        contraindicated: &["pregnancy", "angioedema_history", "bilateral_renal_stenosis"],
    },
    DrugSeed {
        name: "atorvastatin",
        aliases: &["lipitor"],
        classes: &["statin", "lipid_lowering"],
        monitoring: &["liver_enzymes", "CK", "lipid_panel"],
        treats: &["hyperlipidemia", "cardiovascular_disease", "stroke_prevention"],
        contraindicated: &["active_liver_disease", "pregnancy", "breastfeeding"],
    },
    DrugSeed {
        name: "levothyroxine",
        aliases: &["synthroid", "thyroxine"],
        classes: &["thyroid_hormone", "hormone_replacement"],
        monitoring: &["TSH", "T4", "heart_rate"],
        treats: &["hypothyroidism", "thyroid_cancer"],
        contraindicated: &[],
    },
    DrugSeed {
        name: "metoprolol",
        aliases: &["lopressor", "toprol"],
        classes: &["beta_blocker", "antihypertensive"],
        monitoring: &[],
        treats: &["hypertension", "heart_failure", "angina", "arrhythmia"],
        contraindicated: &[],
    },
    DrugSeed {
        name: "amlodipine",
        aliases: &["norvasc"],
        classes: &["calcium_channel_blocker", "antihypertensive"],
        monitoring: &[],
        treats: &["hypertension", "angina"],
        contraindicated: &[],
    },
    DrugSeed {
        name: "omeprazole",
        aliases: &["prilosec"],
        classes: &["proton_pump_inhibitor", "acid_reducer"],
        monitoring: &[],
        treats: &["gerd", "peptic_ulcer", "acid_reflux"],
        contraindicated: &[],
    },
    DrugSeed {
        name: "warfarin",
        aliases: &["coumadin"],
        classes: &["anticoagulant", "blood_thinner"],
        monitoring: &["INR", "bleeding_signs", "CBC"],
        treats: &["atrial_fibrillation", "deep_vein_thrombosis", "pulmonary_embolism"],
        contraindicated: &["pregnancy", "active_bleeding", "severe_liver_disease"],
    },
    DrugSeed {
        name: "insulin",
        aliases: &[],
        classes: &["antidiabetic", "hormone"],
        monitoring: &["blood_glucose"],
        treats: &["type1_diabetes", "type2_diabetes"],
        contraindicated: &["hypoglycemia"],
    },
    DrugSeed {
        name: "ibuprofen",
        aliases: &["advil", "motrin"],
        classes: &["nsaid", "analgesic", "anti_inflammatory"],
        monitoring: &["kidney_function"],
        treats: &["pain", "inflammation", "fever"],
        contraindicated: &[],
    },
];

/// (a, b, severity, mechanism, monitoring); endpoints prefixed `class:` are drug classes
const INTERACTIONS: &[(&str, &str, Severity, &str, &[&str])] = &[
    ("warfarin", "aspirin", Severity::Severe, "bleeding", &["INR", "bleeding_signs", "CBC"]),
    ("warfarin", "omeprazole", Severity::Moderate, "altered_anticoagulation", &["INR"]),
    ("metformin", "insulin", Severity::Mild, "hypoglycemia", &["blood_glucose"]),
    ("lisinopril", "metoprolol", Severity::Mild, "hypotension", &["blood_pressure", "heart_rate"]),
    ("atorvastatin", "amlodipine", Severity::Moderate, "muscle_toxicity", &["CK"]),
    ("class:nsaid", "warfarin", Severity::Severe, "bleeding", &["INR", "bleeding_signs"]),
    ("class:nsaid", "lisinopril", Severity::Moderate, "reduced_kidney_function", &["kidney_function", "blood_pressure"]),
];

/// Class-level contraindications
const CLASS_CONTRAINDICATIONS: &[(&str, &[&str])] = &[
    ("nsaid", &["active_bleeding", "peptic_ulcer", "severe_kidney_disease"]),
    ("ace_inhibitor", &["pregnancy"]),
];

/// Condition aliases for free-text patient conditions
const CONDITION_ALIASES: &[(&str, &[&str])] = &[
    ("type2_diabetes", &["type 2 diabetes", "t2dm", "diabetes"]),
    ("type1_diabetes", &["type 1 diabetes", "t1dm"]),
    ("hypertension", &["high blood pressure", "htn"]),
    ("gerd", &["gastroesophageal reflux disease", "heartburn"]),
    ("atrial_fibrillation", &["afib", "af"]),
    ("heart_failure", &["chf", "congestive heart failure"]),
    ("pregnancy", &["pregnant"]),
    ("active_bleeding", &["bleeding"]),
    ("deep_vein_thrombosis", &["dvt"]),
    ("pulmonary_embolism", &["pe"]),
];

fn agent(name: &str) -> NodeKey {
    match name.strip_prefix("class:") {
        Some(class) => NodeKey::class(class),
        None => NodeKey::drug(name),
    }
}

/// Build the bundled ontology
pub fn default_graph() -> Result<KnowledgeGraph> {
    let mut graph = KnowledgeGraph::new();

    let mut classes: BTreeSet<&str> = BTreeSet::new();
    let mut conditions: BTreeSet<&str> = BTreeSet::new();
    for drug in DRUGS {
        classes.extend(drug.classes.iter().copied());
        conditions.extend(drug.treats.iter().copied());
        conditions.extend(drug.contraindicated.iter().copied());
    }
    for (class, targets) in CLASS_CONTRAINDICATIONS {
        classes.insert(*class);
        conditions.extend(targets.iter().copied());
    }

    for class in &classes {
        graph.add_node(GraphNode::class(class))?;
    }
    for condition in &conditions {
        let aliases = CONDITION_ALIASES
            .iter()
            .find(|(name, _)| name == condition)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[]);
        graph.add_node(GraphNode::condition(condition).with_aliases(aliases.iter().copied()))?;
    }

    for drug in DRUGS {
        graph.add_node(
            GraphNode::drug(drug.name)
                .with_aliases(drug.aliases.iter().copied())
                .with_links(drug.classes.iter().copied())
                .with_monitoring(drug.monitoring.iter().copied()),
        )?;
        let key = NodeKey::drug(drug.name);
        for condition in drug.treats {
            graph.add_edge(GraphEdge::treats(key.clone(), NodeKey::condition(condition)))?;
        }
        for condition in drug.contraindicated {
            graph.add_edge(GraphEdge::contraindicated(key.clone(), NodeKey::condition(condition)))?;
        }
    }

    for (class, targets) in CLASS_CONTRAINDICATIONS {
        for condition in *targets {
            graph.add_edge(GraphEdge::contraindicated(
                NodeKey::class(class),
                NodeKey::condition(condition),
            ))?;
        }
    }

    for (a, b, severity, mechanism, monitoring) in INTERACTIONS {
        graph.add_edge(GraphEdge::interacts(agent(a), agent(b), *severity, mechanism, monitoring))?;
    }
    graph.ensure_memberships_resolved()?;

    let stats = graph.stats();
    tracing::info!(
        "Loaded built-in knowledge graph with {} nodes and {} edges",
        stats.total_nodes,
        stats.total_edges
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeKind;

    #[test]
    fn test_seed_builds() {
        let graph = default_graph().unwrap();
        let stats = graph.stats();
        assert_eq!(stats.drugs, DRUGS.len());
        assert_eq!(stats.interactions, INTERACTIONS.len());
        assert!(stats.memberships >= DRUGS.len());
    }

    #[test]
    fn test_seed_warfarin_aspirin_is_severe() {
        let graph = default_graph().unwrap();
        let edge = graph
            .edge_between(
                &NodeKey::drug("aspirin"),
                &NodeKey::drug("warfarin"),
                EdgeKind::InteractsWith,
            )
            .unwrap();
        assert_eq!(edge.relation.severity(), Some(Severity::Severe));
    }

    #[test]
    fn test_seed_indications_include_class_level() {
        let graph = default_graph().unwrap();
        let ibuprofen = graph.contraindications(&NodeKey::drug("ibuprofen"));
        assert!(ibuprofen.contains(&"active_bleeding".to_string()));
        let lisinopril = graph.therapeutic_indications(&NodeKey::drug("lisinopril"));
        assert!(lisinopril.contains(&"hypertension".to_string()));
    }
}
