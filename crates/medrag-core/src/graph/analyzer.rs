//! Interaction and contraindication analysis over the knowledge graph

use super::model::{EdgeKind, NodeKey, NodeKind, Relation, Severity};
use super::normalize::{normalize_drug_name, DrugResolver};
use super::KnowledgeGraph;
use crate::error::{MedRagError, Result};
use crate::types::normalize_term;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Shortest canonical name matched inside a longer medication string
const MIN_EMBEDDED_NAME_CHARS: usize = 5;

/// Hop bound for class-mediated interaction lookups
const INDIRECT_MAX_HOPS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    /// Direct `interacts_with` edge between two drugs
    Interaction,
    /// Interaction reached through a drug class
    IndirectInteraction,
    /// Drugs share a class but no interaction is recorded
    SharedClass,
    Contraindication,
    /// Input name that did not resolve to any known drug
    UnknownDrug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
    Unverified,
}

/// One safety signal handed to the advice generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionFinding {
    pub kind: FindingKind,
    /// Canonical names, or the raw input for unknown drugs
    pub drugs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    pub severity: Severity,
    pub confidence: Confidence,
    pub explanation: String,
    #[serde(default)]
    pub monitoring: Vec<String>,
}

struct Resolved {
    input: String,
    key: NodeKey,
}

/// Stateless analyzer over a borrowed graph
pub struct InteractionAnalyzer<'a> {
    graph: &'a KnowledgeGraph,
    resolver: Option<&'a dyn DrugResolver>,
}

impl<'a> InteractionAnalyzer<'a> {
    pub fn new(graph: &'a KnowledgeGraph) -> Self {
        Self {
            graph,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn DrugResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Map free text to a drug node: external resolver, then exact or
    /// alias match, then normalized match, then partial match.
    pub fn resolve(&self, raw: &str) -> Result<NodeKey> {
        if let Some(resolver) = self.resolver {
            match resolver.resolve(raw) {
                Ok(Some(canonical)) => {
                    if let Some(key) = self.graph.lookup(NodeKind::Drug, &canonical) {
                        return Ok(key);
                    }
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Drug resolver unavailable for '{}': {}", raw, e),
            }
        }

        if let Some(key) = self.graph.lookup(NodeKind::Drug, raw) {
            return Ok(key);
        }

        let cleaned = normalize_drug_name(raw);
        if cleaned.is_empty() {
            return Err(MedRagError::UnresolvedDrugName(raw.to_string()));
        }
        if let Some(key) = self.graph.lookup(NodeKind::Drug, &cleaned) {
            return Ok(key);
        }

        let needle = normalize_term(&cleaned);
        if needle.chars().count() >= 3 {
            let entries: Vec<_> = self.graph.drug_entries().collect();
            let names = |key: &NodeKey, aliases: &[String]| -> Vec<String> {
                std::iter::once(key.name.clone())
                    .chain(aliases.iter().map(|a| normalize_term(a)))
                    .collect()
            };
            // Query contained in a known name or alias
            for (key, node) in &entries {
                if names(*key, node.aliases()).iter().any(|n| n.contains(&needle)) {
                    return Ok((*key).clone());
                }
            }
            // Canonical name appearing as whole words of the query, e.g.
            // "warfarin sodium". Aliases are excluded here.
            let padded = format!("_{}_", needle);
            for (key, _) in &entries {
                if key.name.chars().count() >= MIN_EMBEDDED_NAME_CHARS
                    && padded.contains(&format!("_{}_", key.name))
                {
                    return Ok((*key).clone());
                }
            }
        }

        Err(MedRagError::UnresolvedDrugName(raw.to_string()))
    }

    /// Safety findings for a medication list and active conditions, most
    /// severe first, ties in supplied order.
    pub fn analyze<S, C>(&self, drug_names: &[S], conditions: &[C]) -> Result<Vec<InteractionFinding>>
    where
        S: AsRef<str>,
        C: AsRef<str>,
    {
        if drug_names.iter().all(|d| d.as_ref().trim().is_empty()) {
            return Err(MedRagError::InvalidArgument(
                "medication list is empty".to_string(),
            ));
        }

        // (first position, second position, finding)
        let mut ranked: Vec<(usize, usize, InteractionFinding)> = Vec::new();
        let mut resolved: Vec<(usize, Resolved)> = Vec::new();
        let mut seen_drugs: HashSet<NodeKey> = HashSet::new();
        let mut seen_unknown: HashSet<String> = HashSet::new();

        for (pos, raw) in drug_names.iter().enumerate() {
            let raw = raw.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match self.resolve(raw) {
                Ok(key) => {
                    if seen_drugs.insert(key.clone()) {
                        resolved.push((
                            pos,
                            Resolved {
                                input: raw.to_string(),
                                key,
                            },
                        ));
                    }
                }
                Err(MedRagError::UnresolvedDrugName(name)) => {
                    tracing::warn!("Unresolved drug name '{}'", name);
                    if seen_unknown.insert(name.to_lowercase()) {
                        ranked.push((pos, pos, unknown_drug(&name)));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        for (i, (pos_a, a)) in resolved.iter().enumerate() {
            for (pos_b, b) in &resolved[i + 1..] {
                if let Some(finding) = self.pair_finding(a, b) {
                    ranked.push((*pos_a, *pos_b, finding));
                }
            }
        }

        let condition_keys: Vec<NodeKey> = conditions
            .iter()
            .filter_map(|c| {
                let c = c.as_ref();
                let key = self.graph.lookup(NodeKind::Condition, c);
                if key.is_none() && !c.trim().is_empty() {
                    tracing::debug!("Condition '{}' not in graph", c);
                }
                key
            })
            .fold(Vec::new(), |mut acc, k| {
                if !acc.contains(&k) {
                    acc.push(k);
                }
                acc
            });

        let offset = drug_names.len();
        for (pos, drug) in &resolved {
            for (ci, condition) in condition_keys.iter().enumerate() {
                if let Some(finding) = self.contraindication(drug, condition) {
                    ranked.push((*pos, offset + ci, finding));
                }
            }
        }

        // Stable: severity first, then supplied order
        ranked.sort_by(|a, b| {
            b.2.severity
                .cmp(&a.2.severity)
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
        });

        let findings: Vec<InteractionFinding> = ranked.into_iter().map(|(_, _, f)| f).collect();
        tracing::debug!(
            "Analyzed {} medications against {} conditions: {} findings",
            drug_names.len(),
            condition_keys.len(),
            findings.len()
        );
        Ok(findings)
    }

    fn pair_finding(&self, a: &Resolved, b: &Resolved) -> Option<InteractionFinding> {
        let graph = self.graph;
        let names = vec![a.key.name.clone(), b.key.name.clone()];

        if let Some(edge) = graph.edge_between(&a.key, &b.key, EdgeKind::InteractsWith) {
            if let Relation::InteractsWith {
                severity,
                mechanism,
                monitoring,
            } = &edge.relation
            {
                return Some(InteractionFinding {
                    kind: FindingKind::Interaction,
                    drugs: names,
                    condition: None,
                    severity: *severity,
                    confidence: Confidence::High,
                    explanation: describe(&a.input, &b.input, mechanism, None),
                    monitoring: monitoring.clone(),
                });
            }
        }

        if let Some((via, severity, mechanism, monitoring)) = self.class_mediated(&a.key, &b.key) {
            return Some(InteractionFinding {
                kind: FindingKind::IndirectInteraction,
                drugs: names,
                condition: None,
                severity,
                confidence: Confidence::Low,
                explanation: describe(&a.input, &b.input, &mechanism, Some(&via)),
                monitoring,
            });
        }

        let shared = graph.find_path_with(
            &a.key,
            &b.key,
            INDIRECT_MAX_HOPS,
            Some(&[EdgeKind::BelongsTo][..]),
        )?;
        let class = shared.nodes.get(1)?.name.clone();
        Some(InteractionFinding {
            kind: FindingKind::SharedClass,
            drugs: names,
            condition: None,
            severity: Severity::Unknown,
            confidence: Confidence::Unverified,
            explanation: format!(
                "{} and {} are both {} agents; no interaction is recorded, check for therapeutic duplication",
                a.input, b.input, class
            ),
            monitoring: Vec::new(),
        })
    }

    /// Strongest interaction reachable in two hops through a drug class:
    /// a class of one drug interacting with the other, or both drugs
    /// interacting with the same class.
    fn class_mediated(
        &self,
        a: &NodeKey,
        b: &NodeKey,
    ) -> Option<(String, Severity, String, Vec<String>)> {
        let graph = self.graph;
        let mut candidates: Vec<(NodeKey, &Relation)> = Vec::new();

        for (drug, other) in [(a, b), (b, a)] {
            for class in graph.pharmacological_classes(drug) {
                let class_key = NodeKey::class(&class);
                if let Some(edge) = graph.edge_between(&class_key, other, EdgeKind::InteractsWith) {
                    candidates.push((class_key, &edge.relation));
                }
            }
        }

        let a_classes: Vec<NodeKey> = graph
            .neighbors(a, EdgeKind::InteractsWith)
            .into_iter()
            .map(|n| n.key())
            .filter(|k| k.kind == NodeKind::DrugClass)
            .collect();
        for class_key in a_classes {
            if let (Some(e1), Some(e2)) = (
                graph.edge_between(a, &class_key, EdgeKind::InteractsWith),
                graph.edge_between(b, &class_key, EdgeKind::InteractsWith),
            ) {
                let stronger = if e2.relation.severity() > e1.relation.severity() {
                    &e2.relation
                } else {
                    &e1.relation
                };
                candidates.push((class_key, stronger));
            }
        }

        let (via, relation) = candidates
            .into_iter()
            .max_by(|x, y| {
                x.1.severity()
                    .cmp(&y.1.severity())
                    .then_with(|| y.0.cmp(&x.0))
            })?;
        match relation {
            Relation::InteractsWith {
                severity,
                mechanism,
                monitoring,
            } => Some((via.name, *severity, mechanism.clone(), monitoring.clone())),
            _ => None,
        }
    }

    fn contraindication(&self, drug: &Resolved, condition: &NodeKey) -> Option<InteractionFinding> {
        let graph = self.graph;
        let via = if graph
            .edge_between(&drug.key, condition, EdgeKind::ContraindicatedFor)
            .is_some()
        {
            None
        } else {
            let class = graph
                .pharmacological_classes(&drug.key)
                .into_iter()
                .find(|c| {
                    graph
                        .edge_between(&NodeKey::class(c), condition, EdgeKind::ContraindicatedFor)
                        .is_some()
                })?;
            Some(class)
        };

        let explanation = match &via {
            None => format!("{} is contraindicated in {}", drug.input, condition.name),
            Some(class) => format!(
                "{} is a {} agent; {} agents are contraindicated in {}",
                drug.input, class, class, condition.name
            ),
        };
        Some(InteractionFinding {
            kind: FindingKind::Contraindication,
            drugs: vec![drug.key.name.clone()],
            condition: Some(condition.name.clone()),
            severity: Severity::Severe,
            confidence: Confidence::High,
            explanation,
            monitoring: graph
                .node(&drug.key)
                .map(|n| n.monitoring().to_vec())
                .unwrap_or_default(),
        })
    }
}

fn unknown_drug(name: &str) -> InteractionFinding {
    InteractionFinding {
        kind: FindingKind::UnknownDrug,
        drugs: vec![name.to_string()],
        condition: None,
        severity: Severity::Unknown,
        confidence: Confidence::Unverified,
        explanation: format!(
            "'{}' is not a recognized drug; its interactions are unverified",
            name
        ),
        monitoring: Vec::new(),
    }
}

fn describe(a: &str, b: &str, mechanism: &str, via: Option<&str>) -> String {
    let mut text = format!("{} interacts with {}", a, b);
    if let Some(class) = via {
        text.push_str(&format!(" through the {} class", class));
    }
    if !mechanism.is_empty() {
        text.push_str(&format!(": risk of {}", mechanism.replace('_', " ")));
    }
    text
}
