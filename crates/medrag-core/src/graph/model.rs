//! Typed nodes and relations of the drug-safety graph

use crate::error::{MedRagError, Result};
use crate::types::normalize_term;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Drug,
    DrugClass,
    Condition,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Drug => "drug",
            NodeKind::DrugClass => "drug_class",
            NodeKind::Condition => "condition",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node identity: variant plus canonical name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub name: String,
}

impl NodeKey {
    /// Key with a canonicalized name
    pub fn new(kind: NodeKind, name: &str) -> Self {
        Self {
            kind,
            name: normalize_term(name),
        }
    }

    pub fn drug(name: &str) -> Self {
        Self::new(NodeKind::Drug, name)
    }

    pub fn class(name: &str) -> Self {
        Self::new(NodeKind::DrugClass, name)
    }

    pub fn condition(name: &str) -> Self {
        Self::new(NodeKind::Condition, name)
    }

    /// Drugs and classes can carry pharmacological relations
    pub fn is_agent(&self) -> bool {
        matches!(self.kind, NodeKind::Drug | NodeKind::DrugClass)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Graph node, tagged by variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphNode {
    Drug {
        name: String,
        #[serde(default)]
        aliases: Vec<String>,
        /// Drug class names this drug belongs to
        #[serde(default)]
        classes: Vec<String>,
        /// Parameters to watch while the drug is taken
        #[serde(default)]
        monitoring: Vec<String>,
    },
    DrugClass {
        name: String,
        #[serde(default)]
        members: Vec<String>,
    },
    Condition {
        name: String,
        #[serde(default)]
        aliases: Vec<String>,
    },
}

impl GraphNode {
    pub fn drug(name: &str) -> Self {
        GraphNode::Drug {
            name: name.to_string(),
            aliases: Vec::new(),
            classes: Vec::new(),
            monitoring: Vec::new(),
        }
    }

    pub fn class(name: &str) -> Self {
        GraphNode::DrugClass {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn condition(name: &str) -> Self {
        GraphNode::Condition {
            name: name.to_string(),
            aliases: Vec::new(),
        }
    }

    /// Builder: add aliases (ignored for classes)
    pub fn with_aliases<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self {
            GraphNode::Drug { aliases, .. } | GraphNode::Condition { aliases, .. } => {
                aliases.extend(values.into_iter().map(Into::into))
            }
            GraphNode::DrugClass { .. } => {}
        }
        self
    }

    /// Builder: class references for a drug, member drugs for a class
    pub fn with_links<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match &mut self {
            GraphNode::Drug { classes, .. } => classes.extend(values.into_iter().map(Into::into)),
            GraphNode::DrugClass { members, .. } => {
                members.extend(values.into_iter().map(Into::into))
            }
            GraphNode::Condition { .. } => {}
        }
        self
    }

    pub fn with_monitoring<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let GraphNode::Drug { monitoring, .. } = &mut self {
            monitoring.extend(values.into_iter().map(Into::into));
        }
        self
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            GraphNode::Drug { .. } => NodeKind::Drug,
            GraphNode::DrugClass { .. } => NodeKind::DrugClass,
            GraphNode::Condition { .. } => NodeKind::Condition,
        }
    }

    /// Display name as declared
    pub fn name(&self) -> &str {
        match self {
            GraphNode::Drug { name, .. }
            | GraphNode::DrugClass { name, .. }
            | GraphNode::Condition { name, .. } => name,
        }
    }

    pub fn aliases(&self) -> &[String] {
        match self {
            GraphNode::Drug { aliases, .. } | GraphNode::Condition { aliases, .. } => aliases,
            GraphNode::DrugClass { .. } => &[],
        }
    }

    pub fn monitoring(&self) -> &[String] {
        match self {
            GraphNode::Drug { monitoring, .. } => monitoring,
            _ => &[],
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.kind(), self.name())
    }
}

/// Interaction severity. Ordered so that `Severe` is the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Unknown,
    Mild,
    Moderate,
    Severe,
}

impl Severity {
    /// Accepts both mild/moderate/severe and minor/moderate/major wording
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "mild" | "minor" => Ok(Severity::Mild),
            "moderate" => Ok(Severity::Moderate),
            "severe" | "major" | "contraindicated" => Ok(Severity::Severe),
            "unknown" => Ok(Severity::Unknown),
            other => Err(MedRagError::InvalidArgument(format!(
                "unrecognized severity '{}'",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unknown => "unknown",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation type without attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    InteractsWith,
    Treats,
    ContraindicatedFor,
    BelongsTo,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::InteractsWith => "interacts_with",
            EdgeKind::Treats => "treats",
            EdgeKind::ContraindicatedFor => "contraindicated_for",
            EdgeKind::BelongsTo => "belongs_to",
        }
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self, EdgeKind::InteractsWith)
    }

    /// Whether an edge of this kind may join `from` to `to`
    pub fn allows(&self, from: NodeKind, to: NodeKind) -> bool {
        use NodeKind::*;
        match self {
            EdgeKind::InteractsWith => {
                matches!(from, Drug | DrugClass) && matches!(to, Drug | DrugClass)
            }
            EdgeKind::Treats | EdgeKind::ContraindicatedFor => {
                matches!(from, Drug | DrugClass) && to == Condition
            }
            EdgeKind::BelongsTo => from == Drug && to == DrugClass,
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relation with its attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Relation {
    InteractsWith {
        severity: Severity,
        #[serde(default)]
        mechanism: String,
        #[serde(default)]
        monitoring: Vec<String>,
    },
    Treats,
    ContraindicatedFor,
    BelongsTo,
}

impl Relation {
    pub fn interaction(severity: Severity, mechanism: &str, monitoring: &[&str]) -> Self {
        Relation::InteractsWith {
            severity,
            mechanism: mechanism.to_string(),
            monitoring: monitoring.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn kind(&self) -> EdgeKind {
        match self {
            Relation::InteractsWith { .. } => EdgeKind::InteractsWith,
            Relation::Treats => EdgeKind::Treats,
            Relation::ContraindicatedFor => EdgeKind::ContraindicatedFor,
            Relation::BelongsTo => EdgeKind::BelongsTo,
        }
    }

    pub fn severity(&self) -> Option<Severity> {
        match self {
            Relation::InteractsWith { severity, .. } => Some(*severity),
            _ => None,
        }
    }
}

/// A typed relation between two declared nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: NodeKey,
    pub to: NodeKey,
    pub relation: Relation,
}

impl GraphEdge {
    pub fn new(from: NodeKey, to: NodeKey, relation: Relation) -> Self {
        Self { from, to, relation }
    }

    pub fn interacts(a: NodeKey, b: NodeKey, severity: Severity, mechanism: &str, monitoring: &[&str]) -> Self {
        Self::new(a, b, Relation::interaction(severity, mechanism, monitoring))
    }

    pub fn treats(agent: NodeKey, condition: NodeKey) -> Self {
        Self::new(agent, condition, Relation::Treats)
    }

    pub fn contraindicated(agent: NodeKey, condition: NodeKey) -> Self {
        Self::new(agent, condition, Relation::ContraindicatedFor)
    }

    pub fn kind(&self) -> EdgeKind {
        self.relation.kind()
    }

    /// Structural check independent of which nodes exist
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind();
        if !kind.allows(self.from.kind, self.to.kind) {
            return Err(MedRagError::InvalidEdge(format!(
                "{} cannot join {} to {}",
                kind, self.from, self.to
            )));
        }
        if self.from == self.to {
            return Err(MedRagError::InvalidEdge(format!(
                "{} self-loop on {}",
                kind, self.from
            )));
        }
        if let Relation::InteractsWith { severity, .. } = &self.relation {
            if *severity == Severity::Unknown {
                return Err(MedRagError::InvalidEdge(format!(
                    "interaction {} -- {} needs a known severity",
                    self.from, self.to
                )));
            }
        }
        Ok(())
    }
}
