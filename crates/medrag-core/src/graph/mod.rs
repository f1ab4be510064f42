//! Drug-safety knowledge graph
//!
//! Typed nodes (drugs, drug classes, conditions) joined by typed relations.
//! The graph is assembled once from a snapshot or the built-in seed and
//! then only read.

mod analyzer;
mod model;
mod normalize;
pub mod seed;
mod snapshot;

pub use analyzer::{Confidence, FindingKind, InteractionAnalyzer, InteractionFinding};
pub use model::{EdgeKind, GraphEdge, GraphNode, NodeKey, NodeKind, Relation, Severity};
pub use normalize::{normalize_drug_name, DrugResolver, StaticResolver};
pub use snapshot::GraphSnapshot;

use crate::error::{MedRagError, Result};
use crate::types::normalize_term;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// Hop bound used when no explicit bound is given
pub const DEFAULT_MAX_HOPS: usize = 6;

#[derive(Debug, Clone, Copy)]
struct Adjacent {
    node: usize,
    edge: usize,
}

/// A relation path between two nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphPath {
    /// Visited nodes, both endpoints included
    pub nodes: Vec<NodeKey>,
    /// Relation traversed between consecutive nodes
    pub relations: Vec<EdgeKind>,
}

impl GraphPath {
    pub fn hops(&self) -> usize {
        self.relations.len()
    }
}

/// Node and edge counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub drugs: usize,
    pub drug_classes: usize,
    pub conditions: usize,
    pub interactions: usize,
    pub treats: usize,
    pub contraindications: usize,
    pub memberships: usize,
}

#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    keys: Vec<NodeKey>,
    index: HashMap<NodeKey, usize>,
    edges: Vec<GraphEdge>,
    /// Edge identity (from, to, kind) to position; symmetric edges stored once
    edge_index: HashMap<(usize, usize, EdgeKind), usize>,
    outgoing: Vec<Vec<Adjacent>>,
    incoming: Vec<Vec<Adjacent>>,
    /// Normalized alias to node keys carrying it
    aliases: HashMap<String, Vec<NodeKey>>,
    /// Class memberships waiting for their other endpoint, keyed by the missing node
    pending_links: HashMap<NodeKey, Vec<(NodeKey, NodeKey)>>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Fails if a node of the same variant and canonical name exists.
    pub fn add_node(&mut self, node: GraphNode) -> Result<NodeKey> {
        let key = node.key();
        if key.name.is_empty() {
            return Err(MedRagError::InvalidArgument(format!(
                "{} node with empty name",
                key.kind
            )));
        }
        if self.index.contains_key(&key) {
            return Err(MedRagError::DuplicateNode(key.to_string()));
        }

        let pos = self.nodes.len();
        for alias in node.aliases() {
            let alias = normalize_term(alias);
            if !alias.is_empty() && alias != key.name {
                self.aliases.entry(alias).or_default().push(key.clone());
            }
        }

        let links: Vec<(NodeKey, NodeKey)> = match &node {
            GraphNode::Drug { classes, .. } => classes
                .iter()
                .map(|c| (key.clone(), NodeKey::class(c)))
                .collect(),
            GraphNode::DrugClass { members, .. } => members
                .iter()
                .map(|m| (NodeKey::drug(m), key.clone()))
                .collect(),
            GraphNode::Condition { .. } => Vec::new(),
        };

        self.nodes.push(node);
        self.keys.push(key.clone());
        self.index.insert(key.clone(), pos);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());

        let waiting = self.pending_links.remove(&key).unwrap_or_default();
        for (drug, class) in links.into_iter().chain(waiting) {
            self.link_membership(drug, class)?;
        }
        Ok(key)
    }

    fn link_membership(&mut self, drug: NodeKey, class: NodeKey) -> Result<()> {
        match (self.index.contains_key(&drug), self.index.contains_key(&class)) {
            (true, true) => self.add_edge(GraphEdge::new(drug, class, Relation::BelongsTo)),
            (false, _) => {
                self.pending_links.entry(drug.clone()).or_default().push((drug, class));
                Ok(())
            }
            (true, false) => {
                self.pending_links.entry(class.clone()).or_default().push((drug, class));
                Ok(())
            }
        }
    }

    /// Fail when a drug or class membership names a node that was never
    /// declared. Called once every node has been added.
    pub fn ensure_memberships_resolved(&self) -> Result<()> {
        if self.pending_links.is_empty() {
            return Ok(());
        }
        let mut missing: Vec<String> = self
            .pending_links
            .values()
            .flatten()
            .map(|(drug, class)| format!("{} -> {}", drug, class))
            .collect();
        missing.sort();
        Err(MedRagError::DanglingEdge(format!(
            "class membership references undeclared nodes: {}",
            missing.join(", ")
        )))
    }

    /// Add a relation between two declared nodes. `interacts_with` defines
    /// both directions with the same attributes. Re-adding an existing
    /// relation merges attributes, keeping the higher severity.
    pub fn add_edge(&mut self, edge: GraphEdge) -> Result<()> {
        edge.validate()?;
        let from = self.position(&edge.from).ok_or_else(|| {
            MedRagError::DanglingEdge(format!("{} endpoint {} is not declared", edge.kind(), edge.from))
        })?;
        let to = self.position(&edge.to).ok_or_else(|| {
            MedRagError::DanglingEdge(format!("{} endpoint {} is not declared", edge.kind(), edge.to))
        })?;

        let kind = edge.kind();
        let identity = if kind.is_symmetric() {
            (from.min(to), from.max(to), kind)
        } else {
            (from, to, kind)
        };

        if let Some(&existing) = self.edge_index.get(&identity) {
            merge_relation(&mut self.edges[existing].relation, edge.relation);
            return Ok(());
        }

        let edge_pos = self.edges.len();
        self.edges.push(edge);
        self.edge_index.insert(identity, edge_pos);

        self.outgoing[from].push(Adjacent { node: to, edge: edge_pos });
        self.incoming[to].push(Adjacent { node: from, edge: edge_pos });
        if kind.is_symmetric() {
            self.outgoing[to].push(Adjacent { node: from, edge: edge_pos });
            self.incoming[from].push(Adjacent { node: to, edge: edge_pos });
        }
        Ok(())
    }

    fn position(&self, key: &NodeKey) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn node(&self, key: &NodeKey) -> Option<&GraphNode> {
        self.position(key).map(|p| &self.nodes[p])
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter()
    }

    /// Edges in insertion order, symmetric edges once
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Resolve a name to a node of `kind` by canonical name, then alias
    pub fn lookup(&self, kind: NodeKind, name: &str) -> Option<NodeKey> {
        let key = NodeKey::new(kind, name);
        if self.contains(&key) {
            return Some(key);
        }
        self.aliases
            .get(&key.name)
            .and_then(|keys| keys.iter().find(|k| k.kind == kind).cloned())
    }

    /// Targets reachable over one `kind` edge from `node`; both directions
    /// for symmetric relations. Sorted, unknown node yields nothing.
    pub fn neighbors(&self, node: &NodeKey, kind: EdgeKind) -> Vec<&GraphNode> {
        self.related(node, kind, &self.outgoing)
    }

    /// Sources pointing at `node` over `kind` edges
    pub fn incoming(&self, node: &NodeKey, kind: EdgeKind) -> Vec<&GraphNode> {
        self.related(node, kind, &self.incoming)
    }

    fn related<'a>(&'a self, node: &NodeKey, kind: EdgeKind, adj: &'a [Vec<Adjacent>]) -> Vec<&'a GraphNode> {
        let Some(pos) = self.position(node) else {
            return Vec::new();
        };
        let targets: BTreeSet<usize> = adj[pos]
            .iter()
            .filter(|a| self.edges[a.edge].kind() == kind)
            .map(|a| a.node)
            .collect();
        let mut out: Vec<&GraphNode> = targets.into_iter().map(|p| &self.nodes[p]).collect();
        out.sort_by(|a, b| a.key().cmp(&b.key()));
        out
    }

    /// The relation of `kind` from `a` to `b`, either direction when symmetric
    pub fn edge_between(&self, a: &NodeKey, b: &NodeKey, kind: EdgeKind) -> Option<&GraphEdge> {
        let from = self.position(a)?;
        let to = self.position(b)?;
        let identity = if kind.is_symmetric() {
            (from.min(to), from.max(to), kind)
        } else {
            (from, to, kind)
        };
        self.edge_index.get(&identity).map(|&e| &self.edges[e])
    }

    /// Shortest path over any relation, ignoring direction
    pub fn find_path(&self, a: &NodeKey, b: &NodeKey, max_hops: usize) -> Option<GraphPath> {
        self.find_path_with(a, b, max_hops, None)
    }

    /// BFS shortest path ignoring direction, optionally restricted to some
    /// relation kinds. Returns `None` when no path exists within `max_hops`.
    pub fn find_path_with(
        &self,
        a: &NodeKey,
        b: &NodeKey,
        max_hops: usize,
        kinds: Option<&[EdgeKind]>,
    ) -> Option<GraphPath> {
        let start = self.position(a)?;
        let goal = self.position(b)?;
        if start == goal {
            return Some(GraphPath {
                nodes: vec![a.clone()],
                relations: Vec::new(),
            });
        }

        let allowed = |kind: EdgeKind| kinds.map_or(true, |ks| ks.contains(&kind));
        let mut parent: HashMap<usize, (usize, EdgeKind)> = HashMap::new();
        let mut depth: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let d = depth[&current];
            if d >= max_hops {
                continue;
            }
            for adj in self.outgoing[current].iter().chain(&self.incoming[current]) {
                let kind = self.edges[adj.edge].kind();
                if !allowed(kind) || depth.contains_key(&adj.node) {
                    continue;
                }
                depth.insert(adj.node, d + 1);
                parent.insert(adj.node, (current, kind));
                if adj.node == goal {
                    return Some(self.rebuild_path(start, goal, &parent));
                }
                queue.push_back(adj.node);
            }
        }
        None
    }

    fn rebuild_path(
        &self,
        start: usize,
        goal: usize,
        parent: &HashMap<usize, (usize, EdgeKind)>,
    ) -> GraphPath {
        let mut nodes = vec![self.keys[goal].clone()];
        let mut relations = Vec::new();
        let mut cursor = goal;
        while cursor != start {
            let (prev, kind) = parent[&cursor];
            relations.push(kind);
            nodes.push(self.keys[prev].clone());
            cursor = prev;
        }
        nodes.reverse();
        relations.reverse();
        GraphPath { nodes, relations }
    }

    /// Classes a drug belongs to
    pub fn pharmacological_classes(&self, drug: &NodeKey) -> Vec<String> {
        self.neighbors(drug, EdgeKind::BelongsTo)
            .into_iter()
            .map(|n| n.key().name)
            .collect()
    }

    /// Conditions a drug treats, directly or through its classes
    pub fn therapeutic_indications(&self, drug: &NodeKey) -> Vec<String> {
        self.agent_targets(drug, EdgeKind::Treats)
    }

    /// Conditions a drug is contraindicated for, directly or through its classes
    pub fn contraindications(&self, drug: &NodeKey) -> Vec<String> {
        self.agent_targets(drug, EdgeKind::ContraindicatedFor)
    }

    fn agent_targets(&self, drug: &NodeKey, kind: EdgeKind) -> Vec<String> {
        let mut names: BTreeSet<String> = self
            .neighbors(drug, kind)
            .into_iter()
            .map(|n| n.key().name)
            .collect();
        for class in self.pharmacological_classes(drug) {
            names.extend(
                self.neighbors(&NodeKey::class(&class), kind)
                    .into_iter()
                    .map(|n| n.key().name),
            );
        }
        names.into_iter().collect()
    }

    /// Monitoring parameters declared on each known drug
    pub fn monitoring_parameters(&self, drugs: &[NodeKey]) -> BTreeMap<String, Vec<String>> {
        drugs
            .iter()
            .filter_map(|key| {
                let node = self.node(key)?;
                if node.monitoring().is_empty() {
                    None
                } else {
                    Some((key.name.clone(), node.monitoring().to_vec()))
                }
            })
            .collect()
    }

    /// Nodes within `depth` hops of `node`, nearest first, excluding itself
    pub fn related_concepts(&self, node: &NodeKey, depth: usize) -> Vec<NodeKey> {
        let Some(start) = self.position(node) else {
            return Vec::new();
        };
        let mut dist: HashMap<usize, usize> = HashMap::from([(start, 0)]);
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            let d = dist[&current];
            if d >= depth {
                continue;
            }
            for adj in self.outgoing[current].iter().chain(&self.incoming[current]) {
                if !dist.contains_key(&adj.node) {
                    dist.insert(adj.node, d + 1);
                    queue.push_back(adj.node);
                }
            }
        }
        let mut found: Vec<(usize, NodeKey)> = dist
            .into_iter()
            .filter(|(p, _)| *p != start)
            .map(|(p, d)| (d, self.keys[p].clone()))
            .collect();
        found.sort();
        found.into_iter().map(|(_, k)| k).collect()
    }

    /// Path-length proxy for interaction risk: `1 / (hops + 1)`, 0 without a path
    pub fn interaction_risk(&self, a: &NodeKey, b: &NodeKey) -> f64 {
        match self.find_path(a, b, DEFAULT_MAX_HOPS) {
            Some(path) => 1.0 / (path.hops() as f64 + 1.0),
            None => 0.0,
        }
    }

    /// Drug names whose canonical name or an alias contains `query`
    pub fn search_drugs(&self, query: &str, limit: usize) -> Vec<String> {
        let needle = normalize_term(query);
        if needle.chars().count() < 2 {
            return Vec::new();
        }
        let mut found: BTreeSet<String> = BTreeSet::new();
        for (node, key) in self.nodes.iter().zip(&self.keys) {
            if key.kind != NodeKind::Drug {
                continue;
            }
            let hit = key.name.contains(&needle)
                || node
                    .aliases()
                    .iter()
                    .any(|a| normalize_term(a).contains(&needle));
            if hit {
                found.insert(key.name.clone());
            }
        }
        found.into_iter().take(limit).collect()
    }

    /// All drug keys with their normalized aliases, in declaration order
    pub(crate) fn drug_entries(&self) -> impl Iterator<Item = (&NodeKey, &GraphNode)> {
        self.keys
            .iter()
            .zip(&self.nodes)
            .filter(|(k, _)| k.kind == NodeKind::Drug)
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            ..GraphStats::default()
        };
        for key in &self.keys {
            match key.kind {
                NodeKind::Drug => stats.drugs += 1,
                NodeKind::DrugClass => stats.drug_classes += 1,
                NodeKind::Condition => stats.conditions += 1,
            }
        }
        for edge in &self.edges {
            match edge.kind() {
                EdgeKind::InteractsWith => stats.interactions += 1,
                EdgeKind::Treats => stats.treats += 1,
                EdgeKind::ContraindicatedFor => stats.contraindications += 1,
                EdgeKind::BelongsTo => stats.memberships += 1,
            }
        }
        stats
    }
}

fn merge_relation(existing: &mut Relation, incoming: Relation) {
    if let (
        Relation::InteractsWith {
            severity,
            mechanism,
            monitoring,
        },
        Relation::InteractsWith {
            severity: new_severity,
            mechanism: new_mechanism,
            monitoring: new_monitoring,
        },
    ) = (existing, incoming)
    {
        if new_severity > *severity {
            *severity = new_severity;
        }
        if mechanism.is_empty() {
            *mechanism = new_mechanism;
        }
        for m in new_monitoring {
            if !monitoring.contains(&m) {
                monitoring.push(m);
            }
        }
    }
}
