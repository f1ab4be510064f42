//! JSON node/edge list persistence for the knowledge graph

use super::model::{GraphEdge, GraphNode, NodeKey};
use super::KnowledgeGraph;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    /// Rebuild through `add_node`/`add_edge` so every invariant is checked
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut graph = KnowledgeGraph::new();
        for node in snapshot.nodes {
            graph.add_node(node)?;
        }
        graph.ensure_memberships_resolved()?;
        for edge in snapshot.edges {
            let from = NodeKey::new(edge.from.kind, &edge.from.name);
            let to = NodeKey::new(edge.to.kind, &edge.to.name);
            graph.add_edge(GraphEdge::new(from, to, edge.relation))?;
        }
        Ok(graph)
    }

    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges().cloned().collect(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let snapshot: GraphSnapshot = serde_json::from_slice(&bytes)?;
        let graph = Self::from_snapshot(snapshot)?;
        tracing::info!(
            "Loaded knowledge graph from {}: {} nodes, {} edges",
            path.display(),
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_vec_pretty(&self.to_snapshot())?)?;
        Ok(())
    }
}
