//! Integration tests for the knowledge graph and interaction analysis

use medrag_core::graph::{seed, Confidence, EdgeKind, Relation};
use medrag_core::{
    FindingKind, GraphEdge, GraphNode, InteractionAnalyzer, KnowledgeGraph, MedRagError, NodeKey,
    Severity, StaticResolver,
};
use proptest::prelude::*;
use tempfile::TempDir;

const DRUG_POOL: &[&str] = &["Alpha", "beta-drug", "Gamma", "delta", "Epsilon Forte", "zeta"];

fn severity_strategy() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Mild),
        Just(Severity::Moderate),
        Just(Severity::Severe),
    ]
}

proptest! {
    #[test]
    fn prop_interactions_are_symmetric(
        a in 0..DRUG_POOL.len(),
        offset in 1..DRUG_POOL.len(),
        severity in severity_strategy(),
    ) {
        let b = (a + offset) % DRUG_POOL.len();
        let mut graph = KnowledgeGraph::new();
        for name in DRUG_POOL {
            graph.add_node(GraphNode::drug(name)).unwrap();
        }
        let key_a = NodeKey::drug(DRUG_POOL[a]);
        let key_b = NodeKey::drug(DRUG_POOL[b]);
        graph
            .add_edge(GraphEdge::interacts(key_a.clone(), key_b.clone(), severity, "test", &[]))
            .unwrap();

        let from_b: Vec<NodeKey> = graph
            .neighbors(&key_b, EdgeKind::InteractsWith)
            .into_iter()
            .map(|n| n.key())
            .collect();
        prop_assert_eq!(from_b, vec![key_a.clone()]);

        let forward = graph.edge_between(&key_a, &key_b, EdgeKind::InteractsWith).unwrap();
        let backward = graph.edge_between(&key_b, &key_a, EdgeKind::InteractsWith).unwrap();
        prop_assert_eq!(forward, backward);
        prop_assert_eq!(backward.relation.severity(), Some(severity));
        prop_assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn prop_reinsert_never_downgrades(
        first in severity_strategy(),
        second in severity_strategy(),
    ) {
        let mut graph = KnowledgeGraph::new();
        graph.add_node(GraphNode::drug("a")).unwrap();
        graph.add_node(GraphNode::drug("b")).unwrap();
        graph
            .add_edge(GraphEdge::interacts(NodeKey::drug("a"), NodeKey::drug("b"), first, "", &[]))
            .unwrap();
        graph
            .add_edge(GraphEdge::interacts(NodeKey::drug("b"), NodeKey::drug("a"), second, "", &[]))
            .unwrap();

        let edge = graph
            .edge_between(&NodeKey::drug("a"), &NodeKey::drug("b"), EdgeKind::InteractsWith)
            .unwrap();
        prop_assert_eq!(edge.relation.severity(), Some(first.max(second)));
    }
}

#[test]
fn test_contraindication_scenario() {
    let mut graph = KnowledgeGraph::new();
    graph.add_node(GraphNode::drug("DrugX")).unwrap();
    graph.add_node(GraphNode::condition("ConditionY")).unwrap();
    graph
        .add_edge(GraphEdge::contraindicated(
            NodeKey::drug("DrugX"),
            NodeKey::condition("ConditionY"),
        ))
        .unwrap();

    let findings = InteractionAnalyzer::new(&graph)
        .analyze(&["DrugX"], &["ConditionY"])
        .unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::Contraindication);
    assert_eq!(findings[0].drugs, vec!["drugx".to_string()]);
    assert_eq!(findings[0].condition.as_deref(), Some("conditiony"));
}

#[test]
fn test_unknown_drug_scenario() {
    let graph = KnowledgeGraph::new();
    let no_conditions: [&str; 0] = [];
    let findings = InteractionAnalyzer::new(&graph)
        .analyze(&["NotARealDrug"], &no_conditions)
        .unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::UnknownDrug);
    assert_eq!(findings[0].severity, Severity::Unknown);
}

#[test]
fn test_dangling_and_duplicate_rejected() {
    let mut graph = KnowledgeGraph::new();
    graph.add_node(GraphNode::drug("aspirin")).unwrap();
    assert!(matches!(
        graph.add_node(GraphNode::drug("Aspirin")),
        Err(MedRagError::DuplicateNode(_))
    ));
    assert!(matches!(
        graph.add_edge(GraphEdge::treats(
            NodeKey::drug("aspirin"),
            NodeKey::condition("pain")
        )),
        Err(MedRagError::DanglingEdge(_))
    ));
    // Same name under another variant is a different node
    graph.add_node(GraphNode::condition("aspirin")).unwrap();
}

#[test]
fn test_disallowed_variant_pair_rejected() {
    let mut graph = KnowledgeGraph::new();
    graph.add_node(GraphNode::condition("pain")).unwrap();
    graph.add_node(GraphNode::drug("aspirin")).unwrap();
    assert!(matches!(
        graph.add_edge(GraphEdge::treats(
            NodeKey::condition("pain"),
            NodeKey::drug("aspirin")
        )),
        Err(MedRagError::InvalidEdge(_))
    ));
}

#[test]
fn test_seed_direct_interaction() {
    let graph = seed::default_graph().unwrap();
    let no_conditions: [&str; 0] = [];
    let findings = InteractionAnalyzer::new(&graph)
        .analyze(&["Coumadin 5mg", "Aspirin"], &no_conditions)
        .unwrap();

    assert_eq!(findings.len(), 1);
    let finding = &findings[0];
    assert_eq!(finding.kind, FindingKind::Interaction);
    assert_eq!(finding.severity, Severity::Severe);
    assert_eq!(finding.confidence, Confidence::High);
    assert_eq!(finding.drugs, vec!["warfarin".to_string(), "aspirin".to_string()]);
    assert!(finding.monitoring.contains(&"INR".to_string()));
}

#[test]
fn test_seed_class_mediated_interaction() {
    let graph = seed::default_graph().unwrap();
    let no_conditions: [&str; 0] = [];
    let findings = InteractionAnalyzer::new(&graph)
        .analyze(&["ibuprofen", "warfarin"], &no_conditions)
        .unwrap();

    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].kind, FindingKind::IndirectInteraction);
    assert_eq!(findings[0].confidence, Confidence::Low);
    assert_eq!(findings[0].severity, Severity::Severe);
    assert!(findings[0].explanation.contains("nsaid"));
}

#[test]
fn test_seed_findings_ordered_by_severity_then_input() {
    let graph = seed::default_graph().unwrap();
    let findings = InteractionAnalyzer::new(&graph)
        .analyze(
            &["metoprolol", "amlodipine", "warfarin", "aspirin", "NotARealDrug"],
            &["bleeding"],
        )
        .unwrap();

    let kinds: Vec<FindingKind> = findings.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FindingKind::Interaction,
            FindingKind::Contraindication,
            FindingKind::Contraindication,
            FindingKind::SharedClass,
            FindingKind::UnknownDrug,
        ]
    );
    assert_eq!(findings[1].drugs, vec!["warfarin".to_string()]);
    assert_eq!(findings[2].drugs, vec!["aspirin".to_string()]);
    for pair in findings.windows(2) {
        assert!(pair[0].severity >= pair[1].severity);
    }
}

#[test]
fn test_resolver_maps_brand_names() {
    let graph = seed::default_graph().unwrap();
    let resolver = StaticResolver::new().with("Jantoven", "warfarin");
    let no_conditions: [&str; 0] = [];
    let findings = InteractionAnalyzer::new(&graph)
        .with_resolver(&resolver)
        .analyze(&["Jantoven", "aspirin"], &no_conditions)
        .unwrap();
    assert_eq!(findings[0].kind, FindingKind::Interaction);
}

#[test]
fn test_find_path_bounded() {
    let graph = seed::default_graph().unwrap();
    let path = graph
        .find_path(&NodeKey::drug("metoprolol"), &NodeKey::drug("amlodipine"), 2)
        .unwrap();
    assert_eq!(path.hops(), 2);
    assert!(graph
        .find_path(&NodeKey::drug("metoprolol"), &NodeKey::drug("amlodipine"), 1)
        .is_none());
}

#[test]
fn test_graph_snapshot_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("graph.json");
    let graph = seed::default_graph().unwrap();
    graph.save(&path).unwrap();

    let loaded = KnowledgeGraph::load(&path).unwrap();
    let edge = loaded
        .edge_between(
            &NodeKey::drug("warfarin"),
            &NodeKey::drug("aspirin"),
            EdgeKind::InteractsWith,
        )
        .unwrap();
    assert!(matches!(
        edge.relation,
        Relation::InteractsWith {
            severity: Severity::Severe,
            ..
        }
    ));
    assert_eq!(
        loaded.pharmacological_classes(&NodeKey::drug("ibuprofen")),
        graph.pharmacological_classes(&NodeKey::drug("ibuprofen"))
    );
}
