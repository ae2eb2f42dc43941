//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Qi.
//! The Qi project belongs to the Dunimd Team.

use qix::dag::*;
use qix::errors::QiError;

fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> QiDAG {
    let mut dag = QiDAG::new();
    for node in nodes {
        dag.add_node(*node).unwrap();
    }
    for (from, to) in edges {
        dag.add_edge(from, to).unwrap();
    }
    dag
}

fn position(dag: &QiDAG, order: &[QiNodeId], name: &str) -> usize {
    let id = dag.node_id(name).unwrap();
    order.iter().position(|n| *n == id).unwrap()
}

#[test]
fn test_dag_topological_sort() {
    let dag = graph(&["a", "b", "c"], &[("a", "c"), ("b", "c")]);
    let sorted = dag.topological_sort().unwrap();

    assert_eq!(sorted.len(), 3);
    assert!(position(&dag, &sorted, "a") < position(&dag, &sorted, "c"));
    assert!(position(&dag, &sorted, "b") < position(&dag, &sorted, "c"));
}

#[test]
fn test_dag_ties_follow_insertion_order() {
    let dag = graph(&["z", "y", "x"], &[]);
    let names: Vec<&str> = dag
        .topological_sort()
        .unwrap()
        .into_iter()
        .map(|id| dag.name(id))
        .collect();
    assert_eq!(names, vec!["z", "y", "x"]);
}

#[test]
fn test_dag_cycle_detection_names_a_block_on_the_cycle() {
    let dag = graph(
        &["source", "a", "b", "c"],
        &[("source", "a"), ("a", "b"), ("b", "c"), ("c", "a")],
    );
    let cycle = dag.find_cycle().unwrap();
    assert!(["a", "b", "c"].contains(&dag.name(cycle)));

    match dag.topological_sort().unwrap_err() {
        QiError::CyclicPipeline { block } => assert!(["a", "b", "c"].contains(&block.as_str())),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_dag_duplicate_nodes_and_edges_rejected() {
    let mut dag = graph(&["a", "b"], &[("a", "b")]);
    assert!(matches!(dag.add_node("a"), Err(QiError::DuplicateName { .. })));
    assert!(matches!(dag.add_edge("a", "b"), Err(QiError::InvalidEdge { .. })));
    assert!(matches!(dag.add_edge("a", "nope"), Err(QiError::UnknownBlock { name }) if name == "nope"));
}

#[test]
fn test_dag_components_and_downstream() {
    let dag = graph(
        &["a1", "b1", "a2", "b2", "c2"],
        &[("a1", "b1"), ("a2", "b2"), ("b2", "c2")],
    );
    let order = dag.topological_sort().unwrap();
    let components = dag.components(&order);
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].len(), 2);
    assert_eq!(components[1].len(), 3);

    let downstream: Vec<&str> = dag
        .downstream(dag.node_id("a2").unwrap())
        .into_iter()
        .map(|id| dag.name(id))
        .collect();
    assert_eq!(downstream, vec!["b2", "c2"]);
}
