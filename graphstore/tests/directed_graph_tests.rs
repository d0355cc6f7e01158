// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Directed simple graph behavior
//!
//! Covers edge direction semantics, the undirected deletion variant,
//! bulk insertion, iteration, and consistency checking.

use graphstore::{DiGraph, GraphError, GraphKind};

#[test]
fn test_single_directed_edge_degrees() {
    let mut graph = DiGraph::new();
    graph.add_node_with_id(0).unwrap();
    graph.add_node_with_id(1).unwrap();
    assert!(graph.add_edge(0, 1).unwrap());

    assert!(graph.is_edge(0, 1));
    assert!(!graph.is_edge(1, 0), "direction matters");
    assert_eq!(graph.in_degree(1).unwrap(), 1);
    assert_eq!(graph.out_degree(1).unwrap(), 0);
    assert_eq!(graph.out_degree(0).unwrap(), 1);
    assert_eq!(graph.in_degree(0).unwrap(), 0);
    assert_eq!(graph.degree(0).unwrap(), 1);

    assert!(graph.is_adjacent(1, 0), "adjacency ignores orientation");
    assert!(graph.check().is_ok());
}

#[test]
fn test_antiparallel_edges_are_distinct() {
    let mut graph = DiGraph::new();
    graph.add_node_with_id(0).unwrap();
    graph.add_node_with_id(1).unwrap();

    assert!(graph.add_edge(0, 1).unwrap());
    assert!(graph.add_edge(1, 0).unwrap(), "reverse edge is a second edge");
    assert!(!graph.add_edge(0, 1).unwrap(), "repeat is idempotent");

    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.degree(0).unwrap(), 2);
}

#[test]
fn test_del_edge_is_one_orientation() {
    let mut graph = DiGraph::new();
    graph.add_node_with_id(0).unwrap();
    graph.add_node_with_id(1).unwrap();
    graph.add_edge(0, 1).unwrap();
    graph.add_edge(1, 0).unwrap();

    assert!(graph.del_edge(0, 1).unwrap());
    assert!(!graph.is_edge(0, 1));
    assert!(graph.is_edge(1, 0), "reverse edge survives");
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn test_del_edge_undirected_removes_both_orientations() {
    let mut graph = DiGraph::new();
    graph.add_node_with_id(0).unwrap();
    graph.add_node_with_id(1).unwrap();
    graph.add_edge(0, 1).unwrap();
    graph.add_edge(1, 0).unwrap();

    assert!(graph.del_edge_undirected(0, 1).unwrap());
    assert_eq!(graph.edge_count(), 0);
    assert!(!graph.is_adjacent(0, 1));

    // No-op when nothing is left, but endpoints must still be live.
    assert!(!graph.del_edge_undirected(0, 1).unwrap());
    let err = graph.del_edge_undirected(0, 9).unwrap_err();
    assert!(matches!(err, GraphError::UnknownNode(9)));
}

#[test]
fn test_del_node_purges_both_directions() {
    let mut graph = DiGraph::new();
    for id in 0..4 {
        graph.add_node_with_id(id).unwrap();
    }
    graph.add_edge(0, 2).unwrap();
    graph.add_edge(2, 1).unwrap();
    graph.add_edge(3, 2).unwrap();
    graph.add_edge(2, 2).unwrap();

    graph.del_node(2).unwrap();

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(graph.out_neighbors(0).unwrap(), &[] as &[u64]);
    assert_eq!(graph.in_neighbors(1).unwrap(), &[] as &[u64]);
    assert_eq!(graph.out_neighbors(3).unwrap(), &[] as &[u64]);
    assert!(graph.check().is_ok());
}

#[test]
fn test_bulk_add_with_in_and_out_lists() {
    let mut graph = DiGraph::new();
    for id in 0..3 {
        graph.add_node_with_id(id).unwrap();
    }

    graph.add_node_with_neighbors(5, &[0, 1], &[1, 2]).unwrap();

    assert_eq!(graph.edge_count(), 4);
    assert_eq!(graph.in_neighbors(5).unwrap(), &[0, 1]);
    assert_eq!(graph.out_neighbors(5).unwrap(), &[1, 2]);
    assert!(graph.is_edge(0, 5));
    assert!(graph.is_edge(5, 2));
    assert!(!graph.is_edge(2, 5));
    assert!(graph.check().is_ok());

    let err = graph.add_node_with_neighbors(6, &[99], &[]).unwrap_err();
    assert!(matches!(err, GraphError::UnknownNode(99)));
    assert!(!graph.is_node(6));
}

#[test]
fn test_edge_iteration_walks_out_lists_in_table_order() {
    let mut graph = DiGraph::new();
    for id in 0..4 {
        graph.add_node_with_id(id).unwrap();
    }
    graph.add_edge(2, 0).unwrap();
    graph.add_edge(0, 3).unwrap();
    graph.add_edge(0, 1).unwrap();
    graph.add_edge(3, 3).unwrap();

    let edges: Vec<(u64, u64)> = graph.edges().collect();
    // Nodes in table order 0,1,2,3; out-lists sorted ascending.
    assert_eq!(edges, vec![(0, 1), (0, 3), (2, 0), (3, 3)]);
    assert_eq!(edges.len(), graph.edge_count());
}

#[test]
fn test_node_views_expose_both_lists() {
    let mut graph = DiGraph::new();
    for id in 0..3 {
        graph.add_node_with_id(id).unwrap();
    }
    graph.add_edge(0, 1).unwrap();
    graph.add_edge(2, 1).unwrap();

    let node = graph.node(1).expect("node 1 is live");
    assert_eq!(node.id(), 1);
    assert_eq!(node.in_degree(), 2);
    assert_eq!(node.out_degree(), 0);
    assert_eq!(node.in_neighbors(), &[0, 2]);
    assert_eq!(node.in_neighbor(1), Some(2));
    assert!(node.is_in_neighbor(0));
    assert!(!node.is_out_neighbor(0));
    assert!(node.is_neighbor(2));

    let ids: Vec<u64> = graph.nodes().map(|n| n.id()).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(graph.kind(), GraphKind::Directed);
}

#[test]
fn test_defrag_and_random_sampling() {
    let mut graph = DiGraph::new();
    for id in 0..10 {
        graph.add_node_with_id(id).unwrap();
        if id > 0 {
            graph.add_edge(id - 1, id).unwrap();
        }
    }
    for id in [1, 4, 7] {
        graph.del_node(id).unwrap();
    }
    graph.defrag();

    assert_eq!(graph.node_count(), 7);
    assert!(graph.check().is_ok());

    let mut rng = fastrand::Rng::with_seed(9);
    for _ in 0..50 {
        let id = graph.rnd_node(&mut rng).expect("graph is not empty");
        assert!(graph.is_node(id), "sampled dead node {}", id);
    }
}
