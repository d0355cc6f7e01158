// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for graph operations
//!
//! Defines the crate-wide [`GraphError`] along with [`ConsistencyError`],
//! the structured payload of a failed consistency check.

use thiserror::Error;

use crate::graph::{EdgeId, NodeId};
use crate::persist::PersistError;

/// Error types for graph operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),

    #[error("Node already exists: {0}")]
    DuplicateNode(NodeId),

    #[error("Edge already exists: {0}")]
    DuplicateEdge(EdgeId),

    #[error("Consistency violation: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

/// Result type for graph operations
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// A structural invariant violation found by a consistency check.
///
/// Each variant names the invariant and the offending entity, so that a
/// caller running `check()` on untrusted data can report precisely what is
/// wrong instead of a bare boolean.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyError {
    #[error("Node {node}: adjacency entries out of order around {entry}")]
    UnsortedAdjacency { node: NodeId, entry: u64 },

    #[error("Node {node}: duplicate adjacency entry {entry}")]
    DuplicateAdjacency { node: NodeId, entry: u64 },

    #[error("Node {node} lists missing node {neighbor} as a neighbor")]
    MissingNeighbor { node: NodeId, neighbor: NodeId },

    #[error("Edge {src} -> {dst} has no matching reverse entry")]
    AsymmetricEdge { src: NodeId, dst: NodeId },

    #[error("Node {node} references missing edge {edge}")]
    MissingEdge { node: NodeId, edge: EdgeId },

    #[error("Edge {edge} endpoint {node} is not a live node")]
    DanglingEndpoint { edge: EdgeId, node: NodeId },

    #[error("Edge {edge} is missing from the incidence list of node {node}")]
    MissingIncidence { edge: EdgeId, node: NodeId },

    #[error("Edge {edge} appears in the wrong incidence list of node {node}")]
    MisplacedIncidence { edge: EdgeId, node: NodeId },

    #[error("Record stored under key {key} carries id {id}")]
    RecordIdMismatch { key: u64, id: u64 },

    #[error("Node id {id} is not below the node id counter {next}")]
    NodeIdAboveCounter { id: NodeId, next: NodeId },

    #[error("Edge id {id} is not below the edge id counter {next}")]
    EdgeIdAboveCounter { id: EdgeId, next: EdgeId },

    #[error("Stored edge count {stored} does not match counted edges {counted}")]
    EdgeCountMismatch { stored: usize, counted: usize },
}
