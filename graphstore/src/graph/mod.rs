// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph representations
//!
//! Three interchangeable in-memory graph structures over the shared
//! adjacency-list and entry-table building blocks:
//! - [`UnGraph`]: undirected simple graph (at most one edge per unordered
//!   pair)
//! - [`DiGraph`]: directed simple graph (separate in/out adjacency)
//! - [`MultiGraph`]: directed multigraph with first-class edge identities,
//!   parallel edges, and self-loops

pub mod directed;
pub mod multi;
pub mod undirected;

pub use directed::DiGraph;
pub use multi::{Edge, MultiGraph};
pub use undirected::UnGraph;

use crate::adjacency::AdjacencyList;
use crate::error::ConsistencyError;

/// Node identity: non-negative integer, unique while live within its table
pub type NodeId = u64;

/// Edge identity: non-negative integer, unique while live within its table
pub type EdgeId = u64;

/// Run-time discriminant describing a graph representation.
///
/// Replaces compile-time capability tags with an explicit enum that can be
/// queried and matched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    /// Undirected simple graph
    Undirected,

    /// Directed simple graph
    Directed,

    /// Directed multigraph with edge identities
    DirectedMulti,
}

impl GraphKind {
    /// Whether edges of this representation carry a direction
    pub fn is_directed(&self) -> bool {
        !matches!(self, GraphKind::Undirected)
    }

    /// Whether this representation admits parallel edges with independent
    /// identity
    pub fn is_multigraph(&self) -> bool {
        matches!(self, GraphKind::DirectedMulti)
    }
}

impl std::fmt::Display for GraphKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GraphKind::Undirected => "undirected",
            GraphKind::Directed => "directed",
            GraphKind::DirectedMulti => "directed-multi",
        };
        write!(f, "{}", name)
    }
}

/// Verify that an adjacency list is strictly ascending and duplicate-free,
/// naming the owning node on failure.
pub(crate) fn check_adjacency(
    node: NodeId,
    list: &AdjacencyList,
) -> Result<(), ConsistencyError> {
    for pair in list.as_slice().windows(2) {
        if pair[0] == pair[1] {
            return Err(ConsistencyError::DuplicateAdjacency {
                node,
                entry: pair[1],
            });
        }
        if pair[0] > pair[1] {
            return Err(ConsistencyError::UnsortedAdjacency {
                node,
                entry: pair[1],
            });
        }
    }
    Ok(())
}
