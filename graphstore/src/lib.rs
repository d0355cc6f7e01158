// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! GraphStore - An in-memory graph storage engine
//!
//! GraphStore provides three interchangeable graph representations built on
//! sorted, deduplicated adjacency lists and insertion-ordered record tables.
//!
//! # Features
//!
//! - **Undirected simple graphs**: at most one edge per unordered node pair
//! - **Directed simple graphs**: separate in/out adjacency per node
//! - **Directed multigraphs**: first-class edge identities, parallel edges
//!   and self-loops
//! - **Binary persistence**: framed, checksummed save/load round-trips that
//!   preserve node/edge sets, adjacency, and id counters
//! - **Consistency checking**: opt-in structural verification reporting the
//!   exact violated invariant and entity
//! - **Graph arena**: generational handles for sharing graphs between owners
//!
//! # Usage
//!
//! ```rust
//! use graphstore::UnGraph;
//!
//! let mut graph = UnGraph::new();
//! let a = graph.add_node();
//! let b = graph.add_node();
//! graph.add_edge(a, b).unwrap();
//! assert!(graph.is_edge(b, a));
//! ```
//!
//! All operations are synchronous and single-threaded; callers needing
//! concurrent access must serialize it externally.

pub mod adjacency;
pub mod arena;
pub mod error;
pub mod graph;
pub mod persist;
pub mod table;

// Re-export the public API
pub use adjacency::AdjacencyList;
pub use arena::{GraphArena, GraphHandle};
pub use error::{ConsistencyError, GraphError, GraphResult};
pub use graph::{DiGraph, Edge, EdgeId, GraphKind, MultiGraph, NodeId, UnGraph};
pub use persist::PersistError;
pub use table::EntryTable;

/// GraphStore version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// GraphStore crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
