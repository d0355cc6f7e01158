// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Undirected simple graph
//!
//! Nodes carry one sorted list of neighbor ids; there is at most one edge
//! between an unordered pair of nodes. Adding a node is constant time,
//! adding an edge is linear in the endpoint degrees (the lists stay
//! sorted), and testing an edge is logarithmic. Edge iteration reports
//! each unordered pair exactly once, anchored at the smaller-id endpoint.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::adjacency::AdjacencyList;
use crate::error::{ConsistencyError, GraphError, GraphResult};
use crate::graph::{check_adjacency, GraphKind, NodeId};
use crate::persist::{self, decode_err, encode_err, PersistError};
use crate::table::{self, EntryTable};

/// Node record: id plus the sorted list of neighbor ids
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    id: NodeId,
    neighbors: AdjacencyList,
}

/// Undirected simple graph
#[derive(Debug, Clone)]
pub struct UnGraph {
    /// Next id handed out by auto-assignment; never reused
    next_node_id: NodeId,

    /// Number of live edges (self-loops count once)
    edge_count: usize,

    /// All node records, in insertion order
    nodes: EntryTable<Node>,
}

impl UnGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            next_node_id: 0,
            edge_count: 0,
            nodes: EntryTable::new(),
        }
    }

    /// Create an empty graph with room for `nodes` node records
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            next_node_id: 0,
            edge_count: 0,
            nodes: EntryTable::with_capacity(nodes),
        }
    }

    /// The representation discriminant of this graph
    pub fn kind(&self) -> GraphKind {
        GraphKind::Undirected
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Check whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Delete all nodes and edges and reset the id counter
    pub fn clear(&mut self) {
        self.next_node_id = 0;
        self.edge_count = 0;
        self.nodes.clear();
    }

    /// Add a node with the next free id
    pub fn add_node(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                neighbors: AdjacencyList::new(),
            },
        );
        id
    }

    /// Add a node with a caller-chosen id
    pub fn add_node_with_id(&mut self, id: NodeId) -> GraphResult<NodeId> {
        if self.nodes.contains_key(id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.next_node_id = self.next_node_id.max(id + 1);
        self.nodes.insert(
            id,
            Node {
                id,
                neighbors: AdjacencyList::new(),
            },
        );
        Ok(id)
    }

    /// Add a node and wire an edge to every listed neighbor in one pass.
    ///
    /// Every neighbor must already be live (or be `id` itself, creating a
    /// self-loop); duplicates in the input collapse to one edge. The input
    /// is validated up front, so a failure leaves the graph unchanged.
    pub fn add_node_with_neighbors(
        &mut self,
        id: NodeId,
        neighbors: &[NodeId],
    ) -> GraphResult<NodeId> {
        if self.nodes.contains_key(id) {
            return Err(GraphError::DuplicateNode(id));
        }
        for &nbr in neighbors {
            if nbr != id && !self.nodes.contains_key(nbr) {
                return Err(GraphError::UnknownNode(nbr));
            }
        }
        self.next_node_id = self.next_node_id.max(id + 1);
        self.nodes.insert(
            id,
            Node {
                id,
                neighbors: AdjacencyList::with_capacity(neighbors.len()),
            },
        );
        for &nbr in neighbors {
            self.add_edge(id, nbr)?;
        }
        Ok(id)
    }

    /// Delete a node, purging it from every neighbor's list
    pub fn del_node(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self.nodes.remove(id).ok_or(GraphError::UnknownNode(id))?;
        self.edge_count -= node.neighbors.len();
        for nbr in node.neighbors.iter() {
            if nbr == id {
                continue;
            }
            if let Some(other) = self.nodes.get_mut(nbr) {
                other.neighbors.remove(id);
            }
        }
        Ok(())
    }

    /// Node existence test
    pub fn is_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Add an edge between `u` and `v`.
    ///
    /// Inserts each endpoint into the other's sorted list. Idempotent:
    /// returns `false` when the edge already exists. Self-loops are stored
    /// once and count as one edge.
    pub fn add_edge(&mut self, u: NodeId, v: NodeId) -> GraphResult<bool> {
        if !self.nodes.contains_key(u) {
            return Err(GraphError::UnknownNode(u));
        }
        if !self.nodes.contains_key(v) {
            return Err(GraphError::UnknownNode(v));
        }
        let inserted = match self.nodes.get_mut(u) {
            Some(node) => node.neighbors.insert(v),
            None => false,
        };
        if !inserted {
            return Ok(false);
        }
        if u != v {
            if let Some(node) = self.nodes.get_mut(v) {
                node.neighbors.insert(u);
            }
        }
        self.edge_count += 1;
        Ok(true)
    }

    /// Delete the edge between `u` and `v`.
    ///
    /// Both endpoints must be live; removing an absent edge is a no-op
    /// returning `false`.
    pub fn del_edge(&mut self, u: NodeId, v: NodeId) -> GraphResult<bool> {
        if !self.nodes.contains_key(u) {
            return Err(GraphError::UnknownNode(u));
        }
        if !self.nodes.contains_key(v) {
            return Err(GraphError::UnknownNode(v));
        }
        let removed = match self.nodes.get_mut(u) {
            Some(node) => node.neighbors.remove(v),
            None => false,
        };
        if !removed {
            return Ok(false);
        }
        if u != v {
            if let Some(node) = self.nodes.get_mut(v) {
                node.neighbors.remove(u);
            }
        }
        self.edge_count -= 1;
        Ok(true)
    }

    /// Edge existence test; symmetric, `false` when either node is missing
    pub fn is_edge(&self, u: NodeId, v: NodeId) -> bool {
        match self.nodes.get(u) {
            Some(node) => node.neighbors.contains(v),
            None => false,
        }
    }

    /// Sorted neighbor ids of a node
    pub fn neighbors(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.nodes
            .get(id)
            .map(|node| node.neighbors.as_slice())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Degree of a node; in- and out-degree are the same number here
    pub fn degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.neighbors.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Reserve room for `additional` more neighbors of a node
    pub fn reserve_neighbors(&mut self, id: NodeId, additional: usize) -> GraphResult<()> {
        let node = self.nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;
        node.neighbors.reserve(additional);
        Ok(())
    }

    /// Iterate over live node ids in table order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Iterate over nodes in table order
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            inner: self.nodes.iter(),
        }
    }

    /// Point accessor for one node
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.get(id).map(|node| NodeRef { node })
    }

    /// Iterate over edges in canonical orientation.
    ///
    /// Each unordered pair surfaces exactly once as `(src, dst)` with
    /// `src <= dst`, ordered by (anchor node in table order, neighbor-list
    /// position).
    pub fn edges(&self) -> Edges<'_> {
        let mut inner = self.nodes.iter();
        let cur = inner.next().map(|(_, node)| node);
        Edges { inner, cur, pos: 0 }
    }

    /// Sample a live node id approximately uniformly
    pub fn rnd_node(&self, rng: &mut fastrand::Rng) -> Option<NodeId> {
        self.nodes.rnd_key(rng)
    }

    /// Compact adjacency storage and the node table.
    ///
    /// Reclaims slack left behind by deletions; logical content is
    /// unchanged.
    pub fn defrag(&mut self) {
        for node in self.nodes.values_mut() {
            node.neighbors.pack();
        }
        self.nodes.compact();
    }

    /// Verify all structural invariants, naming the first violation found
    pub fn check(&self) -> Result<(), ConsistencyError> {
        let mut counted = 0usize;
        for (key, node) in self.nodes.iter() {
            if key != node.id {
                return Err(ConsistencyError::RecordIdMismatch { key, id: node.id });
            }
            if node.id >= self.next_node_id {
                return Err(ConsistencyError::NodeIdAboveCounter {
                    id: node.id,
                    next: self.next_node_id,
                });
            }
            check_adjacency(node.id, &node.neighbors)?;
            for nbr in node.neighbors.iter() {
                let other = self
                    .nodes
                    .get(nbr)
                    .ok_or(ConsistencyError::MissingNeighbor {
                        node: node.id,
                        neighbor: nbr,
                    })?;
                if !other.neighbors.contains(node.id) {
                    return Err(ConsistencyError::AsymmetricEdge {
                        src: node.id,
                        dst: nbr,
                    });
                }
                if nbr >= node.id {
                    counted += 1;
                }
            }
        }
        if counted != self.edge_count {
            return Err(ConsistencyError::EdgeCountMismatch {
                stored: self.edge_count,
                counted,
            });
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check)
    pub fn is_ok(&self) -> bool {
        self.check().is_ok()
    }

    /// Save the graph to a binary stream.
    ///
    /// Payload field order: id counter, edge count, node table.
    pub fn save<W: Write>(&self, writer: &mut W) -> GraphResult<()> {
        let mut payload = Vec::new();
        bincode::serialize_into(&mut payload, &self.next_node_id).map_err(encode_err)?;
        bincode::serialize_into(&mut payload, &(self.edge_count as u64)).map_err(encode_err)?;
        self.nodes.save_into(&mut payload)?;
        persist::write_frame(writer, &payload)?;
        debug!(
            "saved undirected graph: {} nodes, {} edges",
            self.nodes.len(),
            self.edge_count
        );
        Ok(())
    }

    /// Load a graph previously written by [`save`](Self::save)
    pub fn load<R: Read>(reader: &mut R) -> GraphResult<Self> {
        let payload = persist::read_frame(reader)?;
        let mut cursor = payload.as_slice();
        let next_node_id: NodeId = bincode::deserialize_from(&mut cursor).map_err(decode_err)?;
        let edge_count: u64 = bincode::deserialize_from(&mut cursor).map_err(decode_err)?;
        let nodes = EntryTable::load_from(&mut cursor)?;
        debug!(
            "loaded undirected graph: {} nodes, {} edges",
            nodes.len(),
            edge_count
        );
        Ok(Self {
            next_node_id,
            edge_count: edge_count as usize,
            nodes,
        })
    }

    /// Save the graph to a file
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> GraphResult<()> {
        let file = File::create(path).map_err(PersistError::Io)?;
        let mut writer = BufWriter::new(file);
        self.save(&mut writer)
    }

    /// Load a graph from a file
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> GraphResult<Self> {
        let file = File::open(path).map_err(PersistError::Io)?;
        let mut reader = BufReader::new(file);
        Self::load(&mut reader)
    }
}

impl Default for UnGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of one node
pub struct NodeRef<'a> {
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    /// Id of this node
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Number of neighbors
    pub fn degree(&self) -> usize {
        self.node.neighbors.len()
    }

    /// Same as [`degree`](Self::degree); the graph is undirected
    pub fn in_degree(&self) -> usize {
        self.degree()
    }

    /// Same as [`degree`](Self::degree); the graph is undirected
    pub fn out_degree(&self) -> usize {
        self.degree()
    }

    /// Sorted neighbor ids
    pub fn neighbors(&self) -> &'a [NodeId] {
        self.node.neighbors.as_slice()
    }

    /// Neighbor at `pos` in the sorted list
    pub fn neighbor(&self, pos: usize) -> Option<NodeId> {
        self.node.neighbors.get(pos)
    }

    /// Neighbor membership test
    pub fn is_neighbor(&self, id: NodeId) -> bool {
        self.node.neighbors.contains(id)
    }
}

/// Forward iterator over nodes in table order
pub struct Nodes<'a> {
    inner: table::Iter<'a, Node>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, node)| NodeRef { node })
    }
}

/// Forward iterator over edges in canonical orientation.
///
/// Composes the node cursor with an index into the current adjacency list,
/// skipping candidates whose anchor is not the smaller endpoint so each
/// unordered pair is reported once.
pub struct Edges<'a> {
    inner: table::Iter<'a, Node>,
    cur: Option<&'a Node>,
    pos: usize,
}

impl<'a> Iterator for Edges<'a> {
    type Item = (NodeId, NodeId);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.cur?;
            match node.neighbors.get(self.pos) {
                Some(dst) => {
                    self.pos += 1;
                    if node.id <= dst {
                        return Some((node.id, dst));
                    }
                }
                None => {
                    self.cur = self.inner.next().map(|(_, node)| node);
                    self.pos = 0;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An adjacency list with raw, unvalidated contents, as a hostile save
    /// file could carry.
    fn raw_list(ids: &[u64]) -> AdjacencyList {
        bincode::deserialize(&bincode::serialize(&ids.to_vec()).unwrap()).unwrap()
    }

    #[test]
    fn test_check_reports_unsorted_adjacency() {
        let mut graph = UnGraph::new();
        graph.next_node_id = 10;
        graph.nodes.insert(
            0,
            Node {
                id: 0,
                neighbors: raw_list(&[2, 1]),
            },
        );

        assert!(!graph.is_ok());
        assert_eq!(
            graph.check(),
            Err(ConsistencyError::UnsortedAdjacency { node: 0, entry: 1 })
        );
    }

    #[test]
    fn test_check_reports_asymmetric_edge() {
        let mut graph = UnGraph::new();
        graph.next_node_id = 10;
        graph.nodes.insert(
            0,
            Node {
                id: 0,
                neighbors: raw_list(&[1]),
            },
        );
        graph.nodes.insert(
            1,
            Node {
                id: 1,
                neighbors: raw_list(&[]),
            },
        );
        graph.edge_count = 1;

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::AsymmetricEdge { src: 0, dst: 1 })
        );
    }

    #[test]
    fn test_check_reports_missing_neighbor() {
        let mut graph = UnGraph::new();
        graph.next_node_id = 10;
        graph.nodes.insert(
            3,
            Node {
                id: 3,
                neighbors: raw_list(&[9]),
            },
        );

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::MissingNeighbor {
                node: 3,
                neighbor: 9
            })
        );
    }

    #[test]
    fn test_check_reports_id_above_counter() {
        let mut graph = UnGraph::new();
        graph.nodes.insert(
            5,
            Node {
                id: 5,
                neighbors: AdjacencyList::new(),
            },
        );
        // next_node_id stayed 0, so id 5 was never issued.

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::NodeIdAboveCounter { id: 5, next: 0 })
        );
    }

    #[test]
    fn test_self_loop_counts_once_and_iterates_once() {
        let mut graph = UnGraph::new();
        let n = graph.add_node();
        assert!(graph.add_edge(n, n).unwrap());
        assert!(!graph.add_edge(n, n).unwrap());

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.degree(n).unwrap(), 1);
        assert_eq!(graph.edges().collect::<Vec<_>>(), vec![(n, n)]);
        assert!(graph.check().is_ok());

        assert!(graph.del_edge(n, n).unwrap());
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.check().is_ok());
    }
}
