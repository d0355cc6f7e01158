// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Directed simple graph
//!
//! Nodes carry separate sorted lists of in- and out-neighbors; there is at
//! most one edge per ordered pair. Edge iteration walks nodes in table
//! order and each out-list in order — a directed edge is visited once,
//! from its source, with no canonicalization step.

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

/// Node record: id plus sorted in- and out-neighbor lists
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    id: NodeId,
    in_nbrs: AdjacencyList,
    out_nbrs: AdjacencyList,
}

/// Directed simple graph
#[derive(Debug, Clone)]
pub struct DiGraph {
    /// Next id handed out by auto-assignment; never reused
    next_node_id: NodeId,

    /// Number of live directed edges
    edge_count: usize,

    /// All node records, in insertion order
    nodes: EntryTable<Node>,
}

impl DiGraph {
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
        GraphKind::Directed
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live directed edges
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

    fn empty_node(id: NodeId) -> Node {
        Node {
            id,
            in_nbrs: AdjacencyList::new(),
            out_nbrs: AdjacencyList::new(),
        }
    }

    /// Add a node with the next free id
    pub fn add_node(&mut self) -> NodeId {
        let id = self.next_node_id;
        self.next_node_id += 1;
        self.nodes.insert(id, Self::empty_node(id));
        id
    }

    /// Add a node with a caller-chosen id
    pub fn add_node_with_id(&mut self, id: NodeId) -> GraphResult<NodeId> {
        if self.nodes.contains_key(id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.next_node_id = self.next_node_id.max(id + 1);
        self.nodes.insert(id, Self::empty_node(id));
        Ok(id)
    }

    /// Add a node and wire edges from `in_nbrs` and to `out_nbrs` in one
    /// pass.
    ///
    /// Every listed neighbor must already be live (or be `id` itself);
    /// duplicates collapse. The input is validated up front, so a failure
    /// leaves the graph unchanged.
    pub fn add_node_with_neighbors(
        &mut self,
        id: NodeId,
        in_nbrs: &[NodeId],
        out_nbrs: &[NodeId],
    ) -> GraphResult<NodeId> {
        if self.nodes.contains_key(id) {
            return Err(GraphError::DuplicateNode(id));
        }
        for &nbr in in_nbrs.iter().chain(out_nbrs) {
            if nbr != id && !self.nodes.contains_key(nbr) {
                return Err(GraphError::UnknownNode(nbr));
            }
        }
        self.next_node_id = self.next_node_id.max(id + 1);
        self.nodes.insert(id, Self::empty_node(id));
        for &src in in_nbrs {
            self.add_edge(src, id)?;
        }
        for &dst in out_nbrs {
            self.add_edge(id, dst)?;
        }
        Ok(id)
    }

    /// Delete a node, purging it from its neighbors' lists in both
    /// directions
    pub fn del_node(&mut self, id: NodeId) -> GraphResult<()> {
        let node = self.nodes.remove(id).ok_or(GraphError::UnknownNode(id))?;
        // A self-loop sits in both lists but is a single edge.
        let self_loop = usize::from(node.out_nbrs.contains(id));
        self.edge_count -= node.out_nbrs.len() + node.in_nbrs.len() - self_loop;
        for nbr in node.out_nbrs.iter() {
            if nbr == id {
                continue;
            }
            if let Some(other) = self.nodes.get_mut(nbr) {
                other.in_nbrs.remove(id);
            }
        }
        for nbr in node.in_nbrs.iter() {
            if nbr == id {
                continue;
            }
            if let Some(other) = self.nodes.get_mut(nbr) {
                other.out_nbrs.remove(id);
            }
        }
        Ok(())
    }

    /// Node existence test
    pub fn is_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Add the directed edge `src -> dst`.
    ///
    /// Inserts `dst` into `src`'s out-list and `src` into `dst`'s in-list.
    /// Idempotent: returns `false` when the edge already exists.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> GraphResult<bool> {
        if !self.nodes.contains_key(src) {
            return Err(GraphError::UnknownNode(src));
        }
        if !self.nodes.contains_key(dst) {
            return Err(GraphError::UnknownNode(dst));
        }
        let inserted = match self.nodes.get_mut(src) {
            Some(node) => node.out_nbrs.insert(dst),
            None => false,
        };
        if !inserted {
            return Ok(false);
        }
        if let Some(node) = self.nodes.get_mut(dst) {
            node.in_nbrs.insert(src);
        }
        self.edge_count += 1;
        Ok(true)
    }

    /// Delete the directed edge `src -> dst`.
    ///
    /// Both endpoints must be live; removing an absent edge is a no-op
    /// returning `false`.
    pub fn del_edge(&mut self, src: NodeId, dst: NodeId) -> GraphResult<bool> {
        if !self.nodes.contains_key(src) {
            return Err(GraphError::UnknownNode(src));
        }
        if !self.nodes.contains_key(dst) {
            return Err(GraphError::UnknownNode(dst));
        }
        let removed = match self.nodes.get_mut(src) {
            Some(node) => node.out_nbrs.remove(dst),
            None => false,
        };
        if !removed {
            return Ok(false);
        }
        if let Some(node) = self.nodes.get_mut(dst) {
            node.in_nbrs.remove(src);
        }
        self.edge_count -= 1;
        Ok(true)
    }

    /// Delete both orientations between `u` and `v` in one call.
    ///
    /// Returns `true` if at least one orientation existed.
    pub fn del_edge_undirected(&mut self, u: NodeId, v: NodeId) -> GraphResult<bool> {
        let forward = self.del_edge(u, v)?;
        let backward = if u != v { self.del_edge(v, u)? } else { false };
        Ok(forward || backward)
    }

    /// Directed edge existence test; **not** symmetric
    pub fn is_edge(&self, src: NodeId, dst: NodeId) -> bool {
        match self.nodes.get(src) {
            Some(node) => node.out_nbrs.contains(dst),
            None => false,
        }
    }

    /// Test whether an edge exists in either orientation
    pub fn is_adjacent(&self, u: NodeId, v: NodeId) -> bool {
        self.is_edge(u, v) || self.is_edge(v, u)
    }

    /// Sorted in-neighbor ids of a node
    pub fn in_neighbors(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.nodes
            .get(id)
            .map(|node| node.in_nbrs.as_slice())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Sorted out-neighbor ids of a node
    pub fn out_neighbors(&self, id: NodeId) -> GraphResult<&[NodeId]> {
        self.nodes
            .get(id)
            .map(|node| node.out_nbrs.as_slice())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Number of edges pointing at a node
    pub fn in_degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.in_nbrs.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Number of edges leaving a node
    pub fn out_degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.out_nbrs.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Total degree: in-degree plus out-degree
    pub fn degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.in_nbrs.len() + node.out_nbrs.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Reserve room for `additional` more in-neighbors of a node
    pub fn reserve_in_neighbors(&mut self, id: NodeId, additional: usize) -> GraphResult<()> {
        let node = self.nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;
        node.in_nbrs.reserve(additional);
        Ok(())
    }

    /// Reserve room for `additional` more out-neighbors of a node
    pub fn reserve_out_neighbors(&mut self, id: NodeId, additional: usize) -> GraphResult<()> {
        let node = self.nodes.get_mut(id).ok_or(GraphError::UnknownNode(id))?;
        node.out_nbrs.reserve(additional);
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

    /// Iterate over directed edges: nodes in table order, each out-list in
    /// order
    pub fn edges(&self) -> Edges<'_> {
        let mut inner = self.nodes.iter();
        let cur = inner.next().map(|(_, node)| node);
        Edges { inner, cur, pos: 0 }
    }

    /// Sample a live node id approximately uniformly
    pub fn rnd_node(&self, rng: &mut fastrand::Rng) -> Option<NodeId> {
        self.nodes.rnd_key(rng)
    }

    /// Compact adjacency storage and the node table
    pub fn defrag(&mut self) {
        for node in self.nodes.values_mut() {
            node.in_nbrs.pack();
            node.out_nbrs.pack();
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
            check_adjacency(node.id, &node.in_nbrs)?;
            check_adjacency(node.id, &node.out_nbrs)?;
            for nbr in node.out_nbrs.iter() {
                let other = self
                    .nodes
                    .get(nbr)
                    .ok_or(ConsistencyError::MissingNeighbor {
                        node: node.id,
                        neighbor: nbr,
                    })?;
                if !other.in_nbrs.contains(node.id) {
                    return Err(ConsistencyError::AsymmetricEdge {
                        src: node.id,
                        dst: nbr,
                    });
                }
            }
            for nbr in node.in_nbrs.iter() {
                let other = self
                    .nodes
                    .get(nbr)
                    .ok_or(ConsistencyError::MissingNeighbor {
                        node: node.id,
                        neighbor: nbr,
                    })?;
                if !other.out_nbrs.contains(node.id) {
                    return Err(ConsistencyError::AsymmetricEdge {
                        src: nbr,
                        dst: node.id,
                    });
                }
            }
            counted += node.out_nbrs.len();
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
            "saved directed graph: {} nodes, {} edges",
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
            "loaded directed graph: {} nodes, {} edges",
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

impl Default for DiGraph {
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

    /// Number of edges pointing at this node
    pub fn in_degree(&self) -> usize {
        self.node.in_nbrs.len()
    }

    /// Number of edges leaving this node
    pub fn out_degree(&self) -> usize {
        self.node.out_nbrs.len()
    }

    /// Total degree: in-degree plus out-degree
    pub fn degree(&self) -> usize {
        self.in_degree() + self.out_degree()
    }

    /// Sorted in-neighbor ids
    pub fn in_neighbors(&self) -> &'a [NodeId] {
        self.node.in_nbrs.as_slice()
    }

    /// Sorted out-neighbor ids
    pub fn out_neighbors(&self) -> &'a [NodeId] {
        self.node.out_nbrs.as_slice()
    }

    /// In-neighbor at `pos` in the sorted list
    pub fn in_neighbor(&self, pos: usize) -> Option<NodeId> {
        self.node.in_nbrs.get(pos)
    }

    /// Out-neighbor at `pos` in the sorted list
    pub fn out_neighbor(&self, pos: usize) -> Option<NodeId> {
        self.node.out_nbrs.get(pos)
    }

    /// Test whether `id` points at this node
    pub fn is_in_neighbor(&self, id: NodeId) -> bool {
        self.node.in_nbrs.contains(id)
    }

    /// Test whether this node points at `id`
    pub fn is_out_neighbor(&self, id: NodeId) -> bool {
        self.node.out_nbrs.contains(id)
    }

    /// Neighbor test in either direction
    pub fn is_neighbor(&self, id: NodeId) -> bool {
        self.is_out_neighbor(id) || self.is_in_neighbor(id)
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

/// Forward iterator over directed edges, each visited once from its source
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
            match node.out_nbrs.get(self.pos) {
                Some(dst) => {
                    self.pos += 1;
                    return Some((node.id, dst));
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

    #[test]
    fn test_self_loop_is_one_edge_in_both_lists() {
        let mut graph = DiGraph::new();
        let n = graph.add_node();
        assert!(graph.add_edge(n, n).unwrap());

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.in_degree(n).unwrap(), 1);
        assert_eq!(graph.out_degree(n).unwrap(), 1);
        assert!(graph.check().is_ok());

        graph.del_node(n).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.check().is_ok());
    }

    #[test]
    fn test_check_reports_one_sided_edge() {
        let mut graph = DiGraph::new();
        graph.add_node_with_id(0).unwrap();
        graph.add_node_with_id(1).unwrap();
        graph.add_edge(0, 1).unwrap();

        // Corrupt: drop the reverse entry from node 1's in-list.
        if let Some(node) = graph.nodes.get_mut(1) {
            node.in_nbrs.remove(0);
        }

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::AsymmetricEdge { src: 0, dst: 1 })
        );
    }

    #[test]
    fn test_check_reports_edge_count_mismatch() {
        let mut graph = DiGraph::new();
        graph.add_node_with_id(0).unwrap();
        graph.add_node_with_id(1).unwrap();
        graph.add_edge(0, 1).unwrap();

        graph.edge_count = 5;
        assert_eq!(
            graph.check(),
            Err(ConsistencyError::EdgeCountMismatch {
                stored: 5,
                counted: 1
            })
        );
    }
}
