// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Directed multigraph with first-class edge identities
//!
//! Nodes carry sorted lists of incident **edge** ids rather than neighbor
//! ids; a second table owns the edge records. Any number of parallel edges
//! may connect the same ordered pair, self-loops included, each with its
//! own identity. Neighbor queries dereference the edge table — the price
//! of keeping parallel edges distinguishable.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::adjacency::AdjacencyList;
use crate::error::{ConsistencyError, GraphError, GraphResult};
use crate::graph::{check_adjacency, EdgeId, GraphKind, NodeId};
use crate::persist::{self, decode_err, encode_err, PersistError};
use crate::table::{self, EntryTable};

/// Node record: id plus sorted lists of in- and out-incident edge ids
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    id: NodeId,
    in_edges: AdjacencyList,
    out_edges: AdjacencyList,
}

/// Edge record: identity plus the ordered endpoint pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    id: EdgeId,
    src: NodeId,
    dst: NodeId,
}

impl Edge {
    /// Id of this edge
    pub fn id(&self) -> EdgeId {
        self.id
    }

    /// Source node id
    pub fn src(&self) -> NodeId {
        self.src
    }

    /// Destination node id
    pub fn dst(&self) -> NodeId {
        self.dst
    }
}

/// Directed multigraph
#[derive(Debug, Clone)]
pub struct MultiGraph {
    /// Next node id handed out by auto-assignment; never reused
    next_node_id: NodeId,

    /// Next edge id handed out by auto-assignment; never reused
    next_edge_id: EdgeId,

    /// All node records, in insertion order
    nodes: EntryTable<Node>,

    /// All edge records, in insertion order
    edges: EntryTable<Edge>,
}

impl MultiGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            next_node_id: 0,
            next_edge_id: 0,
            nodes: EntryTable::new(),
            edges: EntryTable::new(),
        }
    }

    /// Create an empty graph with room for `nodes` and `edges` records
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            next_node_id: 0,
            next_edge_id: 0,
            nodes: EntryTable::with_capacity(nodes),
            edges: EntryTable::with_capacity(edges),
        }
    }

    /// The representation discriminant of this graph
    pub fn kind(&self) -> GraphKind {
        GraphKind::DirectedMulti
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Delete all nodes and edges and reset both id counters
    pub fn clear(&mut self) {
        self.next_node_id = 0;
        self.next_edge_id = 0;
        self.nodes.clear();
        self.edges.clear();
    }

    fn empty_node(id: NodeId) -> Node {
        Node {
            id,
            in_edges: AdjacencyList::new(),
            out_edges: AdjacencyList::new(),
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

    /// Delete a node after deleting every incident edge record.
    ///
    /// The edges go first in both directions, so no edge record ever
    /// references a dead endpoint.
    pub fn del_node(&mut self, id: NodeId) -> GraphResult<()> {
        let incident = match self.nodes.get(id) {
            Some(node) => {
                let mut ids: Vec<EdgeId> =
                    node.out_edges.iter().chain(node.in_edges.iter()).collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
            None => return Err(GraphError::UnknownNode(id)),
        };
        for edge_id in incident {
            self.del_edge(edge_id)?;
        }
        self.nodes.remove(id);
        Ok(())
    }

    /// Node existence test
    pub fn is_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    fn attach_edge(&mut self, edge: Edge) {
        if let Some(node) = self.nodes.get_mut(edge.src) {
            node.out_edges.insert(edge.id);
        }
        if let Some(node) = self.nodes.get_mut(edge.dst) {
            node.in_edges.insert(edge.id);
        }
        self.edges.insert(edge.id, edge);
    }

    /// Add an edge `src -> dst` with the next free edge id.
    ///
    /// Parallel edges and self-loops are permitted; each call creates a
    /// distinct edge record.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId) -> GraphResult<EdgeId> {
        if !self.nodes.contains_key(src) {
            return Err(GraphError::UnknownNode(src));
        }
        if !self.nodes.contains_key(dst) {
            return Err(GraphError::UnknownNode(dst));
        }
        let id = self.next_edge_id;
        self.next_edge_id += 1;
        self.attach_edge(Edge { id, src, dst });
        Ok(id)
    }

    /// Add an edge `src -> dst` with a caller-chosen edge id
    pub fn add_edge_with_id(
        &mut self,
        src: NodeId,
        dst: NodeId,
        id: EdgeId,
    ) -> GraphResult<EdgeId> {
        if self.edges.contains_key(id) {
            return Err(GraphError::DuplicateEdge(id));
        }
        if !self.nodes.contains_key(src) {
            return Err(GraphError::UnknownNode(src));
        }
        if !self.nodes.contains_key(dst) {
            return Err(GraphError::UnknownNode(dst));
        }
        self.next_edge_id = self.next_edge_id.max(id + 1);
        self.attach_edge(Edge { id, src, dst });
        Ok(id)
    }

    /// Delete exactly one edge by id, purging both incidence lists
    pub fn del_edge(&mut self, id: EdgeId) -> GraphResult<()> {
        let edge = self.edges.remove(id).ok_or(GraphError::UnknownEdge(id))?;
        if let Some(node) = self.nodes.get_mut(edge.src) {
            node.out_edges.remove(id);
        }
        if let Some(node) = self.nodes.get_mut(edge.dst) {
            node.in_edges.remove(id);
        }
        Ok(())
    }

    /// Delete **all** edges of the ordered pair `src -> dst`, returning how
    /// many records went away.
    ///
    /// Deliberately bulk, in contrast to the single-record
    /// [`del_edge`](Self::del_edge).
    pub fn del_edges(&mut self, src: NodeId, dst: NodeId) -> GraphResult<usize> {
        if !self.nodes.contains_key(src) {
            return Err(GraphError::UnknownNode(src));
        }
        if !self.nodes.contains_key(dst) {
            return Err(GraphError::UnknownNode(dst));
        }
        let matching: Vec<EdgeId> = match self.nodes.get(src) {
            Some(node) => node
                .out_edges
                .iter()
                .filter(|&edge_id| {
                    self.edges
                        .get(edge_id)
                        .map(|edge| edge.dst == dst)
                        .unwrap_or(false)
                })
                .collect(),
            None => Vec::new(),
        };
        for edge_id in &matching {
            self.del_edge(*edge_id)?;
        }
        Ok(matching.len())
    }

    /// Delete all edges between `u` and `v` in either orientation
    pub fn del_edges_undirected(&mut self, u: NodeId, v: NodeId) -> GraphResult<usize> {
        let forward = self.del_edges(u, v)?;
        let backward = if u != v { self.del_edges(v, u)? } else { 0 };
        Ok(forward + backward)
    }

    /// Edge-id existence test
    pub fn is_edge_id(&self, id: EdgeId) -> bool {
        self.edges.contains_key(id)
    }

    /// First edge id of the ordered pair `src -> dst`, if any.
    ///
    /// Incidence lists are sorted by edge id, so under parallel edges this
    /// deterministically reports the lowest-id match.
    pub fn find_edge(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        let node = self.nodes.get(src)?;
        node.out_edges.iter().find(|&edge_id| {
            self.edges
                .get(edge_id)
                .map(|edge| edge.dst == dst)
                .unwrap_or(false)
        })
    }

    /// Test whether any edge connects the ordered pair `src -> dst`
    pub fn is_edge(&self, src: NodeId, dst: NodeId) -> bool {
        self.find_edge(src, dst).is_some()
    }

    /// Test whether any edge connects `u` and `v` in either orientation
    pub fn is_adjacent(&self, u: NodeId, v: NodeId) -> bool {
        self.is_edge(u, v) || self.is_edge(v, u)
    }

    /// Point accessor for one edge record
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    /// Sorted in-incident edge ids of a node
    pub fn in_edges(&self, id: NodeId) -> GraphResult<&[EdgeId]> {
        self.nodes
            .get(id)
            .map(|node| node.in_edges.as_slice())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Sorted out-incident edge ids of a node
    pub fn out_edges(&self, id: NodeId) -> GraphResult<&[EdgeId]> {
        self.nodes
            .get(id)
            .map(|node| node.out_edges.as_slice())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Number of edges pointing at a node
    pub fn in_degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.in_edges.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Number of edges leaving a node
    pub fn out_degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.out_edges.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Total degree: incident edges in both directions
    pub fn degree(&self, id: NodeId) -> GraphResult<usize> {
        self.nodes
            .get(id)
            .map(|node| node.in_edges.len() + node.out_edges.len())
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Destination of every out-edge of a node, one table lookup per edge
    pub fn out_neighbors(
        &self,
        id: NodeId,
    ) -> GraphResult<impl Iterator<Item = NodeId> + '_> {
        let node = self.nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
        Ok(node
            .out_edges
            .iter()
            .filter_map(move |edge_id| self.edges.get(edge_id).map(|edge| edge.dst)))
    }

    /// Source of every in-edge of a node, one table lookup per edge
    pub fn in_neighbors(
        &self,
        id: NodeId,
    ) -> GraphResult<impl Iterator<Item = NodeId> + '_> {
        let node = self.nodes.get(id).ok_or(GraphError::UnknownNode(id))?;
        Ok(node
            .in_edges
            .iter()
            .filter_map(move |edge_id| self.edges.get(edge_id).map(|edge| edge.src)))
    }

    /// Test whether some edge runs `id -> nbr`; O(out-degree) scan
    pub fn is_out_neighbor(&self, id: NodeId, nbr: NodeId) -> bool {
        self.is_edge(id, nbr)
    }

    /// Test whether some edge runs `nbr -> id`; O(in-degree) scan
    pub fn is_in_neighbor(&self, id: NodeId, nbr: NodeId) -> bool {
        self.is_edge(nbr, id)
    }

    /// Neighbor test in either direction
    pub fn is_neighbor(&self, id: NodeId, nbr: NodeId) -> bool {
        self.is_adjacent(id, nbr)
    }

    /// Iterate over live node ids in table order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys()
    }

    /// Iterate over live edge ids in table order
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.edges.keys()
    }

    /// Iterate over nodes in table order
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            graph: self,
            inner: self.nodes.iter(),
        }
    }

    /// Point accessor for one node
    pub fn node(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.nodes.get(id).map(|node| NodeRef { graph: self, node })
    }

    /// Iterate over edge records in table order.
    ///
    /// No canonicalization is needed: every record already has a unique
    /// identity.
    pub fn edges(&self) -> Edges<'_> {
        Edges {
            inner: self.edges.iter(),
        }
    }

    /// Sample a live node id approximately uniformly
    pub fn rnd_node(&self, rng: &mut fastrand::Rng) -> Option<NodeId> {
        self.nodes.rnd_key(rng)
    }

    /// Sample a live edge id approximately uniformly
    pub fn rnd_edge(&self, rng: &mut fastrand::Rng) -> Option<EdgeId> {
        self.edges.rnd_key(rng)
    }

    /// Compact incidence storage and both tables
    pub fn defrag(&mut self) {
        for node in self.nodes.values_mut() {
            node.in_edges.pack();
            node.out_edges.pack();
        }
        self.nodes.compact();
        self.edges.compact();
    }

    /// Verify all structural invariants, naming the first violation found
    pub fn check(&self) -> Result<(), ConsistencyError> {
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
            check_adjacency(node.id, &node.in_edges)?;
            check_adjacency(node.id, &node.out_edges)?;
            for edge_id in node.out_edges.iter() {
                let edge = self.edges.get(edge_id).ok_or(ConsistencyError::MissingEdge {
                    node: node.id,
                    edge: edge_id,
                })?;
                if edge.src != node.id {
                    return Err(ConsistencyError::MisplacedIncidence {
                        edge: edge_id,
                        node: node.id,
                    });
                }
            }
            for edge_id in node.in_edges.iter() {
                let edge = self.edges.get(edge_id).ok_or(ConsistencyError::MissingEdge {
                    node: node.id,
                    edge: edge_id,
                })?;
                if edge.dst != node.id {
                    return Err(ConsistencyError::MisplacedIncidence {
                        edge: edge_id,
                        node: node.id,
                    });
                }
            }
        }
        for (key, edge) in self.edges.iter() {
            if key != edge.id {
                return Err(ConsistencyError::RecordIdMismatch { key, id: edge.id });
            }
            if edge.id >= self.next_edge_id {
                return Err(ConsistencyError::EdgeIdAboveCounter {
                    id: edge.id,
                    next: self.next_edge_id,
                });
            }
            let src = self
                .nodes
                .get(edge.src)
                .ok_or(ConsistencyError::DanglingEndpoint {
                    edge: edge.id,
                    node: edge.src,
                })?;
            if !src.out_edges.contains(edge.id) {
                return Err(ConsistencyError::MissingIncidence {
                    edge: edge.id,
                    node: edge.src,
                });
            }
            let dst = self
                .nodes
                .get(edge.dst)
                .ok_or(ConsistencyError::DanglingEndpoint {
                    edge: edge.id,
                    node: edge.dst,
                })?;
            if !dst.in_edges.contains(edge.id) {
                return Err(ConsistencyError::MissingIncidence {
                    edge: edge.id,
                    node: edge.dst,
                });
            }
        }
        Ok(())
    }

    /// Boolean form of [`check`](Self::check)
    pub fn is_ok(&self) -> bool {
        self.check().is_ok()
    }

    /// Save the graph to a binary stream.
    ///
    /// Payload field order: node id counter, edge id counter, node table,
    /// edge table.
    pub fn save<W: Write>(&self, writer: &mut W) -> GraphResult<()> {
        let mut payload = Vec::new();
        bincode::serialize_into(&mut payload, &self.next_node_id).map_err(encode_err)?;
        bincode::serialize_into(&mut payload, &self.next_edge_id).map_err(encode_err)?;
        self.nodes.save_into(&mut payload)?;
        self.edges.save_into(&mut payload)?;
        persist::write_frame(writer, &payload)?;
        debug!(
            "saved multigraph: {} nodes, {} edges",
            self.nodes.len(),
            self.edges.len()
        );
        Ok(())
    }

    /// Load a graph previously written by [`save`](Self::save)
    pub fn load<R: Read>(reader: &mut R) -> GraphResult<Self> {
        let payload = persist::read_frame(reader)?;
        let mut cursor = payload.as_slice();
        let next_node_id: NodeId = bincode::deserialize_from(&mut cursor).map_err(decode_err)?;
        let next_edge_id: EdgeId = bincode::deserialize_from(&mut cursor).map_err(decode_err)?;
        let nodes = EntryTable::load_from(&mut cursor)?;
        let edges = EntryTable::load_from(&mut cursor)?;
        debug!(
            "loaded multigraph: {} nodes, {} edges",
            nodes.len(),
            edges.len()
        );
        Ok(Self {
            next_node_id,
            next_edge_id,
            nodes,
            edges,
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

impl Default for MultiGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of one node
pub struct NodeRef<'a> {
    graph: &'a MultiGraph,
    node: &'a Node,
}

impl<'a> NodeRef<'a> {
    /// Id of this node
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Number of edges pointing at this node
    pub fn in_degree(&self) -> usize {
        self.node.in_edges.len()
    }

    /// Number of edges leaving this node
    pub fn out_degree(&self) -> usize {
        self.node.out_edges.len()
    }

    /// Total degree: incident edges in both directions
    pub fn degree(&self) -> usize {
        self.in_degree() + self.out_degree()
    }

    /// Sorted in-incident edge ids
    pub fn in_edges(&self) -> &'a [EdgeId] {
        self.node.in_edges.as_slice()
    }

    /// Sorted out-incident edge ids
    pub fn out_edges(&self) -> &'a [EdgeId] {
        self.node.out_edges.as_slice()
    }

    /// Incident-edge membership test, out direction
    pub fn is_out_edge(&self, id: EdgeId) -> bool {
        self.node.out_edges.contains(id)
    }

    /// Incident-edge membership test, in direction
    pub fn is_in_edge(&self, id: EdgeId) -> bool {
        self.node.in_edges.contains(id)
    }

    /// Destination of the out-edge at `pos`, dereferenced through the edge
    /// table
    pub fn out_neighbor(&self, pos: usize) -> Option<NodeId> {
        let edge_id = self.node.out_edges.get(pos)?;
        self.graph.edges.get(edge_id).map(|edge| edge.dst)
    }

    /// Source of the in-edge at `pos`, dereferenced through the edge table
    pub fn in_neighbor(&self, pos: usize) -> Option<NodeId> {
        let edge_id = self.node.in_edges.get(pos)?;
        self.graph.edges.get(edge_id).map(|edge| edge.src)
    }

    /// Destinations of all out-edges
    pub fn out_neighbors(&self) -> impl Iterator<Item = NodeId> + 'a {
        let graph = self.graph;
        self.node
            .out_edges
            .iter()
            .filter_map(move |edge_id| graph.edges.get(edge_id).map(|edge| edge.dst))
    }

    /// Sources of all in-edges
    pub fn in_neighbors(&self) -> impl Iterator<Item = NodeId> + 'a {
        let graph = self.graph;
        self.node
            .in_edges
            .iter()
            .filter_map(move |edge_id| graph.edges.get(edge_id).map(|edge| edge.src))
    }

    /// Neighbor test in either direction; O(degree) scan through the edge
    /// table
    pub fn is_neighbor(&self, id: NodeId) -> bool {
        self.graph.is_adjacent(self.node.id, id)
    }
}

/// Forward iterator over nodes in table order
pub struct Nodes<'a> {
    graph: &'a MultiGraph,
    inner: table::Iter<'a, Node>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let graph = self.graph;
        self.inner.next().map(|(_, node)| NodeRef { graph, node })
    }
}

/// Forward iterator over edge records in table order
pub struct Edges<'a> {
    inner: table::Iter<'a, Edge>,
}

impl<'a> Iterator for Edges<'a> {
    type Item = &'a Edge;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, edge)| edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_dangling_endpoint() {
        let mut graph = MultiGraph::new();
        graph.add_node_with_id(0).unwrap();
        graph.add_node_with_id(1).unwrap();
        graph.add_edge_with_id(0, 1, 5).unwrap();

        // Corrupt: drop the destination node record behind the edge's back.
        graph.nodes.remove(1);

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::DanglingEndpoint { edge: 5, node: 1 })
        );
    }

    #[test]
    fn test_check_reports_missing_incidence() {
        let mut graph = MultiGraph::new();
        graph.add_node_with_id(0).unwrap();
        graph.add_node_with_id(1).unwrap();
        graph.add_edge_with_id(0, 1, 5).unwrap();

        if let Some(node) = graph.nodes.get_mut(0) {
            node.out_edges.remove(5);
        }

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::MissingIncidence { edge: 5, node: 0 })
        );
    }

    #[test]
    fn test_check_reports_misplaced_incidence() {
        let mut graph = MultiGraph::new();
        graph.add_node_with_id(0).unwrap();
        graph.add_node_with_id(1).unwrap();
        graph.add_edge_with_id(0, 1, 5).unwrap();

        // Corrupt: the edge also shows up in node 1's out-list.
        if let Some(node) = graph.nodes.get_mut(1) {
            node.out_edges.insert(5);
        }

        assert_eq!(
            graph.check(),
            Err(ConsistencyError::MisplacedIncidence { edge: 5, node: 1 })
        );
    }

    #[test]
    fn test_self_loop_sits_in_both_lists_of_one_node() {
        let mut graph = MultiGraph::new();
        let n = graph.add_node();
        let e = graph.add_edge(n, n).unwrap();

        assert_eq!(graph.in_edges(n).unwrap(), &[e]);
        assert_eq!(graph.out_edges(n).unwrap(), &[e]);
        assert_eq!(graph.degree(n).unwrap(), 2);
        assert!(graph.check().is_ok());

        graph.del_edge(e).unwrap();
        assert_eq!(graph.degree(n).unwrap(), 0);
        assert!(graph.check().is_ok());
    }
}
