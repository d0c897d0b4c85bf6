//! In-memory entity network backed by petgraph::UnGraph.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use crate::config::EntityKind;

/// Node data stored in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Canonical key, unique within the network.
    pub id: String,
    pub label: String,
    pub kind: EntityKind,
    pub uf: Option<String>,
    pub code: Option<String>,
    /// Total value granted, received or paid, depending on `kind`.
    pub value: f64,
    pub beneficiaries: usize,
    pub mean_value: f64,
    pub community: Option<usize>,
}

impl NodeData {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
            uf: None,
            code: None,
            value: 0.0,
            beneficiaries: 0,
            mean_value: 0.0,
            community: None,
        }
    }
}

/// Edge data stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeData {
    /// Monetary sum, shared-recipient count or similarity. Never negative.
    pub weight: f64,
    /// Number of source relations folded into this edge.
    pub count: usize,
    /// Length used by shortest-path metrics. Always positive.
    pub distance: f64,
}

impl EdgeData {
    pub fn new(weight: f64, distance: f64) -> Self {
        Self {
            weight,
            count: 1,
            distance,
        }
    }
}

/// Wrapper around petgraph::UnGraph with string-keyed node access.
///
/// Invariants: no self-loops, no negative weights, one edge per node pair.
#[derive(Debug, Clone)]
pub struct Network {
    graph: UnGraph<NodeData, EdgeData>,
    /// O(1) string ID → NodeIndex lookup.
    id_index: HashMap<String, NodeIndex>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
            id_index: HashMap::new(),
        }
    }

    /// Get or create a node. An existing node keeps its data.
    pub fn ensure_node(&mut self, data: NodeData) -> NodeIndex {
        if let Some(&idx) = self.id_index.get(&data.id) {
            idx
        } else {
            let id = data.id.clone();
            let idx = self.graph.add_node(data);
            self.id_index.insert(id, idx);
            idx
        }
    }

    pub fn get_node_index(&self, id: &str) -> Option<NodeIndex> {
        self.id_index.get(id).copied()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NodeData> {
        self.id_index
            .get(id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeData> {
        match self.id_index.get(id) {
            Some(&idx) => self.graph.node_weight_mut(idx),
            None => None,
        }
    }

    pub fn node_at(&self, idx: NodeIndex) -> &NodeData {
        &self.graph[idx]
    }

    // --- Edges ---

    /// Add `weight` to the edge between `a` and `b`, creating it if needed,
    /// and bump its count. Each relation is one hop long.
    ///
    /// Returns false (and changes nothing) for self-loops, unknown nodes or
    /// negative/non-finite weights.
    pub fn accumulate_edge(&mut self, a: &str, b: &str, weight: f64) -> bool {
        let Some((ai, bi)) = self.endpoints(a, b, weight) else {
            return false;
        };
        if let Some(e) = self.graph.find_edge(ai, bi) {
            let data = &mut self.graph[e];
            data.weight += weight;
            data.count += 1;
        } else {
            self.graph.add_edge(ai, bi, EdgeData::new(weight, 1.0));
        }
        true
    }

    /// Insert an edge with explicit data, replacing any existing edge.
    /// Zero, negative and NaN distances are refused.
    pub fn insert_edge(&mut self, a: &str, b: &str, data: EdgeData) -> bool {
        let Some((ai, bi)) = self.endpoints(a, b, data.weight) else {
            return false;
        };
        if data.distance.is_nan() || data.distance <= 0.0 {
            return false;
        }
        self.graph.update_edge(ai, bi, data);
        true
    }

    fn endpoints(&self, a: &str, b: &str, weight: f64) -> Option<(NodeIndex, NodeIndex)> {
        if a == b || !weight.is_finite() || weight < 0.0 {
            log::debug!("rejected edge {a} -- {b} (weight {weight})");
            return None;
        }
        Some((self.get_node_index(a)?, self.get_node_index(b)?))
    }

    pub fn edge(&self, a: &str, b: &str) -> Option<&EdgeData> {
        let ai = self.get_node_index(a)?;
        let bi = self.get_node_index(b)?;
        self.graph
            .find_edge(ai, bi)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// All edges as (source id, target id, data), in insertion order.
    pub fn edges(&self) -> Vec<(&str, &str, &EdgeData)> {
        self.graph
            .edge_references()
            .map(|e| {
                (
                    self.graph[e.source()].id.as_str(),
                    self.graph[e.target()].id.as_str(),
                    e.weight(),
                )
            })
            .collect()
    }

    // --- Queries ---

    pub fn nodes(&self) -> impl Iterator<Item = &NodeData> {
        self.graph.node_weights()
    }

    pub fn nodes_of_kind(&self, kind: EntityKind) -> Vec<&NodeData> {
        self.graph.node_weights().filter(|n| n.kind == kind).collect()
    }

    pub fn neighbors(&self, id: &str) -> Vec<&NodeData> {
        let Some(idx) = self.get_node_index(id) else {
            return Vec::new();
        };
        self.graph
            .neighbors(idx)
            .map(|n| &self.graph[n])
            .collect()
    }

    pub fn degree(&self, id: &str) -> usize {
        self.get_node_index(id)
            .map(|idx| self.graph.edges(idx).count())
            .unwrap_or(0)
    }

    /// Sum of the weights of the edges incident to `id`.
    pub fn strength(&self, id: &str) -> f64 {
        self.get_node_index(id)
            .map(|idx| self.graph.edges(idx).map(|e| e.weight().weight).sum())
            .unwrap_or(0.0)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn total_weight(&self) -> f64 {
        self.graph.edge_weights().map(|e| e.weight).sum()
    }

    pub fn total_count(&self) -> usize {
        self.graph.edge_weights().map(|e| e.count).sum()
    }

    /// Adjacency by dense node position: `adj[i] = [(j, weight, distance)]`.
    /// Positions equal `NodeIndex::index()` since nodes are never removed.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64, f64)>> {
        let mut adj = vec![Vec::new(); self.graph.node_count()];
        for e in self.graph.edge_references() {
            let (a, b) = (e.source().index(), e.target().index());
            let w = e.weight();
            adj[a].push((b, w.weight, w.distance));
            adj[b].push((a, w.weight, w.distance));
        }
        adj
    }

    /// Network restricted to `ids`, keeping edges with both ends inside.
    pub fn induced(&self, ids: &[&str]) -> Network {
        let mut sub = Network::new();
        for id in ids {
            if let Some(node) = self.node(id) {
                sub.ensure_node(node.clone());
            }
        }
        for e in self.graph.edge_references() {
            let a = &self.graph[e.source()].id;
            let b = &self.graph[e.target()].id;
            if sub.has_node(a) && sub.has_node(b) {
                sub.insert_edge(a, b, *e.weight());
            }
        }
        sub
    }

    pub fn set_community(&mut self, id: &str, community: usize) {
        if let Some(node) = self.node_mut(id) {
            node.community = Some(community);
        }
    }

    /// Access the underlying petgraph for algorithms that need it.
    pub fn inner_graph(&self) -> &UnGraph<NodeData, EdgeData> {
        &self.graph
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
