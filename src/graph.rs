//! Undirected weighted network graph
//!
//! Nodes keep their geographic coordinate so the A* heuristic can reach it.
//! Edge weights are either finite or `f64::INFINITY` for a link that is down.
//! Negative finite weights are allowed (Bellman-Ford accepts them); NaN is not.
//!
//! A graph is a snapshot: once built it is never mutated. Derived graphs such
//! as [`NetworkGraph::without_node_edges`] are new values.

use crate::coordinates::{NodeEntry, NodeId, NodeRegistry};
use crate::latency::{FactorSource, LatencyModel};
use crate::GeoCoordinate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

/// Errors produced during graph construction
#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("duplicate node identifier: {0}")]
    DuplicateNode(NodeId),

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    #[error("duplicate edge {0} - {1}")]
    DuplicateEdge(NodeId, NodeId),

    #[error("invalid weight {weight} on edge {a} - {b}")]
    InvalidWeight { a: NodeId, b: NodeId, weight: f64 },

    #[error("distance threshold must be non-negative, got {0}")]
    InvalidThreshold(f64),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// An undirected edge as seen from outside the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
    /// Serialized as `null` when the link is down
    #[serde(with = "link_weight")]
    pub weight: f64,
}

/// JSON has no infinity, so a down link's weight is written as `null`
mod link_weight {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(weight: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if *weight == f64::INFINITY {
            serializer.serialize_none()
        } else {
            serializer.serialize_some(weight)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

impl Edge {
    /// Down links carry an infinite weight
    pub fn is_down(&self) -> bool {
        self.weight == f64::INFINITY
    }
}

/// Immutable undirected weighted graph
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    nodes: Vec<NodeEntry>,
    index: HashMap<NodeId, usize>,
    /// adjacency[i] = (neighbor index, weight); every edge appears twice
    adjacency: Vec<Vec<(usize, f64)>>,
    edge_count: usize,
    down_links: usize,
    has_negative_weight: bool,
}

impl NetworkGraph {
    /// Build a graph from a node registry.
    ///
    /// Every unordered pair of distinct nodes whose great-circle distance is
    /// at most `threshold_km` becomes an edge weighted by
    /// `latency_fn(distance)`. Pairs are visited in registry order, so a
    /// stateful `latency_fn` sees a reproducible sequence of distances.
    pub fn build<F>(registry: &NodeRegistry, threshold_km: f64, mut latency_fn: F) -> GraphResult<Self>
    where
        F: FnMut(f64) -> f64,
    {
        if threshold_km.is_nan() || threshold_km < 0.0 {
            return Err(GraphError::InvalidThreshold(threshold_km));
        }

        let mut graph = Self::with_nodes(registry.iter().cloned())?;
        let n = graph.nodes.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let distance = graph.nodes[i]
                    .coordinate
                    .distance_km(&graph.nodes[j].coordinate);
                if distance <= threshold_km {
                    let weight = latency_fn(distance);
                    graph.insert_edge(i, j, weight)?;
                }
            }
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count,
            down_links = graph.down_links,
            threshold_km,
            "built network graph"
        );
        Ok(graph)
    }

    /// Build a graph whose weights come from a latency model
    pub fn build_with_model(
        registry: &NodeRegistry,
        threshold_km: f64,
        model: &LatencyModel,
        factors: &mut dyn FactorSource,
    ) -> GraphResult<Self> {
        Self::build(registry, threshold_km, |distance| model.weight(distance, factors))
    }

    /// Build a graph from explicit nodes and edges
    pub fn from_edges<N, E>(nodes: N, edges: E) -> GraphResult<Self>
    where
        N: IntoIterator<Item = (NodeId, GeoCoordinate)>,
        E: IntoIterator<Item = (NodeId, NodeId, f64)>,
    {
        let mut graph = Self::with_nodes(
            nodes
                .into_iter()
                .map(|(id, coordinate)| NodeEntry { id, coordinate }),
        )?;

        for (a, b, weight) in edges {
            let i = graph.require(&a)?;
            let j = graph.require(&b)?;
            if graph.edge_index(i, j).is_some() {
                return Err(GraphError::DuplicateEdge(a, b));
            }
            graph.insert_edge(i, j, weight)?;
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count,
            "built graph from explicit edges"
        );
        Ok(graph)
    }

    fn with_nodes<I>(entries: I) -> GraphResult<Self>
    where
        I: IntoIterator<Item = NodeEntry>,
    {
        let mut nodes = Vec::new();
        let mut index = HashMap::new();
        for entry in entries {
            if index.contains_key(&entry.id) {
                return Err(GraphError::DuplicateNode(entry.id));
            }
            index.insert(entry.id.clone(), nodes.len());
            nodes.push(entry);
        }
        let adjacency = vec![Vec::new(); nodes.len()];

        Ok(Self {
            nodes,
            index,
            adjacency,
            edge_count: 0,
            down_links: 0,
            has_negative_weight: false,
        })
    }

    fn require(&self, id: &NodeId) -> GraphResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::UnknownNode(id.clone()))
    }

    fn insert_edge(&mut self, i: usize, j: usize, weight: f64) -> GraphResult<()> {
        if i == j {
            return Err(GraphError::SelfLoop(self.nodes[i].id.clone()));
        }
        if weight.is_nan() || weight == f64::NEG_INFINITY {
            return Err(GraphError::InvalidWeight {
                a: self.nodes[i].id.clone(),
                b: self.nodes[j].id.clone(),
                weight,
            });
        }

        self.adjacency[i].push((j, weight));
        self.adjacency[j].push((i, weight));
        self.edge_count += 1;
        if weight == f64::INFINITY {
            self.down_links += 1;
        } else if weight < 0.0 {
            self.has_negative_weight = true;
        }
        Ok(())
    }

    fn edge_index(&self, i: usize, j: usize) -> Option<f64> {
        self.adjacency[i]
            .iter()
            .find(|(neighbor, _)| *neighbor == j)
            .map(|(_, w)| *w)
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of undirected edges, down links included
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Number of edges whose weight is infinite
    pub fn down_link_count(&self) -> usize {
        self.down_links
    }

    /// Whether any finite edge weight is negative
    pub fn has_negative_weight(&self) -> bool {
        self.has_negative_weight
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn coordinate(&self, id: &NodeId) -> Option<GeoCoordinate> {
        self.index.get(id).map(|&i| self.nodes[i].coordinate)
    }

    /// Weight of edge (a, b); identical to the weight of (b, a)
    pub fn weight(&self, a: &NodeId, b: &NodeId) -> Option<f64> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        self.edge_index(i, j)
    }

    /// Neighbors of a node with the connecting edge weight
    pub fn neighbors<'a>(&'a self, id: &NodeId) -> Option<impl Iterator<Item = (&'a NodeId, f64)> + 'a> {
        let i = *self.index.get(id)?;
        Some(
            self.adjacency[i]
                .iter()
                .map(move |&(j, w)| (&self.nodes[j].id, w)),
        )
    }

    /// All undirected edges, each reported once
    pub fn edges(&self) -> Vec<Edge> {
        let mut edges = Vec::with_capacity(self.edge_count);
        for (i, neighbors) in self.adjacency.iter().enumerate() {
            for &(j, weight) in neighbors {
                if i < j {
                    edges.push(Edge {
                        a: self.nodes[i].id.clone(),
                        b: self.nodes[j].id.clone(),
                        weight,
                    });
                }
            }
        }
        edges
    }

    /// Copy of this graph with every edge incident to `id` removed
    pub fn without_node_edges(&self, id: &NodeId) -> GraphResult<Self> {
        let removed = self.require(id)?;
        let nodes = self
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.coordinate));
        let edges = self
            .edges()
            .into_iter()
            .filter(|e| &e.a != id && &e.b != id)
            .map(|e| (e.a, e.b, e.weight));

        let graph = Self::from_edges(nodes, edges)?;
        debug!(node = %self.nodes[removed].id, "isolated node");
        Ok(graph)
    }

    /// Serializable view for external renderers, optionally highlighting a path
    pub fn export(&self, path: Option<&[NodeId]>) -> GraphExport {
        GraphExport {
            nodes: self.nodes.clone(),
            edges: self.edges(),
            path: path.map(|p| p.to_vec()).unwrap_or_default(),
        }
    }

    // Index-level access for the path-finding engine

    pub(crate) fn index_of(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn id_at(&self, i: usize) -> &NodeId {
        &self.nodes[i].id
    }

    pub(crate) fn coordinate_at(&self, i: usize) -> GeoCoordinate {
        self.nodes[i].coordinate
    }

    pub(crate) fn adjacent(&self, i: usize) -> &[(usize, f64)] {
        &self.adjacency[i]
    }
}

/// Graph plus highlighted path, the output contract for visualization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<NodeEntry>,
    pub edges: Vec<Edge>,
    pub path: Vec<NodeId>,
}
