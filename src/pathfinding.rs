//! Shortest-path engines: Dijkstra, Bellman-Ford and geodesic A*
//!
//! Every engine runs the same state machine:
//! `Init -> Relax/Explore -> {Found, NoPath, Error}`.
//!
//! Edges with an infinite weight are links that are down; all three engines
//! skip them as if the edge did not exist.
//!
//! The graph is undirected, so Bellman-Ford sees every edge as two opposite
//! arcs. A reachable negative edge therefore always forms a negative cycle
//! (a -> b -> a) and is reported as such.

use crate::coordinates::NodeId;
use crate::graph::NetworkGraph;
use crate::GeoCoordinate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace};

/// Per-run failures of a path-finding engine
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
pub enum PathError {
    #[error("node {0} is not in the graph")]
    UnknownNode(NodeId),

    #[error("no path from {from} to {to}")]
    NoPath { from: NodeId, to: NodeId },

    #[error("negative weight {weight} on edge {a} - {b}; {algorithm} requires non-negative weights")]
    NegativeWeight {
        algorithm: Algorithm,
        a: NodeId,
        b: NodeId,
        weight: f64,
    },

    #[error("negative-weight cycle reachable from {from}")]
    NegativeCycle { from: NodeId },

    #[error("{algorithm} exceeded its time budget of {budget:?}")]
    Timeout { algorithm: Algorithm, budget: Duration },
}

pub type PathResult<T> = Result<T, PathError>;

/// The routing strategies under comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    Dijkstra,
    BellmanFord,
    AStar,
}

impl Algorithm {
    /// All algorithms in report order
    pub const ALL: [Algorithm; 3] = [Algorithm::Dijkstra, Algorithm::BellmanFord, Algorithm::AStar];
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Algorithm::Dijkstra => "Dijkstra",
            Algorithm::BellmanFord => "Bellman-Ford",
            Algorithm::AStar => "A*",
        };
        f.write_str(name)
    }
}

/// Work done by a search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes taken off the frontier (Dijkstra, A*) or scanned per pass (Bellman-Ford)
    pub expanded: usize,
    /// Successful edge relaxations
    pub relaxations: usize,
}

/// A path through the graph together with its total weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePath {
    /// Nodes from source to target, never empty
    pub nodes: Vec<NodeId>,
    /// Sum of edge weights along the path
    pub total_weight: f64,
    pub stats: SearchStats,
}

impl RoutePath {
    /// First node; `None` only for an empty, hand-built value
    pub fn source(&self) -> Option<&NodeId> {
        self.nodes.first()
    }

    pub fn target(&self) -> Option<&NodeId> {
        self.nodes.last()
    }

    /// Number of edges traversed
    pub fn hops(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

impl std::fmt::Display for RoutePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.nodes.iter().map(NodeId::as_str).collect();
        write!(f, "{} (weight {:.3})", names.join(" -> "), self.total_weight)
    }
}

/// Trait for shortest-path engines
pub trait PathFinder: Send + Sync {
    /// Find the minimum-weight path from `source` to `target`
    fn find_path(&self, graph: &NetworkGraph, source: &NodeId, target: &NodeId) -> PathResult<RoutePath>;

    /// Which algorithm this engine implements
    fn algorithm(&self) -> Algorithm;
}

/// A* heuristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Heuristic {
    /// Great-circle distance to the target scaled by the latency per km.
    /// Admissible only while every edge weight is at least its great-circle
    /// length times `per_km`.
    Geodesic { per_km: f64 },
    /// Always zero; A* degenerates to Dijkstra
    Zero,
}

impl Heuristic {
    pub fn estimate(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> f64 {
        match self {
            Heuristic::Geodesic { per_km } => from.distance_km(to) * per_km,
            Heuristic::Zero => 0.0,
        }
    }
}

impl Default for Heuristic {
    fn default() -> Self {
        Heuristic::Geodesic { per_km: 0.1 }
    }
}

/// Build an engine for `algorithm`
pub fn finder_for(algorithm: Algorithm, heuristic: Heuristic, budget: Option<Duration>) -> Box<dyn PathFinder> {
    match algorithm {
        Algorithm::Dijkstra => Box::new(Dijkstra { budget }),
        Algorithm::BellmanFord => Box::new(BellmanFord { budget }),
        Algorithm::AStar => Box::new(AStar { heuristic, budget }),
    }
}

/// Wall-clock budget of a single run
struct Budget {
    algorithm: Algorithm,
    started: Instant,
    limit: Option<Duration>,
}

impl Budget {
    fn start(algorithm: Algorithm, limit: Option<Duration>) -> Self {
        Self {
            algorithm,
            started: Instant::now(),
            limit,
        }
    }

    fn check(&self) -> PathResult<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Err(PathError::Timeout {
                algorithm: self.algorithm,
                budget: limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Min-heap entry ordered by priority, then node index for determinism
#[derive(Debug, Clone, Copy)]
struct Frontier {
    priority: f64,
    node: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Resolved endpoints of a query
struct Endpoints {
    source: usize,
    target: usize,
}

fn resolve(graph: &NetworkGraph, source: &NodeId, target: &NodeId) -> PathResult<Endpoints> {
    let s = graph
        .index_of(source)
        .ok_or_else(|| PathError::UnknownNode(source.clone()))?;
    let t = graph
        .index_of(target)
        .ok_or_else(|| PathError::UnknownNode(target.clone()))?;
    Ok(Endpoints { source: s, target: t })
}

fn reject_negative(graph: &NetworkGraph, algorithm: Algorithm) -> PathResult<()> {
    if !graph.has_negative_weight() {
        return Ok(());
    }
    match graph.edges().into_iter().find(|e| e.weight < 0.0) {
        Some(edge) => Err(PathError::NegativeWeight {
            algorithm,
            a: edge.a,
            b: edge.b,
            weight: edge.weight,
        }),
        None => Ok(()),
    }
}

fn trivial_path(graph: &NetworkGraph, node: usize) -> RoutePath {
    RoutePath {
        nodes: vec![graph.id_at(node).clone()],
        total_weight: 0.0,
        stats: SearchStats::default(),
    }
}

/// Walk predecessor links back from `target`
fn reconstruct(
    graph: &NetworkGraph,
    prev: &[Option<usize>],
    target: usize,
    total_weight: f64,
    stats: SearchStats,
) -> RoutePath {
    let mut nodes = vec![graph.id_at(target).clone()];
    let mut current = target;
    while let Some(p) = prev[current] {
        nodes.push(graph.id_at(p).clone());
        current = p;
        if nodes.len() > prev.len() {
            break;
        }
    }
    nodes.reverse();
    RoutePath {
        nodes,
        total_weight,
        stats,
    }
}

fn no_path(source: &NodeId, target: &NodeId) -> PathError {
    PathError::NoPath {
        from: source.clone(),
        to: target.clone(),
    }
}

/// Dijkstra's algorithm; requires non-negative weights
#[derive(Debug, Clone, Default)]
pub struct Dijkstra {
    budget: Option<Duration>,
}

impl Dijkstra {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget: Some(budget),
        }
    }
}

impl PathFinder for Dijkstra {
    fn find_path(&self, graph: &NetworkGraph, source: &NodeId, target: &NodeId) -> PathResult<RoutePath> {
        debug!(algorithm = "Dijkstra", %source, %target, "init");
        let ends = resolve(graph, source, target)?;
        reject_negative(graph, Algorithm::Dijkstra)?;
        if ends.source == ends.target {
            return Ok(trivial_path(graph, ends.source));
        }

        let budget = Budget::start(Algorithm::Dijkstra, self.budget);
        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut stats = SearchStats::default();
        let mut heap = BinaryHeap::new();

        dist[ends.source] = 0.0;
        heap.push(Frontier {
            priority: 0.0,
            node: ends.source,
        });

        while let Some(Frontier { priority: cost, node }) = heap.pop() {
            budget.check()?;

            // Stale entry
            if cost > dist[node] {
                continue;
            }
            stats.expanded += 1;

            if node == ends.target {
                debug!(algorithm = "Dijkstra", expanded = stats.expanded, cost, "found");
                return Ok(reconstruct(graph, &prev, node, cost, stats));
            }

            for &(neighbor, weight) in graph.adjacent(node) {
                if !weight.is_finite() {
                    continue;
                }
                let candidate = cost + weight;
                if candidate < dist[neighbor] {
                    dist[neighbor] = candidate;
                    prev[neighbor] = Some(node);
                    stats.relaxations += 1;
                    heap.push(Frontier {
                        priority: candidate,
                        node: neighbor,
                    });
                }
            }
        }

        debug!(algorithm = "Dijkstra", expanded = stats.expanded, "no path");
        Err(no_path(source, target))
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::Dijkstra
    }
}

/// Bellman-Ford; tolerates negative weights and detects negative cycles
#[derive(Debug, Clone, Default)]
pub struct BellmanFord {
    budget: Option<Duration>,
}

impl BellmanFord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget: Some(budget),
        }
    }
}

impl PathFinder for BellmanFord {
    fn find_path(&self, graph: &NetworkGraph, source: &NodeId, target: &NodeId) -> PathResult<RoutePath> {
        debug!(algorithm = "Bellman-Ford", %source, %target, "init");
        let ends = resolve(graph, source, target)?;

        let budget = Budget::start(Algorithm::BellmanFord, self.budget);
        let n = graph.node_count();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut stats = SearchStats::default();
        dist[ends.source] = 0.0;

        let mut converged = false;
        for pass in 0..n.saturating_sub(1) {
            budget.check()?;
            let mut changed = false;

            for u in 0..n {
                if dist[u] == f64::INFINITY {
                    continue;
                }
                stats.expanded += 1;
                for &(v, weight) in graph.adjacent(u) {
                    if !weight.is_finite() {
                        continue;
                    }
                    let candidate = dist[u] + weight;
                    if candidate < dist[v] {
                        dist[v] = candidate;
                        prev[v] = Some(u);
                        stats.relaxations += 1;
                        changed = true;
                    }
                }
            }

            trace!(algorithm = "Bellman-Ford", pass, changed, "relaxation pass");
            if !changed {
                converged = true;
                break;
            }
        }

        // One more pass: any further improvement means a reachable negative cycle
        if !converged {
            budget.check()?;
            for u in 0..n {
                if dist[u] == f64::INFINITY {
                    continue;
                }
                for &(v, weight) in graph.adjacent(u) {
                    if weight.is_finite() && dist[u] + weight < dist[v] {
                        debug!(algorithm = "Bellman-Ford", "negative cycle");
                        return Err(PathError::NegativeCycle { from: source.clone() });
                    }
                }
            }
        }

        if ends.source == ends.target {
            return Ok(trivial_path(graph, ends.source));
        }
        if dist[ends.target] == f64::INFINITY {
            debug!(algorithm = "Bellman-Ford", "no path");
            return Err(no_path(source, target));
        }

        debug!(algorithm = "Bellman-Ford", cost = dist[ends.target], "found");
        Ok(reconstruct(graph, &prev, ends.target, dist[ends.target], stats))
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::BellmanFord
    }
}

/// A* search guided by a [`Heuristic`]
#[derive(Debug, Clone, Default)]
pub struct AStar {
    heuristic: Heuristic,
    budget: Option<Duration>,
}

impl AStar {
    pub fn new(heuristic: Heuristic) -> Self {
        Self {
            heuristic,
            budget: None,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }
}

impl PathFinder for AStar {
    fn find_path(&self, graph: &NetworkGraph, source: &NodeId, target: &NodeId) -> PathResult<RoutePath> {
        debug!(algorithm = "A*", %source, %target, "init");
        let ends = resolve(graph, source, target)?;
        reject_negative(graph, Algorithm::AStar)?;
        if ends.source == ends.target {
            return Ok(trivial_path(graph, ends.source));
        }

        let budget = Budget::start(Algorithm::AStar, self.budget);
        let n = graph.node_count();
        let goal = graph.coordinate_at(ends.target);
        let h = |i: usize| self.heuristic.estimate(&graph.coordinate_at(i), &goal);

        let mut g = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut closed = vec![false; n];
        let mut stats = SearchStats::default();
        let mut open = BinaryHeap::new();

        g[ends.source] = 0.0;
        open.push(Frontier {
            priority: h(ends.source),
            node: ends.source,
        });

        while let Some(Frontier { node, .. }) = open.pop() {
            budget.check()?;

            if closed[node] {
                continue;
            }
            if node == ends.target {
                stats.expanded += 1;
                debug!(algorithm = "A*", expanded = stats.expanded, cost = g[node], "found");
                return Ok(reconstruct(graph, &prev, node, g[node], stats));
            }
            closed[node] = true;
            stats.expanded += 1;

            for &(neighbor, weight) in graph.adjacent(node) {
                if !weight.is_finite() || closed[neighbor] {
                    continue;
                }
                let tentative = g[node] + weight;
                if tentative < g[neighbor] {
                    g[neighbor] = tentative;
                    prev[neighbor] = Some(node);
                    stats.relaxations += 1;
                    open.push(Frontier {
                        priority: tentative + h(neighbor),
                        node: neighbor,
                    });
                }
            }
        }

        debug!(algorithm = "A*", expanded = stats.expanded, "no path");
        Err(no_path(source, target))
    }

    fn algorithm(&self) -> Algorithm {
        Algorithm::AStar
    }
}
