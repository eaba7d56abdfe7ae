//! Path metrics: latency, energy and packet delivery
//!
//! The delivery probability is the deterministic expectation
//! `(1 - loss)^hops`. A single stochastic trial per hop is available as
//! [`simulate_delivery`] for callers that want per-packet sampling, and
//! [`estimate_delivery`] averages many trials.

use crate::coordinates::NodeId;
use crate::graph::NetworkGraph;
use crate::pathfinding::RoutePath;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Energy spent per unit of latency
pub const ENERGY_PER_LATENCY_UNIT: f64 = 0.01;

/// Errors produced when computing metrics
#[derive(Debug, Error, PartialEq)]
pub enum MetricsError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("per-hop loss probability must be in [0, 1], got {0}")]
    InvalidLossProbability(f64),
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Weights of consecutive hops, validating that each hop is an edge
fn hop_weights(path: &[NodeId], graph: &NetworkGraph) -> MetricsResult<Vec<f64>> {
    if path.is_empty() {
        return Err(MetricsError::InvalidPath("path is empty".to_string()));
    }
    if let Some(unknown) = path.iter().find(|id| !graph.contains(id)) {
        return Err(MetricsError::InvalidPath(format!("node {} is not in the graph", unknown)));
    }

    path.windows(2)
        .map(|pair| {
            graph.weight(&pair[0], &pair[1]).ok_or_else(|| {
                MetricsError::InvalidPath(format!("{} - {} is not an edge", pair[0], pair[1]))
            })
        })
        .collect()
}

fn check_loss(loss: f64) -> MetricsResult<()> {
    if (0.0..=1.0).contains(&loss) {
        Ok(())
    } else {
        Err(MetricsError::InvalidLossProbability(loss))
    }
}

/// Sum of edge weights along the path
pub fn total_latency(path: &[NodeId], graph: &NetworkGraph) -> MetricsResult<f64> {
    Ok(hop_weights(path, graph)?.into_iter().fold(0.0, |acc, w| acc + w))
}

/// Energy cost of the path: `0.01 * total_latency`
pub fn energy(path: &[NodeId], graph: &NetworkGraph) -> MetricsResult<f64> {
    Ok(ENERGY_PER_LATENCY_UNIT * total_latency(path, graph)?)
}

/// Probability that a packet survives every hop: `(1 - loss)^hops`
pub fn delivery_probability(path: &[NodeId], graph: &NetworkGraph, per_hop_loss: f64) -> MetricsResult<f64> {
    check_loss(per_hop_loss)?;
    let hops = hop_weights(path, graph)?.len();
    let p = (1.0 - per_hop_loss).powi(hops as i32);
    Ok(p.clamp(0.0, 1.0))
}

/// One stochastic delivery attempt: each hop independently drops the packet
/// with probability `per_hop_loss`. Returns whether it arrived.
pub fn simulate_delivery<R: Rng + ?Sized>(
    path: &[NodeId],
    graph: &NetworkGraph,
    per_hop_loss: f64,
    rng: &mut R,
) -> MetricsResult<bool> {
    check_loss(per_hop_loss)?;
    let hops = hop_weights(path, graph)?.len();
    Ok((0..hops).all(|_| !rng.gen_bool(per_hop_loss)))
}

/// Monte-Carlo estimate of the delivery probability over `trials` attempts
pub fn estimate_delivery<R: Rng + ?Sized>(
    path: &[NodeId],
    graph: &NetworkGraph,
    per_hop_loss: f64,
    trials: usize,
    rng: &mut R,
) -> MetricsResult<f64> {
    if trials == 0 {
        return delivery_probability(path, graph, per_hop_loss);
    }
    let mut delivered = 0usize;
    for _ in 0..trials {
        if simulate_delivery(path, graph, per_hop_loss, rng)? {
            delivered += 1;
        }
    }
    Ok(delivered as f64 / trials as f64)
}

/// All metrics of one path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathMetrics {
    pub total_latency: f64,
    pub energy: f64,
    pub delivery_probability: f64,
    pub hops: usize,
}

impl PathMetrics {
    pub fn compute(path: &[NodeId], graph: &NetworkGraph, per_hop_loss: f64) -> MetricsResult<Self> {
        let total_latency = total_latency(path, graph)?;
        Ok(Self {
            total_latency,
            energy: ENERGY_PER_LATENCY_UNIT * total_latency,
            delivery_probability: delivery_probability(path, graph, per_hop_loss)?,
            hops: path.len() - 1,
        })
    }

    pub fn for_route(route: &RoutePath, graph: &NetworkGraph, per_hop_loss: f64) -> MetricsResult<Self> {
        Self::compute(&route.nodes, graph, per_hop_loss)
    }
}
