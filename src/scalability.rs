//! Scalability tester
//!
//! Generates random geometric graphs of increasing size and runs the
//! comparison harness on each, collecting timing-vs-size samples. The
//! samples are informational; nothing here asserts performance bounds.
//!
//! Determinism: every (size, trial) pair gets its own `StdRng` seeded from
//! the run seed, so results do not depend on whether trials run in parallel.

use crate::coordinates::NodeId;
use crate::graph::{GraphError, NetworkGraph};
use crate::harness::{ComparisonHarness, HarnessConfig};
use crate::pathfinding::{Algorithm, Heuristic};
use crate::GeoCoordinate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// 64-bit fractional golden-ratio constant for seed mixing
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

#[derive(Debug, Error, PartialEq)]
pub enum ScalabilityError {
    #[error("graph size must be at least 2, got {0}")]
    SizeTooSmall(usize),

    #[error("radius must be finite and non-negative, got {0}")]
    InvalidRadius(f64),

    #[error("weight range [{0}, {1}] must be positive and ordered")]
    InvalidWeightRange(f64, f64),

    #[error("graph generation failed: {0}")]
    Graph(#[from] GraphError),
}

pub type ScalabilityResult<T> = Result<T, ScalabilityError>;

/// Configuration for scalability experiments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalabilityConfig {
    /// Graph sizes to test
    pub sizes: Vec<usize>,
    /// Connection radius in the unit square
    pub radius: f64,
    /// Edge weights are drawn uniformly from [min, max]
    pub weight_range: (f64, f64),
    /// Random graphs per size
    pub trials_per_size: usize,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Run trials on the rayon pool
    pub parallel: bool,
    pub harness: HarnessConfig,
}

impl Default for ScalabilityConfig {
    fn default() -> Self {
        Self {
            sizes: vec![10, 50, 100, 200],
            radius: 0.3,
            weight_range: (1.0, 10.0),
            trials_per_size: 1,
            seed: 42,
            parallel: false,
            // Weights are unrelated to positions, so only a zero heuristic is admissible
            harness: HarnessConfig {
                heuristic: Heuristic::Zero,
                ..HarnessConfig::default()
            },
        }
    }
}

impl ScalabilityConfig {
    pub fn validate(&self) -> ScalabilityResult<()> {
        if let Some(&size) = self.sizes.iter().find(|&&s| s < 2) {
            return Err(ScalabilityError::SizeTooSmall(size));
        }
        if !self.radius.is_finite() || self.radius < 0.0 {
            return Err(ScalabilityError::InvalidRadius(self.radius));
        }
        let (min, max) = self.weight_range;
        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ScalabilityError::InvalidWeightRange(min, max));
        }
        Ok(())
    }
}

/// Seed for one trial, distinct per (size, trial)
pub fn trial_seed(seed: u64, size: usize, trial: usize) -> u64 {
    let stream = ((size as u64) << 32) ^ trial as u64;
    seed ^ stream.wrapping_add(1).wrapping_mul(MIXING_CONSTANT)
}

/// Random geometric graph: `n` points uniform in the unit square, an edge
/// between every pair closer than `radius`, i.i.d. uniform weights.
///
/// Positions are stored as (latitude, longitude) = (y, x) in degrees.
pub fn random_geometric_graph<R: Rng + ?Sized>(
    n: usize,
    radius: f64,
    weight_range: (f64, f64),
    rng: &mut R,
) -> ScalabilityResult<NetworkGraph> {
    let points: Vec<(f64, f64)> = (0..n).map(|_| (rng.gen::<f64>(), rng.gen::<f64>())).collect();

    let mut edges = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let dx = points[i].0 - points[j].0;
            let dy = points[i].1 - points[j].1;
            if (dx * dx + dy * dy).sqrt() <= radius {
                let weight = if weight_range.1 > weight_range.0 {
                    rng.gen_range(weight_range.0..=weight_range.1)
                } else {
                    weight_range.0
                };
                edges.push((node_name(i), node_name(j), weight));
            }
        }
    }

    let nodes = points.iter().enumerate().map(|(i, &(x, y))| {
        let coordinate = GeoCoordinate {
            latitude: y,
            longitude: x,
        };
        (node_name(i), coordinate)
    });

    Ok(NetworkGraph::from_edges(nodes, edges)?)
}

fn node_name(i: usize) -> NodeId {
    NodeId::new(format!("node_{}", i))
}

/// Timing of one algorithm in one trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmTiming {
    pub algorithm: Algorithm,
    pub elapsed_us: f64,
    pub success: bool,
}

/// Result of one (size, trial) run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalabilitySample {
    pub size: usize,
    pub trial: usize,
    pub edge_count: usize,
    pub source: NodeId,
    pub target: NodeId,
    pub timings: Vec<AlgorithmTiming>,
    pub consistent: bool,
}

/// Per-size aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeSummary {
    pub size: usize,
    pub trials: usize,
    pub avg_edges: f64,
    pub avg_degree: f64,
    /// Mean elapsed time per algorithm, microseconds, in [`Algorithm::ALL`] order
    pub avg_elapsed_us: Vec<(Algorithm, f64)>,
    /// Fraction of trials each algorithm found a path
    pub success_rate: Vec<(Algorithm, f64)>,
}

impl std::fmt::Display for SizeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Graph Size: {} nodes, {:.1} edges (avg)", self.size, self.avg_edges)?;
        writeln!(f, "  Avg Degree:        {:.2}", self.avg_degree)?;
        for ((algorithm, elapsed), (_, rate)) in self.avg_elapsed_us.iter().zip(&self.success_rate) {
            writeln!(
                f,
                "  {:<18} {:>10.2} μs   success {:>6.1}%",
                format!("{}:", algorithm),
                elapsed,
                rate * 100.0
            )?;
        }
        Ok(())
    }
}

/// All samples plus per-size aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalabilitySummary {
    pub samples: Vec<ScalabilitySample>,
    pub sizes: Vec<SizeSummary>,
}

/// Drives the harness over synthetic graphs of increasing size
#[derive(Debug, Clone, Default)]
pub struct ScalabilityTester {
    config: ScalabilityConfig,
}

impl ScalabilityTester {
    pub fn new(config: ScalabilityConfig) -> ScalabilityResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScalabilityConfig {
        &self.config
    }

    /// Run every (size, trial) job and aggregate the results
    pub fn run(&self) -> ScalabilityResult<ScalabilitySummary> {
        let jobs: Vec<(usize, usize)> = self
            .config
            .sizes
            .iter()
            .flat_map(|&size| (0..self.config.trials_per_size).map(move |trial| (size, trial)))
            .collect();

        info!(
            jobs = jobs.len(),
            parallel = self.config.parallel,
            seed = self.config.seed,
            "starting scalability run"
        );

        let samples: Vec<ScalabilitySample> = if self.config.parallel {
            jobs.par_iter()
                .map(|&(size, trial)| self.run_trial(size, trial))
                .collect::<ScalabilityResult<_>>()?
        } else {
            jobs.iter()
                .map(|&(size, trial)| self.run_trial(size, trial))
                .collect::<ScalabilityResult<_>>()?
        };

        let sizes = self.summarize(&samples);
        Ok(ScalabilitySummary { samples, sizes })
    }

    /// Generate one random graph and compare the algorithms on it
    pub fn run_trial(&self, size: usize, trial: usize) -> ScalabilityResult<ScalabilitySample> {
        if size < 2 {
            return Err(ScalabilityError::SizeTooSmall(size));
        }
        let mut rng = StdRng::seed_from_u64(trial_seed(self.config.seed, size, trial));
        let graph = random_geometric_graph(size, self.config.radius, self.config.weight_range, &mut rng)?;

        let s = rng.gen_range(0..size);
        let mut t = rng.gen_range(0..size - 1);
        if t >= s {
            t += 1;
        }
        let source = node_name(s);
        let target = node_name(t);

        let report = ComparisonHarness::new(self.config.harness.clone()).run(&graph, &source, &target);
        debug!(size, trial, edges = graph.edge_count(), "trial complete");

        let timings = report
            .entries
            .iter()
            .map(|e| AlgorithmTiming {
                algorithm: e.algorithm,
                elapsed_us: e.elapsed.as_secs_f64() * 1e6,
                success: e.is_success(),
            })
            .collect();

        Ok(ScalabilitySample {
            size,
            trial,
            edge_count: graph.edge_count(),
            source,
            target,
            timings,
            consistent: report.validation.is_consistent(),
        })
    }

    fn summarize(&self, samples: &[ScalabilitySample]) -> Vec<SizeSummary> {
        let mut sizes: Vec<usize> = Vec::new();
        for &size in &self.config.sizes {
            if !sizes.contains(&size) {
                sizes.push(size);
            }
        }

        sizes
            .into_iter()
            .map(|size| {
                let group: Vec<&ScalabilitySample> = samples.iter().filter(|s| s.size == size).collect();
                let trials = group.len().max(1) as f64;
                let avg_edges = group.iter().map(|s| s.edge_count as f64).sum::<f64>() / trials;

                let per_algorithm = |f: &dyn Fn(&AlgorithmTiming) -> f64| -> Vec<(Algorithm, f64)> {
                    Algorithm::ALL
                        .iter()
                        .map(|&algorithm| {
                            let total: f64 = group
                                .iter()
                                .flat_map(|s| s.timings.iter())
                                .filter(|t| t.algorithm == algorithm)
                                .map(f)
                                .sum();
                            (algorithm, total / trials)
                        })
                        .collect()
                };

                SizeSummary {
                    size,
                    trials: group.len(),
                    avg_edges,
                    avg_degree: 2.0 * avg_edges / size as f64,
                    avg_elapsed_us: per_algorithm(&|t: &AlgorithmTiming| t.elapsed_us),
                    success_rate: per_algorithm(&|t: &AlgorithmTiming| if t.success { 1.0 } else { 0.0 }),
                }
            })
            .collect()
    }
}
