//! Comparison harness
//!
//! Runs Dijkstra, Bellman-Ford and A* on the same query, times each run,
//! derives path metrics and cross-validates the results. Individual failures
//! never abort the comparison: the report always holds one entry per
//! algorithm.

use crate::coordinates::NodeId;
use crate::graph::NetworkGraph;
use crate::latency::LatencyModel;
use crate::metrics::{MetricsError, PathMetrics};
use crate::pathfinding::{finder_for, Algorithm, Heuristic, PathError, RoutePath};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Relative tolerance used when comparing path weights
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Harness settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Per-hop packet loss used for the delivery probability
    pub per_hop_loss: f64,
    /// Heuristic handed to A*
    pub heuristic: Heuristic,
    /// Optional wall-clock budget per algorithm run
    pub time_budget: Option<Duration>,
    /// Run the three algorithms on the rayon pool
    pub parallel: bool,
    /// Whether the caller guarantees A*'s heuristic is admissible; only then
    /// is A* checked against Dijkstra
    pub astar_admissible: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            per_hop_loss: 0.01,
            heuristic: Heuristic::default(),
            time_budget: None,
            parallel: false,
            astar_admissible: true,
        }
    }
}

impl HarnessConfig {
    /// Geodesic heuristic matched to a latency model
    pub fn for_latency_model(model: &LatencyModel, per_hop_loss: f64) -> Self {
        Self {
            per_hop_loss,
            heuristic: Heuristic::Geodesic {
                per_km: model.config().latency_per_km,
            },
            astar_admissible: model.geodesic_heuristic_admissible(),
            ..Self::default()
        }
    }
}

/// Named failure categories recorded in a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    UnknownNode,
    NoPath,
    NegativeWeight,
    NegativeCycle,
    Timeout,
    InvalidPath,
}

impl From<&PathError> for FailureKind {
    fn from(err: &PathError) -> Self {
        match err {
            PathError::UnknownNode(_) => FailureKind::UnknownNode,
            PathError::NoPath { .. } => FailureKind::NoPath,
            PathError::NegativeWeight { .. } => FailureKind::NegativeWeight,
            PathError::NegativeCycle { .. } => FailureKind::NegativeCycle,
            PathError::Timeout { .. } => FailureKind::Timeout,
        }
    }
}

/// Result of one algorithm: a path with metrics, or a named failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Found { route: RoutePath, metrics: PathMetrics },
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    fn from_path_error(err: &PathError) -> Self {
        Outcome::Failed {
            kind: err.into(),
            message: err.to_string(),
        }
    }

    fn from_metrics_error(err: &MetricsError) -> Self {
        Outcome::Failed {
            kind: FailureKind::InvalidPath,
            message: err.to_string(),
        }
    }
}

/// One row of the comparison report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmReport {
    pub algorithm: Algorithm,
    pub elapsed: Duration,
    pub outcome: Outcome,
}

impl AlgorithmReport {
    pub fn path(&self) -> Option<&[NodeId]> {
        match &self.outcome {
            Outcome::Found { route, .. } => Some(&route.nodes),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn metrics(&self) -> Option<&PathMetrics> {
        match &self.outcome {
            Outcome::Found { metrics, .. } => Some(metrics),
            Outcome::Failed { .. } => None,
        }
    }

    pub fn total_latency(&self) -> Option<f64> {
        self.metrics().map(|m| m.total_latency)
    }

    pub fn failure(&self) -> Option<FailureKind> {
        match &self.outcome {
            Outcome::Found { .. } => None,
            Outcome::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Found { .. })
    }
}

/// Agreement checks between algorithms
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    /// Dijkstra and Bellman-Ford totals agree; None when not comparable
    pub bellman_ford_matches_dijkstra: Option<bool>,
    /// A* and Dijkstra totals agree; None when not comparable or A*'s
    /// precondition was not declared
    pub astar_matches_dijkstra: Option<bool>,
    pub issues: Vec<String>,
}

impl CrossValidation {
    pub fn is_consistent(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Structured result of one comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub source: NodeId,
    pub target: NodeId,
    pub node_count: usize,
    pub edge_count: usize,
    /// Exactly one entry per algorithm, in [`Algorithm::ALL`] order
    pub entries: Vec<AlgorithmReport>,
    pub validation: CrossValidation,
}

impl ComparisonReport {
    pub fn entry(&self, algorithm: Algorithm) -> Option<&AlgorithmReport> {
        self.entries.iter().find(|e| e.algorithm == algorithm)
    }
}

impl std::fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Routing Comparison: {} -> {} ===", self.source, self.target)?;
        writeln!(f, "Graph: {} nodes, {} edges", self.node_count, self.edge_count)?;
        for entry in &self.entries {
            writeln!(f)?;
            writeln!(f, "{}:", entry.algorithm)?;
            match &entry.outcome {
                Outcome::Found { route, metrics } => {
                    let names: Vec<&str> = route.nodes.iter().map(NodeId::as_str).collect();
                    writeln!(f, "  Path:          {}", names.join(" -> "))?;
                    writeln!(f, "  Hops:          {}", metrics.hops)?;
                    writeln!(f, "  Latency:       {:.3}", metrics.total_latency)?;
                    writeln!(f, "  Energy:        {:.5}", metrics.energy)?;
                    writeln!(f, "  Delivery:      {:.4}", metrics.delivery_probability)?;
                    writeln!(f, "  Expanded:      {}", route.stats.expanded)?;
                }
                Outcome::Failed { message, .. } => {
                    writeln!(f, "  Error:         {}", message)?;
                }
            }
            writeln!(f, "  Elapsed:       {:.2} μs", entry.elapsed.as_secs_f64() * 1e6)?;
        }
        writeln!(f)?;
        if self.validation.is_consistent() {
            writeln!(f, "Cross-validation: consistent")?;
        } else {
            writeln!(f, "Cross-validation issues:")?;
            for issue in &self.validation.issues {
                writeln!(f, "  - {}", issue)?;
            }
        }
        Ok(())
    }
}

fn weights_match(a: f64, b: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= WEIGHT_TOLERANCE * scale
}

/// Compares the three algorithms on a shared, read-only graph
#[derive(Debug, Clone, Default)]
pub struct ComparisonHarness {
    config: HarnessConfig,
}

impl ComparisonHarness {
    pub fn new(config: HarnessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run all algorithms and build the report
    pub fn run(&self, graph: &NetworkGraph, source: &NodeId, target: &NodeId) -> ComparisonReport {
        let entries: Vec<AlgorithmReport> = if self.config.parallel {
            Algorithm::ALL
                .as_slice()
                .par_iter()
                .map(|&algorithm| self.run_one(graph, algorithm, source, target))
                .collect()
        } else {
            Algorithm::ALL
                .iter()
                .map(|&algorithm| self.run_one(graph, algorithm, source, target))
                .collect()
        };

        let validation = self.cross_validate(&entries);
        for issue in &validation.issues {
            warn!(%source, %target, "{}", issue);
        }

        ComparisonReport {
            source: source.clone(),
            target: target.clone(),
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            entries,
            validation,
        }
    }

    /// Run a single algorithm, converting any failure into a report row
    pub fn run_one(
        &self,
        graph: &NetworkGraph,
        algorithm: Algorithm,
        source: &NodeId,
        target: &NodeId,
    ) -> AlgorithmReport {
        let finder = finder_for(algorithm, self.config.heuristic, self.config.time_budget);

        let started = Instant::now();
        let result = finder.find_path(graph, source, target);
        let elapsed = started.elapsed();

        let outcome = match result {
            Ok(route) => match PathMetrics::for_route(&route, graph, self.config.per_hop_loss) {
                Ok(metrics) => Outcome::Found { route, metrics },
                Err(err) => Outcome::from_metrics_error(&err),
            },
            Err(err) => Outcome::from_path_error(&err),
        };

        match &outcome {
            Outcome::Found { metrics, .. } => info!(
                %algorithm,
                latency = metrics.total_latency,
                hops = metrics.hops,
                elapsed_us = elapsed.as_micros() as u64,
                "path found"
            ),
            Outcome::Failed { kind, message } => info!(
                %algorithm,
                ?kind,
                elapsed_us = elapsed.as_micros() as u64,
                "{}",
                message
            ),
        }

        AlgorithmReport {
            algorithm,
            elapsed,
            outcome,
        }
    }

    fn cross_validate(&self, entries: &[AlgorithmReport]) -> CrossValidation {
        let find = |a: Algorithm| entries.iter().find(|e| e.algorithm == a);
        let mut validation = CrossValidation::default();

        let (Some(dijkstra), Some(bellman_ford), Some(astar)) = (
            find(Algorithm::Dijkstra),
            find(Algorithm::BellmanFord),
            find(Algorithm::AStar),
        ) else {
            validation.issues.push("report is missing an algorithm entry".to_string());
            return validation;
        };

        match (dijkstra.total_latency(), bellman_ford.total_latency()) {
            (Some(d), Some(b)) => {
                let ok = weights_match(d, b);
                validation.bellman_ford_matches_dijkstra = Some(ok);
                if !ok {
                    validation
                        .issues
                        .push(format!("Bellman-Ford total {} differs from Dijkstra total {}", b, d));
                }
            }
            (Some(_), None) if bellman_ford.failure() == Some(FailureKind::NoPath) => {
                validation.bellman_ford_matches_dijkstra = Some(false);
                validation
                    .issues
                    .push("Dijkstra found a path Bellman-Ford reports as missing".to_string());
            }
            (None, Some(_)) if dijkstra.failure() == Some(FailureKind::NoPath) => {
                validation.bellman_ford_matches_dijkstra = Some(false);
                validation
                    .issues
                    .push("Bellman-Ford found a path Dijkstra reports as missing".to_string());
            }
            _ => {}
        }

        if self.config.astar_admissible {
            if let (Some(d), Some(a)) = (dijkstra.total_latency(), astar.total_latency()) {
                let ok = weights_match(d, a);
                validation.astar_matches_dijkstra = Some(ok);
                if !ok {
                    validation
                        .issues
                        .push(format!("A* total {} differs from Dijkstra total {}", a, d));
                }
            }
        }

        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeoCoordinate;

    fn node(name: &str) -> NodeId {
        NodeId::new(name)
    }

    fn graph_with(edges: Vec<(&str, &str, f64)>) -> NetworkGraph {
        let origin = GeoCoordinate::new(0.0, 0.0).unwrap();
        let mut names: Vec<&str> = edges.iter().flat_map(|(a, b, _)| [*a, *b]).collect();
        names.sort_unstable();
        names.dedup();
        NetworkGraph::from_edges(
            names.into_iter().map(|n| (node(n), origin)),
            edges.into_iter().map(|(a, b, w)| (node(a), node(b), w)),
        )
        .unwrap()
    }

    fn zero_heuristic() -> HarnessConfig {
        HarnessConfig {
            heuristic: Heuristic::Zero,
            ..HarnessConfig::default()
        }
    }

    #[test]
    fn test_report_has_one_entry_per_algorithm() {
        let graph = graph_with(vec![("A", "B", 1.0), ("B", "C", 2.0), ("A", "C", 4.0)]);
        let report = ComparisonHarness::new(zero_heuristic()).run(&graph, &node("A"), &node("C"));

        assert_eq!(report.entries.len(), 3);
        for (entry, expected) in report.entries.iter().zip(Algorithm::ALL) {
            assert_eq!(entry.algorithm, expected);
            assert_eq!(entry.total_latency(), Some(3.0));
            assert_eq!(entry.path().unwrap(), &[node("A"), node("B"), node("C")]);
        }
        assert!(report.validation.is_consistent());
        assert_eq!(report.validation.bellman_ford_matches_dijkstra, Some(true));
        assert_eq!(report.validation.astar_matches_dijkstra, Some(true));
    }

    #[test]
    fn test_failures_are_recorded_not_raised() {
        let graph = graph_with(vec![("A", "B", 1.0), ("B", "C", -2.0)]);
        let report = ComparisonHarness::new(zero_heuristic()).run(&graph, &node("A"), &node("C"));

        assert_eq!(report.entries.len(), 3);
        assert_eq!(
            report.entry(Algorithm::Dijkstra).unwrap().failure(),
            Some(FailureKind::NegativeWeight)
        );
        assert_eq!(
            report.entry(Algorithm::BellmanFord).unwrap().failure(),
            Some(FailureKind::NegativeCycle)
        );
        assert_eq!(
            report.entry(Algorithm::AStar).unwrap().failure(),
            Some(FailureKind::NegativeWeight)
        );
        // Nothing comparable, nothing flagged
        assert!(report.validation.is_consistent());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let graph = graph_with(vec![
            ("A", "B", 1.5),
            ("B", "C", 2.5),
            ("A", "D", 1.0),
            ("D", "C", 3.5),
            ("C", "E", 0.5),
        ]);
        let sequential = ComparisonHarness::new(zero_heuristic()).run(&graph, &node("A"), &node("E"));
        let parallel = ComparisonHarness::new(HarnessConfig {
            parallel: true,
            ..zero_heuristic()
        })
        .run(&graph, &node("A"), &node("E"));

        for (s, p) in sequential.entries.iter().zip(&parallel.entries) {
            assert_eq!(s.algorithm, p.algorithm);
            assert_eq!(s.outcome, p.outcome);
        }
    }

    #[test]
    fn test_timeout_recorded() {
        let graph = graph_with(vec![("A", "B", 1.0)]);
        let config = HarnessConfig {
            time_budget: Some(Duration::ZERO),
            ..zero_heuristic()
        };
        let report = ComparisonHarness::new(config).run(&graph, &node("A"), &node("B"));
        for entry in &report.entries {
            assert_eq!(entry.failure(), Some(FailureKind::Timeout));
        }
    }

    #[test]
    fn test_astar_check_skipped_without_admissibility() {
        let graph = graph_with(vec![("A", "B", 1.0)]);
        let config = HarnessConfig {
            astar_admissible: false,
            ..zero_heuristic()
        };
        let report = ComparisonHarness::new(config).run(&graph, &node("A"), &node("B"));
        assert_eq!(report.validation.astar_matches_dijkstra, None);
    }

    #[test]
    fn test_report_serializes_and_displays() {
        let graph = graph_with(vec![("A", "B", 1.0)]);
        let report = ComparisonHarness::new(zero_heuristic()).run(&graph, &node("A"), &node("B"));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"status\":\"found\""));

        let text = report.to_string();
        assert!(text.contains("Bellman-Ford"));
        assert!(text.contains("Cross-validation: consistent"));
    }

    #[test]
    fn test_weights_match_tolerance() {
        assert!(weights_match(1.0, 1.0 + 1e-12));
        assert!(!weights_match(1.0, 1.001));
        assert!(weights_match(1e6, 1e6 + 1e-4));
    }

    #[test]
    fn test_overestimating_heuristic_is_flagged() {
        // B sits far from the target, so the geodesic estimate hides the cheap A-B-C route
        let graph = NetworkGraph::from_edges(
            vec![
                (node("A"), GeoCoordinate::new(0.0, 0.0).unwrap()),
                (node("B"), GeoCoordinate::new(0.0, 60.0).unwrap()),
                (node("C"), GeoCoordinate::new(0.0, 1.0).unwrap()),
            ],
            vec![
                (node("A"), node("B"), 1.0),
                (node("B"), node("C"), 1.0),
                (node("A"), node("C"), 5.0),
            ],
        )
        .unwrap();
        let harness = ComparisonHarness::new(HarnessConfig {
            heuristic: Heuristic::Geodesic { per_km: 0.1 },
            astar_admissible: true,
            ..HarnessConfig::default()
        });

        let report = harness.run(&graph, &node("A"), &node("C"));

        assert_eq!(report.entry(Algorithm::Dijkstra).unwrap().total_latency(), Some(2.0));
        assert_eq!(report.entry(Algorithm::AStar).unwrap().total_latency(), Some(5.0));
        assert_eq!(report.validation.bellman_ford_matches_dijkstra, Some(true));
        assert_eq!(report.validation.astar_matches_dijkstra, Some(false));
        assert!(!report.validation.is_consistent());
        assert_eq!(report.validation.issues.len(), 1);
        assert!(report.validation.issues[0].contains("A*"));
        assert!(report.to_string().contains("Cross-validation issues"));
    }
}
