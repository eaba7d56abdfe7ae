//! End-to-end tests over the Asian root-server registry
//!
//! Builds threshold graphs from real server locations and drives the
//! comparison harness through the success and failure paths.

use anycast_routing::config::SimulationConfig;
use anycast_routing::coordinates::{NodeId, NodeRegistry};
use anycast_routing::graph::{GraphError, GraphExport, NetworkGraph};
use anycast_routing::harness::{ComparisonHarness, FailureKind, HarnessConfig};
use anycast_routing::latency::{FixedFactors, LatencyConfig, LatencyModel, SeededFactors};
use anycast_routing::pathfinding::Algorithm;
use anycast_routing::GeoCoordinate;

const SERVERS: [(&str, f64, f64); 20] = [
    ("Beijing (F-Root)", 39.908657170664284, 116.40744366071854),
    ("Ulaanbaatar (I-Root)", 47.925489761874566, 106.90519368487101),
    ("Seoul (F-Root)", 37.570588255250925, 126.97830876553707),
    ("Tokyo (K-Root)", 35.69364076859484, 139.6927315206505),
    ("Kathmandu (J-Root)", 27.697480843101093, 85.32595514492928),
    ("Thimphu (K-Root)", 27.432195344458957, 89.65136832598677),
    ("Delhi (K-Root)", 28.709454485241707, 77.10214292911624),
    ("Dhaka (F-Root)", 23.716286807244927, 90.40727417333864),
    ("Karachi (F-Root)", 24.89771625685946, 67.02805591279059),
    ("Mumbai (I-Root)", 19.080856668920223, 72.8773231136106),
    ("Chennai (F-Root)", 13.058335239832585, 80.25131212386664),
    ("Colombo (I-Root)", 6.934210101363445, 79.86080739213143),
    ("Bangkok (I-Root)", 13.733291322371999, 100.52383789110326),
    ("Phnom Penh (F-Root)", 11.565871238891692, 104.9181323207523),
    ("Kuala Lumpur (I-Root)", 3.13842431601014, 101.68487871056935),
    ("Jakarta (I-Root)", -6.169617943221922, 106.86500690789407),
    ("Singapore (F-Root)", 1.359289361789639, 103.81914483670622),
    ("Manila (I-Root)", 14.605478137135725, 120.98524509935208),
    ("Taipei (K-Root)", 25.079091582404914, 121.57650285075167),
    ("Hongkong (F-Root)", 22.402082576524865, 114.10929040891995),
];

fn registry() -> NodeRegistry {
    SERVERS
        .iter()
        .map(|&(name, lat, lon)| (NodeId::new(name), GeoCoordinate::new(lat, lon).unwrap()))
        .collect()
}

fn beijing() -> NodeId {
    NodeId::new("Beijing (F-Root)")
}

fn colombo() -> NodeId {
    NodeId::new("Colombo (I-Root)")
}

fn static_graph(threshold_km: f64) -> NetworkGraph {
    let model = LatencyModel::new(LatencyConfig::default()).unwrap();
    NetworkGraph::build_with_model(&registry(), threshold_km, &model, &mut FixedFactors::neutral()).unwrap()
}

#[test]
fn test_static_model_all_algorithms_agree() {
    let graph = static_graph(2000.0);
    let model = LatencyModel::new(LatencyConfig::default()).unwrap();
    let harness = ComparisonHarness::new(HarnessConfig::for_latency_model(&model, 0.01));

    let report = harness.run(&graph, &beijing(), &colombo());

    assert_eq!(report.entries.len(), 3);
    assert!(report.entries.iter().all(|e| e.is_success()), "{}", report);
    assert!(report.validation.is_consistent());
    assert_eq!(report.validation.bellman_ford_matches_dijkstra, Some(true));
    assert_eq!(report.validation.astar_matches_dijkstra, Some(true));

    let dijkstra = report.entry(Algorithm::Dijkstra).unwrap();
    let path = dijkstra.path().unwrap();
    assert_eq!(path.first(), Some(&beijing()));
    assert_eq!(path.last(), Some(&colombo()));

    let metrics = dijkstra.metrics().unwrap();
    assert_eq!(metrics.energy, 0.01 * metrics.total_latency);
    assert!((metrics.delivery_probability - 0.99f64.powi(metrics.hops as i32)).abs() < 1e-12);

    // Straight-line latency is a lower bound on any routed latency
    let direct = graph
        .coordinate(&beijing())
        .unwrap()
        .distance_km(&graph.coordinate(&colombo()).unwrap())
        * 0.1;
    assert!(metrics.total_latency >= direct - 1e-9);
}

#[test]
fn test_higher_threshold_gives_denser_graph() {
    let sparse = static_graph(1000.0);
    let medium = static_graph(2000.0);
    let dense = static_graph(5000.0);
    assert!(sparse.edge_count() <= medium.edge_count());
    assert!(medium.edge_count() <= dense.edge_count());

    let complete = static_graph(20_000.0);
    assert_eq!(complete.edge_count(), SERVERS.len() * (SERVERS.len() - 1) / 2);
}

#[test]
fn test_zero_threshold_has_no_path() {
    let graph = static_graph(0.0);
    assert_eq!(graph.edge_count(), 0);

    let report = ComparisonHarness::default().run(&graph, &beijing(), &colombo());
    assert!(report
        .entries
        .iter()
        .all(|e| e.failure() == Some(FailureKind::NoPath)));
    assert!(report.validation.is_consistent());
}

#[test]
fn test_isolated_target_reports_no_path() {
    let graph = static_graph(2000.0).without_node_edges(&colombo()).unwrap();
    assert!(graph.contains(&colombo()));
    assert_eq!(graph.neighbors(&colombo()).unwrap().count(), 0);

    let report = ComparisonHarness::default().run(&graph, &beijing(), &colombo());
    for entry in &report.entries {
        assert_eq!(entry.failure(), Some(FailureKind::NoPath), "{}", entry.algorithm);
    }
}

#[test]
fn test_all_links_down_reports_no_path() {
    let model = LatencyModel::new(LatencyConfig::dynamic(1.0)).unwrap();
    let mut factors = FixedFactors {
        down: true,
        ..FixedFactors::neutral()
    };
    let graph = NetworkGraph::build_with_model(&registry(), 2000.0, &model, &mut factors).unwrap();
    assert!(graph.edge_count() > 0);
    assert_eq!(graph.down_link_count(), graph.edge_count());

    let report = ComparisonHarness::default().run(&graph, &beijing(), &colombo());
    assert!(report
        .entries
        .iter()
        .all(|e| e.failure() == Some(FailureKind::NoPath)));
}

#[test]
fn test_unknown_server_is_reported_per_algorithm() {
    let graph = static_graph(2000.0);
    let report = ComparisonHarness::default().run(&graph, &beijing(), &NodeId::new("Atlantis (Z-Root)"));
    assert!(report
        .entries
        .iter()
        .all(|e| e.failure() == Some(FailureKind::UnknownNode)));
}

#[test]
fn test_duplicate_server_is_rejected() {
    let mut registry = registry();
    registry.register("Tokyo (K-Root)", GeoCoordinate::new(35.0, 139.0).unwrap());

    let result = NetworkGraph::build(&registry, 2000.0, |d| d * 0.1);
    assert_eq!(
        result.unwrap_err(),
        GraphError::DuplicateNode(NodeId::new("Tokyo (K-Root)"))
    );
}

#[test]
fn test_seeded_dynamic_graphs_are_reproducible() {
    let model = LatencyModel::new(LatencyConfig::dynamic(0.1)).unwrap();
    let first =
        NetworkGraph::build_with_model(&registry(), 2000.0, &model, &mut SeededFactors::from_seed(7)).unwrap();
    let second =
        NetworkGraph::build_with_model(&registry(), 2000.0, &model, &mut SeededFactors::from_seed(7)).unwrap();

    assert_eq!(first.edges(), second.edges());
    assert_eq!(first.down_link_count(), second.down_link_count());
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let graph = static_graph(2500.0);
    let sequential = ComparisonHarness::new(HarnessConfig::default()).run(&graph, &beijing(), &colombo());
    let parallel = ComparisonHarness::new(HarnessConfig {
        parallel: true,
        ..HarnessConfig::default()
    })
    .run(&graph, &beijing(), &colombo());

    for algorithm in Algorithm::ALL {
        let s = sequential.entry(algorithm).unwrap();
        let p = parallel.entry(algorithm).unwrap();
        assert_eq!(s.path(), p.path());
        assert_eq!(s.metrics(), p.metrics());
    }
}

#[test]
fn test_config_pipeline_and_export() {
    let config = SimulationConfig::from_json(r#"{ "threshold_km": 2000.0, "random_seed": 3 }"#).unwrap();
    let model = config.latency_model().unwrap();
    let mut factors = config.factor_source();
    let graph = NetworkGraph::build_with_model(&registry(), config.threshold_km, &model, &mut factors).unwrap();

    let report = ComparisonHarness::new(config.harness_config().unwrap()).run(&graph, &beijing(), &colombo());
    assert!(report.validation.is_consistent(), "{}", report);

    let path = report.entry(Algorithm::Dijkstra).and_then(|e| e.path());
    let export = graph.export(path);
    assert_eq!(export.nodes.len(), SERVERS.len());
    assert_eq!(export.edges.len(), graph.edge_count());
    assert_eq!(export.path.first(), Some(&beijing()));

    let json = serde_json::to_string(&export).unwrap();
    let decoded: GraphExport = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded.path, export.path);
}
