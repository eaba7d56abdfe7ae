//! Anycast root-server routing simulator
//!
//! Builds the distance-threshold graph over the built-in Asian root-server
//! registry, routes one query with every algorithm and prints the
//! comparison. Optionally writes the graph plus the Dijkstra path as JSON
//! for an external renderer.

use anycast_routing::config::SimulationConfig;
use anycast_routing::coordinates::{NodeId, NodeRegistry};
use anycast_routing::graph::NetworkGraph;
use anycast_routing::harness::{ComparisonHarness, ComparisonReport};
use anycast_routing::latency::FactorRange;
use anycast_routing::pathfinding::Algorithm;
use anycast_routing::telemetry;
use anycast_routing::GeoCoordinate;
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::Write;
use tracing::info;

const ROOT_SERVERS: [(&str, f64, f64); 20] = [
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

fn root_server_registry() -> NodeRegistry {
    ROOT_SERVERS
        .iter()
        .filter_map(|&(name, lat, lon)| GeoCoordinate::new(lat, lon).map(|c| (NodeId::new(name), c)))
        .collect()
}

/// Command-line options layered over a [`SimulationConfig`]
struct Options {
    config: SimulationConfig,
    source: String,
    target: String,
    export_file: Option<String>,
    report_file: Option<String>,
    json_logs: bool,
}

#[derive(Serialize)]
struct SimulationSummary<'a> {
    timestamp: String,
    config: &'a SimulationConfig,
    report: &'a ComparisonReport,
}

fn print_usage() {
    println!("Usage: simulator [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config FILE     JSON configuration file (flags below override it)");
    println!("  -s, --source NAME     Source server (default: \"Beijing (F-Root)\")");
    println!("  -t, --target NAME     Target server (default: \"Colombo (I-Root)\")");
    println!("      --threshold KM    Link distance threshold in km (default: 2000)");
    println!("      --seed NUM        Random seed for latency factors (default: 42)");
    println!("      --dynamic         Enable weather and congestion factors");
    println!("      --downtime P      Per-link downtime probability (default: 0)");
    println!("      --loss P          Per-hop packet loss probability (default: 0.01)");
    println!("      --budget-ms MS    Per-algorithm time budget");
    println!("      --parallel        Run the algorithms concurrently");
    println!("      --export FILE     Write graph and Dijkstra path as JSON");
    println!("  -o, --output FILE     Write the comparison report as JSON");
    println!("      --json-logs       Emit logs as JSON");
    println!("      --list            List the built-in servers");
    println!("  -h, --help            Show this help");
}

/// Parse arguments; `Ok(None)` means the program should exit quietly
fn parse_args(args: &[String]) -> Result<Option<Options>, Box<dyn Error>> {
    // Load the config file first so flags can override it regardless of order
    let mut config = match args.iter().position(|a| a == "--config" || a == "-c") {
        Some(pos) => {
            let path = args.get(pos + 1).ok_or("--config requires a file")?;
            SimulationConfig::from_file(path)?
        }
        None => SimulationConfig::default(),
    };

    let mut options_source = "Beijing (F-Root)".to_string();
    let mut options_target = "Colombo (I-Root)".to_string();
    let mut export_file = None;
    let mut report_file = None;
    let mut json_logs = false;

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match args[i].as_str() {
            "--config" | "-c" => {
                i += 1;
            }
            "--source" | "-s" => {
                if let Some(v) = value {
                    options_source = v.clone();
                    i += 1;
                }
            }
            "--target" | "-t" => {
                if let Some(v) = value {
                    options_target = v.clone();
                    i += 1;
                }
            }
            "--threshold" => {
                if let Some(v) = value {
                    config.threshold_km = v.parse()?;
                    i += 1;
                }
            }
            "--seed" => {
                if let Some(v) = value {
                    config.random_seed = Some(v.parse()?);
                    i += 1;
                }
            }
            "--dynamic" => {
                config.weather_factor_range = Some(FactorRange::weather());
                config.congestion_factor_range = Some(FactorRange::congestion());
            }
            "--downtime" => {
                if let Some(v) = value {
                    config.downtime_probability = v.parse()?;
                    i += 1;
                }
            }
            "--loss" => {
                if let Some(v) = value {
                    config.per_hop_loss_probability = v.parse()?;
                    i += 1;
                }
            }
            "--budget-ms" => {
                if let Some(v) = value {
                    config.time_budget_ms = Some(v.parse()?);
                    i += 1;
                }
            }
            "--parallel" => {
                config.parallel = true;
            }
            "--export" => {
                if let Some(v) = value {
                    export_file = Some(v.clone());
                    i += 1;
                }
            }
            "--output" | "-o" => {
                if let Some(v) = value {
                    report_file = Some(v.clone());
                    i += 1;
                }
            }
            "--json-logs" => {
                json_logs = true;
            }
            "--list" => {
                for (name, lat, lon) in ROOT_SERVERS {
                    println!("{:<24} {:>10.4} {:>10.4}", name, lat, lon);
                }
                return Ok(None);
            }
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            other => {
                eprintln!("Ignoring unknown argument: {}", other);
            }
        }
        i += 1;
    }

    config.validate()?;

    Ok(Some(Options {
        config,
        source: options_source,
        target: options_target,
        export_file,
        report_file,
        json_logs,
    }))
}

fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn run(options: Options) -> Result<(), Box<dyn Error>> {
    let config = &options.config;

    println!("Configuration:");
    println!("  Threshold:     {} km", config.threshold_km);
    println!("  Latency/km:    {}", config.latency_per_km);
    println!(
        "  Dynamic:       {}",
        config.weather_factor_range.is_some() || config.congestion_factor_range.is_some()
    );
    println!("  Downtime:      {}", config.downtime_probability);
    println!("  Loss/hop:      {}", config.per_hop_loss_probability);
    match config.random_seed {
        Some(seed) => println!("  Seed:          {}", seed),
        None => println!("  Seed:          (entropy)"),
    }
    println!();

    let registry = root_server_registry();
    let model = config.latency_model()?;
    let mut factors = config.factor_source();
    let graph = NetworkGraph::build_with_model(&registry, config.threshold_km, &model, &mut factors)?;

    let source = NodeId::new(options.source.as_str());
    let target = NodeId::new(options.target.as_str());
    for id in [&source, &target] {
        if !graph.contains(id) {
            return Err(format!("unknown server '{}' (use --list)", id).into());
        }
    }

    let harness = ComparisonHarness::new(config.harness_config()?);
    let report = harness.run(&graph, &source, &target);
    println!("{}", report);

    if let Some(path) = &options.export_file {
        let route = report.entry(Algorithm::Dijkstra).and_then(|e| e.path());
        write_json(path, &graph.export(route))?;
        println!("✓ Graph exported to: {}", path);
    }

    if let Some(path) = &options.report_file {
        let summary = SimulationSummary {
            timestamp: chrono::Utc::now().to_rfc3339(),
            config,
            report: &report,
        };
        write_json(path, &summary)?;
        println!("✓ Report saved to: {}", path);
    }

    info!(consistent = report.validation.is_consistent(), "Simulation complete");
    Ok(())
}

fn main() {
    println!("Anycast Root-Server Routing Simulator");
    println!("=====================================\n");

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(Some(options)) => options,
        Ok(None) => return,
        Err(e) => {
            eprintln!("✗ {}", e);
            std::process::exit(2);
        }
    };

    telemetry::init_tracing(options.json_logs);

    if let Err(e) = run(options) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}
