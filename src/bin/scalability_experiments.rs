//! Scalability experiments
//!
//! Runs Dijkstra, Bellman-Ford and A* on random geometric graphs of
//! increasing size and records timing and agreement per size.

use anycast_routing::pathfinding::Algorithm;
use anycast_routing::scalability::{ScalabilityConfig, ScalabilitySummary, ScalabilityTester};
use anycast_routing::telemetry;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::time::Instant;

#[derive(Serialize)]
struct ExperimentOutput {
    timestamp: String,
    total_time_secs: f64,
    config: ScalabilityConfig,
    summary: ScalabilitySummary,
}

fn main() {
    println!("Routing Scalability Experiments");
    println!("===============================\n");

    let args: Vec<String> = std::env::args().collect();
    let mut config = ScalabilityConfig::default();
    let mut output_file = "scalability_results.json".to_string();
    let mut json_logs = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sizes" => {
                if i + 1 < args.len() {
                    config.sizes = args[i + 1]
                        .split(',')
                        .filter_map(|s| s.trim().parse().ok())
                        .collect();
                    i += 1;
                }
            }
            "--trials" => {
                if i + 1 < args.len() {
                    config.trials_per_size = args[i + 1].parse().unwrap_or(1);
                    i += 1;
                }
            }
            "--radius" => {
                if i + 1 < args.len() {
                    config.radius = args[i + 1].parse().unwrap_or(0.3);
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    config.seed = args[i + 1].parse().unwrap_or(42);
                    i += 1;
                }
            }
            "--parallel" => {
                config.parallel = true;
            }
            "--json-logs" => {
                json_logs = true;
            }
            "--output" | "-o" => {
                if i + 1 < args.len() {
                    output_file = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: scalability_experiments [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --sizes SIZES     Comma-separated graph sizes (default: 10,50,100,200)");
                println!("  --trials NUM      Random graphs per size (default: 1)");
                println!("  --radius R        Connection radius in the unit square (default: 0.3)");
                println!("  --seed NUM        Random seed (default: 42)");
                println!("  --parallel        Run trials on all cores");
                println!("  --json-logs       Emit logs as JSON");
                println!("  -o, --output FILE Output JSON file (default: scalability_results.json)");
                println!("  -h, --help        Show this help");
                return;
            }
            _ => {}
        }
        i += 1;
    }

    telemetry::init_tracing(json_logs);

    println!("Configuration:");
    println!("  Sizes:         {:?}", config.sizes);
    println!("  Trials/Size:   {}", config.trials_per_size);
    println!("  Radius:        {}", config.radius);
    println!("  Seed:          {}", config.seed);
    println!("  Parallel:      {}", config.parallel);
    println!("  Output:        {}", output_file);

    let tester = match ScalabilityTester::new(config.clone()) {
        Ok(tester) => tester,
        Err(e) => {
            eprintln!("\n✗ Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let total_start = Instant::now();
    let summary = match tester.run() {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("\n✗ Experiment failed: {}", e);
            std::process::exit(1);
        }
    };
    let total_time = total_start.elapsed();

    println!("\n=== Scalability Summary ===");
    println!("Total experiment time: {:.2} seconds", total_time.as_secs_f64());
    println!();

    print!("{:<10} {:<12} {:<10}", "Size", "Avg Edges", "Degree");
    for algorithm in Algorithm::ALL {
        print!(" {:<16}", format!("{} (μs)", algorithm));
    }
    println!();
    println!("{}", "-".repeat(34 + 17 * Algorithm::ALL.len()));

    for size in &summary.sizes {
        print!("{:<10} {:<12.1} {:<10.2}", size.size, size.avg_edges, size.avg_degree);
        for (_, elapsed) in &size.avg_elapsed_us {
            print!(" {:<16.2}", elapsed);
        }
        println!();
    }

    println!();
    for size in &summary.sizes {
        print!("{}", size);
    }

    let inconsistent = summary.samples.iter().filter(|s| !s.consistent).count();
    if inconsistent == 0 {
        println!("\n✓ All algorithms agreed on every trial");
    } else {
        println!("\n✗ {} trial(s) with disagreeing algorithms", inconsistent);
    }

    let output = ExperimentOutput {
        timestamp: chrono::Utc::now().to_rfc3339(),
        total_time_secs: total_time.as_secs_f64(),
        config,
        summary,
    };

    let saved = serde_json::to_string_pretty(&output)
        .map_err(|e| e.to_string())
        .and_then(|json| {
            File::create(&output_file)
                .and_then(|mut file| file.write_all(json.as_bytes()))
                .map_err(|e| e.to_string())
        });
    match saved {
        Ok(()) => println!("\n✓ Results saved to: {}", output_file),
        Err(e) => eprintln!("\n✗ Failed to save results: {}", e),
    }

    println!("\n✓ Scalability experiments complete!");
}
