//! Neuro Racer CLI - Evolve car controllers headlessly from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use neuro_racer::{
    compute::evolution::{GenerationReport, RaceEngine},
    schema::RaceConfig,
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [generations]", args[0]);
        eprintln!();
        eprintln!("Evolve neural network car controllers on a procedural track.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to race configuration file");
        eprintln!("  generations  Number of generations (default: config limit, else 10)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let mut config = RaceConfig::from_json_file(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    let generations = match args.get(2) {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            eprintln!("Invalid generation count: {}", arg);
            std::process::exit(1);
        }),
        None => config.evolution.max_generations.unwrap_or(10),
    };
    config.evolution.max_generations = Some(generations);
    // Nobody acknowledges generations in headless mode.
    config.rollout.await_release = false;

    println!("Neuro Racer");
    println!("===========");
    println!(
        "Track: {}x{} {:?}",
        config.track.width, config.track.height, config.track.shape
    );
    println!(
        "Sensor: {} rays, sight {}",
        config.sensor.rays, config.sensor.sight_distance
    );
    for (i, group) in config.groups.iter().enumerate() {
        println!("Group {}: {} agents, layers {:?}", i, group.size, config.topology(group));
    }
    println!("Generations: {}", generations);
    println!();

    let mut engine = RaceEngine::new(config).unwrap_or_else(|e| {
        eprintln!("Error creating engine: {}", e);
        std::process::exit(1);
    });

    let start = Instant::now();
    let summary = engine.run_with_callback(print_report);
    let elapsed = start.elapsed();

    println!();
    println!("Stopped after {} generations ({:?})", summary.generations, summary.stop_reason);
    match summary.best_finish_time {
        Some(t) => println!("Best lap: {:.2}s", t),
        None => println!("No agent completed a lap"),
    }
    println!(
        "Time: {:.2}s ({:.2} generations/s)",
        elapsed.as_secs_f32(),
        summary.generations as f32 / elapsed.as_secs_f32()
    );
}

fn print_report(report: &GenerationReport) {
    for group in &report.groups {
        let best = match group.best_finish_time {
            Some(t) => format!("lap {:.2}s", t),
            None => format!("progress {:.3}", group.best_progress.unwrap_or(0.0)),
        };
        println!(
            "  Generation {} group {}: finished={} crashed={} best {}",
            report.generation, group.group, group.finished, group.crashed, best
        );
    }
}

fn print_example_config() {
    let config = RaceConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            std::process::exit(1);
        }
    }
}
