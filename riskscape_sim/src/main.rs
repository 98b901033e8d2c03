//! Riskscape headless simulator CLI
//!
//! Runs interaction scenarios against a seeded synthetic backend.

use clap::Parser;
use riskscape_core::EngineConfig;
use riskscape_sim::{ScenarioId, ScenarioResult, ScenarioRunner};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Riskscape deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "riskscape-sim")]
#[command(about = "Run deterministic interaction scenarios for the Riskscape engine", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (tour, bucket_scrub, empty_targets, fetch_failure,
    /// asset_fallback, counterfactual, pause_resume, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Entities in the synthetic dataset
    #[arg(short, long, default_value = "200")]
    entities: usize,

    /// Time buckets in the synthetic dataset
    #[arg(short, long, default_value = "6")]
    buckets: u32,

    /// Maximum simulated duration per scenario in seconds
    #[arg(short, long, default_value = "120")]
    duration: f32,

    /// Engine configuration JSON (defaults when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the effective engine configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Export recorded frames to a JSON file (single scenario only)
    #[arg(long)]
    export: Option<String>,

    /// Record every Nth frame when exporting
    #[arg(long, default_value = "6")]
    export_every: u64,

    /// Stream frames to a Rerun viewer (needs the visualization feature)
    #[arg(long)]
    visualize: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => EngineConfig::from_json_file(path).map_err(|e| format!("{}: {}", path, e)),
        None => Ok(EngineConfig::default()),
    }
}

fn report(result: &ScenarioResult) {
    if result.passed {
        info!(
            "✓ {} (seed={}) PASSED in {} frames",
            result.scenario.name(),
            result.seed,
            result.frames
        );
    } else {
        error!(
            "✗ {} (seed={}) FAILED: {}",
            result.scenario.name(),
            result.seed,
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid config {}", e);
            return ExitCode::FAILURE;
        }
    };
    if args.print_config {
        return match config.to_json_pretty() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    if !args.json {
        info!("Riskscape Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        match args.scenario.parse() {
            Ok(scenario) => vec![scenario],
            Err(e) => {
                eprintln!("Error: {}", e);
                let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
                eprintln!("Available scenarios: {}, all", names.join(", "));
                return ExitCode::FAILURE;
            }
        }
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        args.seed
    };

    let runner_for = |seed: u64| {
        ScenarioRunner::new(seed)
            .with_entities(args.entities)
            .with_buckets(args.buckets)
            .with_duration(args.duration)
            .with_config(config.clone())
            .with_visualizer(args.visualize)
    };

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            return ExitCode::FAILURE;
        }
        info!("Running with export to: {}", export_path);

        return match runner_for(base_seed).run_with_export(scenarios[0], args.export_every, export_path) {
            Ok(result) => {
                report(&result);
                if result.passed {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                error!("Failed to write export: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let runner = runner_for(base_seed.wrapping_add(seed_offset as u64));
        for scenario in &scenarios {
            let result = runner.run(*scenario);
            if !args.json {
                report(&result);
            }
            all_results.push(result);
        }
    }

    let total = all_results.len();
    let failed: Vec<&ScenarioResult> = all_results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "frames": r.frames,
                    "time_secs": r.final_time_secs,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Error: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);
            for result in &failed {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    if failed.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
