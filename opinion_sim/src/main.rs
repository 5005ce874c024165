//! Opinion dynamics simulator CLI
//!
//! Runs voter / Sznajd dynamics over named topologies until consensus.

use clap::Parser;
use opinion_core::Model;
use opinion_sim::{
    ScenarioId, ScenarioResult, ScenarioRunner, SimConfig, SimError, SimWorld, SNAPSHOT_LABEL,
};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Opinion dynamics simulation CLI
#[derive(Parser, Debug)]
#[command(name = "opinion-sim")]
#[command(about = "Run voter and Sznajd opinion dynamics on generated graphs", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of nodes
    #[arg(short, long)]
    nodes: Option<usize>,

    /// Update rule (voter, sznajd)
    #[arg(short, long)]
    model: Option<Model>,

    /// Scenario to run (complete, ring, chain, star, lattice, proximity, spaced, all)
    #[arg(short = 'S', long)]
    scenario: Option<String>,

    /// JSON config file; flags override its values
    #[arg(short, long)]
    config: Option<String>,

    /// Tick limit per run (0 = until consensus)
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Number of consecutive seeds to run
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for scripting
    #[arg(long)]
    json: bool,

    /// Export opinion transitions to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Save the final graph snapshot
    #[arg(long)]
    save: Option<String>,

    /// Run on a saved graph snapshot instead of generating one
    #[arg(long)]
    load: Option<String>,
}

impl Args {
    /// Layers CLI flags over the config file (or defaults).
    fn config(&self) -> Result<SimConfig, SimError> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = if seed == 0 { seed_from_time() } else { seed };
        }
        if let Some(nodes) = self.nodes {
            config.population = nodes;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks = max_ticks;
        }

        config.validate()?;
        Ok(config)
    }
}

fn seed_from_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}

/// Runs one scenario, honoring --load, --export and --save.
fn run_single(args: &Args, config: SimConfig, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
    let runner = ScenarioRunner::new(config.seed, config.population).with_config(config.clone());

    let (scenario, mut world) = match &args.load {
        Some(path) => {
            info!("Loading snapshot from {}", path);
            (None, SimWorld::from_snapshot(config, path)?)
        }
        None => (
            Some(scenario),
            SimWorld::new(SimConfig {
                topology: scenario,
                ..config
            })?,
        ),
    };

    let (result, log) = runner.record(scenario, &mut world);

    if let Some(path) = &args.export {
        match log.write_to_file(path) {
            Ok(()) => info!("Exported {} transitions to {}", log.frames.len(), path),
            Err(e) => error!("Failed to write export: {:?}", e),
        }
    }

    if let Some(path) = &args.save {
        world.save(path)?;
        info!("Saved graph snapshot to {}", path);
    }

    Ok(result)
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
    }

    let config = args.config().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    if !args.json {
        info!("Opinion Dynamics Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = match args.scenario.as_deref() {
        Some("all") => ScenarioId::all(),
        Some(name) => vec![name.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: complete, ring, chain, star, lattice, proximity, spaced, all");
            std::process::exit(1);
        })],
        None => vec![config.topology],
    };

    let single = args.export.is_some() || args.save.is_some() || args.load.is_some();
    if single && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export, --save and --load run a single scenario and seed");
        std::process::exit(1);
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds.max(1) {
        let seed = config.seed.wrapping_add(seed_offset as u64);
        let seeded = SimConfig {
            seed,
            ..config.clone()
        };

        for scenario in &scenarios {
            let name = if args.load.is_some() { SNAPSHOT_LABEL } else { scenario.name() };
            let outcome = if single {
                run_single(&args, seeded.clone(), *scenario)
            } else {
                ScenarioRunner::new(seed, seeded.population)
                    .with_config(seeded.clone())
                    .run(*scenario)
            };

            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} (seed={}) error: {}", name, seed, e);
                    std::process::exit(1);
                }
            };

            if !args.json {
                match &result.failure_reason {
                    None => info!(
                        "✓ {} (seed={}) consensus on {} after {} ticks ({:.1}s)",
                        result.name(),
                        seed,
                        result.final_share >= 0.5,
                        result.total_ticks,
                        result.final_time_secs
                    ),
                    Some(reason) => info!(
                        "· {} (seed={}) {} (share={:.2})",
                        result.name(),
                        seed,
                        reason,
                        result.final_share
                    ),
                }
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let converged = all_results.iter().filter(|r| r.reached_consensus).count();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "converged": converged,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.name(),
                    "model": r.model.name(),
                    "seed": r.seed,
                    "reached_consensus": r.reached_consensus,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "final_share": r.final_share,
                    "flips": r.metrics.flips,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("{}/{} runs reached consensus", converged, total);
    }
}
