use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecosim_core::config::SimConfig;
use ecosim_core::rng::derive_scenario_rng;
use ecosim_core::scenario::ScenarioConfig;
use ecosim_core::world::World;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const WARMUP_STEPS: usize = 10;
const BENCHMARK_STEPS: usize = 200;

#[derive(Parser)]
#[command(name = "ecosim")]
#[command(about = "Predator-prey ecosystem simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single simulation from a config file
    Run {
        /// Path to run config file (JSON)
        #[arg(long)]
        config: PathBuf,

        /// Output directory for results (optional)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Number of simulation steps to run
        #[arg(long, default_value_t = 10000)]
        steps: usize,

        /// Record run metrics every N steps
        #[arg(long, default_value_t = 100)]
        sample_every: usize,

        /// Also write the final quadtree partition (requires --out)
        #[arg(long)]
        export_index: bool,
    },
    /// Run the performance benchmark suite
    Benchmark,
    /// Dump the default run configuration to stdout
    DumpDefaultConfig,
}

/// Simulation parameters plus the initial population layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct RunConfig {
    #[serde(default)]
    sim: SimConfig,
    #[serde(default)]
    scenario: ScenarioConfig,
}

fn build_world(run: &RunConfig) -> Result<World> {
    run.sim.validate().context("simulation config validation error")?;
    let mut rng = derive_scenario_rng(run.sim.seed);
    let (agents, plants) = run
        .scenario
        .generate(&run.sim, &mut rng)
        .context("scenario config validation error")?;
    World::new(run.sim.clone(), agents, plants).context("failed to initialize world")
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn run_benchmark(num_animals: usize, num_plants: usize) -> Result<()> {
    let run = RunConfig {
        scenario: ScenarioConfig {
            num_animals,
            num_plants,
            spawn_margin: 50.0,
            ..ScenarioConfig::default()
        },
        ..RunConfig::default()
    };
    let mut world = build_world(&run)?;

    for _ in 0..WARMUP_STEPS {
        world.step();
    }

    let mut total_spatial = 0u64;
    let mut total_behavior = 0u64;
    let mut total_perception = 0u64;
    let mut total_time = 0u64;
    for _ in 0..BENCHMARK_STEPS {
        let timings = world.step();
        total_spatial += timings.spatial_build_us;
        total_behavior += timings.behavior_us;
        total_perception += timings.perception_us;
        total_time += timings.total_us;
    }

    let per_step = |total: u64| total as f64 / BENCHMARK_STEPS as f64;
    let avg_step_us = per_step(total_time);
    let steps_per_sec = if avg_step_us > 0.0 {
        1_000_000.0 / avg_step_us
    } else {
        f64::INFINITY
    };

    println!("--- {num_animals} animals, {num_plants} plants ---");
    println!("  Avg step:      {avg_step_us:.0} us ({steps_per_sec:.1} steps/sec)");
    println!(
        "  Breakdown:     spatial={:.0} us, behavior={:.0} us, perception={:.0} us",
        per_step(total_spatial),
        per_step(total_behavior),
        per_step(total_perception),
    );
    println!("  Population:    {}", world.agents.len());
    println!();
    Ok(())
}

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = RunConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Benchmark => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p ecosim-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Ecosim Benchmark ===");
            println!("Warmup: {WARMUP_STEPS} steps, Benchmark: {BENCHMARK_STEPS} steps");
            println!();
            for (animals, plants) in [(50, 50), (200, 200), (800, 400)] {
                run_benchmark(animals, plants)?;
            }
        }
        Commands::Run {
            config,
            out,
            steps,
            sample_every,
            export_index,
        } => {
            let file = File::open(&config).context("failed to open config file")?;
            let reader = BufReader::new(file);
            let run: RunConfig =
                serde_json::from_reader(reader).context("failed to parse config")?;
            let mut world = build_world(&run)?;

            info!(config = %config.display(), steps, "starting run");
            let summary = world
                .try_run_experiment(steps, sample_every)
                .context("invalid run length")?;

            if let Some(out_dir) = out {
                std::fs::create_dir_all(&out_dir).context("failed to create output directory")?;
                write_json(&out_dir.join("summary.json"), &summary)?;
                write_json(&out_dir.join("final_snapshot.json"), &world.snapshot())?;
                if export_index {
                    write_json(&out_dir.join("quadtree.json"), &world.index_regions())?;
                }
                println!("Run complete. Results saved to {:?}", out_dir);
            } else {
                if export_index {
                    eprintln!("--export-index has no effect without --out");
                }
                println!(
                    "Run complete. Final population: {} ({} births)",
                    summary.final_population, summary.total_births
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_config_fills_missing_sections_with_defaults() {
        let run: RunConfig =
            serde_json::from_str(r#"{ "sim": { "seed": 7 } }"#).expect("partial config parses");
        assert_eq!(run.sim.seed, 7);
        assert_eq!(run.scenario.num_animals, 50);
        assert_eq!(run.sim.species.len(), 10);
    }

    #[test]
    fn default_run_config_builds_a_world() {
        let world = build_world(&RunConfig::default()).expect("default world");
        assert_eq!(world.agents.len(), 50);
        assert_eq!(world.resources().len(), 50);
    }

    #[test]
    fn invalid_scenario_is_reported() {
        let run = RunConfig {
            scenario: ScenarioConfig {
                species_weights: vec![1],
                ..ScenarioConfig::default()
            },
            ..RunConfig::default()
        };
        let err = build_world(&run).err().expect("mismatched weights rejected");
        assert!(format!("{err:#}").contains("species_weights"));
    }
}
