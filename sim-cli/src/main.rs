use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use serde::Serialize;
use sim_config::{load_default_world_config, load_world_config_from_path};
use sim_core::Simulation;
use sim_types::{MetricsSnapshot, PolicyKind, Tier, TierCounts, WorldConfig};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sim-cli")]
#[command(about = "Waste-relay robot mission simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs one world and prints a summary of the final turn.
    Run {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 100)]
        turns: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Step {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        turns: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = false)]
        print_state: bool,
    },
    /// Writes one JSON snapshot per turn.
    Export {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 50)]
        turns: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Runs independent seeds in parallel and averages waste on the grid per turn.
    Batch {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        runs: u32,
        #[arg(long, default_value_t = 200)]
        turns: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Uses the random baseline policy instead of coordinated deliberation.
        #[arg(long, default_value_t = false)]
        random_agents: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    turns: u32,
    seed: u64,
    final_turn: u64,
    robots: usize,
    waste_on_grid: TierCounts,
    waste_carried: TierCounts,
    disposed: TierCounts,
    handoffs_total: u64,
}

#[derive(Debug, Serialize)]
struct StepSummary {
    turns: u32,
    final_turn: u64,
    last_metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize, PartialEq)]
struct MeanWaste {
    green: f64,
    yellow: f64,
    red: f64,
}

#[derive(Debug, Serialize)]
struct BatchSummary {
    runs: u32,
    turns: u32,
    policy: PolicyKind,
    elapsed_ms: u128,
    /// Entry `t` is the state after `t` turns; entry 0 is the initial world.
    mean_waste_per_turn: Vec<MeanWaste>,
    mean_disposed: f64,
    min_disposed: u64,
    max_disposed: u64,
}

/// Waste on the grid after every turn of one run, starting with the initial world.
struct RunTrace {
    waste_per_turn: Vec<TierCounts>,
    disposed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sim_cli=info,sim_core=warn".to_owned()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            turns,
            seed,
            format,
            out,
        } => run_command(config, turns, seed, format, out),
        Commands::Step {
            config,
            turns,
            seed,
            print_state,
        } => step_command(config, turns, seed, print_state),
        Commands::Export {
            config,
            turns,
            seed,
            out,
        } => export_command(config, turns, seed, out),
        Commands::Batch {
            config,
            runs,
            turns,
            seed,
            random_agents,
            format,
            out,
        } => batch_command(config, runs, turns, seed, random_agents, format, out),
    }
}

fn run_command(
    config_path: Option<PathBuf>,
    turns: u32,
    seed: u64,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let mut sim = Simulation::new(cfg, seed)?;
    info!(turns, seed, robots = sim.robots().len(), "starting run");
    let handoffs_total: u64 = sim
        .step_n(turns)
        .iter()
        .map(|delta| delta.metrics.handoffs_last_turn)
        .sum();
    let snapshot = sim.snapshot();
    info!(final_turn = snapshot.turn, "run complete");

    let summary = RunSummary {
        turns,
        seed,
        final_turn: snapshot.turn,
        robots: snapshot.robots.len(),
        waste_on_grid: snapshot.metrics.waste_on_grid,
        waste_carried: snapshot.metrics.waste_carried,
        disposed: snapshot.metrics.disposed,
        handoffs_total,
    };

    let text = match format {
        OutputFormat::Pretty => format!(
            "turns={} seed={} final_turn={} robots={} on_grid(g/y/r)={}/{}/{} carried={} disposed={} handoffs={}",
            summary.turns,
            summary.seed,
            summary.final_turn,
            summary.robots,
            summary.waste_on_grid.green,
            summary.waste_on_grid.yellow,
            summary.waste_on_grid.red,
            summary.waste_carried.total(),
            summary.disposed.total(),
            summary.handoffs_total
        ),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    write_output(text, out)
}

fn step_command(
    config_path: Option<PathBuf>,
    turns: u32,
    seed: u64,
    print_state: bool,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let mut sim = Simulation::new(cfg, seed)?;
    sim.step_n(turns.max(1));
    let snapshot = sim.snapshot();

    let summary = StepSummary {
        turns: turns.max(1),
        final_turn: snapshot.turn,
        last_metrics: snapshot.metrics.clone(),
    };

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if print_state {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    }
    Ok(())
}

fn export_command(
    config_path: Option<PathBuf>,
    turns: u32,
    seed: u64,
    out: PathBuf,
) -> Result<()> {
    let cfg = load_config(config_path)?;
    let mut sim = Simulation::new(cfg, seed)?;
    let lines = sim.export_trace_jsonl(turns);

    fs::write(&out, lines.join("\n"))
        .with_context(|| format!("failed writing export to {}", out.display()))?;
    println!("exported trace to {}", out.display());
    Ok(())
}

fn batch_command(
    config_path: Option<PathBuf>,
    runs: u32,
    turns: u32,
    seed: u64,
    random_agents: bool,
    format: OutputFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    if random_agents {
        cfg.policy = PolicyKind::Random;
    }
    let runs = runs.max(1);
    info!(runs, turns, policy = ?cfg.policy, "starting batch");

    let start = Instant::now();
    let traces = (0..runs)
        .into_par_iter()
        .map(|index| trace_run(&cfg, run_seed(seed, index), turns))
        .collect::<Result<Vec<_>>>()?;
    let elapsed = start.elapsed();

    let disposed: Vec<u64> = traces.iter().map(|trace| trace.disposed).collect();
    let summary = BatchSummary {
        runs,
        turns,
        policy: cfg.policy,
        elapsed_ms: elapsed.as_millis(),
        mean_waste_per_turn: mean_waste_per_turn(&traces),
        mean_disposed: disposed.iter().sum::<u64>() as f64 / disposed.len() as f64,
        min_disposed: disposed.iter().copied().min().unwrap_or(0),
        max_disposed: disposed.iter().copied().max().unwrap_or(0),
    };
    info!(elapsed_ms = summary.elapsed_ms, "batch complete");

    let text = match format {
        OutputFormat::Pretty => {
            let mut text = format!(
                "runs={} turns={} policy={:?} disposed mean={:.2} min={} max={}\n",
                summary.runs,
                summary.turns,
                summary.policy,
                summary.mean_disposed,
                summary.min_disposed,
                summary.max_disposed
            );
            for (turn, mean) in summary.mean_waste_per_turn.iter().enumerate() {
                text.push_str(&format!(
                    "turn {turn:>5}: green={:.2} yellow={:.2} red={:.2}\n",
                    mean.green, mean.yellow, mean.red
                ));
            }
            text
        }
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    write_output(text, out)
}

fn trace_run(cfg: &WorldConfig, seed: u64, turns: u32) -> Result<RunTrace> {
    let mut sim = Simulation::new(cfg.clone(), seed)?;
    let mut waste_per_turn = Vec::with_capacity(turns as usize + 1);
    waste_per_turn.push(sim.metrics().waste_on_grid);
    for _ in 0..turns {
        waste_per_turn.push(sim.step().metrics.waste_on_grid);
    }
    Ok(RunTrace {
        waste_per_turn,
        disposed: sim.metrics().disposed.total(),
    })
}

fn mean_waste_per_turn(traces: &[RunTrace]) -> Vec<MeanWaste> {
    let Some(len) = traces.iter().map(|trace| trace.waste_per_turn.len()).min() else {
        return Vec::new();
    };
    let runs = traces.len() as f64;
    (0..len)
        .map(|turn| {
            let mean = |tier: Tier| {
                traces
                    .iter()
                    .map(|trace| trace.waste_per_turn[turn].get(tier))
                    .sum::<u64>() as f64
                    / runs
            };
            MeanWaste {
                green: mean(Tier::Green),
                yellow: mean(Tier::Yellow),
                red: mean(Tier::Red),
            }
        })
        .collect()
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn run_seed(batch_seed: u64, run_index: u32) -> u64 {
    splitmix64(batch_seed ^ (run_index as u64).wrapping_mul(0x9E37_79B9))
}

fn load_config(path: Option<PathBuf>) -> Result<WorldConfig> {
    match path {
        Some(path) => load_world_config_from_path(&path),
        None => load_default_world_config(),
    }
}

fn write_output(text: String, out: Option<PathBuf>) -> Result<()> {
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating output directory {}", parent.display())
            })?;
        }
        fs::write(&path, text).with_context(|| format!("failed writing {}", path.display()))?;
        println!("wrote output to {}", path.display());
    } else {
        println!("{text}");
    }
    Ok(())
}
