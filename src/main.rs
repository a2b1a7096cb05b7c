//  _        __
// (_)_ __  / _|_ __ __ _ _ __   __ ___   __
// | | '_ \| |_| '__/ _` | '_ \ / _` \ \ / /
// | | | | |  _| | | (_| | | | | (_| |\ V /
// |_|_| |_|_| |_|  \__,_|_| |_|\__,_| \_/

// A grid of agents that wander between infrastructure regions, optimizing what they reach.
// The CLI runs it on a clock, or answers one-off status, routing and targeting queries.

// Copyright 2025 The infranav authors

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use infranav::metrics::analyzer;
use infranav::metrics::logger::{self, MetricsLogger};
use infranav::prelude::*;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::interval;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation in real time and save results
    Run {
        #[arg(short, long, default_value_t = 30)]
        duration: u64,
        #[arg(short, long)]
        tick_ms: Option<u64>,
        #[arg(short, long)]
        grid: Option<u32>,
        #[arg(short, long)]
        config: Option<String>,
        #[arg(short, long, default_value = "results")]
        out: String,
    },

    /// Step the simulation without a clock and print the status snapshot
    Status {
        #[arg(short = 'n', long, default_value_t = 100)]
        ticks: u64,
        #[arg(short, long)]
        config: Option<String>,
    },

    Route {
        #[arg(short, long, default_value = "web")]
        kind: String,
        /// User location as x,y
        #[arg(short, long)]
        at: Option<String>,
        #[arg(short, long, default_value_t = 0)]
        warmup: u64,
        #[arg(short, long)]
        config: Option<String>,
    },

    Target {
        #[arg(short, long, default_value = "optimization")]
        kind: String,
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long)]
        config: Option<String>,
    },

    Regions {
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run { duration, tick_ms, grid, config, out } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(ms) = tick_ms {
                config = config.with_tick_period(Duration::from_millis(ms));
            }
            if let Some(size) = grid {
                config = config.with_grid_size(size);
            }
            run_simulation(config, duration, &out).await?;
        }

        Commands::Status { ticks, config } => {
            let mut engine = Engine::new(load_config(config.as_deref())?)?;
            step(&mut engine, ticks);
            println!("{}", serde_json::to_string_pretty(&engine.status())?);
        }

        Commands::Route { kind, at, warmup, config } => {
            let mut engine = Engine::new(load_config(config.as_deref())?)?;
            step(&mut engine, warmup);
            let location = at.as_deref().map(parse_position).transpose()?;
            let route = engine.optimal_route(&kind, location)?;
            info!("{}", route.recommendation);
            println!("{}", serde_json::to_string_pretty(&route)?);
        }

        Commands::Target { kind, region, config } => {
            let mut engine = Engine::new(load_config(config.as_deref())?)?;
            let region = region.map(RegionId::new);
            let placement = engine.add_target(&kind, region.as_ref())?;
            println!("{}", serde_json::to_string_pretty(&placement)?);
        }

        Commands::Regions { config } => {
            let engine = Engine::new(load_config(config.as_deref())?)?;
            println!("\nConfigured Regions");
            for region in engine.status().regions {
                let neighbors: Vec<&str> = region.neighbor_ids.iter().map(|id| id.as_str()).collect();
                println!(
                    "  - {:<14} ({:>2}, {:>2})  latency {:>6.1} ms  load {:>5.1}%  neighbors: {}",
                    region.id.as_str(),
                    region.position.x,
                    region.position.y,
                    region.latency,
                    region.load,
                    neighbors.join(", ")
                );
            }
            println!();
        }
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());
    Ok(())
}

fn load_config(path: Option<&str>) -> Result<SimConfig> {
    match path {
        Some(path) => SimConfig::from_json_file(path),
        None => Ok(SimConfig::default()),
    }
}

fn step(engine: &mut Engine, ticks: u64) {
    engine.start();
    for _ in 0..ticks {
        engine.tick();
    }
    engine.stop();
}

fn parse_position(s: &str) -> Result<Position> {
    let (x, y) = s
        .split_once(',')
        .with_context(|| format!("expected x,y but got '{}'", s))?;
    Ok(Position::new(
        x.trim().parse().with_context(|| format!("bad x in '{}'", s))?,
        y.trim().parse().with_context(|| format!("bad y in '{}'", s))?,
    ))
}

async fn run_simulation(config: SimConfig, duration: u64, out: &str) -> Result<()> {
    info!("Starting simulation: {}", config.name);
    info!("Grid: {}x{}, tick period: {:?}", config.grid_size, config.grid_size, config.tick_period());
    info!("Regions: {}, Agents: {}", config.regions.len(), config.agents.len());

    let name = config.name.clone();
    let mut navigator = Navigator::new(config)?;
    let metrics = navigator.metrics();

    let mut events = navigator.subscribe();
    let feed = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(
                    "Agent {} ({}) optimized {} for {} points at tick {}",
                    event.agent_id,
                    event.agent_kind.name(),
                    event.region_id,
                    event.points,
                    event.tick
                ),
                Err(RecvError::Lagged(skipped)) => warn!("Event feed lagged, {} events skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    navigator.save_snapshot();
    navigator.start();

    let pb = ProgressBar::new(duration);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.orange/yellow} {pos}/{len}s {msg}")?
            .progress_chars("█▓░"),
    );

    let mut tick = interval(Duration::from_secs(1));
    tick.tick().await;
    for _ in 0..duration {
        tick.tick().await;
        let status = navigator.save_snapshot();
        pb.inc(1);
        pb.set_message(format!(
            "Score: {} | Completions: {} | Latency: {:.1}ms",
            status.total_score,
            metrics.completions(),
            status.average_latency
        ));
    }

    pb.finish_with_message("Simulation complete");

    info!("Shutting down simulation..");
    navigator.stop().await;
    navigator.save_snapshot();
    feed.abort();

    save_results(&metrics.get_snapshots(), &name, out)
}

fn save_results(snapshots: &[MetricsSnapshot], name: &str, out: &str) -> Result<()> {
    let stamp = logger::run_stamp(&chrono::Local::now());

    let mut writer = MetricsLogger::for_run(out, name, &stamp)?;
    writer.log_batch(snapshots)?;
    info!("Results saved to: {}", writer.path().display());

    let report = analyzer::analyze(snapshots, name);
    let json_path = logger::run_path(out, name, &stamp, "_analysis.json");
    std::fs::write(&json_path, serde_json::to_string_pretty(&report)?)
        .with_context(|| format!("writing {}", json_path.display()))?;
    info!("Analysis saved to: {}", json_path.display());

    info!("Ticks: {}", report.ticks);
    info!("Final score: {} ({:.2}/tick)", report.final_score, report.score_per_tick);
    info!("Completions: {}, collisions: {}", report.completions, report.collisions);
    info!("Latency reduction: {:.2}%", report.latency_reduction_pct);
    info!("Load reduction: {:.2}%", report.load_reduction_pct);

    Ok(())
}
