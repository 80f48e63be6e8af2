//! samatala-sim - Bed leveling simulator
//!
//! Runs YAML scenarios against a simulated printer with a known bed shape,
//! a noisy probe and drifting temperatures, then reports how far the
//! resulting mesh is from the true bed.
//!
//! ```text
//! samatala-sim --scenario scenarios/full_probe.yaml
//! samatala-sim -c configs/sim.yaml -s scenarios/tilt_and_store.yaml --store mesh.bin
//! ```

mod config;
mod error;
mod noise;
mod printer;
mod runner;
mod scenario;
mod surface;

use std::path::Path;

use clap::{Parser, ValueEnum};
use samatala::io::SlotImage;

use crate::config::SimConfig;
use crate::error::Result;
use crate::runner::ScenarioRunner;
use crate::scenario::Scenario;

/// Bed leveling scenario simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Simulator configuration file
    #[arg(short, long, default_value = "configs/sim.yaml")]
    config: String,

    /// Scenario file to run
    #[arg(short, long)]
    scenario: String,

    /// Override the probe noise seed (0 = entropy)
    #[arg(long)]
    seed: Option<u64>,

    /// Print the final mesh in this map format
    #[arg(short, long, value_enum)]
    map_format: Option<MapArg>,

    /// Slot image file; loaded when present and saved after the run
    #[arg(long)]
    store: Option<String>,
}

/// Map layouts selectable from the command line
#[derive(Clone, Copy, Debug, ValueEnum)]
enum MapArg {
    /// Bordered grid with coordinates
    Human,
    /// Tab-separated values
    Csv,
    /// One compact line per row
    Host,
}

impl MapArg {
    /// The matching `T` code
    fn code(self) -> u8 {
        match self {
            MapArg::Human => 0,
            MapArg::Csv => 1,
            MapArg::Host => 2,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    log::info!("Using config: {}", args.config);
    let mut config = SimConfig::load(Path::new(&args.config))?;
    if let Some(seed) = args.seed {
        config.random_seed = seed;
    }
    let scenario = Scenario::load(Path::new(&args.scenario))?;

    let mut runner = match &args.store {
        Some(path) if Path::new(path).exists() => {
            log::info!("Loading slot image {}", path);
            ScenarioRunner::with_image(&config, SlotImage::open(Path::new(path))?)?
        }
        _ => ScenarioRunner::new(&config)?,
    };

    let summary = runner.run(&scenario)?;
    for block in &summary.output {
        println!("{}", block);
    }

    if let Some(format) = args.map_format {
        println!("{}", runner.render_map(format.code()));
    }

    if let Some(path) = &args.store {
        runner.store().save(Path::new(path))?;
        log::info!("Slot image saved to {}", path);
    }

    log::info!(
        "Scenario '{}' finished: {} steps, {} probes ({} failed), {} moves, {} mesh updates",
        scenario.name,
        summary.steps,
        summary.stats.probes,
        summary.stats.failed_probes,
        summary.stats.moves,
        summary.stats.mesh_updates
    );
    match summary.max_error {
        Some(error) => log::info!(
            "{} cells defined, max error {:.4}mm, active slot {}",
            summary.defined,
            error,
            runner.workflow().active_slot()
        ),
        None => log::info!("No mesh cells defined"),
    }
    Ok(())
}
