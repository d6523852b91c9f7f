use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use osmia::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
    systems::{BeeSystem, BookkeepingSystem, FloraSystem, WeatherSystem},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Solitary bee population model runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/meadow.yaml")]
    scenario: PathBuf,

    /// Override run length in days (uses the scenario's year count when omitted)
    #[arg(long)]
    days: Option<u64>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    let mut world = scenario.build_world()?;
    let days = scenario.run_days(cli.days);
    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };

    let mut engine = EngineBuilder::new(settings)
        .with_system(WeatherSystem::new())
        .with_system(FloraSystem::new())
        .with_system(BeeSystem::new())
        .with_system(BookkeepingSystem::new())
        .build();

    engine.run(&mut world, days)?;
    let counts = world.stage_counts();
    println!(
        "Scenario '{}' completed after {} days. Population: {} ({} eggs laid, {} females emerged, {} deaths)",
        scenario.name,
        days,
        world.population(),
        world.stats.eggs_laid,
        world.stats.females_emerged,
        world.stats.deaths,
    );
    println!(
        "Stages: {} eggs, {} larvae, {} prepupae, {} pupae, {} cocoons, {} adults",
        counts.eggs, counts.larvae, counts.prepupae, counts.pupae, counts.cocoons, counts.adults
    );
    Ok(())
}
