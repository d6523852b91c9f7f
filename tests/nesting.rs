//! Nesting-season behaviour through the full engine, driven by a measured
//! weather series so the spring conditions are exactly controlled.

use std::fmt::Write as _;
use std::path::PathBuf;

use osmia::{
    bee::LifeStage,
    engine::{Engine, EngineBuilder, EngineSettings},
    scenario::Scenario,
    systems::{BeeSystem, BookkeepingSystem, FloraSystem, WeatherSystem},
    world::World,
};

/// A scenario starting on 1 March with a constant supplied weather record,
/// so emergence counters arm on the first tick and count down steadily.
fn march_scenario(day: &str, extra: &str) -> Scenario {
    let mut yaml = String::from(
        "
name: march
seed: 77
start_date: 2023-03-01
landscape:
  width_m: 600
  height_m: 600
  cell_size_m: 10
  mix:
    cropland: 0.1
    grassland: 0.2
    hedgerow: 0.4
    woodland: 0.1
    garden: 0.2
initial_cocoons:
  count: 200
  provision_min_mg: 200.0
  provision_max_mg: 600.0
weather:
  series:
",
    );
    for _ in 0..130 {
        writeln!(yaml, "    - {day}").unwrap();
    }
    yaml.push_str(extra);
    serde_yaml::from_str(&yaml).unwrap()
}

fn run(scenario: &Scenario, days: u64) -> World {
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: 0,
        snapshot_dir: PathBuf::from("unused"),
    };
    let mut engine: Engine = EngineBuilder::new(settings)
        .with_system(WeatherSystem::new())
        .with_system(FloraSystem::new())
        .with_system(BeeSystem::new())
        .with_system(BookkeepingSystem::new())
        .build();
    let mut world = scenario.build_world().unwrap();
    engine.run(&mut world, days).unwrap();
    world
}

#[test]
fn warm_spring_drives_a_full_nesting_cycle() {
    let world = run(&march_scenario("{ temp_c: 15.0 }", ""), 120);

    assert!(world.stats.females_emerged > 0);
    assert!(world.stats.nests_started > 0);
    assert!(world.stats.eggs_laid > 0);

    // Completed nests are sealed holding their full clutch.
    assert!(world
        .nests
        .values()
        .any(|nest| !nest.is_open() && nest.cell_count() > 1));

    // An open nest always belongs to a living female; death seals it.
    let open_nests = world.nests.values().filter(|nest| nest.is_open()).count();
    assert!(open_nests <= world.stage_counts().adults);
}

#[test]
fn grounding_wind_blocks_provisioning_but_not_emergence() {
    // Warm enough to emerge and disperse, but every day too windy to fly a
    // foraging bout.
    let world = run(&march_scenario("{ temp_c: 15.0, wind_ms: 9.0 }", ""), 120);

    assert!(world.stats.females_emerged > 0);
    assert!(world.stats.nests_started > 0);
    assert_eq!(world.stats.eggs_laid, 0);
}

#[test]
fn parasitoids_reach_broods_in_open_nests() {
    let extra = "params:\n  parasitism_per_open_day: 0.2\n";
    let world = run(&march_scenario("{ temp_c: 15.0 }", extra), 120);

    assert!(world.stats.eggs_laid > 0);
    let marked = world
        .bees
        .values()
        .filter(|bee| bee.parasitism != osmia::bee::Parasitism::None)
        .count();
    assert!(marked > 0);

    // Only developing brood can carry the mark; emerging carriers die.
    for bee in world.bees.values() {
        if bee.parasitism != osmia::bee::Parasitism::None {
            assert!(!matches!(bee.stage, LifeStage::Adult(_)));
        }
    }
}
