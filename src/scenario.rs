//! YAML scenario files: run length, landscape composition, weather source,
//! the starting cohort, and optional species-parameter overrides.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::landscape::{HabitatMix, Landscape};
use crate::parasitism::{MechanisticParasitism, ParasitismModel, SimpleParasitism};
use crate::params::SpeciesParams;
use crate::weather::{WeatherDay, WeatherSeries};
use crate::world::World;

fn default_years() -> u32 {
    1
}

fn default_snapshot_interval_ticks() -> u64 {
    30
}

fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_else(|| unreachable!("valid fixed date"))
}

fn default_width_m() -> i32 {
    2000
}

fn default_height_m() -> i32 {
    2000
}

fn default_cell_size_m() -> i32 {
    10
}

fn default_mean_temp_c() -> f64 {
    9.0
}

fn default_amplitude_c() -> f64 {
    9.0
}

fn default_cocoon_count() -> usize {
    500
}

fn default_provision_min_mg() -> f64 {
    84.0
}

fn default_provision_max_mg() -> f64 {
    600.0
}

fn default_parasitoid_abundance() -> f64 {
    1.0
}

fn default_per_capita_chance() -> f64 {
    0.005
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default = "default_years")]
    pub years: u32,
    #[serde(default = "default_snapshot_interval_ticks")]
    pub snapshot_interval_ticks: u64,
    #[serde(default = "default_start_date")]
    pub start_date: NaiveDate,
    #[serde(default)]
    pub landscape: ScenarioLandscape,
    #[serde(default)]
    pub weather: ScenarioWeather,
    #[serde(default)]
    pub initial_cocoons: InitialCocoons,
    #[serde(default)]
    pub parasitoids: ScenarioParasitoids,
    #[serde(default)]
    pub params: Option<SpeciesParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioLandscape {
    #[serde(default = "default_width_m")]
    pub width_m: i32,
    #[serde(default = "default_height_m")]
    pub height_m: i32,
    #[serde(default = "default_cell_size_m")]
    pub cell_size_m: i32,
    #[serde(default)]
    pub mix: HabitatMix,
}

impl Default for ScenarioLandscape {
    fn default() -> Self {
        Self {
            width_m: default_width_m(),
            height_m: default_height_m(),
            cell_size_m: default_cell_size_m(),
            mix: HabitatMix::default(),
        }
    }
}

/// Either a measured daily series or a generated synthetic cycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScenarioWeather {
    Series { series: Vec<WeatherDay> },
    Synthetic(SyntheticWeather),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticWeather {
    #[serde(default = "default_mean_temp_c")]
    pub mean_temp_c: f64,
    #[serde(default = "default_amplitude_c")]
    pub amplitude_c: f64,
}

impl Default for ScenarioWeather {
    fn default() -> Self {
        ScenarioWeather::Synthetic(SyntheticWeather {
            mean_temp_c: default_mean_temp_c(),
            amplitude_c: default_amplitude_c(),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitialCocoons {
    #[serde(default = "default_cocoon_count")]
    pub count: usize,
    #[serde(default = "default_provision_min_mg")]
    pub provision_min_mg: f64,
    #[serde(default = "default_provision_max_mg")]
    pub provision_max_mg: f64,
}

impl Default for InitialCocoons {
    fn default() -> Self {
        Self {
            count: default_cocoon_count(),
            provision_min_mg: default_provision_min_mg(),
            provision_max_mg: default_provision_max_mg(),
        }
    }
}

/// Abundance inputs for the mechanistic parasitoid model; only read when
/// `params.mechanistic_parasitoids` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioParasitoids {
    #[serde(default = "default_parasitoid_abundance")]
    pub bombylid_abundance: f64,
    #[serde(default = "default_parasitoid_abundance")]
    pub cleptoparasite_abundance: f64,
    #[serde(default = "default_per_capita_chance")]
    pub per_capita_chance: f64,
}

impl Default for ScenarioParasitoids {
    fn default() -> Self {
        Self {
            bombylid_abundance: default_parasitoid_abundance(),
            cleptoparasite_abundance: default_parasitoid_abundance(),
            per_capita_chance: default_per_capita_chance(),
        }
    }
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn build_world(&self) -> Result<World> {
        let params = self.params.clone().unwrap_or_default();
        params
            .validate()
            .with_context(|| format!("Invalid species parameters in scenario '{}'", self.name))?;

        // World construction draws from its own stream so the engine's
        // per-system streams start identically regardless of setup.
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(0x5eed));
        let landscape = Landscape::generate(
            self.landscape.width_m,
            self.landscape.height_m,
            self.landscape.cell_size_m,
            &self.landscape.mix,
            &mut rng,
        )?;

        let day_count = self.days() as usize + 1;
        let weather = match &self.weather {
            ScenarioWeather::Series { series } => {
                anyhow::ensure!(
                    !series.is_empty(),
                    "scenario '{}' supplies an empty weather series",
                    self.name
                );
                WeatherSeries::from_records(series.clone())
            }
            ScenarioWeather::Synthetic(synth) => WeatherSeries::synthetic(
                self.seed,
                day_count.min(365 * 2),
                synth.mean_temp_c,
                synth.amplitude_c,
            ),
        };

        let parasitism: Box<dyn ParasitismModel> = if params.mechanistic_parasitoids {
            Box::new(MechanisticParasitism::new(
                self.parasitoids.bombylid_abundance,
                self.parasitoids.cleptoparasite_abundance,
                self.parasitoids.per_capita_chance,
            ))
        } else {
            Box::new(SimpleParasitism::new(&params))
        };

        let mut world = World::new(self.start_date, params, weather, landscape, parasitism);
        world.seed_overwintering(
            self.initial_cocoons.count,
            (
                self.initial_cocoons.provision_min_mg,
                self.initial_cocoons.provision_max_mg,
            ),
            &mut rng,
        );
        Ok(world)
    }

    pub fn days(&self) -> u64 {
        u64::from(self.years) * 365
    }

    pub fn run_days(&self, override_days: Option<u64>) -> u64 {
        override_days.unwrap_or_else(|| self.days())
    }
}
