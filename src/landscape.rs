//! Habitat grid. Coordinates are metres, wrapped toroidally; each grid cell
//! carries a habitat class whose seasonal bloom curve yields the day's pollen
//! score, a cavity budget for nesting, and a forager-density counter used for
//! competition scaling.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LandscapeError {
    #[error("landscape must have positive extent, got {width_m}x{height_m}")]
    EmptyExtent { width_m: i32, height_m: i32 },
    #[error("cell size must be positive, got {0}")]
    BadCellSize(i32),
    #[error("habitat weights must not all be zero")]
    NoHabitat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Habitat {
    Cropland,
    Grassland,
    Hedgerow,
    Woodland,
    Garden,
}

impl Habitat {
    /// Peak pollen score of the habitat, in landscape score units.
    fn pollen_peak(self) -> f64 {
        match self {
            Habitat::Cropland => 1.2,
            Habitat::Grassland => 2.0,
            Habitat::Hedgerow => 2.5,
            Habitat::Woodland => 0.8,
            Habitat::Garden => 1.8,
        }
    }

    /// Day-of-year at which bloom peaks.
    fn bloom_peak_day(self) -> f64 {
        match self {
            Habitat::Cropland => 130.0,
            Habitat::Grassland => 160.0,
            Habitat::Hedgerow => 125.0,
            Habitat::Woodland => 110.0,
            Habitat::Garden => 170.0,
        }
    }

    fn bloom_spread_days(self) -> f64 {
        match self {
            Habitat::Cropland => 18.0,
            Habitat::Grassland => 45.0,
            Habitat::Hedgerow => 35.0,
            Habitat::Woodland => 25.0,
            Habitat::Garden => 60.0,
        }
    }

    /// How many nest cavities one grid cell of this habitat can host.
    fn cavity_capacity(self) -> u32 {
        match self {
            Habitat::Cropland => 0,
            Habitat::Grassland => 1,
            Habitat::Hedgerow => 6,
            Habitat::Woodland => 4,
            Habitat::Garden => 8,
        }
    }

    fn score(self, day_of_year: f64) -> f64 {
        let z = (day_of_year - self.bloom_peak_day()) / self.bloom_spread_days();
        self.pollen_peak() * (-0.5 * z * z).exp()
    }
}

/// Weight of each habitat class when generating a landscape.
#[derive(Debug, Clone, Deserialize)]
pub struct HabitatMix {
    #[serde(default = "default_cropland")]
    pub cropland: f64,
    #[serde(default = "default_grassland")]
    pub grassland: f64,
    #[serde(default = "default_hedgerow")]
    pub hedgerow: f64,
    #[serde(default = "default_woodland")]
    pub woodland: f64,
    #[serde(default = "default_garden")]
    pub garden: f64,
}

fn default_cropland() -> f64 {
    0.55
}

fn default_grassland() -> f64 {
    0.2
}

fn default_hedgerow() -> f64 {
    0.1
}

fn default_woodland() -> f64 {
    0.1
}

fn default_garden() -> f64 {
    0.05
}

impl Default for HabitatMix {
    fn default() -> Self {
        Self {
            cropland: default_cropland(),
            grassland: default_grassland(),
            hedgerow: default_hedgerow(),
            woodland: default_woodland(),
            garden: default_garden(),
        }
    }
}

pub struct Landscape {
    width_m: i32,
    height_m: i32,
    cell_size_m: i32,
    cols: usize,
    rows: usize,
    habitats: Vec<Habitat>,
    pollen: Vec<f64>,
    nests: Vec<u32>,
    foragers: Vec<u32>,
}

impl Landscape {
    pub fn generate(
        width_m: i32,
        height_m: i32,
        cell_size_m: i32,
        mix: &HabitatMix,
        rng: &mut impl Rng,
    ) -> Result<Self, LandscapeError> {
        if width_m <= 0 || height_m <= 0 {
            return Err(LandscapeError::EmptyExtent { width_m, height_m });
        }
        if cell_size_m <= 0 {
            return Err(LandscapeError::BadCellSize(cell_size_m));
        }
        let weights = [
            mix.cropland,
            mix.grassland,
            mix.hedgerow,
            mix.woodland,
            mix.garden,
        ];
        let dist = WeightedIndex::new(weights).map_err(|_| LandscapeError::NoHabitat)?;
        let classes = [
            Habitat::Cropland,
            Habitat::Grassland,
            Habitat::Hedgerow,
            Habitat::Woodland,
            Habitat::Garden,
        ];
        let cols = (width_m as usize).div_ceil(cell_size_m as usize);
        let rows = (height_m as usize).div_ceil(cell_size_m as usize);
        let habitats: Vec<Habitat> = (0..cols * rows)
            .map(|_| classes[dist.sample(rng)])
            .collect();
        let n = habitats.len();
        Ok(Self {
            width_m,
            height_m,
            cell_size_m,
            cols,
            rows,
            habitats,
            pollen: vec![0.0; n],
            nests: vec![0; n],
            foragers: vec![0; n],
        })
    }

    pub fn width_m(&self) -> i32 {
        self.width_m
    }

    pub fn height_m(&self) -> i32 {
        self.height_m
    }

    fn index_of(&self, x_m: i32, y_m: i32) -> usize {
        let x = x_m.rem_euclid(self.width_m);
        let y = y_m.rem_euclid(self.height_m);
        let col = (x / self.cell_size_m) as usize % self.cols;
        let row = (y / self.cell_size_m) as usize % self.rows;
        row * self.cols + col
    }

    /// Daily refresh: bloom-curve pollen for every cell, forager counters
    /// cleared. Yesterday's forager distribution is obsolete once females
    /// move.
    pub fn refresh(&mut self, day_of_year: u32) {
        let doy = day_of_year as f64;
        let habitats = &self.habitats;
        self.pollen
            .par_iter_mut()
            .zip(habitats.par_iter())
            .for_each(|(score, habitat)| {
                *score = habitat.score(doy);
            });
        self.foragers.iter_mut().for_each(|f| *f = 0);
    }

    pub fn habitat_at(&self, x_m: i32, y_m: i32) -> Habitat {
        self.habitats[self.index_of(x_m, y_m)]
    }

    pub fn pollen_score_at(&self, x_m: i32, y_m: i32) -> f64 {
        self.pollen[self.index_of(x_m, y_m)]
    }

    /// Best pollen score anywhere, the reference for proportional give-up
    /// decisions.
    pub fn best_pollen_score(&self) -> f64 {
        self.pollen.iter().copied().fold(0.0, f64::max)
    }

    pub fn register_forager(&mut self, x_m: i32, y_m: i32) {
        let idx = self.index_of(x_m, y_m);
        self.foragers[idx] += 1;
    }

    /// Competition scaler at a location: 1.0 for a lone forager, growing with
    /// each additional female working the same cell.
    pub fn competition_at(&self, x_m: i32, y_m: i32, removal_const: f64) -> f64 {
        let count = self.foragers[self.index_of(x_m, y_m)];
        1.0 + removal_const * count.saturating_sub(1) as f64
    }

    pub fn nesting_space_at(&self, x_m: i32, y_m: i32) -> bool {
        let idx = self.index_of(x_m, y_m);
        self.nests[idx] < self.habitats[idx].cavity_capacity()
    }

    pub fn register_nest(&mut self, x_m: i32, y_m: i32) {
        let idx = self.index_of(x_m, y_m);
        self.nests[idx] += 1;
    }

    pub fn release_nest(&mut self, x_m: i32, y_m: i32) {
        let idx = self.index_of(x_m, y_m);
        self.nests[idx] = self.nests[idx].saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_landscape() -> Landscape {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        Landscape::generate(500, 500, 10, &HabitatMix::default(), &mut rng).unwrap()
    }

    #[test]
    fn coordinates_wrap() {
        let land = small_landscape();
        assert_eq!(land.habitat_at(10, 10), land.habitat_at(510, 510));
        assert_eq!(land.habitat_at(-490, 10), land.habitat_at(10, 10));
    }

    #[test]
    fn bloom_peaks_in_season() {
        let mut land = small_landscape();
        land.refresh(30);
        let winter = land.best_pollen_score();
        land.refresh(130);
        let spring = land.best_pollen_score();
        assert!(spring > winter * 10.0);
    }

    #[test]
    fn competition_grows_with_foragers() {
        let mut land = small_landscape();
        assert_eq!(land.competition_at(50, 50, 0.5), 1.0);
        land.register_forager(50, 50);
        assert_eq!(land.competition_at(50, 50, 0.5), 1.0);
        land.register_forager(50, 50);
        land.register_forager(50, 50);
        assert_eq!(land.competition_at(50, 50, 0.5), 2.0);
    }

    #[test]
    fn cropland_offers_no_cavities() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mix = HabitatMix {
            cropland: 1.0,
            grassland: 0.0,
            hedgerow: 0.0,
            woodland: 0.0,
            garden: 0.0,
        };
        let land = Landscape::generate(100, 100, 10, &mix, &mut rng).unwrap();
        assert!(!land.nesting_space_at(20, 20));
    }

    #[test]
    fn nest_registration_consumes_capacity() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mix = HabitatMix {
            cropland: 0.0,
            grassland: 1.0,
            hedgerow: 0.0,
            woodland: 0.0,
            garden: 0.0,
        };
        let mut land = Landscape::generate(100, 100, 10, &mix, &mut rng).unwrap();
        assert!(land.nesting_space_at(5, 5));
        land.register_nest(5, 5);
        assert!(!land.nesting_space_at(5, 5));
        land.release_nest(5, 5);
        assert!(land.nesting_space_at(5, 5));
    }
}
