//! Parasitoid attack on open nest cells. Two interchangeable risk models sit
//! behind one trait; the scenario picks one at world build time and the
//! choice never varies per agent.

use rand::Rng;

use crate::bee::Parasitism;
use crate::params::SpeciesParams;

pub trait ParasitismModel: Send + Sync {
    /// Evaluate one day of exposure for a cell that has been open for
    /// `cell_open_days`. Returns the parasitoid type on attack, `None`
    /// otherwise. Callers only apply the result to individuals not already
    /// parasitised.
    fn attack(&self, cell_open_days: u32, rng: &mut dyn rand::RngCore) -> Parasitism;
}

/// Risk grows linearly with how long the cell has stood open; the attacking
/// type splits by a fixed bombyliid fraction.
pub struct SimpleParasitism {
    per_open_day: f64,
    bombylid_fraction: f64,
}

impl SimpleParasitism {
    pub fn new(params: &SpeciesParams) -> Self {
        Self {
            per_open_day: params.parasitism_per_open_day,
            bombylid_fraction: params.bombylid_fraction,
        }
    }
}

impl ParasitismModel for SimpleParasitism {
    fn attack(&self, cell_open_days: u32, rng: &mut dyn rand::RngCore) -> Parasitism {
        let risk = self.per_open_day * cell_open_days as f64;
        if rng.gen::<f64>() >= risk {
            return Parasitism::None;
        }
        if rng.gen::<f64>() < self.bombylid_fraction {
            Parasitism::Bombylid
        } else {
            Parasitism::Cleptoparasite
        }
    }
}

/// Density-driven variant: daily attack probability per open cell is the
/// product of a parasitoid abundance index and a per-capita attack chance,
/// one term per parasitoid type. Abundances come from whatever external
/// estimate the scenario supplies.
pub struct MechanisticParasitism {
    bombylid_rate: f64,
    cleptoparasite_rate: f64,
}

impl MechanisticParasitism {
    pub fn new(bombylid_abundance: f64, clepto_abundance: f64, per_capita_chance: f64) -> Self {
        Self {
            bombylid_rate: bombylid_abundance * per_capita_chance,
            cleptoparasite_rate: clepto_abundance * per_capita_chance,
        }
    }
}

impl ParasitismModel for MechanisticParasitism {
    fn attack(&self, _cell_open_days: u32, rng: &mut dyn rand::RngCore) -> Parasitism {
        let total = self.bombylid_rate + self.cleptoparasite_rate;
        if total <= 0.0 || rng.gen::<f64>() >= total {
            return Parasitism::None;
        }
        if rng.gen::<f64>() < self.bombylid_rate / total {
            Parasitism::Bombylid
        } else {
            Parasitism::Cleptoparasite
        }
    }
}
