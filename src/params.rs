//! Species parameters: every calibrated constant of the model, loadable and
//! overridable from the scenario file, immutable after validation.
//!
//! Several of the development constants are calibration values rather than
//! laboratory measurements (the pupal threshold in particular). They are kept
//! as configuration so a scenario can substitute its own calibration.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be a probability in [0, 1], got {value}")]
    NotProbability { field: &'static str, value: f64 },
    #[error("{field}: min {min} exceeds max {max}")]
    InvertedRange { field: &'static str, min: f64, max: f64 },
    #[error("{field} must not be empty")]
    EmptyTable { field: &'static str },
}

fn default_egg_threshold_c() -> f64 {
    0.0
}

fn default_egg_total_dd() -> f64 {
    86.0
}

fn default_egg_daily_mortality() -> f64 {
    0.0014
}

fn default_larva_threshold_c() -> f64 {
    4.5
}

fn default_larva_total_dd() -> f64 {
    422.0
}

fn default_larva_daily_mortality() -> f64 {
    0.0014
}

fn default_prepupa_mean_days() -> f64 {
    45.0
}

fn default_prepupa_daily_mortality() -> f64 {
    0.003
}

fn default_pupa_threshold_c() -> f64 {
    1.1
}

fn default_pupa_total_dd() -> f64 {
    570.0
}

fn default_pupa_daily_mortality() -> f64 {
    0.003
}

fn default_prewinter_threshold_c() -> f64 {
    15.0
}

fn default_overwinter_threshold_c() -> f64 {
    0.0
}

fn default_emergence_temp_c() -> f64 {
    5.0
}

fn default_emergence_counter_const() -> f64 {
    35.4819
}

fn default_emergence_counter_slope() -> f64 {
    -0.0147
}

fn default_winter_mortality_const() -> f64 {
    -4.63
}

fn default_winter_mortality_slope() -> f64 {
    0.05
}

fn default_emergence_day_weights() -> Vec<f64> {
    vec![8.0, 7.0, 9.0, 24.0, 20.0, 8.0, 6.0, 5.0, 5.0, 4.0, 4.0]
}

/// Relative prepupal development per day, indexed by rounded temperature in
/// degrees C from 0 to 41. Peaks at 22 C and falls off on both sides.
fn default_prepupal_devel_rates() -> Vec<f64> {
    vec![
        0.118180491,
        0.128062924,
        0.139167698,
        0.151690375,
        0.165863251,
        0.181962547,
        0.200316654,
        0.221315209,
        0.245418359,
        0.273164807,
        0.305175879,
        0.342150483,
        0.384842052,
        0.434002716,
        0.490272059,
        0.553979475,
        0.62482638,
        0.701432201,
        0.780791977,
        0.857828943,
        0.925409524,
        0.97526899,
        1.0,
        0.995492173,
        0.96251684,
        0.90641791,
        0.835121012,
        0.756712977,
        0.677752358,
        0.602659522,
        0.53389011,
        0.472441557,
        0.418380352,
        0.371255655,
        0.330377543,
        0.294984821,
        0.264336547,
        0.237755941,
        0.214646732,
        0.194494708,
        0.176862031,
        0.161378614,
    ]
}

fn default_adult_daily_mortality() -> f64 {
    0.02
}

fn default_adult_lifespan_days() -> u32 {
    60
}

fn default_prenesting_days() -> u32 {
    2
}

fn default_adult_mass_const() -> f64 {
    4.0
}

fn default_adult_mass_slope() -> f64 {
    0.25
}

fn default_female_mass_min_mg() -> f64 {
    25.0
}

fn default_female_mass_max_mg() -> f64 {
    200.0
}

fn default_male_min_provision_mg() -> f64 {
    10.0
}

fn default_egg_load_slope() -> f64 {
    0.0371
}

fn default_egg_load_const() -> f64 {
    2.8399
}

fn default_total_nests_possible() -> u32 {
    5
}

fn default_min_eggs_per_nest() -> u32 {
    3
}

fn default_max_eggs_per_nest() -> u32 {
    30
}

fn default_find_nest_attempts() -> u32 {
    20
}

fn default_lifetime_provision_loss_pct() -> f64 {
    30.0
}

fn default_provision_per_cocoon_mass() -> f64 {
    3.247
}

fn default_pollen_score_to_mg() -> f64 {
    25.0
}

fn default_pollen_give_up_threshold() -> f64 {
    0.75
}

fn default_pollen_give_up_return() -> f64 {
    0.75
}

fn default_density_removal_const() -> f64 {
    0.5
}

fn default_min_flight_temp_c() -> f64 {
    6.0
}

fn default_max_flight_wind_ms() -> f64 {
    8.0
}

fn default_max_flight_precip_mm() -> f64 {
    0.1
}

fn default_max_forage_hours() -> f64 {
    8.0
}

fn default_mask_step_m() -> i32 {
    50
}

fn default_mask_rings() -> usize {
    12
}

// Distance at which half of homing females fail to return (R50).
fn default_typical_homing_distance_m() -> f64 {
    600.0
}

// Distance at which ninety percent fail to return (R90).
fn default_max_homing_distance_m() -> f64 {
    1430.0
}

fn default_detailed_mask_step_m() -> i32 {
    25
}

fn default_detailed_mask_radius_m() -> i32 {
    600
}

fn default_parasitism_per_open_day() -> f64 {
    0.0075
}

fn default_bombylid_fraction() -> f64 {
    0.5
}

fn default_initial_overwinter_dd() -> f64 {
    320.0
}

/// Thermal budget for one degree-day driven stage.
#[derive(Debug, Clone, Copy)]
pub struct StageThermal {
    pub threshold_c: f64,
    pub total_dd: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeciesParams {
    // Egg stage.
    #[serde(default = "default_egg_threshold_c")]
    pub egg_threshold_c: f64,
    #[serde(default = "default_egg_total_dd")]
    pub egg_total_dd: f64,
    #[serde(default = "default_egg_daily_mortality")]
    pub egg_daily_mortality: f64,

    // Larval stage.
    #[serde(default = "default_larva_threshold_c")]
    pub larva_threshold_c: f64,
    #[serde(default = "default_larva_total_dd")]
    pub larva_total_dd: f64,
    #[serde(default = "default_larva_daily_mortality")]
    pub larva_daily_mortality: f64,

    // Prepupal stage develops by elapsed time scaled with temperature, not by
    // degree-days; diapause response to temperature is not monotonic.
    #[serde(default = "default_prepupa_mean_days")]
    pub prepupa_mean_days: f64,
    #[serde(default = "default_prepupa_daily_mortality")]
    pub prepupa_daily_mortality: f64,
    #[serde(default = "default_prepupal_devel_rates")]
    pub prepupal_devel_rates: Vec<f64>,

    // Pupal stage.
    #[serde(default = "default_pupa_threshold_c")]
    pub pupa_threshold_c: f64,
    #[serde(default = "default_pupa_total_dd")]
    pub pupa_total_dd: f64,
    #[serde(default = "default_pupa_daily_mortality")]
    pub pupa_daily_mortality: f64,

    // Overwintering cocoon.
    #[serde(default = "default_prewinter_threshold_c")]
    pub prewinter_threshold_c: f64,
    #[serde(default = "default_overwinter_threshold_c")]
    pub overwinter_threshold_c: f64,
    #[serde(default = "default_emergence_temp_c")]
    pub emergence_temp_c: f64,
    #[serde(default = "default_emergence_counter_const")]
    pub emergence_counter_const: f64,
    #[serde(default = "default_emergence_counter_slope")]
    pub emergence_counter_slope: f64,
    #[serde(default = "default_winter_mortality_const")]
    pub winter_mortality_const: f64,
    #[serde(default = "default_winter_mortality_slope")]
    pub winter_mortality_slope: f64,
    #[serde(default = "default_emergence_day_weights")]
    pub emergence_day_weights: Vec<f64>,
    #[serde(default = "default_initial_overwinter_dd")]
    pub initial_overwinter_dd: f64,

    // Adult females.
    #[serde(default = "default_adult_daily_mortality")]
    pub adult_daily_mortality: f64,
    #[serde(default = "default_adult_lifespan_days")]
    pub adult_lifespan_days: u32,
    #[serde(default = "default_prenesting_days")]
    pub prenesting_days: u32,
    #[serde(default = "default_adult_mass_const")]
    pub adult_mass_const: f64,
    #[serde(default = "default_adult_mass_slope")]
    pub adult_mass_slope: f64,
    #[serde(default = "default_female_mass_min_mg")]
    pub female_mass_min_mg: f64,
    #[serde(default = "default_female_mass_max_mg")]
    pub female_mass_max_mg: f64,
    #[serde(default = "default_male_min_provision_mg")]
    pub male_min_provision_mg: f64,

    // Fecundity and nesting.
    #[serde(default = "default_egg_load_slope")]
    pub egg_load_slope: f64,
    #[serde(default = "default_egg_load_const")]
    pub egg_load_const: f64,
    #[serde(default = "default_total_nests_possible")]
    pub total_nests_possible: u32,
    #[serde(default = "default_min_eggs_per_nest")]
    pub min_eggs_per_nest: u32,
    #[serde(default = "default_max_eggs_per_nest")]
    pub max_eggs_per_nest: u32,
    #[serde(default = "default_find_nest_attempts")]
    pub find_nest_attempts: u32,

    // Provisioning.
    #[serde(default = "default_lifetime_provision_loss_pct")]
    pub lifetime_provision_loss_pct: f64,
    #[serde(default = "default_provision_per_cocoon_mass")]
    pub provision_per_cocoon_mass: f64,
    #[serde(default = "default_pollen_score_to_mg")]
    pub pollen_score_to_mg: f64,
    #[serde(default = "default_pollen_give_up_threshold")]
    pub pollen_give_up_threshold: f64,
    #[serde(default = "default_pollen_give_up_return")]
    pub pollen_give_up_return: f64,
    #[serde(default = "default_density_removal_const")]
    pub density_removal_const: f64,

    // Flight weather limits and daily activity budget.
    #[serde(default = "default_min_flight_temp_c")]
    pub min_flight_temp_c: f64,
    #[serde(default = "default_max_flight_wind_ms")]
    pub max_flight_wind_ms: f64,
    #[serde(default = "default_max_flight_precip_mm")]
    pub max_flight_precip_mm: f64,
    #[serde(default = "default_max_forage_hours")]
    pub max_forage_hours: f64,

    // Movement range: the coarse forage rings span the typical homing
    // distance; dispersal flights can reach the maximum.
    #[serde(default = "default_typical_homing_distance_m")]
    pub typical_homing_distance_m: f64,
    #[serde(default = "default_max_homing_distance_m")]
    pub max_homing_distance_m: f64,

    // Forage mask geometry.
    #[serde(default = "default_mask_step_m")]
    pub mask_step_m: i32,
    #[serde(default = "default_mask_rings")]
    pub mask_rings: usize,
    #[serde(default = "default_detailed_mask_step_m")]
    pub detailed_mask_step_m: i32,
    #[serde(default = "default_detailed_mask_radius_m")]
    pub detailed_mask_radius_m: i32,

    // Parasitism.
    #[serde(default = "default_parasitism_per_open_day")]
    pub parasitism_per_open_day: f64,
    #[serde(default = "default_bombylid_fraction")]
    pub bombylid_fraction: f64,
    #[serde(default)]
    pub mechanistic_parasitoids: bool,
}

impl Default for SpeciesParams {
    fn default() -> Self {
        // Round-trip through serde so the field defaults stay the single
        // source of truth.
        serde_yaml::from_str("{}").unwrap_or_else(|_| unreachable!())
    }
}

impl SpeciesParams {
    /// Fails fast on configuration that cannot be biologically interpreted.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (field, value) in [
            ("egg_total_dd", self.egg_total_dd),
            ("larva_total_dd", self.larva_total_dd),
            ("pupa_total_dd", self.pupa_total_dd),
            ("prepupa_mean_days", self.prepupa_mean_days),
            ("pollen_score_to_mg", self.pollen_score_to_mg),
            ("provision_per_cocoon_mass", self.provision_per_cocoon_mass),
            ("typical_homing_distance_m", self.typical_homing_distance_m),
            ("max_homing_distance_m", self.max_homing_distance_m),
        ] {
            if value < 0.0 {
                return Err(ParamsError::Negative { field, value });
            }
        }
        for (field, value) in [
            ("egg_daily_mortality", self.egg_daily_mortality),
            ("larva_daily_mortality", self.larva_daily_mortality),
            ("prepupa_daily_mortality", self.prepupa_daily_mortality),
            ("pupa_daily_mortality", self.pupa_daily_mortality),
            ("adult_daily_mortality", self.adult_daily_mortality),
            ("bombylid_fraction", self.bombylid_fraction),
            ("pollen_give_up_threshold", self.pollen_give_up_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ParamsError::NotProbability { field, value });
            }
        }
        if self.female_mass_min_mg > self.female_mass_max_mg {
            return Err(ParamsError::InvertedRange {
                field: "female_mass",
                min: self.female_mass_min_mg,
                max: self.female_mass_max_mg,
            });
        }
        if self.typical_homing_distance_m > self.max_homing_distance_m {
            return Err(ParamsError::InvertedRange {
                field: "homing_distance",
                min: self.typical_homing_distance_m,
                max: self.max_homing_distance_m,
            });
        }
        if self.min_eggs_per_nest > self.max_eggs_per_nest {
            return Err(ParamsError::InvertedRange {
                field: "eggs_per_nest",
                min: self.min_eggs_per_nest as f64,
                max: self.max_eggs_per_nest as f64,
            });
        }
        if self.prepupal_devel_rates.is_empty() {
            return Err(ParamsError::EmptyTable {
                field: "prepupal_devel_rates",
            });
        }
        if self.emergence_day_weights.is_empty() {
            return Err(ParamsError::EmptyTable {
                field: "emergence_day_weights",
            });
        }
        Ok(())
    }

    pub fn egg_thermal(&self) -> StageThermal {
        StageThermal {
            threshold_c: self.egg_threshold_c,
            total_dd: self.egg_total_dd,
        }
    }

    pub fn larva_thermal(&self) -> StageThermal {
        StageThermal {
            threshold_c: self.larva_threshold_c,
            total_dd: self.larva_total_dd,
        }
    }

    pub fn pupa_thermal(&self) -> StageThermal {
        StageThermal {
            threshold_c: self.pupa_threshold_c,
            total_dd: self.pupa_total_dd,
        }
    }

    /// Daily prepupal development increment for the given mean temperature.
    /// The table index is the rounded temperature clamped to the table range.
    pub fn prepupal_rate_at(&self, temp_c: f64) -> f64 {
        let idx = temp_c.round().max(0.0) as usize;
        let idx = idx.min(self.prepupal_devel_rates.len() - 1);
        self.prepupal_devel_rates[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = SpeciesParams::default();
        params.validate().unwrap();
        assert_eq!(params.egg_total_dd, 86.0);
        assert_eq!(params.adult_lifespan_days, 60);
        assert_eq!(params.prepupal_devel_rates.len(), 42);
        // Coarse rings span the typical homing distance.
        assert_eq!(
            params.mask_step_m * params.mask_rings as i32,
            params.typical_homing_distance_m as i32
        );
    }

    #[test]
    fn inverted_homing_range_rejected() {
        let params: SpeciesParams =
            serde_yaml::from_str("typical_homing_distance_m: 2000.0\n").unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn prepupal_rate_clamps_to_table() {
        let params = SpeciesParams::default();
        assert_eq!(params.prepupal_rate_at(-5.0), params.prepupal_devel_rates[0]);
        assert_eq!(params.prepupal_rate_at(22.0), 1.0);
        assert_eq!(
            params.prepupal_rate_at(100.0),
            *params.prepupal_devel_rates.last().unwrap()
        );
    }

    #[test]
    fn yaml_override_keeps_other_defaults() {
        let params: SpeciesParams =
            serde_yaml::from_str("egg_total_dd: 37.0\nadult_lifespan_days: 40\n").unwrap();
        assert_eq!(params.egg_total_dd, 37.0);
        assert_eq!(params.adult_lifespan_days, 40);
        assert_eq!(params.larva_total_dd, 422.0);
    }

    #[test]
    fn negative_budget_rejected() {
        let params: SpeciesParams = serde_yaml::from_str("pupa_total_dd: -1.0\n").unwrap();
        assert!(params.validate().is_err());
    }
}
