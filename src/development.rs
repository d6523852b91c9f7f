//! Thermal and time-based development rules as pure functions of the day's
//! temperature and the species parameters. Nothing here touches agent or
//! world state, which keeps every transition rule testable in isolation.

use rand::Rng;

use crate::params::{SpeciesParams, StageThermal};

/// One day's degree-day contribution above a stage threshold.
pub fn degree_day(temp_c: f64, threshold_c: f64) -> f64 {
    (temp_c - threshold_c).max(0.0)
}

pub fn thermal_complete(accumulated_dd: f64, stage: StageThermal) -> bool {
    accumulated_dd >= stage.total_dd
}

/// Per-individual prepupal duration: nominal days plus a uniform deviate of
/// up to ten percent either way.
pub fn draw_prepupa_target_days(mean_days: f64, rng: &mut impl Rng) -> f64 {
    mean_days + 0.2 * mean_days * rng.gen::<f64>() - 0.1 * mean_days
}

/// Spring emergence countdown from the finished overwintering degree-day sum,
/// before the stochastic emergence-day draw and the nest microsite delay are
/// added.
pub fn emergence_counter_base(params: &SpeciesParams, winter_dd: f64) -> i32 {
    (params.emergence_counter_const + params.emergence_counter_slope * winter_dd) as i32
}

/// Draw from the configured discrete emergence-day distribution; the result
/// is an offset in days.
pub fn draw_emergence_day(weights: &[f64], rng: &mut impl Rng) -> i32 {
    let total: f64 = weights.iter().sum();
    let mut target = rng.gen::<f64>() * total;
    for (day, weight) in weights.iter().enumerate() {
        target -= weight;
        if target < 0.0 {
            return day as i32;
        }
    }
    weights.len() as i32 - 1
}

/// Dispersal flight distance in metres. The draw is shaped by the two homing
/// radii: the median lands on the typical homing distance (R50) and no flight
/// exceeds the maximum homing distance (R90).
pub fn dispersal_distance_m(params: &SpeciesParams, rng: &mut impl Rng) -> f64 {
    let r50 = params.typical_homing_distance_m;
    let r90 = params.max_homing_distance_m;
    if r90 <= 0.0 {
        return 0.0;
    }
    let shape = (r50 / r90).ln() / 0.5_f64.ln();
    r90 * rng.gen::<f64>().powf(shape)
}

/// Winter mortality, evaluated once when the overwintering degree-day sums
/// are finalized: probability on a 0-100 scale, linear in the prewinter heat
/// the cocoon was exposed to.
pub fn winter_mortality_pct(params: &SpeciesParams, prewinter_dd: f64) -> f64 {
    params.winter_mortality_slope * prewinter_dd + params.winter_mortality_const
}

/// Adult body mass from the provision mass the cell was stocked with,
/// clamped to the species range.
pub fn adult_mass_mg(params: &SpeciesParams, provision_mg: f64) -> f64 {
    let mass = params.adult_mass_slope * provision_mg + params.adult_mass_const;
    mass.clamp(params.female_mass_min_mg, params.female_mass_max_mg)
}

/// Lifetime egg load of a freshly matured female, an increasing function of
/// her body mass with a uniform jitter of up to three eggs either way.
pub fn egg_load(params: &SpeciesParams, mass_mg: f64, rng: &mut impl Rng) -> u32 {
    let expected = params.total_nests_possible as f64
        * (params.egg_load_slope * mass_mg + params.egg_load_const);
    let jittered = expected + rng.gen::<f64>() * 6.0 - 3.0;
    jittered.max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn no_heat_below_threshold() {
        assert_eq!(degree_day(4.0, 4.5), 0.0);
        assert_eq!(degree_day(-10.0, 0.0), 0.0);
        assert_eq!(degree_day(20.0, 4.5), 15.5);
    }

    #[test]
    fn egg_finishes_in_five_days_at_twenty_degrees() {
        let params = SpeciesParams::default();
        let stage = params.egg_thermal();
        let mut dd = 0.0;
        let mut days = 0;
        while !thermal_complete(dd, stage) {
            dd += degree_day(20.0, stage.threshold_c);
            days += 1;
        }
        assert_eq!(days, 5);
    }

    #[test]
    fn prepupa_target_within_ten_percent() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..200 {
            let target = draw_prepupa_target_days(45.0, &mut rng);
            assert!((40.5..=49.5).contains(&target));
        }
    }

    #[test]
    fn emergence_counter_shrinks_with_winter_heat() {
        let params = SpeciesParams::default();
        assert_eq!(emergence_counter_base(&params, 0.0), 35);
        assert!(emergence_counter_base(&params, 1000.0) < 35);
    }

    #[test]
    fn emergence_day_draw_stays_in_range() {
        let params = SpeciesParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let n = params.emergence_day_weights.len() as i32;
        for _ in 0..500 {
            let day = draw_emergence_day(&params.emergence_day_weights, &mut rng);
            assert!((0..n).contains(&day));
        }
    }

    #[test]
    fn dispersal_distances_follow_the_homing_radii() {
        let params = SpeciesParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut draws: Vec<f64> = (0..10_000)
            .map(|_| dispersal_distance_m(&params, &mut rng))
            .collect();
        assert!(draws
            .iter()
            .all(|d| (0.0..=params.max_homing_distance_m).contains(d)));
        draws.sort_by(f64::total_cmp);
        let median = draws[draws.len() / 2];
        assert!(
            (median - params.typical_homing_distance_m).abs() < 30.0,
            "median {median}"
        );
    }

    #[test]
    fn adult_mass_is_linear_then_clamped() {
        let params = SpeciesParams::default();
        let mass = adult_mass_mg(&params, 400.0);
        assert!((mass - (0.25 * 400.0 + 4.0)).abs() < 1e-9);
        assert_eq!(adult_mass_mg(&params, 0.0), params.female_mass_min_mg);
        assert_eq!(adult_mass_mg(&params, 1e6), params.female_mass_max_mg);
    }

    #[test]
    fn heavier_females_carry_more_eggs() {
        let params = SpeciesParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let light: u32 = (0..100).map(|_| egg_load(&params, 30.0, &mut rng)).sum();
        let heavy: u32 = (0..100).map(|_| egg_load(&params, 150.0, &mut rng)).sum();
        assert!(heavy > light);
    }
}
