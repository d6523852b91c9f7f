//! Daily survival draws. Death is immediate and unconditional once a draw
//! falls below the stage probability; there are no retries and no partial
//! outcomes.

use rand::Rng;

use crate::bee::LifeStage;
use crate::development::winter_mortality_pct;
use crate::params::SpeciesParams;

/// The per-day background mortality of a stage. For eggs and larvae in open
/// cells the parasitism pathway is an additional risk on top of this, not a
/// replacement.
pub fn stage_daily_mortality(params: &SpeciesParams, stage: &LifeStage) -> f64 {
    match stage {
        LifeStage::Egg => params.egg_daily_mortality,
        LifeStage::Larva => params.larva_daily_mortality,
        LifeStage::Prepupa { .. } => params.prepupa_daily_mortality,
        LifeStage::Pupa => params.pupa_daily_mortality,
        // Overwintering mortality is a one-time test at diapause end, not a
        // daily draw.
        LifeStage::Cocoon(_) => 0.0,
        LifeStage::Adult(_) => params.adult_daily_mortality,
    }
}

pub fn survives_day(probability: f64, rng: &mut impl Rng) -> bool {
    rng.gen::<f64>() >= probability
}

/// The one-time winter mortality test, run when the emergence countdown
/// completes. The linear model is on a percent scale and can go negative for
/// cool prewinters, in which case survival is certain.
pub fn survives_winter(params: &SpeciesParams, prewinter_dd: f64, rng: &mut impl Rng) -> bool {
    let pct = winter_mortality_pct(params, prewinter_dd);
    if pct <= 0.0 {
        return true;
    }
    rng.gen_range(0.0..100.0) >= pct
}
