//! The life-stage state machine as pure dispatch: one function consumes the
//! agent's current behavioural state, performs that state's action against
//! the day's environment, and returns whether the agent should be stepped
//! again today, is finished for the day, or has died.
//!
//! The scheduler calls [`begin_day`] once per agent per day and then invokes
//! [`step`] repeatedly until a non-`Continue` result comes back.

use chrono::{Datelike, NaiveDate};
use rand::Rng;
use slotmap::SlotMap;

use crate::bee::{
    Bee, BeeState, CellPlan, CocoonState, FemaleState, LifeStage, Parasitism, Sex,
};
use crate::development;
use crate::landscape::Landscape;
use crate::mask::{ForageMask, ForageMaskDetailed};
use crate::mortality;
use crate::nest::{Nest, NestId};
use crate::parasitism::ParasitismModel;
use crate::params::SpeciesParams;

/// The day's shared environment, published by the weather system before any
/// agent steps.
#[derive(Debug, Clone)]
pub struct DayContext {
    pub date: NaiveDate,
    pub temp_c: f64,
    pub forage_hours: f64,
    /// Prepupal development increment for today's temperature.
    pub prepupal_rate: f64,
    /// Latched once the autumn running mean temperature drops; switches the
    /// cocoon stage from prewinter to overwinter accumulation.
    pub prewinter_over: bool,
    /// Best pollen score anywhere today, reference for give-up decisions.
    pub best_pollen: f64,
}

impl DayContext {
    pub fn day_of_year(&self) -> u32 {
        self.date.ordinal()
    }

    fn is_first_of(&self, month: u32) -> bool {
        self.date.month() == month && self.date.day() == 1
    }

    fn past_emergence_deadline(&self) -> bool {
        self.date.month() >= 6
    }
}

/// Mutable world slices the state machine may touch. Nest mutation goes
/// through the nest's own synchronized interface; everything else is only
/// reached from the single stepping thread.
pub struct StepEnv<'a> {
    pub params: &'a SpeciesParams,
    pub today: &'a DayContext,
    pub landscape: &'a mut Landscape,
    pub nests: &'a mut SlotMap<NestId, Nest>,
    pub mask: &'a ForageMask,
    pub mask_detailed: &'a ForageMaskDetailed,
    pub parasitism: &'a dyn ParasitismModel,
    /// Eggs laid today, registered in the agent arena after the day's
    /// stepping so handles stay stable mid-iteration.
    pub laid: Vec<LaidEgg>,
}

#[derive(Debug, Clone)]
pub struct LaidEgg {
    pub nest: NestId,
    pub sex: Sex,
    pub provision_mg: f64,
    /// This egg completes the nest's plan: seal right after it is appended,
    /// preserving the lay-then-seal order across the deferred registration.
    pub seal_after: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// State changed, step again today.
    Continue,
    Done,
    Died,
}

/// Once-per-day bookkeeping before the intra-day step loop: ageing, the
/// daily forage budget, and adult background mortality including the
/// lifespan cap. A death here seals the female's open nest.
pub fn begin_day(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    bee.age_days += 1;
    if let LifeStage::Adult(_) = bee.stage {
        bee.forage_hours_remaining = env.today.forage_hours;
        let over_lifespan = bee.age_days > env.params.adult_lifespan_days;
        if over_lifespan || !mortality::survives_day(env.params.adult_daily_mortality, rng) {
            return die(bee, env);
        }
    }
    StepResult::Continue
}

pub fn step(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    match bee.state {
        BeeState::Initial => st_initial(bee),
        BeeState::Develop => st_develop(bee, env, rng),
        BeeState::NextStage => st_next_stage(bee, env, rng),
        BeeState::Emerged => st_emerged(bee),
        BeeState::Disperse => st_disperse(bee, env, rng),
        BeeState::ReproductiveBehaviour => st_reproductive(bee, env, rng),
        BeeState::NestProvisioning => st_provisioning(bee, env),
        BeeState::Die => StepResult::Died,
    }
}

/// Terminal transition. If the dead agent is a provisioning female with an
/// open nest, the nest is sealed on her behalf.
fn die(bee: &mut Bee, env: &mut StepEnv) -> StepResult {
    if let LifeStage::Adult(_) = bee.stage {
        if let Some(nest_id) = bee.home_nest {
            if let Some(nest) = env.nests.get(nest_id) {
                nest.seal();
            }
        }
    }
    bee.state = BeeState::Die;
    StepResult::Died
}

fn st_initial(bee: &mut Bee) -> StepResult {
    bee.state = BeeState::Develop;
    StepResult::Continue
}

fn st_develop(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    let temp = env.today.temp_c;
    let nest_open = bee
        .home_nest
        .and_then(|id| env.nests.get(id))
        .map(Nest::is_open)
        .unwrap_or(false);

    match &mut bee.stage {
        LifeStage::Egg => {
            bee.thermal_units += development::degree_day(temp, env.params.egg_threshold_c);
            open_cell_exposure(bee, env, nest_open, rng);
            if mortality::survives_day(env.params.egg_daily_mortality, rng) {
                let complete =
                    development::thermal_complete(bee.thermal_units, env.params.egg_thermal());
                finish_or_wait(bee, complete)
            } else {
                die(bee, env)
            }
        }
        LifeStage::Larva => {
            bee.thermal_units += development::degree_day(temp, env.params.larva_threshold_c);
            open_cell_exposure(bee, env, nest_open, rng);
            if mortality::survives_day(env.params.larva_daily_mortality, rng) {
                let complete =
                    development::thermal_complete(bee.thermal_units, env.params.larva_thermal());
                finish_or_wait(bee, complete)
            } else {
                die(bee, env)
            }
        }
        LifeStage::Prepupa { target_days } => {
            let target = *target_days;
            bee.time_units += env.today.prepupal_rate;
            if !mortality::survives_day(env.params.prepupa_daily_mortality, rng) {
                return die(bee, env);
            }
            let complete = bee.time_units >= target;
            finish_or_wait(bee, complete)
        }
        LifeStage::Pupa => {
            bee.thermal_units += development::degree_day(temp, env.params.pupa_threshold_c);
            if !mortality::survives_day(env.params.pupa_daily_mortality, rng) {
                return die(bee, env);
            }
            let complete =
                development::thermal_complete(bee.thermal_units, env.params.pupa_thermal());
            finish_or_wait(bee, complete)
        }
        LifeStage::Cocoon(_) => st_overwinter(bee, env, rng),
        // Adults never sit in Develop; reaching here is a dispatch bug.
        LifeStage::Adult(_) => unreachable!("adult agent dispatched to Develop"),
    }
}

fn finish_or_wait(bee: &mut Bee, complete: bool) -> StepResult {
    if complete {
        bee.state = BeeState::NextStage;
        StepResult::Continue
    } else {
        StepResult::Done
    }
}

/// Daily parasitoid exposure for a developing individual whose cell is still
/// open. An attack marks the agent and lets development keep running until
/// the type-specific death point.
fn open_cell_exposure(bee: &mut Bee, env: &mut StepEnv, nest_open: bool, rng: &mut impl Rng) {
    if !nest_open {
        return;
    }
    bee.cell_open_days += 1;
    if bee.parasitism == Parasitism::None {
        let attack = env.parasitism.attack(bee.cell_open_days, rng);
        bee.parasitise(attack);
    }
}

/// The overwintering cocoon: prewinter heat sum, winter heat sum, the
/// 1 March countdown arming, warm-day countdown, the one-time winter
/// mortality test, and the 1 June deadline.
fn st_overwinter(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    let temp = env.today.temp_c;
    let microsite = bee
        .home_nest
        .and_then(|id| env.nests.get(id))
        .map(Nest::microsite_delay)
        .unwrap_or(0);
    let params = env.params;

    let LifeStage::Cocoon(state) = &mut bee.stage else {
        unreachable!("st_overwinter outside cocoon stage");
    };

    if state.emergence_counter.is_none() {
        if !env.today.prewinter_over {
            state.prewinter_dd += development::degree_day(temp, params.prewinter_threshold_c);
            return StepResult::Done;
        }
        if !env.today.is_first_of(3) {
            state.winter_dd += development::degree_day(temp, params.overwinter_threshold_c);
            return StepResult::Done;
        }
        let base = development::emergence_counter_base(params, state.winter_dd);
        let draw = development::draw_emergence_day(&params.emergence_day_weights, rng);
        state.emergence_counter = Some(base + draw + microsite);
        return StepResult::Done;
    }

    if env.today.past_emergence_deadline() {
        // Missed the season entirely.
        return die(bee, env);
    }

    if temp >= params.emergence_temp_c {
        let counter = state
            .emergence_counter
            .as_mut()
            .unwrap_or_else(|| unreachable!("checked above"));
        *counter -= 1;
        if *counter < 1 {
            let prewinter_dd = state.prewinter_dd;
            if !mortality::survives_winter(params, prewinter_dd, rng) {
                return die(bee, env);
            }
            bee.state = BeeState::NextStage;
            return StepResult::Continue;
        }
    }
    StepResult::Done
}

/// Swap the stage variant for the next one in the fixed sequence, carrying
/// mass, parasitism and nest along. Parasitised individuals die at their
/// type-specific point instead of progressing.
fn st_next_stage(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    match &bee.stage {
        LifeStage::Egg => {
            bee.enter_stage(LifeStage::Larva);
            bee.state = BeeState::Develop;
            StepResult::Done
        }
        LifeStage::Larva => {
            // A cleptoparasite larva has eaten the provision; the host dies
            // instead of spinning a cocoon.
            if bee.parasitism == Parasitism::Cleptoparasite {
                return die(bee, env);
            }
            let target = development::draw_prepupa_target_days(env.params.prepupa_mean_days, rng);
            bee.enter_stage(LifeStage::Prepupa {
                target_days: target,
            });
            bee.state = BeeState::Develop;
            StepResult::Done
        }
        LifeStage::Prepupa { .. } => {
            // Bombyliid larvae consume the host at pupation.
            if bee.parasitism == Parasitism::Bombylid {
                return die(bee, env);
            }
            bee.enter_stage(LifeStage::Pupa);
            bee.state = BeeState::Develop;
            StepResult::Done
        }
        LifeStage::Pupa => {
            bee.enter_stage(LifeStage::Cocoon(CocoonState::default()));
            bee.state = BeeState::Develop;
            StepResult::Done
        }
        LifeStage::Cocoon(_) => st_eclose(bee, env, rng),
        LifeStage::Adult(_) => unreachable!("no stage follows the adult"),
    }
}

/// Leave the cocoon. Anything parasitised dies now; males disperse from the
/// model; females take their adult body mass and start the prenesting
/// period.
fn st_eclose(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    if bee.parasitism != Parasitism::None {
        return die(bee, env);
    }
    if bee.sex == Sex::Male {
        return die(bee, env);
    }
    let mass = development::adult_mass_mg(env.params, bee.mass_mg);
    let eggs = development::egg_load(env.params, mass, rng);
    let base_provision = mass * env.params.provision_per_cocoon_mass;
    let decline = if eggs > 0 {
        base_provision * (env.params.lifetime_provision_loss_pct / 100.0) / eggs as f64
    } else {
        0.0
    };
    bee.mass_mg = mass;
    bee.age_days = 0;
    bee.home_nest = None;
    bee.enter_stage(LifeStage::Adult(FemaleState {
        prenesting_days_left: env.params.prenesting_days,
        eggs_remaining: eggs,
        nests_remaining: env.params.total_nests_possible,
        planned_this_nest: 0,
        laid_this_nest: 0,
        base_provision_mg: base_provision,
        provision_decline_mg: decline,
        eggs_laid_total: 0,
        current_cell: None,
    }));
    bee.state = BeeState::Emerged;
    StepResult::Done
}

fn st_emerged(bee: &mut Bee) -> StepResult {
    let Some(state) = bee.female_state_mut() else {
        unreachable!("Emerged outside adult stage");
    };
    if state.prenesting_days_left > 0 {
        state.prenesting_days_left -= 1;
        return StepResult::Done;
    }
    if state.eggs_remaining == 0 {
        // Nothing to provision for; she lives out her days unmodelled.
        bee.state = BeeState::Die;
        return StepResult::Died;
    }
    bee.state = BeeState::Disperse;
    StepResult::Continue
}

/// Total pollen on offer within homing range of a point, sampled over the
/// detailed mask's grid.
fn local_forage_score(landscape: &Landscape, mask: &ForageMaskDetailed, x: i32, y: i32) -> f64 {
    mask.offsets()
        .iter()
        .map(|&(dx, dy)| landscape.pollen_score_at(x + dx, y + dy))
        .sum()
}

/// Search for a nest site: a bounded number of candidate draws per day, each
/// a move of homing-distribution length in a uniform direction.
/// Cavity-bearing candidates are ranked by the forage on offer around them;
/// with no usable candidate the female ends the day wherever her last move
/// took her.
fn st_disperse(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    let mut best: Option<(i32, i32, f64)> = None;
    for _ in 0..env.params.find_nest_attempts {
        let distance = development::dispersal_distance_m(env.params, rng);
        let angle = rng.gen::<f64>() * std::f64::consts::TAU;
        let x = bee.x_m + (distance * angle.cos()) as i32;
        let y = bee.y_m + (distance * angle.sin()) as i32;
        bee.x_m = x;
        bee.y_m = y;
        if env.landscape.nesting_space_at(x, y) {
            let score = local_forage_score(env.landscape, env.mask_detailed, x, y);
            if best.map(|(_, _, s)| score > s).unwrap_or(true) {
                best = Some((x, y, score));
            }
        }
    }
    let Some((x, y, _)) = best else {
        // No site today; try again tomorrow from the new position.
        return StepResult::Done;
    };
    bee.x_m = x;
    bee.y_m = y;
    let microsite = rng.gen_range(0..=3);
    let nest_id = env.nests.insert(Nest::new(x, y, microsite));
    env.landscape.register_nest(x, y);
    bee.home_nest = Some(nest_id);
    plan_nest(bee, env.params, rng);
    bee.state = BeeState::ReproductiveBehaviour;
    StepResult::Continue
}

/// Decide how many cells this nest will hold, bounded by the configured
/// range and by the eggs she still carries.
fn plan_nest(bee: &mut Bee, params: &SpeciesParams, rng: &mut impl Rng) {
    let Some(state) = bee.female_state_mut() else {
        unreachable!("plan_nest outside adult stage");
    };
    let planned = rng.gen_range(params.min_eggs_per_nest..=params.max_eggs_per_nest);
    state.planned_this_nest = planned.min(state.eggs_remaining);
    state.laid_this_nest = 0;
}

/// Plan the next cell: target provision mass declines across her lifetime;
/// early cells in a nest get large provisions and become females, the outer
/// cells get small provisions and become males.
fn st_reproductive(bee: &mut Bee, env: &mut StepEnv, rng: &mut impl Rng) -> StepResult {
    let params = env.params;
    let Some(state) = bee.female_state_mut() else {
        unreachable!("ReproductiveBehaviour outside adult stage");
    };
    if state.eggs_remaining == 0 {
        return die(bee, env);
    }
    let female_share = (state.planned_this_nest as f64 * 0.55).ceil() as u32;
    let sex = if state.laid_this_nest < female_share {
        Sex::Female
    } else {
        Sex::Male
    };
    let declined =
        state.base_provision_mg - state.provision_decline_mg * state.eggs_laid_total as f64;
    let jitter = 0.9 + 0.2 * rng.gen::<f64>();
    let target = match sex {
        Sex::Female => declined * jitter,
        Sex::Male => (declined * 0.5 * jitter).max(params.male_min_provision_mg),
    };
    state.current_cell = Some(CellPlan {
        target_mg: target.max(params.male_min_provision_mg),
        progress_mg: 0.0,
        sex,
    });
    bee.state = BeeState::NestProvisioning;
    StepResult::Continue
}

/// Forage efficiency over an adult female's life: a short learning ramp,
/// full efficiency through the prime weeks, senescent decline after.
fn forage_efficiency(age_days: u32) -> f64 {
    match age_days {
        0..=1 => 0.5,
        2..=3 => 0.8,
        4..=29 => 1.0,
        30..=39 => 0.8,
        _ => 0.6,
    }
}

/// One invocation per foraging bout; each bout costs an hour of the day's
/// budget. Rings are searched nearest-first and the bout harvests the first
/// ring offering a usable score.
fn st_provisioning(bee: &mut Bee, env: &mut StepEnv) -> StepResult {
    let params = env.params;
    if bee.forage_hours_remaining < 1.0 {
        return StepResult::Done;
    }
    let Some(nest_id) = bee.home_nest else {
        // Lost the nest reference; go find another site.
        bee.state = BeeState::Disperse;
        return StepResult::Continue;
    };
    let (nx, ny) = match env.nests.get(nest_id) {
        Some(nest) => nest.location(),
        None => {
            bee.state = BeeState::Disperse;
            return StepResult::Continue;
        }
    };

    // Nearest-first ring search from the nest.
    let mut found: Option<(i32, i32, f64)> = None;
    let give_up_score = (params.pollen_give_up_threshold * env.today.best_pollen)
        .max(params.pollen_give_up_return);
    // Foraging stays inside the typical homing range.
    'rings: for ring in env.mask.rings_within(env.params.typical_homing_distance_m as i32) {
        let mut ring_best: Option<(i32, i32, f64)> = None;
        for &(dx, dy) in ring {
            let (x, y) = (nx + dx, ny + dy);
            let score = env.landscape.pollen_score_at(x, y);
            if score >= give_up_score
                && ring_best.map(|(_, _, best)| score > best).unwrap_or(true)
            {
                ring_best = Some((x, y, score));
            }
        }
        if ring_best.is_some() {
            found = ring_best;
            break 'rings;
        }
    }

    let Some((fx, fy, score)) = found else {
        // Nothing worth the flight anywhere in range today.
        bee.forage_hours_remaining = 0.0;
        return StepResult::Done;
    };

    env.landscape.register_forager(fx, fy);
    let competition = env
        .landscape
        .competition_at(fx, fy, params.density_removal_const);
    let gain_mg =
        score * params.pollen_score_to_mg * forage_efficiency(bee.age_days) / competition;
    bee.forage_hours_remaining -= 1.0;

    let Some(state) = bee.female_state_mut() else {
        unreachable!("NestProvisioning outside adult stage");
    };
    let Some(cell) = state.current_cell.as_mut() else {
        bee.state = BeeState::ReproductiveBehaviour;
        return StepResult::Continue;
    };
    cell.progress_mg += gain_mg;
    if cell.progress_mg < cell.target_mg {
        return StepResult::Continue;
    }

    // Cell fully provisioned: lay the egg.
    let (sex, provision) = (cell.sex, cell.target_mg);
    state.current_cell = None;
    state.laid_this_nest += 1;
    state.eggs_laid_total += 1;
    state.eggs_remaining -= 1;
    let nest_full = state.laid_this_nest >= state.planned_this_nest;
    let eggs_left = state.eggs_remaining;
    env.laid.push(LaidEgg {
        nest: nest_id,
        sex,
        provision_mg: provision,
        seal_after: nest_full,
    });

    if !nest_full {
        bee.state = BeeState::ReproductiveBehaviour;
        return StepResult::Continue;
    }

    // Nest complete. The seal rides on the buffered egg so the final cell is
    // appended before the nest closes; only moving on happens now.
    bee.home_nest = None;
    let Some(state) = bee.female_state_mut() else {
        unreachable!("NestProvisioning outside adult stage");
    };
    state.nests_remaining = state.nests_remaining.saturating_sub(1);
    if eggs_left == 0 || state.nests_remaining == 0 {
        bee.state = BeeState::Die;
        return StepResult::Died;
    }
    bee.state = BeeState::Disperse;
    StepResult::Continue
}
