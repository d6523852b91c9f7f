//! The agent: one `Bee` struct for the whole life cycle. The stage tag and
//! its variant payload replace the per-stage class hierarchy such a model is
//! often written with; a stage transition rewrites the tag in place instead of
//! substituting a new object into the nest.

use serde::Serialize;
use slotmap::new_key_type;

use crate::nest::NestId;

new_key_type! {
    pub struct BeeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sex {
    Female,
    Male,
}

/// Set at most once per individual and never cleared; once non-`None` the
/// individual is on an irreversible path to death at a type-specific time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Parasitism {
    None,
    Bombylid,
    Cleptoparasite,
}

/// Behavioural state consumed and produced by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeeState {
    Initial,
    Develop,
    NextStage,
    Disperse,
    NestProvisioning,
    ReproductiveBehaviour,
    Emerged,
    Die,
}

#[derive(Debug, Clone)]
pub enum LifeStage {
    Egg,
    Larva,
    /// Target duration in rate-weighted days, drawn once at stage entry.
    Prepupa { target_days: f64 },
    Pupa,
    Cocoon(CocoonState),
    Adult(FemaleState),
}

impl LifeStage {
    pub fn label(&self) -> &'static str {
        match self {
            LifeStage::Egg => "egg",
            LifeStage::Larva => "larva",
            LifeStage::Prepupa { .. } => "prepupa",
            LifeStage::Pupa => "pupa",
            LifeStage::Cocoon(_) => "cocoon",
            LifeStage::Adult(_) => "adult",
        }
    }
}

/// Overwintering bookkeeping: two separately accumulated degree-day sums and
/// the spring countdown.
#[derive(Debug, Clone, Default)]
pub struct CocoonState {
    pub prewinter_dd: f64,
    pub winter_dd: f64,
    /// Set on 1 March from the winter degree-day sum; counts down on warm
    /// days until emergence.
    pub emergence_counter: Option<i32>,
}

/// Current cell under construction in the female's nest.
#[derive(Debug, Clone)]
pub struct CellPlan {
    pub target_mg: f64,
    pub progress_mg: f64,
    pub sex: Sex,
}

#[derive(Debug, Clone)]
pub struct FemaleState {
    pub prenesting_days_left: u32,
    pub eggs_remaining: u32,
    pub nests_remaining: u32,
    /// Cells planned and laid in the nest currently under construction.
    pub planned_this_nest: u32,
    pub laid_this_nest: u32,
    /// Target provision mass for the first (largest) cell; later cells
    /// shrink by `provision_decline_mg` per egg laid over her lifetime.
    pub base_provision_mg: f64,
    pub provision_decline_mg: f64,
    pub eggs_laid_total: u32,
    pub current_cell: Option<CellPlan>,
}

#[derive(Debug, Clone)]
pub struct Bee {
    pub state: BeeState,
    pub stage: LifeStage,
    pub sex: Sex,
    pub age_days: u32,
    /// Provision mass while developing; body mass once adult. Always mg.
    pub mass_mg: f64,
    pub parasitism: Parasitism,
    pub home_nest: Option<NestId>,
    /// Map position in metres. Developing stages sit at their natal nest;
    /// adult females move.
    pub x_m: i32,
    pub y_m: i32,
    /// Stage-local degree-day sum, reset to zero on every stage transition.
    pub thermal_units: f64,
    /// Stage-local elapsed-time sum for the prepupal stage, reset likewise.
    pub time_units: f64,
    /// Days this individual's cell has been open to parasitoid attack.
    pub cell_open_days: u32,
    pub forage_hours_remaining: f64,
}

impl Bee {
    /// A freshly laid egg in its natal nest.
    pub fn egg(sex: Sex, provision_mg: f64, nest: NestId, x_m: i32, y_m: i32) -> Self {
        Self {
            state: BeeState::Initial,
            stage: LifeStage::Egg,
            sex,
            age_days: 0,
            mass_mg: provision_mg,
            parasitism: Parasitism::None,
            home_nest: Some(nest),
            x_m,
            y_m,
            thermal_units: 0.0,
            time_units: 0.0,
            cell_open_days: 0,
            forage_hours_remaining: 0.0,
        }
    }

    /// A start-of-simulation overwintering individual, part-way through the
    /// winter so the first spring produces a realistic emergence phenology.
    pub fn overwintering(
        sex: Sex,
        provision_mg: f64,
        nest: NestId,
        x_m: i32,
        y_m: i32,
        winter_dd: f64,
    ) -> Self {
        Self {
            state: BeeState::Develop,
            stage: LifeStage::Cocoon(CocoonState {
                prewinter_dd: 0.0,
                winter_dd,
                emergence_counter: None,
            }),
            sex,
            age_days: 0,
            mass_mg: provision_mg,
            parasitism: Parasitism::None,
            home_nest: Some(nest),
            x_m,
            y_m,
            thermal_units: 0.0,
            time_units: 0.0,
            cell_open_days: 0,
            forage_hours_remaining: 0.0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state != BeeState::Die
    }

    /// Mark parasitised, first writer wins. Returns whether the status was
    /// actually set by this call.
    pub fn parasitise(&mut self, kind: Parasitism) -> bool {
        if self.parasitism != Parasitism::None || kind == Parasitism::None {
            return false;
        }
        self.parasitism = kind;
        true
    }

    /// Move to the given stage, resetting the stage-local counters.
    pub fn enter_stage(&mut self, stage: LifeStage) {
        self.stage = stage;
        self.thermal_units = 0.0;
        self.time_units = 0.0;
    }

    pub fn female_state(&self) -> Option<&FemaleState> {
        match &self.stage {
            LifeStage::Adult(state) => Some(state),
            _ => None,
        }
    }

    pub fn female_state_mut(&mut self) -> Option<&mut FemaleState> {
        match &mut self.stage {
            LifeStage::Adult(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn nest_id() -> NestId {
        let mut arena: SlotMap<NestId, ()> = SlotMap::with_key();
        arena.insert(())
    }

    #[test]
    fn parasitism_is_write_once() {
        let mut bee = Bee::egg(Sex::Female, 300.0, nest_id(), 0, 0);
        assert!(bee.parasitise(Parasitism::Bombylid));
        assert!(!bee.parasitise(Parasitism::Cleptoparasite));
        assert_eq!(bee.parasitism, Parasitism::Bombylid);
        assert!(!bee.parasitise(Parasitism::None));
        assert_eq!(bee.parasitism, Parasitism::Bombylid);
    }

    #[test]
    fn stage_entry_resets_counters() {
        let mut bee = Bee::egg(Sex::Male, 120.0, nest_id(), 0, 0);
        bee.thermal_units = 86.0;
        bee.time_units = 3.0;
        bee.enter_stage(LifeStage::Larva);
        assert_eq!(bee.thermal_units, 0.0);
        assert_eq!(bee.time_units, 0.0);
        assert_eq!(bee.stage.label(), "larva");
    }
}
