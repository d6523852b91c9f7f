//! Steps every live agent through the day: once-per-day bookkeeping, then
//! the intra-day state-machine loop until each agent reports done or dead,
//! then registration of the day's newly laid eggs.

use anyhow::Result;

use crate::{
    bee::{Bee, BeeId},
    behaviour::{self, StepEnv, StepResult},
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

/// Upper bound on same-day re-dispatches per agent. Provisioning loops are
/// already bounded by the forage-hour budget; this catches a transition
/// cycle that would otherwise spin.
const MAX_INTRA_DAY_STEPS: u32 = 64;

pub struct BeeSystem;

impl BeeSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BeeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BeeSystem {
    fn name(&self) -> &str {
        "bees"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let mut ids: Vec<BeeId> = world.bees.keys().collect();
        ids.sort();

        let nests_before = world.nests.len();
        let mut env = StepEnv {
            params: &world.params,
            today: &world.today,
            landscape: &mut world.landscape,
            nests: &mut world.nests,
            mask: &world.mask,
            mask_detailed: &world.mask_detailed,
            parasitism: world.parasitism.as_ref(),
            laid: Vec::new(),
        };

        for id in ids {
            let Some(bee) = world.bees.get_mut(id) else {
                continue;
            };
            if !bee.is_alive() {
                continue;
            }
            if behaviour::begin_day(bee, &mut env, rng) == StepResult::Died {
                continue;
            }
            let mut guard = 0;
            loop {
                match behaviour::step(bee, &mut env, rng) {
                    StepResult::Continue => {
                        guard += 1;
                        if guard > MAX_INTRA_DAY_STEPS {
                            debug_assert!(
                                false,
                                "agent spun past the intra-day step bound in state {:?}",
                                bee.state
                            );
                            break;
                        }
                    }
                    StepResult::Done | StepResult::Died => break,
                }
            }
        }

        let laid = std::mem::take(&mut env.laid);
        drop(env);

        world.stats.nests_started += (world.nests.len() - nests_before) as u64;
        for egg in laid {
            let Some(nest) = world.nests.get(egg.nest) else {
                continue;
            };
            let (x, y) = nest.location();
            let bee_id = world
                .bees
                .insert(Bee::egg(egg.sex, egg.provision_mg, egg.nest, x, y));
            if nest.append_cell(bee_id) {
                world.stats.eggs_laid += 1;
                if egg.seal_after {
                    nest.seal();
                }
            } else {
                // The nest was sealed after laying (mother died later the
                // same day); the brood is lost.
                world.bees.remove(bee_id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::bee::{BeeState, CellPlan, FemaleState, LifeStage, Sex};
    use crate::landscape::{HabitatMix, Landscape};
    use crate::nest::Nest;
    use crate::parasitism::SimpleParasitism;
    use crate::params::SpeciesParams;
    use crate::rng::RngManager;
    use crate::weather::WeatherSeries;
    use crate::world::World;

    /// A mid-bloom world with a single provisioning female one cell away from
    /// completing her nest.
    fn world_with_finishing_mother() -> (World, crate::nest::NestId) {
        let mut params = SpeciesParams::default();
        params.adult_daily_mortality = 0.0;
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let mix = HabitatMix {
            cropland: 0.0,
            grassland: 0.0,
            hedgerow: 1.0,
            woodland: 0.0,
            garden: 0.0,
        };
        let landscape = Landscape::generate(300, 300, 10, &mix, &mut rng).unwrap();
        let weather = WeatherSeries::synthetic(12, 365, 9.0, 9.0);
        let parasitism = Box::new(SimpleParasitism::new(&params));
        let date = NaiveDate::from_ymd_opt(2023, 5, 5).unwrap();
        let mut world = World::new(date, params, weather, landscape, parasitism);
        world.landscape.refresh(date.ordinal());
        world.today.temp_c = 18.0;
        world.today.forage_hours = 8.0;
        world.today.best_pollen = world.landscape.best_pollen_score();

        let nest_id = world.nests.insert(Nest::new(150, 150, 0));
        world.landscape.register_nest(150, 150);
        let mut mother = Bee::egg(Sex::Female, 0.0, nest_id, 150, 150);
        mother.age_days = 10;
        mother.mass_mg = 100.0;
        mother.enter_stage(LifeStage::Adult(FemaleState {
            prenesting_days_left: 0,
            eggs_remaining: 1,
            nests_remaining: 5,
            planned_this_nest: 1,
            laid_this_nest: 0,
            base_provision_mg: 300.0,
            provision_decline_mg: 0.0,
            eggs_laid_total: 0,
            current_cell: Some(CellPlan {
                target_mg: 20.0,
                progress_mg: 0.0,
                sex: Sex::Female,
            }),
        }));
        mother.state = BeeState::NestProvisioning;
        world.bees.insert(mother);
        (world, nest_id)
    }

    #[test]
    fn final_egg_lands_in_the_nest_before_it_seals() {
        let (mut world, nest_id) = world_with_finishing_mother();
        let date = world.date();
        let mut manager = RngManager::new(3);
        let mut stream = manager.stream("bees");
        let ctx = SystemContext {
            tick: 0,
            date,
            scenario_name: "test",
        };
        let mut system = BeeSystem::new();
        system.run(&ctx, &mut world, &mut stream).unwrap();

        let nest = &world.nests[nest_id];
        assert!(!nest.is_open());
        assert_eq!(nest.cell_count(), 1);
        assert_eq!(world.stats.eggs_laid, 1);

        let brood: Vec<&Bee> = world
            .bees
            .values()
            .filter(|bee| matches!(bee.stage, LifeStage::Egg))
            .collect();
        assert_eq!(brood.len(), 1);
        assert_eq!(brood[0].home_nest, Some(nest_id));
    }
}
