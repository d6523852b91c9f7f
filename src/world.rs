//! Shared simulation state: the calendar, the landscape, the agent and nest
//! arenas, the published day context, and snapshot assembly.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use slotmap::SlotMap;

use crate::bee::{Bee, BeeId, LifeStage, Parasitism, Sex};
use crate::behaviour::DayContext;
use crate::landscape::Landscape;
use crate::mask::{ForageMask, ForageMaskDetailed};
use crate::nest::{Nest, NestId};
use crate::parasitism::ParasitismModel;
use crate::params::SpeciesParams;
use crate::weather::WeatherSeries;

/// Running totals accumulated by the bookkeeping system.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunStats {
    pub eggs_laid: u64,
    pub deaths: u64,
    pub females_emerged: u64,
    pub nests_started: u64,
}

#[derive(Debug, Serialize)]
pub struct StageCounts {
    pub eggs: usize,
    pub larvae: usize,
    pub prepupae: usize,
    pub pupae: usize,
    pub cocoons: usize,
    pub adults: usize,
}

#[derive(Debug, Serialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub date: NaiveDate,
    pub temp_c: f64,
    pub population: usize,
    pub stages: StageCounts,
    pub parasitised: usize,
    pub nests: usize,
    pub open_nests: usize,
    pub stats: RunStats,
}

pub struct World {
    tick: u64,
    date: NaiveDate,
    pub params: SpeciesParams,
    pub weather: WeatherSeries,
    pub landscape: Landscape,
    pub bees: SlotMap<BeeId, Bee>,
    pub nests: SlotMap<NestId, Nest>,
    pub mask: ForageMask,
    pub mask_detailed: ForageMaskDetailed,
    pub parasitism: Box<dyn ParasitismModel>,
    pub today: DayContext,
    pub stats: RunStats,
}

impl World {
    pub fn new(
        start_date: NaiveDate,
        params: SpeciesParams,
        weather: WeatherSeries,
        landscape: Landscape,
        parasitism: Box<dyn ParasitismModel>,
    ) -> Self {
        let mask = ForageMask::new(params.mask_step_m, params.mask_rings);
        let mask_detailed =
            ForageMaskDetailed::new(params.detailed_mask_step_m, params.detailed_mask_radius_m);
        let today = DayContext {
            date: start_date,
            temp_c: 0.0,
            forage_hours: 0.0,
            prepupal_rate: 0.0,
            // A simulation starting in winter begins with prewintering
            // already behind the overwintering cohort.
            prewinter_over: start_date.month() < 7,
            best_pollen: 0.0,
        };
        Self {
            tick: 0,
            date: start_date,
            params,
            weather,
            landscape,
            bees: SlotMap::with_key(),
            nests: SlotMap::with_key(),
            mask,
            mask_detailed,
            parasitism,
            today,
            stats: RunStats::default(),
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Index into the weather series for the current day.
    pub fn day_index(&self) -> usize {
        self.tick as usize
    }

    pub fn advance_day(&mut self) {
        self.tick += 1;
        self.date = self
            .date
            .succ_opt()
            .expect("simulation date overflowed the calendar");
    }

    /// Seed the starting cohort: overwintering cocoons in fresh sealed nests
    /// scattered over nesting habitat.
    pub fn seed_overwintering(
        &mut self,
        count: usize,
        provision_range_mg: (f64, f64),
        rng: &mut impl rand::Rng,
    ) {
        let (lo, hi) = provision_range_mg;
        let mut placed = 0;
        let mut guard = 0;
        while placed < count && guard < count * 200 {
            guard += 1;
            let x = rng.gen_range(0..self.landscape.width_m());
            let y = rng.gen_range(0..self.landscape.height_m());
            if !self.landscape.nesting_space_at(x, y) {
                continue;
            }
            let microsite = rng.gen_range(0..=3);
            let nest = Nest::new(x, y, microsite);
            let nest_id = self.nests.insert(nest);
            self.landscape.register_nest(x, y);
            let provision = rng.gen_range(lo..=hi);
            let sex = if rng.gen_bool(0.55) {
                Sex::Female
            } else {
                Sex::Male
            };
            let bee = Bee::overwintering(
                sex,
                provision,
                nest_id,
                x,
                y,
                self.params.initial_overwinter_dd,
            );
            let bee_id = self.bees.insert(bee);
            let nest = &self.nests[nest_id];
            nest.append_cell(bee_id);
            nest.seal();
            placed += 1;
        }
    }

    pub fn population(&self) -> usize {
        self.bees.len()
    }

    pub fn stage_counts(&self) -> StageCounts {
        let mut counts = StageCounts {
            eggs: 0,
            larvae: 0,
            prepupae: 0,
            pupae: 0,
            cocoons: 0,
            adults: 0,
        };
        for bee in self.bees.values() {
            match bee.stage {
                LifeStage::Egg => counts.eggs += 1,
                LifeStage::Larva => counts.larvae += 1,
                LifeStage::Prepupa { .. } => counts.prepupae += 1,
                LifeStage::Pupa => counts.pupae += 1,
                LifeStage::Cocoon(_) => counts.cocoons += 1,
                LifeStage::Adult(_) => counts.adults += 1,
            }
        }
        counts
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let parasitised = self
            .bees
            .values()
            .filter(|bee| bee.parasitism != Parasitism::None)
            .count();
        let open_nests = self.nests.values().filter(|nest| nest.is_open()).count();
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            date: self.date,
            temp_c: self.today.temp_c,
            population: self.population(),
            stages: self.stage_counts(),
            parasitised,
            nests: self.nests.len(),
            open_nests,
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landscape::HabitatMix;
    use crate::parasitism::SimpleParasitism;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_world() -> World {
        let params = SpeciesParams::default();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mix = HabitatMix {
            cropland: 0.0,
            grassland: 0.5,
            hedgerow: 0.5,
            woodland: 0.0,
            garden: 0.0,
        };
        let landscape = Landscape::generate(500, 500, 10, &mix, &mut rng).unwrap();
        let weather = WeatherSeries::synthetic(8, 365, 9.0, 9.0);
        let parasitism = Box::new(SimpleParasitism::new(&params));
        World::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            params,
            weather,
            landscape,
            parasitism,
        )
    }

    #[test]
    fn seeding_places_sealed_single_cell_nests() {
        let mut world = test_world();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        world.seed_overwintering(50, (80.0, 600.0), &mut rng);
        assert_eq!(world.population(), 50);
        assert_eq!(world.nests.len(), 50);
        assert!(world.nests.values().all(|nest| !nest.is_open()));
        assert!(world.nests.values().all(|nest| nest.cell_count() == 1));
        assert_eq!(world.stage_counts().cocoons, 50);
    }

    #[test]
    fn calendar_advances_with_ticks() {
        let mut world = test_world();
        world.advance_day();
        world.advance_day();
        assert_eq!(world.tick(), 2);
        assert_eq!(world.date(), NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
    }
}
