//! End-of-day sweep: counts the day's emergences, removes dead agents from
//! the arena, and discards sealed nests whose occupants are all gone so
//! their cavities free up.

use anyhow::Result;

use crate::{
    bee::LifeStage,
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(
        &mut self,
        _ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        // Freshly eclosed females still have their reset age; begin_day
        // bumps it tomorrow.
        let emerged = world
            .bees
            .values()
            .filter(|bee| matches!(bee.stage, LifeStage::Adult(_)) && bee.age_days == 0)
            .count();
        world.stats.females_emerged += emerged as u64;

        let before = world.bees.len();
        world.bees.retain(|_, bee| bee.is_alive());
        world.stats.deaths += (before - world.bees.len()) as u64;

        // Dead occupants stay in their cells as inert entries; once every
        // occupant of a sealed nest is gone the nest itself is discarded.
        let empty: Vec<_> = world
            .nests
            .iter()
            .filter(|(_, nest)| {
                if nest.is_open() {
                    return false;
                }
                let cells = nest.lock();
                cells
                    .occupants()
                    .iter()
                    .all(|id| !world.bees.contains_key(*id))
            })
            .map(|(id, _)| id)
            .collect();
        for id in empty {
            if let Some(nest) = world.nests.remove(id) {
                let (x, y) = nest.location();
                world.landscape.release_nest(x, y);
            }
        }
        Ok(())
    }
}
