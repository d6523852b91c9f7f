//! Daily flora refresh: bloom-curve pollen scores across the grid and the
//! forager-density reset, plus the day's best score for give-up decisions.

use anyhow::Result;
use chrono::Datelike;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    world::World,
};

pub struct FloraSystem;

impl FloraSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FloraSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for FloraSystem {
    fn name(&self) -> &str {
        "flora"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.landscape.refresh(ctx.date.ordinal());
        world.today.best_pollen = world.landscape.best_pollen_score();
        Ok(())
    }
}
