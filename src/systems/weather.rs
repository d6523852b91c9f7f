//! Begin-of-day weather publication: today's conditions, the forage-hours
//! budget, the prepupal development rate for today's temperature, and the
//! prewinter/overwinter phase flag.

use anyhow::Result;
use chrono::Datelike;

use crate::{
    engine::{System, SystemContext},
    rng::SystemRng,
    weather::{self, PREWINTER_END_MEAN_C},
    world::World,
};

/// Day of year around which the flag lifecycle resets; mean temperatures
/// are still high then, so the latch cannot re-trip immediately.
const MIDSUMMER_DOY: u32 = 183;

pub struct WeatherSystem;

impl WeatherSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WeatherSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WeatherSystem {
    fn name(&self) -> &str {
        "weather"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let index = world.day_index();
        let day = world.weather.day(index);
        let doy = ctx.date.ordinal();

        if doy == MIDSUMMER_DOY {
            world.today.prewinter_over = false;
        }
        if !world.today.prewinter_over
            && doy > MIDSUMMER_DOY
            && world.weather.trailing_mean_temp(index) < PREWINTER_END_MEAN_C
        {
            world.today.prewinter_over = true;
        }

        world.today.date = ctx.date;
        world.today.temp_c = day.temp_c;
        world.today.forage_hours = weather::forage_hours(day, &world.params);
        world.today.prepupal_rate = world.params.prepupal_rate_at(day.temp_c);
        Ok(())
    }
}
