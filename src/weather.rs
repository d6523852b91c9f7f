//! Daily weather driving the model: one record per simulated day, a
//! synthetic-year generator for scenarios without measured series, and the
//! flight-weather rule that turns a day's conditions into forage hours.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;

use crate::params::SpeciesParams;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeatherDay {
    pub temp_c: f64,
    #[serde(default)]
    pub wind_ms: f64,
    #[serde(default)]
    pub precip_mm: f64,
}

/// Window length for the running mean used to detect the end of prewintering.
const MEAN_WINDOW_DAYS: usize = 10;

/// Running mean temperature falling below this after midsummer marks the end
/// of the prewintering phase.
pub const PREWINTER_END_MEAN_C: f64 = 13.0;

#[derive(Debug, Clone)]
pub struct WeatherSeries {
    days: Vec<WeatherDay>,
}

impl WeatherSeries {
    pub fn from_records(days: Vec<WeatherDay>) -> Self {
        Self { days }
    }

    /// Sinusoidal annual cycle with seeded day-to-day noise. `day_count` may
    /// span several years; day 0 is 1 January.
    pub fn synthetic(seed: u64, day_count: usize, mean_c: f64, amplitude_c: f64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut days = Vec::with_capacity(day_count);
        for day in 0..day_count {
            let phase = (day % 365) as f64 / 365.0 * std::f64::consts::TAU;
            // Coldest around mid January, warmest mid July.
            let seasonal = mean_c - amplitude_c * (phase + 0.25).cos();
            let temp_c = seasonal + rng.gen_range(-2.5..2.5);
            let wind_ms = rng.gen_range(0.0..10.0);
            let precip_mm = if rng.gen_bool(0.3) {
                rng.gen_range(0.1..8.0)
            } else {
                0.0
            };
            days.push(WeatherDay {
                temp_c,
                wind_ms,
                precip_mm,
            });
        }
        Self { days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Day index wraps, so multi-year runs over a one-year series repeat it.
    pub fn day(&self, index: usize) -> WeatherDay {
        self.days[index % self.days.len()]
    }

    /// Mean temperature over the trailing window ending at `index`.
    pub fn trailing_mean_temp(&self, index: usize) -> f64 {
        let start = index.saturating_sub(MEAN_WINDOW_DAYS - 1);
        let mut sum = 0.0;
        let mut n = 0;
        for i in start..=index {
            sum += self.day(i).temp_c;
            n += 1;
        }
        sum / n as f64
    }
}

/// Hours of flight-capable weather on a day. A daily-mean approximation of
/// an hourly integration: wind or rain over the limit grounds the whole day,
/// otherwise the budget scales with how far the temperature clears the
/// flight minimum.
pub fn forage_hours(day: WeatherDay, params: &SpeciesParams) -> f64 {
    if day.wind_ms >= params.max_flight_wind_ms || day.precip_mm >= params.max_flight_precip_mm {
        return 0.0;
    }
    let excess = day.temp_c - params.min_flight_temp_c;
    if excess <= 0.0 {
        return 0.0;
    }
    let fraction = (excess / 10.0).min(1.0);
    params.max_forage_hours * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm(temp_c: f64) -> WeatherDay {
        WeatherDay {
            temp_c,
            wind_ms: 1.0,
            precip_mm: 0.0,
        }
    }

    #[test]
    fn cold_windy_or_wet_days_ground_flight() {
        let params = SpeciesParams::default();
        assert_eq!(forage_hours(calm(4.0), &params), 0.0);
        let windy = WeatherDay {
            temp_c: 20.0,
            wind_ms: 9.0,
            precip_mm: 0.0,
        };
        assert_eq!(forage_hours(windy, &params), 0.0);
        let wet = WeatherDay {
            temp_c: 20.0,
            wind_ms: 1.0,
            precip_mm: 2.0,
        };
        assert_eq!(forage_hours(wet, &params), 0.0);
    }

    #[test]
    fn warm_calm_day_gives_full_budget() {
        let params = SpeciesParams::default();
        assert_eq!(forage_hours(calm(20.0), &params), params.max_forage_hours);
        let partial = forage_hours(calm(9.0), &params);
        assert!(partial > 0.0 && partial < params.max_forage_hours);
    }

    #[test]
    fn synthetic_year_is_reproducible_and_seasonal() {
        let a = WeatherSeries::synthetic(11, 365, 9.0, 9.0);
        let b = WeatherSeries::synthetic(11, 365, 9.0, 9.0);
        assert_eq!(a.day(100).temp_c, b.day(100).temp_c);
        let january = a.trailing_mean_temp(15);
        let july = a.trailing_mean_temp(196);
        assert!(july > january + 8.0);
    }

    #[test]
    fn series_wraps_across_years() {
        let series = WeatherSeries::synthetic(3, 365, 9.0, 9.0);
        assert_eq!(series.day(400).temp_c, series.day(35).temp_c);
    }
}
