//! Fixtures for tests

use crate::consumer::sampled::SampledConsumer;
use crate::operational_setting::ConsumerOperationalSettings;
use crate::time_series::{TimeSeries, Timestep};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.err().unwrap().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Shorthand for creating a date
pub fn date(year: i32, month: u32, day: u32) -> Timestep {
    Timestep::from_ymd_opt(year, month, day).unwrap()
}

/// The first day of each year from 2020 to 2023
#[fixture]
pub fn timesteps() -> Vec<Timestep> {
    (2020..=2023).map(|year| date(year, 1, 1)).collect()
}

/// A pump handling up to 10 units of rate
#[fixture]
pub fn sampled_consumer() -> SampledConsumer {
    SampledConsumer::new("pump".into(), vec![5.0, 10.0], vec![2.0, 4.0], None).unwrap()
}

/// Settings with a single rate component and fixed pressures
pub fn consumer_settings(timesteps: &[Timestep], rates: &[f64]) -> ConsumerOperationalSettings {
    ConsumerOperationalSettings {
        rates: vec![TimeSeries::new(timesteps.to_vec(), rates.to_vec()).unwrap()],
        suction_pressure: TimeSeries::filled(timesteps, 10.0),
        discharge_pressure: TimeSeries::filled(timesteps, 100.0),
        fluid_density: None,
    }
}
