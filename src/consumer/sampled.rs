//! A consumer whose energy usage is given by sampled points on its performance curve.
use super::{Consumer, ConsumerID, ConsumerResult};
use crate::operational_setting::ConsumerOperationalSettings;
use crate::time_series::TimeSeries;
use anyhow::{Result, ensure};
use float_cmp::approx_eq;
use itertools::Itertools;

/// A consumer with energy usage interpolated linearly between sampled `(rate, energy)` points.
///
/// The largest sampled rate is the consumer's capacity. Rates between zero and the smallest
/// sample use the energy usage of the smallest sample (e.g. recirculation); a zero rate means the
/// consumer is switched off and uses nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledConsumer {
    id: ConsumerID,
    rates: Vec<f64>,
    energy_usage: Vec<f64>,
    power_factor: Option<f64>,
}

impl SampledConsumer {
    /// Create a new sampled consumer.
    ///
    /// # Arguments
    ///
    /// * `id` - The consumer's ID
    /// * `rates` - Sampled rates, in increasing order
    /// * `energy_usage` - Energy usage at each sampled rate
    /// * `power_factor` - If given, power is reported as energy usage multiplied by this factor
    pub fn new(
        id: ConsumerID,
        rates: Vec<f64>,
        energy_usage: Vec<f64>,
        power_factor: Option<f64>,
    ) -> Result<Self> {
        ensure!(!rates.is_empty(), "Consumer {id} must have at least one sample");
        ensure!(
            rates.len() == energy_usage.len(),
            "Consumer {id} has {} sampled rates but {} energy usage values",
            rates.len(),
            energy_usage.len()
        );
        ensure!(
            rates.iter().chain(&energy_usage).all(|v| v.is_finite()),
            "Sampled values for consumer {id} must be finite"
        );
        ensure!(
            rates[0] >= 0.0 && rates.iter().tuple_windows().all(|(a, b)| a < b),
            "Sampled rates for consumer {id} must be non-negative and strictly increasing"
        );
        if let Some(factor) = power_factor {
            ensure!(
                factor.is_finite() && factor >= 0.0,
                "Power factor for consumer {id} must be a non-negative number"
            );
        }

        Ok(Self {
            id,
            rates,
            energy_usage,
            power_factor,
        })
    }

    /// The largest rate the consumer can handle
    pub fn max_rate(&self) -> f64 {
        self.rates[self.rates.len() - 1]
    }

    /// Interpolate the energy usage for a rate within capacity
    fn interpolate(&self, rate: f64) -> f64 {
        if rate <= 0.0 {
            return 0.0;
        }

        let upper = self.rates.partition_point(|&r| r < rate);
        if upper == 0 {
            return self.energy_usage[0];
        }
        if upper == self.rates.len() {
            return self.energy_usage[upper - 1];
        }

        let (r0, r1) = (self.rates[upper - 1], self.rates[upper]);
        let (e0, e1) = (self.energy_usage[upper - 1], self.energy_usage[upper]);
        e0 + (e1 - e0) * (rate - r0) / (r1 - r0)
    }

    /// Whether the consumer can operate at the given rate and pressures
    fn is_valid(&self, rate: f64, suction_pressure: f64, discharge_pressure: f64) -> bool {
        if rate <= 0.0 {
            // Switching off is always possible but negative rates are not
            return approx_eq!(f64, rate, 0.0);
        }

        let within_capacity = rate < self.max_rate() || approx_eq!(f64, rate, self.max_rate());
        within_capacity && discharge_pressure >= suction_pressure
    }
}

impl Consumer for SampledConsumer {
    fn id(&self) -> &ConsumerID {
        &self.id
    }

    fn evaluate(&self, settings: &ConsumerOperationalSettings) -> ConsumerResult {
        let rate = settings.total_rate();
        let pressures = settings
            .suction_pressure
            .zip_with(&settings.discharge_pressure, |&s, &d| (s, d));
        let is_valid = rate.zip_with(&pressures, |&rate, &(suction, discharge)| {
            self.is_valid(rate, suction, discharge)
        });
        let energy_usage = rate.map(|&rate| self.interpolate(rate.min(self.max_rate())));
        let power = self
            .power_factor
            .map(|factor| energy_usage.map(|energy| energy * factor));

        ConsumerResult {
            id: self.id.clone(),
            is_valid,
            rate,
            energy_usage,
            power,
        }
    }

    fn get_max_rate(&self, settings: &ConsumerOperationalSettings) -> TimeSeries<f64> {
        TimeSeries::filled(settings.timesteps(), self.max_rate())
    }
}
