//! Operational settings: the requested rates and pressures which drive each consumer.
//!
//! Settings are immutable values. Adjusting a setting (e.g. to account for crossover) returns a
//! new setting, as the same base setting is reused across several evaluation attempts.
use crate::consumer::ConsumerID;
use crate::crossover::Crossover;
use crate::time_series::{TimeSeries, Timestep};
use anyhow::{Context, Result, bail, ensure};
use std::ops::Range;

/// The requested process variables for a single consumer
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerOperationalSettings {
    /// Inlet rate components. The first is the consumer's own requested rate; any others are
    /// additional inlet streams, such as flow sent here from other consumers.
    pub rates: Vec<TimeSeries<f64>>,
    /// Suction (inlet) pressure
    pub suction_pressure: TimeSeries<f64>,
    /// Discharge (outlet) pressure
    pub discharge_pressure: TimeSeries<f64>,
    /// Density of the fluid, for consumers which need it (e.g. pumps)
    pub fluid_density: Option<TimeSeries<f64>>,
}

impl ConsumerOperationalSettings {
    /// The timesteps covered by the setting
    pub fn timesteps(&self) -> &[Timestep] {
        self.suction_pressure.timesteps()
    }

    /// The sum of all inlet rate components
    pub fn total_rate(&self) -> TimeSeries<f64> {
        self.rates.iter().fold(
            TimeSeries::filled(self.timesteps(), 0.0),
            |total, rate| &total + rate,
        )
    }

    /// A copy of this setting with the inlet rates replaced
    pub fn with_rates(&self, rates: Vec<TimeSeries<f64>>) -> Self {
        Self {
            rates,
            ..self.clone()
        }
    }

    /// A copy of this setting restricted to a contiguous range of timesteps
    pub fn get_range(&self, range: Range<usize>) -> Self {
        Self {
            rates: self
                .rates
                .iter()
                .map(|rate| rate.get_range(range.clone()))
                .collect(),
            suction_pressure: self.suction_pressure.get_range(range.clone()),
            discharge_pressure: self.discharge_pressure.get_range(range.clone()),
            fluid_density: self
                .fluid_density
                .as_ref()
                .map(|density| density.get_range(range)),
        }
    }

    /// Interpret the rates as calendar day rates and convert them to stream day rates.
    ///
    /// `stream_day_rate = calendar_day_rate / regularity`, where regularity is the fraction of the
    /// time the installation is operating. Zero regularity gives a zero stream day rate.
    pub fn convert_rates_to_stream_day(&self, regularity: &TimeSeries<f64>) -> Self {
        let rates = self
            .rates
            .iter()
            .map(|rate| {
                rate.zip_with(regularity, |&rate, &regularity| {
                    if regularity > 0.0 {
                        rate / regularity
                    } else {
                        0.0
                    }
                })
            })
            .collect();

        self.with_rates(rates)
    }

    /// Check that every series in the setting covers exactly `timesteps`
    fn check_timesteps(&self, timesteps: &[Timestep]) -> Result<()> {
        ensure!(!self.rates.is_empty(), "At least one rate must be given");
        let series = self
            .rates
            .iter()
            .chain([&self.suction_pressure, &self.discharge_pressure])
            .chain(self.fluid_density.as_ref());
        for s in series {
            ensure!(
                s.timesteps() == timesteps,
                "Operational setting does not cover the time vector"
            );
        }

        Ok(())
    }
}

/// The operational settings for every consumer in a system, for one candidate configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SystemOperationalSettings {
    /// One setting per consumer, in the same order as the consumers in the system
    pub consumer_settings: Vec<ConsumerOperationalSettings>,
    /// Crossover to use with this setting, if different from the system's own
    pub crossover: Option<Vec<Crossover>>,
}

impl SystemOperationalSettings {
    /// Create settings which use the system's crossover
    pub fn new(consumer_settings: Vec<ConsumerOperationalSettings>) -> Self {
        Self {
            consumer_settings,
            crossover: None,
        }
    }

    /// The number of consumers the setting is defined for
    pub fn number_of_consumers(&self) -> usize {
        self.consumer_settings.len()
    }

    /// Get the setting for one consumer, restricted to the given range of timesteps
    pub fn get_consumer_operational_settings(
        &self,
        consumer_index: usize,
        range: Range<usize>,
    ) -> Result<ConsumerOperationalSettings> {
        let settings = self
            .consumer_settings
            .get(consumer_index)
            .with_context(|| format!("No operational setting for consumer {consumer_index}"))?;

        Ok(settings.get_range(range))
    }

    /// Check that the settings match the number of consumers and cover the time vector
    pub fn validate(&self, number_of_consumers: usize, timesteps: &[Timestep]) -> Result<()> {
        ensure!(
            self.number_of_consumers() == number_of_consumers,
            "Operational setting has {} elements but the system has {} consumers",
            self.number_of_consumers(),
            number_of_consumers
        );
        for (index, settings) in self.consumer_settings.iter().enumerate() {
            settings
                .check_timesteps(timesteps)
                .with_context(|| format!("Invalid operational setting for consumer {index}"))?;
        }

        Ok(())
    }
}

/// An operational setting given as lists of attributes, one element per consumer.
///
/// `cross_overs` gives the consumer to send excess rate to, counting consumers from 1. Zero
/// means no crossover, so `[3, 3, 0]` sends the excess of the first and second consumers to
/// the third, which has nowhere to send its own excess.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedOperationalSetting {
    /// Requested rate for each consumer
    pub rates: Vec<TimeSeries<f64>>,
    /// Suction pressure for each consumer
    pub suction_pressures: Vec<TimeSeries<f64>>,
    /// Discharge pressure for each consumer
    pub discharge_pressures: Vec<TimeSeries<f64>>,
    /// Crossover target for each consumer (1-based, 0 for none)
    pub cross_overs: Option<Vec<usize>>,
    /// Fluid density for each consumer
    pub fluid_densities: Option<Vec<TimeSeries<f64>>>,
}

impl IndexedOperationalSetting {
    /// The number of consumers the setting is defined for
    pub fn number_of_consumers(&self) -> usize {
        self.rates.len()
    }

    /// Check that all attribute lists have one element per consumer
    pub fn check_list_length(&self) -> Result<()> {
        let n_rates = self.rates.len();
        let check = |field: &str, len: usize| -> Result<()> {
            ensure!(
                len == n_rates,
                "All attributes in a consumer system operational setting must have the same \
                number of elements (corresponding to the number of consumers). The number of \
                elements in {field} ({len}) is not equal to the number of elements in rates \
                ({n_rates})."
            );
            Ok(())
        };

        check("suction_pressures", self.suction_pressures.len())?;
        check("discharge_pressures", self.discharge_pressures.len())?;
        if let Some(cross_overs) = &self.cross_overs {
            check("cross_overs", cross_overs.len())?;
        }
        if let Some(fluid_densities) = &self.fluid_densities {
            check("fluid_densities", fluid_densities.len())?;
        }

        Ok(())
    }

    /// Convert the 1-based `cross_overs` list into crossover edges between the given consumers
    fn get_crossover(&self, consumer_ids: &[ConsumerID]) -> Result<Option<Vec<Crossover>>> {
        let Some(cross_overs) = &self.cross_overs else {
            return Ok(None);
        };

        let mut crossover = Vec::new();
        for (from, &to) in consumer_ids.iter().zip(cross_overs) {
            if to == 0 {
                continue;
            }
            let Some(to_id) = consumer_ids.get(to - 1) else {
                bail!(
                    "Crossover target {to} for consumer {from} is out of range (there are {} \
                    consumers)",
                    consumer_ids.len()
                );
            };
            crossover.push(Crossover::new(from.clone(), to_id.clone()));
        }

        Ok(Some(crossover))
    }

    /// Convert into per-consumer settings for the given consumers
    pub fn into_system_settings(
        self,
        consumer_ids: &[ConsumerID],
    ) -> Result<SystemOperationalSettings> {
        self.check_list_length()?;
        ensure!(
            self.number_of_consumers() == consumer_ids.len(),
            "Operational setting has {} elements but the system has {} consumers",
            self.number_of_consumers(),
            consumer_ids.len()
        );

        let crossover = self.get_crossover(consumer_ids)?;
        let fluid_densities: Vec<Option<TimeSeries<f64>>> = self
            .fluid_densities
            .map(|densities| densities.into_iter().map(Some).collect())
            .unwrap_or_else(|| vec![None; consumer_ids.len()]);
        let consumer_settings = self
            .rates
            .into_iter()
            .zip(self.suction_pressures)
            .zip(self.discharge_pressures)
            .zip(fluid_densities)
            .map(
                |(((rate, suction_pressure), discharge_pressure), fluid_density)| {
                    ConsumerOperationalSettings {
                        rates: vec![rate],
                        suction_pressure,
                        discharge_pressure,
                        fluid_density,
                    }
                },
            )
            .collect();

        Ok(SystemOperationalSettings {
            consumer_settings,
            crossover,
        })
    }
}
