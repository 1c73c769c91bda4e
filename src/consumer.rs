//! Consumers of energy (pumps, compressors, etc.) as seen by a consumer system.
//!
//! The physics of individual consumers is hidden behind the [`Consumer`] trait: the system only
//! needs to evaluate a consumer for some operational settings and to ask for its capacity.
use crate::id::define_id_type;
use crate::operational_setting::ConsumerOperationalSettings;
use crate::time_series::{Mergeable, TimeSeries, Timestep};
use anyhow::{Result, bail, ensure};
use std::rc::Rc;

pub mod sampled;

define_id_type! {ConsumerID}

/// A consumer which can be evaluated as part of a consumer system
pub trait Consumer {
    /// The consumer's unique ID
    fn id(&self) -> &ConsumerID;

    /// Evaluate the consumer for the given settings.
    ///
    /// Steps at which the settings are outside what the consumer can handle are flagged as
    /// invalid in the result; this is not an error.
    fn evaluate(&self, settings: &ConsumerOperationalSettings) -> ConsumerResult;

    /// The maximum rate the consumer can handle at each timestep, given the settings
    fn get_max_rate(&self, settings: &ConsumerOperationalSettings) -> TimeSeries<f64>;
}

/// A collection of consumers, in the order they were defined
pub type ConsumerList = Vec<Rc<dyn Consumer>>;

/// The result of evaluating a consumer over a number of timesteps
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerResult {
    /// The ID of the evaluated consumer
    pub id: ConsumerID,
    /// Whether the consumer could handle the requested conditions
    pub is_valid: TimeSeries<bool>,
    /// The total rate through the consumer
    pub rate: TimeSeries<f64>,
    /// Energy usage
    pub energy_usage: TimeSeries<f64>,
    /// Power, for consumers which report it
    pub power: Option<TimeSeries<f64>>,
}

impl ConsumerResult {
    /// The timesteps covered by the result
    pub fn timesteps(&self) -> &[Timestep] {
        self.is_valid.timesteps()
    }
}

impl Mergeable for ConsumerResult {
    fn merge(&self, other: &Self) -> Result<Self> {
        ensure!(
            self.id == other.id,
            "Cannot merge results for different consumers ({} and {})",
            self.id,
            other.id
        );
        let power = match (&self.power, &other.power) {
            (Some(a), Some(b)) => Some(a.merge(b)?),
            (None, None) => None,
            _ => bail!(
                "Cannot merge results for consumer {} with and without power",
                self.id
            ),
        };

        Ok(Self {
            id: self.id.clone(),
            is_valid: self.is_valid.merge(&other.is_valid)?,
            rate: self.rate.merge(&other.rate)?,
            energy_usage: self.energy_usage.merge(&other.energy_usage)?,
            power,
        })
    }

    fn get_subset(&self, indices: &[usize]) -> Self {
        Self {
            id: self.id.clone(),
            is_valid: self.is_valid.get_subset(indices),
            rate: self.rate.get_subset(indices),
            energy_usage: self.energy_usage.get_subset(indices),
            power: self.power.as_ref().map(|power| power.get_subset(indices)),
        }
    }
}
