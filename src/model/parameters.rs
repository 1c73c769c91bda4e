//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::crossover::Crossover;
use crate::input::{SeriesInput, input_err_msg, is_sorted_and_unique, read_toml};
use crate::time_series::Timestep;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The ID of the consumer system
    #[serde(default = "default_system_id")]
    pub system_id: String,
    /// The time vector
    pub timesteps: Vec<Timestep>,
    /// Whether requested rates are per calendar day or per stream day
    #[serde(default)]
    pub rate_type: RateType,
    /// Fraction of the time the installation is operating
    #[serde(default = "default_regularity")]
    pub regularity: SeriesInput,
    /// How operational settings are chosen
    #[serde(default)]
    pub selection: SelectionMode,
    /// The consumers making up the system, in the order operational settings refer to them
    pub consumers: Vec<ConsumerParameters>,
    /// Crossover relations used unless an operational setting gives its own
    #[serde(default)]
    pub crossover: Vec<Crossover>,
    /// Prioritised operational settings for each period
    pub periods: Vec<PeriodParameters>,
}

/// Whether rates are given per calendar day or per stream day
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum RateType {
    /// Average rate over the whole day, including downtime
    #[string = "calendar_day"]
    CalendarDay,
    /// Rate while the installation is operating
    #[default]
    #[string = "stream_day"]
    StreamDay,
}

/// How the operational setting is chosen
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Clone, Copy, Default)]
pub enum SelectionMode {
    /// Evaluate whole periods at once
    #[default]
    #[string = "period"]
    Period,
    /// Choose between named priorities separately at each timestep
    #[string = "timestep"]
    Timestep,
}

fn default_system_id() -> String {
    "consumer_system".to_string()
}

fn default_regularity() -> SeriesInput {
    SeriesInput::Constant(1.0)
}

/// A consumer described by sampled points on its performance curve
#[derive(Debug, Deserialize, PartialEq)]
pub struct ConsumerParameters {
    /// Unique ID
    pub id: String,
    /// Sampled rates, in increasing order
    pub rates: Vec<f64>,
    /// Energy usage at each sampled rate
    pub energy_usage: Vec<f64>,
    /// Converts energy usage into power, if given
    pub power_factor: Option<f64>,
}

/// The operational settings in force from a given date
#[derive(Debug, Deserialize, PartialEq)]
pub struct PeriodParameters {
    /// The date the period starts
    pub start: Timestep,
    /// Candidate settings, in priority order
    pub operational_settings: Vec<OperationalSettingParameters>,
}

/// An operational setting, as lists with one element per consumer
#[derive(Debug, Deserialize, PartialEq)]
pub struct OperationalSettingParameters {
    /// Name of the setting, used when choosing between settings at each timestep
    pub name: Option<String>,
    /// Requested rate for each consumer
    pub rates: Vec<SeriesInput>,
    /// Suction pressure for each consumer
    pub suction_pressures: Vec<SeriesInput>,
    /// Discharge pressure for each consumer
    pub discharge_pressures: Vec<SeriesInput>,
    /// Consumer to send excess rate to, counting from 1 (0 for none)
    pub cross_overs: Option<Vec<usize>>,
    /// Fluid density for each consumer
    pub fluid_densities: Option<Vec<SeriesInput>>,
}

/// Check that the `timesteps` parameter is valid
fn check_timesteps(timesteps: &[Timestep]) -> Result<()> {
    ensure!(!timesteps.is_empty(), "`timesteps` is empty");
    ensure!(
        is_sorted_and_unique(timesteps),
        "`timesteps` must be composed of unique values in order"
    );

    Ok(())
}

/// Check that the `regularity` parameter is valid
fn check_regularity(regularity: &SeriesInput, timesteps: &[Timestep]) -> Result<()> {
    let regularity = regularity
        .to_time_series(timesteps)
        .context("Invalid value for regularity")?;
    ensure!(
        regularity
            .values()
            .iter()
            .all(|value| (0.0..=1.0).contains(value)),
        "regularity must be between 0 and 1"
    );

    Ok(())
}

/// Check that the `periods` parameter is valid
fn check_periods(periods: &[PeriodParameters], timesteps: &[Timestep]) -> Result<()> {
    ensure!(!periods.is_empty(), "`periods` is empty");
    ensure!(
        is_sorted_and_unique(periods.iter().map(|period| period.start)),
        "Period start dates must be unique and in order"
    );
    ensure!(
        periods[0].start <= timesteps[0],
        "The first period must start on or before the first timestep"
    );
    for period in periods {
        ensure!(
            !period.operational_settings.is_empty(),
            "No operational settings given for period starting {}",
            period.start
        );
    }

    Ok(())
}

/// Check the parameters required when choosing settings at each timestep
fn check_timestep_selection(periods: &[PeriodParameters]) -> Result<()> {
    ensure!(
        periods.len() == 1,
        "Choosing operational settings at each timestep requires a single period"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_timesteps(&self.timesteps)?;
        check_regularity(&self.regularity, &self.timesteps)?;
        ensure!(!self.consumers.is_empty(), "`consumers` is empty");
        check_periods(&self.periods, &self.timesteps)?;
        if self.selection == SelectionMode::Timestep {
            check_timestep_selection(&self.periods)?;
        }

        Ok(())
    }
}
