//! Common routines for handling input data.
use crate::time_series::{TimeSeries, Timestep};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Check whether an iterator contains values that are sorted and unique
pub fn is_sorted_and_unique<T, I>(iter: I) -> bool
where
    T: PartialOrd + Clone,
    I: IntoIterator<Item = T>,
{
    iter.into_iter().tuple_windows().all(|(a, b)| a < b)
}

/// A quantity given either as a single value for all timesteps or as one value per timestep
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SeriesInput {
    /// The same value at every timestep
    Constant(f64),
    /// One value for each timestep
    Values(Vec<f64>),
}

impl SeriesInput {
    /// Convert into a time series over the given timesteps
    pub fn to_time_series(&self, timesteps: &[Timestep]) -> Result<TimeSeries<f64>> {
        let series = match self {
            Self::Constant(value) => TimeSeries::filled(timesteps, *value),
            Self::Values(values) => TimeSeries::new(timesteps.to_vec(), values.clone())?,
        };
        ensure!(
            series.values().iter().all(|value| value.is_finite()),
            "Values must be finite numbers"
        );

        Ok(series)
    }
}

/// Convert a list of per-consumer inputs into time series, naming the field on error
pub fn to_time_series_list(
    field: &str,
    inputs: &[SeriesInput],
    timesteps: &[Timestep],
) -> Result<Vec<TimeSeries<f64>>> {
    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            input
                .to_time_series(timesteps)
                .with_context(|| format!("Invalid value in {field} for consumer {}", index + 1))
        })
        .collect()
}
