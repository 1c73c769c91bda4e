//! The module responsible for writing output data to disk.
use crate::consumer::{ConsumerID, ConsumerResult};
use crate::system::SystemResult;
use crate::time_series::Timestep;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
pub const OUTPUT_DIRECTORY_ROOT: &str = "consumer_system_results";

/// The output file name for the results of the system as a whole
const SYSTEM_RESULTS_FILE_NAME: &str = "system_results.csv";

/// The output file name for the results of each consumer
const CONSUMER_RESULTS_FILE_NAME: &str = "consumer_results.csv";

/// Get the default output directory for the model specified at `model_dir`
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    // Construct path
    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory for the model, optionally overwriting existing data
///
/// # Arguments
///
/// * `output_dir` - The output directory to create/overwrite
/// * `allow_overwrite` - Whether to delete and recreate the folder if it is non-empty
///
/// # Returns
///
/// True if the output dir contained existing data that was deleted, false if not, or an error.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    // If the folder already exists, then delete it
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Please delete the folder or pass the \
            --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the system results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SystemResultRow {
    timestep: Timestep,
    is_valid: bool,
    energy_usage: f64,
    power: Option<f64>,
    operational_setting_used: usize,
}

/// Represents a row in the consumer results CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ConsumerResultRow {
    consumer: ConsumerID,
    timestep: Timestep,
    is_valid: bool,
    rate: f64,
    energy_usage: f64,
    power: Option<f64>,
}

/// An object for writing results to file
pub struct DataWriter {
    system_writer: csv::Writer<File>,
    consumer_writer: csv::Writer<File>,
}

impl DataWriter {
    /// Open CSV files to write output data to
    ///
    /// # Arguments
    ///
    /// * `output_path` - Folder where files will be saved
    pub fn create(output_path: &Path) -> Result<Self> {
        let new_writer = |file_name| {
            let file_path = output_path.join(file_name);
            csv::Writer::from_path(file_path)
        };

        Ok(Self {
            system_writer: new_writer(SYSTEM_RESULTS_FILE_NAME)?,
            consumer_writer: new_writer(CONSUMER_RESULTS_FILE_NAME)?,
        })
    }

    /// Write the results for the system and each of its consumers
    pub fn write_system_result(&mut self, result: &SystemResult) -> Result<()> {
        for (index, &timestep) in result.timesteps().iter().enumerate() {
            let row = SystemResultRow {
                timestep,
                is_valid: result.is_valid.values()[index],
                energy_usage: result.energy_usage.values()[index],
                power: result.power.as_ref().map(|power| power.values()[index]),
                operational_setting_used: result.operational_settings_used.values()[index],
            };
            self.system_writer.serialize(row)?;
        }

        for consumer_result in &result.consumer_results {
            self.write_consumer_result(consumer_result)?;
        }

        Ok(())
    }

    /// Write the results for one consumer
    fn write_consumer_result(&mut self, result: &ConsumerResult) -> Result<()> {
        for (index, &timestep) in result.timesteps().iter().enumerate() {
            let row = ConsumerResultRow {
                consumer: result.id.clone(),
                timestep,
                is_valid: result.is_valid.values()[index],
                rate: result.rate.values()[index],
                energy_usage: result.energy_usage.values()[index],
                power: result.power.as_ref().map(|power| power.values()[index]),
            };
            self.consumer_writer.serialize(row)?;
        }

        Ok(())
    }

    /// Flush the underlying streams
    pub fn flush(&mut self) -> Result<()> {
        self.system_writer.flush()?;
        self.consumer_writer.flush()?;

        Ok(())
    }
}
