//! Evaluation of consumer systems: groups of energy consumers sharing a stream, evaluated under
//! prioritised operational settings.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod consumer;
pub mod crossover;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod operational_setting;
pub mod output;
pub mod period;
pub mod priority;
pub mod selection;
pub mod settings;
pub mod system;
pub mod time_series;

#[cfg(test)]
mod fixture;

/// Get the config dir for the program.
///
/// If the platform has no config dir, the current working directory is used.
pub fn get_config_dir() -> PathBuf {
    let Some(mut dir) = dirs::config_dir() else {
        return PathBuf::default();
    };
    dir.push("consumer-system");

    dir
}
