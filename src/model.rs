//! Code for consumer system models.
use crate::consumer::sampled::SampledConsumer;
use crate::consumer::{Consumer, ConsumerID, ConsumerList};
use crate::input::{input_err_msg, to_time_series_list};
use crate::operational_setting::{IndexedOperationalSetting, SystemOperationalSettings};
use crate::period::TemporalModel;
use crate::priority::PriorityID;
use crate::system::{ConsumerSystem, SystemResult};
use crate::time_series::{TimeSeries, Timestep};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use log::info;
use std::path::{Path, PathBuf};
use std::rc::Rc;

pub mod parameters;
use parameters::{
    ConsumerParameters, ModelParameters, OperationalSettingParameters, RateType, SelectionMode,
};

/// Operational settings to choose between, in priority order
pub enum PrioritisedSettings {
    /// Candidate settings for each period, with whole periods evaluated at once
    Periods(TemporalModel<Vec<SystemOperationalSettings>>),
    /// Named settings, chosen between at each timestep
    Timesteps(IndexMap<PriorityID, SystemOperationalSettings>),
}

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// The consumer system to evaluate
    pub system: ConsumerSystem,
    /// The time vector
    pub timesteps: Vec<Timestep>,
    /// Operational settings for the system
    pub operational_settings: PrioritisedSettings,
}

impl Model {
    /// Read a model from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
        let model_path = model_dir.as_ref();
        let params = ModelParameters::from_path(model_path)?;
        let file_path = model_path.join("model.toml");

        let consumers =
            read_consumers(&params.consumers).with_context(|| input_err_msg(&file_path))?;
        let system = ConsumerSystem::new(
            params.system_id.as_str().into(),
            consumers,
            &params.crossover,
        )
        .with_context(|| input_err_msg(&file_path))?;
        let operational_settings = read_operational_settings(&params, &system)
            .with_context(|| input_err_msg(&file_path))?;

        Ok(Model {
            model_path: model_path.to_path_buf(),
            system,
            timesteps: params.timesteps,
            operational_settings,
        })
    }

    /// Evaluate the model's consumer system
    pub fn run(&self) -> Result<SystemResult> {
        info!(
            "Evaluating consumer system {} over {} timestep(s)",
            self.system.id(),
            self.timesteps.len()
        );

        match &self.operational_settings {
            PrioritisedSettings::Periods(settings) => {
                self.system.evaluate(&self.timesteps, settings)
            }
            PrioritisedSettings::Timesteps(priorities) => {
                self.system.evaluate_with_priorities(&self.timesteps, priorities)
            }
        }
    }
}

/// Create the consumers described in the model file
fn read_consumers(consumers: &[ConsumerParameters]) -> Result<ConsumerList> {
    consumers
        .iter()
        .map(|consumer| {
            let consumer: Rc<dyn Consumer> = Rc::new(SampledConsumer::new(
                consumer.id.as_str().into(),
                consumer.rates.clone(),
                consumer.energy_usage.clone(),
                consumer.power_factor,
            )?);
            Ok(consumer)
        })
        .collect()
}

/// Convert an operational setting from the model file for the consumers of `system`
fn read_operational_setting(
    setting: &OperationalSettingParameters,
    system: &ConsumerSystem,
    timesteps: &[Timestep],
    regularity: Option<&TimeSeries<f64>>,
) -> Result<SystemOperationalSettings> {
    let fluid_densities = setting
        .fluid_densities
        .as_deref()
        .map(|densities| to_time_series_list("fluid_densities", densities, timesteps))
        .transpose()?;
    let indexed = IndexedOperationalSetting {
        rates: to_time_series_list("rates", &setting.rates, timesteps)?,
        suction_pressures: to_time_series_list(
            "suction_pressures",
            &setting.suction_pressures,
            timesteps,
        )?,
        discharge_pressures: to_time_series_list(
            "discharge_pressures",
            &setting.discharge_pressures,
            timesteps,
        )?,
        cross_overs: setting.cross_overs.clone(),
        fluid_densities,
    };

    let consumer_ids: Vec<ConsumerID> = system.consumer_ids().iter().cloned().collect();
    let mut settings = indexed.into_system_settings(&consumer_ids)?;
    if let Some(regularity) = regularity {
        for consumer_settings in &mut settings.consumer_settings {
            *consumer_settings = consumer_settings.convert_rates_to_stream_day(regularity);
        }
    }

    Ok(settings)
}

/// Convert all the operational settings in the model file
fn read_operational_settings(
    params: &ModelParameters,
    system: &ConsumerSystem,
) -> Result<PrioritisedSettings> {
    let timesteps = &params.timesteps;
    let regularity = match params.rate_type {
        RateType::CalendarDay => Some(params.regularity.to_time_series(timesteps)?),
        RateType::StreamDay => None,
    };

    let mut periods = Vec::new();
    for period in &params.periods {
        let settings = period
            .operational_settings
            .iter()
            .enumerate()
            .map(|(index, setting)| {
                read_operational_setting(setting, system, timesteps, regularity.as_ref())
                    .with_context(|| {
                        format!(
                            "Invalid operational setting {} for period starting {}",
                            index + 1,
                            period.start
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        periods.push((period.start, settings));
    }

    match params.selection {
        SelectionMode::Period => Ok(PrioritisedSettings::Periods(TemporalModel::new(periods)?)),
        SelectionMode::Timestep => {
            let (_, candidates) = periods.swap_remove(0);
            let names = params.periods[0]
                .operational_settings
                .iter()
                .map(|setting| setting.name.as_ref());
            let mut priorities: IndexMap<PriorityID, _> = IndexMap::new();
            for (index, (name, settings)) in names.zip(candidates).enumerate() {
                let id = name.map_or_else(|| (index + 1).to_string(), Clone::clone);
                ensure!(
                    !priorities.contains_key(id.as_str()),
                    "Duplicate operational setting name {id}"
                );
                priorities.insert(PriorityID::from(id), settings);
            }

            Ok(PrioritisedSettings::Timesteps(priorities))
        }
    }
}
