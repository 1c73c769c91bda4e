//! Consumer systems: groups of consumers evaluated together under prioritised operational
//! settings.
//!
//! For each period, the candidate settings are evaluated in priority order. At each timestep the
//! first candidate under which every consumer is valid is used. Timesteps where no candidate is
//! valid use the last candidate and are reported as invalid.
use crate::consumer::{ConsumerID, ConsumerList, ConsumerResult};
use crate::crossover::{Crossover, CrossoverGraph, get_crossover_rates};
use crate::input::is_sorted_and_unique;
use crate::operational_setting::{ConsumerOperationalSettings, SystemOperationalSettings};
use crate::period::TemporalModel;
use crate::priority::{self, EvaluatorResult, PriorityID};
use crate::selection::SelectionRecord;
use crate::time_series::{Mergeable, TimeSeries, Timestep, all_valid, sum_all};
use anyhow::{Context, Result, ensure};
use indexmap::IndexSet;
use indexmap::map::{Entry, IndexMap};
use log::{debug, warn};
use std::ops::Range;

/// A group of consumers which share operational settings and can send rate to one another
pub struct ConsumerSystem {
    id: ConsumerID,
    consumers: ConsumerList,
    consumer_ids: IndexSet<ConsumerID>,
    crossover: CrossoverGraph,
}

/// The results of every candidate evaluated for one period
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResults {
    /// Positions of the period's timesteps in the time vector
    pub range: Range<usize>,
    /// Results for each consumer, for each candidate evaluated, in priority order
    pub candidates: Vec<Vec<ConsumerResult>>,
}

/// The result of evaluating a consumer system
#[derive(Debug, Clone, PartialEq)]
pub struct SystemResult {
    /// The ID of the system
    pub id: ConsumerID,
    /// Whether every consumer was valid under the setting used
    pub is_valid: TimeSeries<bool>,
    /// Total energy usage of the consumers
    pub energy_usage: TimeSeries<f64>,
    /// Total power of the consumers which report it
    pub power: Option<TimeSeries<f64>>,
    /// The setting used at each timestep, numbered from 1 (0 means no setting was chosen)
    pub operational_settings_used: TimeSeries<usize>,
    /// Results for each consumer under the settings used
    pub consumer_results: Vec<ConsumerResult>,
}

impl SystemResult {
    fn new(
        id: ConsumerID,
        is_valid: TimeSeries<bool>,
        operational_settings_used: TimeSeries<usize>,
        consumer_results: Vec<ConsumerResult>,
    ) -> Result<Self> {
        let energy_usage = sum_all(consumer_results.iter().map(|result| &result.energy_usage))
            .with_context(|| format!("No consumer results for system {id}"))?;
        let power = sum_all(
            consumer_results
                .iter()
                .filter_map(|result| result.power.as_ref()),
        );

        Ok(Self {
            id,
            is_valid,
            energy_usage,
            power,
            operational_settings_used,
            consumer_results,
        })
    }

    /// The timesteps covered by the result
    pub fn timesteps(&self) -> &[Timestep] {
        self.is_valid.timesteps()
    }
}

impl ConsumerSystem {
    /// Create a new consumer system.
    ///
    /// # Arguments
    ///
    /// * `id` - The system's ID
    /// * `consumers` - The consumers making up the system. Operational settings give one element
    ///   per consumer, in this order.
    /// * `crossover` - Crossover relations between the consumers, used unless an operational
    ///   setting provides its own
    pub fn new(id: ConsumerID, consumers: ConsumerList, crossover: &[Crossover]) -> Result<Self> {
        ensure!(
            !consumers.is_empty(),
            "Consumer system {id} must have at least one consumer"
        );

        let mut consumer_ids = IndexSet::new();
        for consumer in &consumers {
            ensure!(
                consumer_ids.insert(consumer.id().clone()),
                "Duplicate consumer ID {} in consumer system {id}",
                consumer.id()
            );
        }

        let crossover = CrossoverGraph::new(&consumer_ids, crossover)
            .with_context(|| format!("Invalid crossover for consumer system {id}"))?;

        Ok(Self {
            id,
            consumers,
            consumer_ids,
            crossover,
        })
    }

    /// The system's ID
    pub fn id(&self) -> &ConsumerID {
        &self.id
    }

    /// The IDs of the consumers, in the order operational settings refer to them
    pub fn consumer_ids(&self) -> &IndexSet<ConsumerID> {
        &self.consumer_ids
    }

    /// The crossover graph to use for the given settings
    fn get_crossover_graph(&self, settings: &SystemOperationalSettings) -> Result<CrossoverGraph> {
        match &settings.crossover {
            Some(crossover) => CrossoverGraph::new(&self.consumer_ids, crossover),
            None => Ok(self.crossover.clone()),
        }
    }

    /// Check settings against the system and resolve their crossover graphs
    fn validate_settings<'a, I>(
        &self,
        timesteps: &[Timestep],
        settings: I,
    ) -> Result<Vec<CrossoverGraph>>
    where
        I: IntoIterator<Item = &'a SystemOperationalSettings>,
    {
        settings
            .into_iter()
            .map(|settings| {
                settings.validate(self.consumers.len(), timesteps)?;
                self.get_crossover_graph(settings)
            })
            .collect()
    }

    /// Get the settings for each consumer for the given range of timesteps, with rate the
    /// consumers cannot handle sent on along the crossover relations.
    ///
    /// Returns one setting per consumer, in consumer order.
    pub fn get_operational_settings_adjusted_for_crossover(
        &self,
        settings: &SystemOperationalSettings,
        crossover: &CrossoverGraph,
        range: Range<usize>,
    ) -> Result<Vec<ConsumerOperationalSettings>> {
        let mut adjusted = vec![None; self.consumers.len()];
        let mut received: Vec<Vec<TimeSeries<f64>>> = vec![Vec::new(); self.consumers.len()];
        for &index in crossover.order() {
            let consumer_settings =
                settings.get_consumer_operational_settings(index, range.clone())?;
            let mut inlet_rates = consumer_settings.rates.clone();
            inlet_rates.append(&mut received[index]);

            let rates = match crossover.target(index) {
                Some(target) => {
                    let max_rate = self.consumers[index]
                        .get_max_rate(&consumer_settings.with_rates(inlet_rates.clone()));
                    let (excess_rate, rates_within_capacity) =
                        get_crossover_rates(&max_rate, &inlet_rates);
                    received[target].push(excess_rate);
                    rates_within_capacity
                }
                None => inlet_rates,
            };
            adjusted[index] = Some(consumer_settings.with_rates(rates));
        }

        Ok(adjusted.into_iter().flatten().collect())
    }

    /// Evaluate every consumer under one candidate setting, returning results in consumer order
    fn evaluate_candidate(
        &self,
        settings: &SystemOperationalSettings,
        crossover: &CrossoverGraph,
        range: Range<usize>,
    ) -> Result<Vec<ConsumerResult>> {
        let adjusted =
            self.get_operational_settings_adjusted_for_crossover(settings, crossover, range)?;

        Ok(self
            .consumers
            .iter()
            .zip(&adjusted)
            .map(|(consumer, settings)| consumer.evaluate(settings))
            .collect())
    }

    /// Evaluate the system.
    ///
    /// # Arguments
    ///
    /// * `timesteps` - The time vector, in order
    /// * `operational_settings` - Candidate settings for each period, in priority order
    ///
    /// # Returns
    ///
    /// The result for the system as a whole, along with the result for each consumer under the
    /// settings used. An error is returned if the settings are inconsistent with the system or
    /// the time vector; this is checked before anything is evaluated.
    pub fn evaluate(
        &self,
        timesteps: &[Timestep],
        operational_settings: &TemporalModel<Vec<SystemOperationalSettings>>,
    ) -> Result<SystemResult> {
        check_timesteps(timesteps)?;
        ensure!(
            operational_settings.start() <= timesteps[0],
            "Operational settings for consumer system {} start at {}, after the first timestep \
            ({})",
            self.id,
            operational_settings.start(),
            timesteps[0]
        );

        let mut crossover = Vec::new();
        for (period, candidates) in operational_settings.iter() {
            ensure!(
                !candidates.is_empty(),
                "No operational settings given for consumer system {} for period {period}",
                self.id
            );
            let graphs = self
                .validate_settings(timesteps, candidates)
                .with_context(|| {
                    format!(
                        "Invalid operational settings for consumer system {} for period {period}",
                        self.id
                    )
                })?;
            crossover.push(graphs);
        }

        let mut record = SelectionRecord::new(timesteps.len());
        let mut period_results = Vec::new();
        for ((period, candidates), graphs) in operational_settings.iter().zip(&crossover) {
            let range = period.get_timestep_indices(timesteps);
            if range.is_empty() {
                continue;
            }

            let mut results = Vec::new();
            for (index, (settings, graph)) in candidates.iter().zip(graphs).enumerate() {
                let consumer_results = self.evaluate_candidate(settings, graph, range.clone())?;
                let is_valid = all_valid(consumer_results.iter().map(|result| &result.is_valid))
                    .context("No consumer results")?;
                let committed = record.commit(range.start, is_valid.values(), index);
                debug!(
                    "Operational setting {} for consumer system {} is used at {committed} \
                    timestep(s) in period {period}",
                    index + 1,
                    self.id
                );
                results.push(consumer_results);

                if record.is_complete(range.clone()) {
                    break;
                }
            }

            let fallback = record.apply_fallback(range.clone(), candidates.len() - 1);
            if !fallback.is_empty() {
                warn!(
                    "No valid operational setting for consumer system {} at {} timestep(s) in \
                    period {period}; using the last setting",
                    self.id,
                    fallback.len()
                );
            }

            period_results.push(PeriodResults {
                range,
                candidates: results,
            });
        }

        let consumer_results = collect_consumer_results(&record, &period_results)?;
        SystemResult::new(
            self.id.clone(),
            TimeSeries::new(timesteps.to_vec(), record.is_valid().to_vec())?,
            TimeSeries::new(timesteps.to_vec(), record.used_one_based())?,
            consumer_results,
        )
    }

    /// Evaluate the system, choosing between named settings separately at each timestep.
    ///
    /// The setting used at each timestep is reported by its position in `priorities`, counting
    /// from 1.
    pub fn evaluate_with_priorities(
        &self,
        timesteps: &[Timestep],
        priorities: &IndexMap<PriorityID, SystemOperationalSettings>,
    ) -> Result<SystemResult> {
        check_timesteps(timesteps)?;
        let graphs = self
            .validate_settings(timesteps, priorities.values())
            .with_context(|| {
                format!("Invalid operational settings for consumer system {}", self.id)
            })?;
        let candidates: IndexMap<PriorityID, _> = priorities
            .iter()
            .zip(graphs)
            .map(|((id, settings), graph)| (id.clone(), (settings, graph)))
            .collect();

        let result = priority::optimize(timesteps, &candidates, |step, (settings, graph)| {
            let results = self.evaluate_candidate(settings, graph, step..step + 1)?;
            Ok(results
                .into_iter()
                .map(|result| EvaluatorResult {
                    id: result.id.clone(),
                    is_valid: result.is_valid.clone(),
                    result,
                })
                .collect())
        })?;

        let operational_settings_used = result
            .priorities_used
            .map(|id| priorities.get_index_of(id).map_or(0, |index| index + 1));
        SystemResult::new(
            self.id.clone(),
            result.is_valid,
            operational_settings_used,
            result.priority_results.into_values().collect(),
        )
    }
}

/// Check that the time vector is non-empty, in order and free of duplicates
fn check_timesteps(timesteps: &[Timestep]) -> Result<()> {
    ensure!(!timesteps.is_empty(), "Time vector must not be empty");
    ensure!(
        is_sorted_and_unique(timesteps),
        "Time vector must be in chronological order with no repeated timesteps"
    );

    Ok(())
}

/// Stitch together each consumer's results under the settings used at each timestep.
///
/// # Arguments
///
/// * `record` - The setting used at each timestep
/// * `period_results` - Results for each candidate evaluated in each period
///
/// # Returns
///
/// One result per consumer, covering every timestep which had a setting chosen, in the order the
/// consumers first appear.
pub fn collect_consumer_results(
    record: &SelectionRecord,
    period_results: &[PeriodResults],
) -> Result<Vec<ConsumerResult>> {
    let mut merged: IndexMap<ConsumerID, ConsumerResult> = IndexMap::new();
    for period in period_results {
        for (candidate, steps) in record.steps_by_candidate(period.range.clone()) {
            let results = period.candidates.get(candidate).with_context(|| {
                format!(
                    "Operational setting {} was used but not evaluated",
                    candidate + 1
                )
            })?;
            let indices: Vec<_> = steps.iter().map(|step| step - period.range.start).collect();
            for result in results {
                let subset = result.get_subset(&indices);
                match merged.entry(result.id.clone()) {
                    Entry::Occupied(mut entry) => {
                        let result = entry.get().merge(&subset)?;
                        entry.insert(result);
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(subset);
                    }
                }
            }
        }
    }

    Ok(merged.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::Consumer;
    use crate::consumer::sampled::SampledConsumer;
    use crate::fixture::{assert_error, consumer_settings, date, timesteps};
    use indexmap::indexmap;
    use rstest::{fixture, rstest};
    use std::rc::Rc;

    /// Two consumers: `a` can handle a rate of up to 10 and `b` up to 100
    #[fixture]
    fn consumers() -> ConsumerList {
        vec![
            Rc::new(
                SampledConsumer::new("a".into(), vec![0.0, 10.0], vec![0.0, 10.0], None).unwrap(),
            ),
            Rc::new(
                SampledConsumer::new("b".into(), vec![0.0, 100.0], vec![0.0, 50.0], Some(2.0))
                    .unwrap(),
            ),
        ]
    }

    fn settings(timesteps: &[Timestep], a: &[f64], b: &[f64]) -> SystemOperationalSettings {
        SystemOperationalSettings::new(vec![
            consumer_settings(timesteps, a),
            consumer_settings(timesteps, b),
        ])
    }

    fn consumer_result<'a>(result: &'a SystemResult, id: &str) -> &'a ConsumerResult {
        result
            .consumer_results
            .iter()
            .find(|result| result.id == id.into())
            .unwrap()
    }

    #[rstest]
    fn test_new_invalid(consumers: ConsumerList) {
        assert_error!(
            ConsumerSystem::new("system".into(), vec![], &[]),
            "Consumer system system must have at least one consumer"
        );
        assert_error!(
            ConsumerSystem::new(
                "system".into(),
                vec![consumers[0].clone(), consumers[0].clone()],
                &[]
            ),
            "Duplicate consumer ID a in consumer system system"
        );
        assert_error!(
            ConsumerSystem::new(
                "system".into(),
                consumers,
                &[
                    Crossover::new("a".into(), "b".into()),
                    Crossover::new("b".into(), "a".into())
                ]
            ),
            "Invalid crossover for consumer system system"
        );
    }

    #[rstest]
    fn test_adjusted_for_crossover(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new(
            "system".into(),
            consumers,
            &[Crossover::new("a".into(), "b".into())],
        )
        .unwrap();
        let settings = settings(&timesteps, &[5.0, 12.0, 8.0, 20.0], &[1.0; 4]);

        let adjusted = system
            .get_operational_settings_adjusted_for_crossover(&settings, &system.crossover, 0..4)
            .unwrap();
        assert_eq!(adjusted[0].rates.len(), 1);
        assert_eq!(adjusted[0].rates[0].values(), [5.0, 10.0, 8.0, 10.0]);
        assert_eq!(adjusted[1].rates.len(), 2);
        assert_eq!(adjusted[1].rates[0].values(), [1.0; 4]);
        assert_eq!(adjusted[1].rates[1].values(), [0.0, 2.0, 0.0, 10.0]);

        // The base settings are unchanged
        assert_eq!(settings.consumer_settings[0].rates[0].values()[3], 20.0);
    }

    #[rstest]
    fn test_adjusted_for_crossover_chain(timesteps: Vec<Timestep>) {
        let consumer = |id: &str, max_rate: f64| -> Rc<dyn Consumer> {
            Rc::new(
                SampledConsumer::new(id.into(), vec![0.0, max_rate], vec![0.0, 1.0], None)
                    .unwrap(),
            )
        };
        let system = ConsumerSystem::new(
            "system".into(),
            vec![consumer("a", 10.0), consumer("b", 5.0), consumer("c", 100.0)],
            &[
                Crossover::new("b".into(), "c".into()),
                Crossover::new("a".into(), "b".into()),
            ],
        )
        .unwrap();
        let settings = SystemOperationalSettings::new(vec![
            consumer_settings(&timesteps, &[15.0; 4]),
            consumer_settings(&timesteps, &[4.0; 4]),
            consumer_settings(&timesteps, &[0.0; 4]),
        ]);

        let adjusted = system
            .get_operational_settings_adjusted_for_crossover(&settings, &system.crossover, 0..4)
            .unwrap();
        let totals: Vec<_> = adjusted
            .iter()
            .map(|settings| settings.total_rate().values()[0])
            .collect();

        // b keeps 5 of its 9, reducing the rate received from a first, and sends 4 on to c
        assert_eq!(totals, [10.0, 5.0, 4.0]);
        assert_eq!(adjusted[1].rates[0].values()[0], 4.0);
        assert_eq!(adjusted[1].rates[1].values()[0], 1.0);
    }

    #[rstest]
    fn test_evaluate_with_crossover(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new(
            "system".into(),
            consumers,
            &[Crossover::new("a".into(), "b".into())],
        )
        .unwrap();
        let settings = TemporalModel::constant(vec![settings(
            &timesteps,
            &[5.0, 12.0, 8.0, 20.0],
            &[1.0; 4],
        )]);

        let result = system.evaluate(&timesteps, &settings).unwrap();
        assert!(result.is_valid.all());
        assert_eq!(result.operational_settings_used.values(), [1; 4]);
        assert_eq!(
            consumer_result(&result, "a").rate.values(),
            [5.0, 10.0, 8.0, 10.0]
        );
        assert_eq!(
            consumer_result(&result, "b").rate.values(),
            [1.0, 3.0, 1.0, 11.0]
        );
        assert_eq!(result.energy_usage.values(), [5.5, 11.5, 8.5, 15.5]);
        assert_eq!(result.power.unwrap().values(), [1.0, 3.0, 1.0, 11.0]);
    }

    #[rstest]
    fn test_evaluate_priorities(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let timesteps = &timesteps[..3];
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let candidates = vec![
            settings(timesteps, &[5.0, 20.0, 20.0], &[1.0; 3]),
            settings(timesteps, &[20.0, 5.0, 20.0], &[1.0; 3]),
            settings(timesteps, &[20.0, 20.0, 20.0], &[2.0; 3]),
        ];

        let result = system
            .evaluate(timesteps, &TemporalModel::constant(candidates))
            .unwrap();
        assert_eq!(result.operational_settings_used.values(), [1, 2, 3]);
        assert_eq!(result.is_valid.values(), [true, true, false]);
        assert_eq!(result.timesteps(), timesteps);

        // Each consumer's result comes from the setting used at that timestep
        let b = consumer_result(&result, "b");
        assert_eq!(b.rate.values(), [1.0, 1.0, 2.0]);
        assert_eq!(b.timesteps(), timesteps);
        assert_eq!(
            consumer_result(&result, "a").is_valid.values(),
            [true, true, false]
        );
    }

    #[rstest]
    fn test_evaluate_stops_when_all_valid(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let candidates = vec![
            settings(&timesteps, &[1.0; 4], &[1.0; 4]),
            settings(&timesteps, &[2.0; 4], &[2.0; 4]),
        ];

        let result = system
            .evaluate(&timesteps, &TemporalModel::constant(candidates))
            .unwrap();
        assert_eq!(result.operational_settings_used.values(), [1; 4]);
        assert_eq!(consumer_result(&result, "a").rate.values(), [1.0; 4]);
    }

    #[rstest]
    fn test_evaluate_is_repeatable(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new(
            "system".into(),
            consumers,
            &[Crossover::new("a".into(), "b".into())],
        )
        .unwrap();
        let settings = TemporalModel::constant(vec![
            settings(&timesteps, &[5.0, 12.0, 8.0, 20.0], &[95.0; 4]),
            settings(&timesteps, &[1.0; 4], &[1.0; 4]),
        ]);

        let first = system.evaluate(&timesteps, &settings).unwrap();
        let second = system.evaluate(&timesteps, &settings).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.operational_settings_used.values(), [1, 1, 1, 2]);
    }

    #[rstest]
    fn test_evaluate_multiple_periods(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let settings = TemporalModel::new(vec![
            (
                date(2020, 1, 1),
                vec![
                    settings(&timesteps, &[20.0; 4], &[1.0; 4]),
                    settings(&timesteps, &[2.0; 4], &[1.0; 4]),
                ],
            ),
            (
                date(2022, 1, 1),
                vec![settings(&timesteps, &[3.0; 4], &[1.0; 4])],
            ),
        ])
        .unwrap();

        let result = system.evaluate(&timesteps, &settings).unwrap();
        assert_eq!(result.operational_settings_used.values(), [2, 2, 1, 1]);
        assert!(result.is_valid.all());
        assert_eq!(
            consumer_result(&result, "a").rate.values(),
            [2.0, 2.0, 3.0, 3.0]
        );
    }

    #[rstest]
    fn test_evaluate_invalid_settings(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let one_consumer =
            SystemOperationalSettings::new(vec![consumer_settings(&timesteps, &[1.0; 4])]);
        assert!(
            system
                .evaluate(&timesteps, &TemporalModel::constant(vec![one_consumer]))
                .is_err()
        );
        assert!(
            system
                .evaluate(&timesteps, &TemporalModel::constant(vec![]))
                .is_err()
        );

        let late_start = TemporalModel::new(vec![(
            date(2021, 1, 1),
            vec![settings(&timesteps, &[1.0; 4], &[1.0; 4])],
        )])
        .unwrap();
        assert_error!(
            system.evaluate(&timesteps, &late_start),
            "Operational settings for consumer system system start at 2021-01-01, after the \
            first timestep (2020-01-01)"
        );
    }

    #[rstest]
    fn test_evaluate_crossover_override(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let mut with_crossover = settings(&timesteps, &[12.0; 4], &[1.0; 4]);
        with_crossover.crossover = Some(vec![Crossover::new("a".into(), "b".into())]);
        let candidates = vec![settings(&timesteps, &[12.0; 4], &[1.0; 4]), with_crossover];

        let result = system
            .evaluate(&timesteps, &TemporalModel::constant(candidates))
            .unwrap();
        assert_eq!(result.operational_settings_used.values(), [2; 4]);
        assert_eq!(consumer_result(&result, "b").rate.values(), [3.0; 4]);
    }

    #[rstest]
    fn test_evaluate_with_priorities(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let priorities = indexmap! {
            PriorityID::new("high") => settings(&timesteps, &[5.0, 20.0, 5.0, 20.0], &[1.0; 4]),
            PriorityID::new("low") => settings(&timesteps, &[20.0, 5.0, 20.0, 20.0], &[2.0; 4]),
        };

        let result = system.evaluate_with_priorities(&timesteps, &priorities).unwrap();
        assert_eq!(result.operational_settings_used.values(), [1, 2, 1, 2]);
        assert_eq!(result.is_valid.values(), [true, true, true, false]);
        assert_eq!(
            consumer_result(&result, "b").rate.values(),
            [1.0, 2.0, 1.0, 2.0]
        );
    }

    #[rstest]
    #[case::empty(vec![], "Time vector must not be empty")]
    #[case::repeated(
        vec![date(2020, 1, 1), date(2020, 1, 1)],
        "Time vector must be in chronological order with no repeated timesteps"
    )]
    #[case::unordered(
        vec![date(2021, 1, 1), date(2020, 1, 1)],
        "Time vector must be in chronological order with no repeated timesteps"
    )]
    fn test_evaluate_invalid_timesteps(
        consumers: ConsumerList,
        #[case] timesteps: Vec<Timestep>,
        #[case] msg: &str,
    ) {
        let system = ConsumerSystem::new("system".into(), consumers, &[]).unwrap();
        let rates = vec![1.0; timesteps.len()];
        let candidates = vec![
            settings(&timesteps, &rates, &rates),
            settings(&timesteps, &rates, &rates),
        ];
        let priorities = indexmap! {
            PriorityID::new("high") => candidates[0].clone(),
            PriorityID::new("low") => candidates[1].clone(),
        };

        assert_error!(
            system.evaluate(&timesteps, &TemporalModel::constant(candidates)),
            msg
        );
        assert_error!(system.evaluate_with_priorities(&timesteps, &priorities), msg);
    }

    #[rstest]
    fn test_collect_consumer_results(consumers: ConsumerList, timesteps: Vec<Timestep>) {
        let results: Vec<Vec<ConsumerResult>> = [[1.0; 4], [2.0; 4]]
            .iter()
            .map(|rates| {
                consumers
                    .iter()
                    .map(|consumer| consumer.evaluate(&consumer_settings(&timesteps, rates)))
                    .collect()
            })
            .collect();
        let mut record = SelectionRecord::new(4);
        record.commit(0, &[false, true, false, true], 1);
        record.commit(0, &[true, true, true, true], 0);

        let merged = collect_consumer_results(
            &record,
            &[PeriodResults {
                range: 0..4,
                candidates: results,
            }],
        )
        .unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id, "a".into());
        assert_eq!(merged[0].rate.values(), [1.0, 2.0, 1.0, 2.0]);
        assert_eq!(merged[1].timesteps(), timesteps);
    }
}
