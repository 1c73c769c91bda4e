//! Choosing between named priorities one timestep at a time.
//!
//! For each timestep, the priorities are tried in order and the first one for which every result
//! is valid is chosen. If none is valid, the last priority is used.
use crate::consumer::ConsumerID;
use crate::id::define_id_type;
use crate::selection::SelectionRecord;
use crate::time_series::{Mergeable, TimeSeries, Timestep};
use anyhow::{Result, ensure};
use indexmap::IndexMap;
use indexmap::map::Entry;
use log::{debug, warn};

define_id_type! {PriorityID}

/// One of the results returned by an evaluator for a single timestep
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorResult<R> {
    /// What the result is for
    pub id: ConsumerID,
    /// The result itself
    pub result: R,
    /// Whether the result is valid
    pub is_valid: TimeSeries<bool>,
}

/// The outcome of choosing a priority for each timestep
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityOptimizerResult<R> {
    /// The priority chosen for each timestep
    pub priorities_used: TimeSeries<PriorityID>,
    /// Whether the chosen priority was valid at each timestep
    pub is_valid: TimeSeries<bool>,
    /// Results under the chosen priorities, stitched together, in order of first appearance
    pub priority_results: IndexMap<ConsumerID, R>,
}

/// Choose a priority for each timestep.
///
/// # Arguments
///
/// * `timesteps` - The timesteps to choose priorities for
/// * `priorities` - Candidate values, in priority order
/// * `evaluator` - Evaluates a candidate at the timestep with the given index
///
/// # Returns
///
/// The chosen priorities, their validity and the results under them. An error is only returned if
/// there are no priorities or the evaluator fails.
pub fn optimize<P, R, F>(
    timesteps: &[Timestep],
    priorities: &IndexMap<PriorityID, P>,
    mut evaluator: F,
) -> Result<PriorityOptimizerResult<R>>
where
    R: Mergeable,
    F: FnMut(usize, &P) -> Result<Vec<EvaluatorResult<R>>>,
{
    ensure!(!priorities.is_empty(), "At least one priority must be given");
    let last = priorities.len() - 1;

    let mut record = SelectionRecord::new(timesteps.len());
    let mut priority_results: IndexMap<ConsumerID, R> = IndexMap::new();
    for step in 0..timesteps.len() {
        let mut chosen = Vec::new();
        for (index, (priority_id, value)) in priorities.iter().enumerate() {
            let results = evaluator(step, value)?;
            ensure!(
                !results.is_empty(),
                "Evaluator returned no results for priority {priority_id}"
            );

            let is_valid = results.iter().all(|result| result.is_valid.all());
            chosen = results;
            if record.commit(step, &[is_valid], index) > 0 {
                debug!("Using priority {priority_id} at {}", timesteps[step]);
                break;
            }
        }

        if !record.is_complete(step..step + 1) {
            record.apply_fallback(step..step + 1, last);
            warn!(
                "No valid priority at {}; falling back to the last priority",
                timesteps[step]
            );
        }

        for EvaluatorResult { id, result, .. } in chosen {
            match priority_results.entry(id) {
                Entry::Occupied(mut entry) => {
                    let merged = entry.get().merge(&result)?;
                    entry.insert(merged);
                }
                Entry::Vacant(entry) => {
                    entry.insert(result);
                }
            }
        }
    }

    let priority_ids: Vec<_> = priorities.keys().collect();
    let priorities_used = record
        .used()
        .iter()
        .map(|used| priority_ids[used.unwrap_or(last)].clone())
        .collect();

    Ok(PriorityOptimizerResult {
        priorities_used: TimeSeries::new(timesteps.to_vec(), priorities_used)?,
        is_valid: TimeSeries::new(timesteps.to_vec(), record.is_valid().to_vec())?,
        priority_results,
    })
}
