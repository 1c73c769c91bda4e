//! Keeping track of which candidate has been selected at each timestep.
//!
//! Candidates are tried in priority order. The first candidate which is valid at a timestep is
//! committed for it, and later candidates can never override that choice. If no candidate is
//! valid at a timestep, it falls back to the last candidate.
use std::ops::Range;

/// Per-timestep record of the selected candidate
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionRecord {
    /// Whether a valid candidate has been found for each timestep
    is_valid: Vec<bool>,
    /// Index of the selected candidate for each timestep (`None` until a decision is made)
    used: Vec<Option<usize>>,
}

impl SelectionRecord {
    /// Create a record for the given number of timesteps with no decisions made
    pub fn new(number_of_timesteps: usize) -> Self {
        Self {
            is_valid: vec![false; number_of_timesteps],
            used: vec![None; number_of_timesteps],
        }
    }

    /// Commit `candidate` to each timestep where it is valid and nothing has been committed yet.
    ///
    /// `valid[i]` refers to timestep `offset + i`. Returns the number of newly committed
    /// timesteps.
    pub fn commit(&mut self, offset: usize, valid: &[bool], candidate: usize) -> usize {
        let mut committed = 0;
        for (i, &valid) in valid.iter().enumerate() {
            let step = offset + i;
            if valid && !self.is_valid[step] {
                self.is_valid[step] = true;
                self.used[step] = Some(candidate);
                committed += 1;
            }
        }

        committed
    }

    /// Whether a valid candidate has been found for every timestep in `range`
    pub fn is_complete(&self, range: Range<usize>) -> bool {
        self.is_valid[range].iter().all(|&valid| valid)
    }

    /// Assign `candidate` to every timestep in `range` without a valid candidate.
    ///
    /// These timesteps remain flagged as invalid. Returns the timesteps which were assigned.
    pub fn apply_fallback(&mut self, range: Range<usize>, candidate: usize) -> Vec<usize> {
        let mut assigned = Vec::new();
        for step in range {
            if !self.is_valid[step] {
                self.used[step] = Some(candidate);
                assigned.push(step);
            }
        }

        assigned
    }

    /// Whether a valid candidate was found for each timestep
    pub fn is_valid(&self) -> &[bool] {
        &self.is_valid
    }

    /// The selected candidate for each timestep, if decided
    pub fn used(&self) -> &[Option<usize>] {
        &self.used
    }

    /// The selected candidates numbered from 1, with 0 meaning no decision was made
    pub fn used_one_based(&self) -> Vec<usize> {
        self.used
            .iter()
            .map(|used| used.map_or(0, |index| index + 1))
            .collect()
    }

    /// Group the timesteps in `range` by their selected candidate, in candidate order
    pub fn steps_by_candidate(&self, range: Range<usize>) -> Vec<(usize, Vec<usize>)> {
        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        for step in range {
            let Some(candidate) = self.used[step] else {
                continue;
            };
            match groups.iter_mut().find(|(c, _)| *c == candidate) {
                Some((_, steps)) => steps.push(step),
                None => groups.push((candidate, vec![step])),
            }
        }
        groups.sort_by_key(|(candidate, _)| *candidate);

        groups
    }
}
