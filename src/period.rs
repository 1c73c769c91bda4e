//! Scheduling periods and values which change over time.
use crate::input::is_sorted_and_unique;
use crate::time_series::Timestep;
use anyhow::{Result, ensure};
use std::fmt::Display;
use std::ops::Range;

/// A half-open range of time, `[start, end)`. A period with no end extends indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    /// First timestep included in the period
    pub start: Timestep,
    /// First timestep not included in the period
    pub end: Option<Timestep>,
}

impl Period {
    /// Get the contiguous range of positions in `timesteps` which fall within the period.
    ///
    /// `timesteps` must be sorted.
    pub fn get_timestep_indices(&self, timesteps: &[Timestep]) -> Range<usize> {
        let start = timesteps.partition_point(|&t| t < self.start);
        let end = match self.end {
            Some(end) => timesteps.partition_point(|&t| t < end),
            None => timesteps.len(),
        };

        start..end.max(start)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}..{}", self.start, end),
            None => write!(f, "{}..", self.start),
        }
    }
}

/// A value which changes at given start dates, each holding until the next one begins
#[derive(Debug, Clone, PartialEq)]
pub struct TemporalModel<T> {
    models: Vec<(Timestep, T)>,
}

impl<T> TemporalModel<T> {
    /// Create a new temporal model from `(start, value)` pairs.
    ///
    /// The start dates must be unique and in order.
    pub fn new(models: Vec<(Timestep, T)>) -> Result<Self> {
        ensure!(!models.is_empty(), "Temporal model must have at least one period");
        let starts: Vec<_> = models.iter().map(|(start, _)| *start).collect();
        ensure!(
            is_sorted_and_unique(&starts),
            "Temporal model start dates must be unique and in order"
        );

        Ok(Self { models })
    }

    /// A model with the same value for all time
    pub fn constant(value: T) -> Self {
        Self {
            models: vec![(Timestep::MIN, value)],
        }
    }

    /// The start of the first period
    pub fn start(&self) -> Timestep {
        self.models[0].0
    }

    /// Iterate over each period and its value
    pub fn iter(&self) -> impl Iterator<Item = (Period, &T)> {
        self.models.iter().enumerate().map(|(i, (start, value))| {
            let end = self.models.get(i + 1).map(|(next_start, _)| *next_start);
            (
                Period {
                    start: *start,
                    end,
                },
                value,
            )
        })
    }
}
