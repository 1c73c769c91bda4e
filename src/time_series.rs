//! Time series of values keyed by an ordered vector of timesteps.
//!
//! All the quantities handled by the engine (rates, pressures, energy usage, validity flags) are
//! stored as [`TimeSeries`]. Series that are combined elementwise must share the same timesteps.
use anyhow::{Result, ensure};
use chrono::NaiveDate;
use itertools::Itertools;
use std::ops::{Add, BitAnd, Range};

/// A point on the global time axis
pub type Timestep = NaiveDate;

/// Results which can be cut down to a subset of their timesteps and stitched back together
pub trait Mergeable: Sized {
    /// Combine two results covering disjoint timesteps into one, ordered by time
    fn merge(&self, other: &Self) -> Result<Self>;

    /// Extract the values at the given (not necessarily contiguous) positions
    fn get_subset(&self, indices: &[usize]) -> Self;
}

/// A sequence of values, one per timestep
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries<T> {
    timesteps: Vec<Timestep>,
    values: Vec<T>,
}

impl<T> TimeSeries<T> {
    /// Create a new time series, checking that there is exactly one value per timestep
    pub fn new(timesteps: Vec<Timestep>, values: Vec<T>) -> Result<Self> {
        ensure!(
            timesteps.len() == values.len(),
            "Time series has {} timesteps but {} values",
            timesteps.len(),
            values.len()
        );

        Ok(Self { timesteps, values })
    }

    /// The timesteps of the series
    pub fn timesteps(&self) -> &[Timestep] {
        &self.timesteps
    }

    /// The values of the series
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// The number of timesteps
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no timesteps
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(timestep, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Timestep, &T)> {
        self.timesteps.iter().zip(self.values.iter())
    }

    /// Apply `f` to each value, keeping the timesteps
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> TimeSeries<U> {
        TimeSeries {
            timesteps: self.timesteps.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }

    /// Combine two series sharing the same timesteps elementwise
    ///
    /// # Panics
    ///
    /// Panics if the timesteps of the two series differ.
    pub fn zip_with<U, V, F>(&self, other: &TimeSeries<U>, mut f: F) -> TimeSeries<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        assert_eq!(
            self.timesteps, other.timesteps,
            "Cannot combine time series with different timesteps"
        );

        TimeSeries {
            timesteps: self.timesteps.clone(),
            values: self
                .values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }
}

impl<T: Clone> TimeSeries<T> {
    /// Create a series with the same value at every timestep
    pub fn filled(timesteps: &[Timestep], value: T) -> Self {
        Self {
            timesteps: timesteps.to_vec(),
            values: vec![value; timesteps.len()],
        }
    }

    /// Extract a contiguous range of timesteps
    pub fn get_range(&self, range: Range<usize>) -> Self {
        Self {
            timesteps: self.timesteps[range.clone()].to_vec(),
            values: self.values[range].to_vec(),
        }
    }
}

impl<T: Clone> Mergeable for TimeSeries<T> {
    fn merge(&self, other: &Self) -> Result<Self> {
        let (timesteps, values): (Vec<_>, Vec<_>) = self
            .iter()
            .chain(other.iter())
            .sorted_by_key(|(timestep, _)| **timestep)
            .map(|(timestep, value)| (*timestep, value.clone()))
            .unzip();
        ensure!(
            timesteps.iter().tuple_windows().all(|(a, b)| a < b),
            "Cannot merge time series with overlapping timesteps"
        );

        Ok(Self { timesteps, values })
    }

    fn get_subset(&self, indices: &[usize]) -> Self {
        Self {
            timesteps: indices.iter().map(|&i| self.timesteps[i]).collect(),
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
        }
    }
}

impl TimeSeries<bool> {
    /// Whether the series is `true` at every timestep
    pub fn all(&self) -> bool {
        self.values.iter().all(|&valid| valid)
    }
}

impl Add for &TimeSeries<f64> {
    type Output = TimeSeries<f64>;

    fn add(self, rhs: Self) -> TimeSeries<f64> {
        self.zip_with(rhs, |a, b| a + b)
    }
}

impl BitAnd for &TimeSeries<bool> {
    type Output = TimeSeries<bool>;

    fn bitand(self, rhs: Self) -> TimeSeries<bool> {
        self.zip_with(rhs, |a, b| *a && *b)
    }
}

/// Sum a collection of series elementwise, returning `None` if there are none
pub fn sum_all<'a, I>(series: I) -> Option<TimeSeries<f64>>
where
    I: IntoIterator<Item = &'a TimeSeries<f64>>,
{
    series
        .into_iter()
        .fold(None, |acc: Option<TimeSeries<f64>>, s| match acc {
            None => Some(s.clone()),
            Some(acc) => Some(&acc + s),
        })
}

/// Combine a collection of validity series with logical AND, returning `None` if there are none
pub fn all_valid<'a, I>(series: I) -> Option<TimeSeries<bool>>
where
    I: IntoIterator<Item = &'a TimeSeries<bool>>,
{
    series
        .into_iter()
        .fold(None, |acc: Option<TimeSeries<bool>>, s| match acc {
            None => Some(s.clone()),
            Some(acc) => Some(&acc & s),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, timesteps};
    use rstest::rstest;

    #[rstest]
    fn test_new_length_mismatch(timesteps: Vec<Timestep>) {
        assert_error!(
            TimeSeries::new(timesteps, vec![1.0]),
            "Time series has 4 timesteps but 1 values"
        );
    }

    #[rstest]
    fn test_add(timesteps: Vec<Timestep>) {
        let a = TimeSeries::new(timesteps.clone(), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = TimeSeries::filled(&timesteps, 1.0);
        assert_eq!((&a + &b).values(), [2.0, 3.0, 4.0, 5.0]);
    }

    #[rstest]
    fn test_all_valid(timesteps: Vec<Timestep>) {
        let a = TimeSeries::new(timesteps.clone(), vec![true, true, false, true]).unwrap();
        let b = TimeSeries::new(timesteps.clone(), vec![true, false, false, true]).unwrap();
        let valid = all_valid([&a, &b]).unwrap();
        assert_eq!(valid.values(), [true, false, false, true]);
        assert!(!valid.all());
        assert!(all_valid(Vec::<&TimeSeries<bool>>::new()).is_none());
    }

    #[rstest]
    fn test_sum_all(timesteps: Vec<Timestep>) {
        let a = TimeSeries::filled(&timesteps, 1.5);
        let b = TimeSeries::filled(&timesteps, 2.0);
        assert_eq!(sum_all([&a, &b, &a]).unwrap().values(), [5.0; 4]);
        assert!(sum_all(Vec::<&TimeSeries<f64>>::new()).is_none());
    }

    #[rstest]
    fn test_subset_and_merge(timesteps: Vec<Timestep>) {
        let series = TimeSeries::new(timesteps.clone(), vec![1, 2, 3, 4]).unwrap();
        let odd = series.get_subset(&[1, 3]);
        let even = series.get_subset(&[0, 2]);
        assert_eq!(odd.timesteps(), [timesteps[1], timesteps[3]]);

        // Merging in either order restores the original series
        assert_eq!(odd.merge(&even).unwrap(), series);
        assert_eq!(even.merge(&odd).unwrap(), series);
    }

    #[rstest]
    fn test_merge_overlapping(timesteps: Vec<Timestep>) {
        let series = TimeSeries::filled(&timesteps, 0.0);
        assert_error!(
            series.merge(&series.get_subset(&[2])),
            "Cannot merge time series with overlapping timesteps"
        );
    }

    #[rstest]
    fn test_get_range(timesteps: Vec<Timestep>) {
        let series = TimeSeries::new(timesteps.clone(), vec![5, 6, 7, 8]).unwrap();
        let range = series.get_range(1..3);
        assert_eq!(range.timesteps(), &timesteps[1..3]);
        assert_eq!(range.values(), [6, 7]);
    }
}
