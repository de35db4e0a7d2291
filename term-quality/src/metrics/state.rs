//! Mergeable per-chunk partial states for the tabular backend.
//!
//! Each static metric computes one partial state per chunk and merges them.
//! Merges are exact: counts add, extrema fold, moments combine pairwise,
//! distinct values union, frequencies add per key.

use crate::error::Result;
use arrow::array::ArrayRef;
use arrow::row::OwnedRow;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A partial state computed over one chunk.
pub trait ChunkState: Sized {
    /// Combines partial states. Merging no states yields the empty state.
    fn merge(states: Vec<Self>) -> Self;
}

/// Computes one state per chunk and merges them.
pub fn fold_chunks<S, F>(arrays: &[ArrayRef], per_chunk: F) -> Result<S>
where
    S: ChunkState,
    F: Fn(&ArrayRef) -> Result<S>,
{
    let states = arrays.iter().map(per_chunk).collect::<Result<Vec<_>>>()?;
    Ok(S::merge(states))
}

/// Row and non-null value counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountState {
    pub rows: i64,
    pub values: i64,
}

impl CountState {
    pub fn of(array: &ArrayRef) -> Self {
        Self {
            rows: array.len() as i64,
            values: (array.len() - array.null_count()) as i64,
        }
    }

    pub fn nulls(&self) -> i64 {
        self.rows - self.values
    }
}

impl ChunkState for CountState {
    fn merge(states: Vec<Self>) -> Self {
        states.into_iter().fold(Self::default(), |acc, s| Self {
            rows: acc.rows + s.rows,
            values: acc.values + s.values,
        })
    }
}

/// A plain counter, e.g. matching values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterState(pub i64);

impl ChunkState for CounterState {
    fn merge(states: Vec<Self>) -> Self {
        CounterState(states.into_iter().map(|s| s.0).sum())
    }
}

/// Minimum and maximum of the observed values.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtremaState<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for ExtremaState<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd + Clone> ExtremaState<T> {
    pub fn observe(&mut self, value: T) {
        if self.min.as_ref().map_or(true, |m| value < *m) {
            self.min = Some(value.clone());
        }
        if self.max.as_ref().map_or(true, |m| value > *m) {
            self.max = Some(value);
        }
    }
}

impl<T: PartialOrd + Clone> ChunkState for ExtremaState<T> {
    fn merge(states: Vec<Self>) -> Self {
        let mut merged = Self::default();
        for state in states {
            if let Some(min) = state.min {
                merged.observe(min);
            }
            if let Some(max) = state.max {
                merged.observe(max);
            }
        }
        merged
    }
}

/// A value ordered by `key` that carries its rendered form.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeled {
    pub key: i64,
    pub label: String,
}

impl PartialOrd for Labeled {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.key.partial_cmp(&other.key)
    }
}

/// Count, sum, mean and sum of squared deviations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MomentsState {
    pub count: u64,
    pub sum: f64,
    pub mean: f64,
    pub m2: f64,
}

impl MomentsState {
    pub fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn combine(a: Self, b: Self) -> Self {
        if a.count == 0 {
            return b;
        }
        if b.count == 0 {
            return a;
        }
        let count = a.count + b.count;
        let delta = b.mean - a.mean;
        let mean = a.mean + delta * b.count as f64 / count as f64;
        let m2 = a.m2 + b.m2 + delta * delta * a.count as f64 * b.count as f64 / count as f64;
        Self {
            count,
            sum: a.sum + b.sum,
            mean,
            m2,
        }
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population standard deviation.
    pub fn stddev_pop(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).sqrt())
    }
}

impl ChunkState for MomentsState {
    fn merge(states: Vec<Self>) -> Self {
        states.into_iter().fold(Self::default(), Self::combine)
    }
}

/// Distinct non-null values, in Arrow row encoding.
#[derive(Debug, Clone, Default)]
pub struct DistinctState(pub HashSet<OwnedRow>);

impl ChunkState for DistinctState {
    fn merge(states: Vec<Self>) -> Self {
        let mut iter = states.into_iter();
        let mut merged = iter.next().unwrap_or_default();
        for state in iter {
            merged.0.extend(state.0);
        }
        merged
    }
}

/// Occurrences per key.
#[derive(Debug, Clone)]
pub struct FrequencyState<K>(pub HashMap<K, i64>);

impl<K> Default for FrequencyState<K> {
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<K: Hash + Eq> FrequencyState<K> {
    pub fn observe(&mut self, key: K) {
        *self.0.entry(key).or_insert(0) += 1;
    }

    /// Number of keys that occurred exactly once.
    pub fn singletons(&self) -> i64 {
        self.0.values().filter(|n| **n == 1).count() as i64
    }
}

impl<K: Hash + Eq> ChunkState for FrequencyState<K> {
    fn merge(states: Vec<Self>) -> Self {
        let mut merged = Self::default();
        for state in states {
            for (key, n) in state.0 {
                *merged.0.entry(key).or_insert(0) += n;
            }
        }
        merged
    }
}

impl FrequencyState<String> {
    /// The `bins` most frequent values, ties broken by value.
    pub fn top(self, bins: usize) -> Vec<(String, i64)> {
        let mut entries: Vec<(String, i64)> = self.0.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(bins);
        entries
    }
}

/// All non-null numeric values, for order statistics.
#[derive(Debug, Clone, Default)]
pub struct ValuesState(pub Vec<f64>);

impl ValuesState {
    /// Median with the two middle values averaged for even counts.
    pub fn median(mut self) -> Option<f64> {
        if self.0.is_empty() {
            return None;
        }
        self.0.sort_by(f64::total_cmp);
        let mid = self.0.len() / 2;
        if self.0.len() % 2 == 0 {
            Some((self.0[mid - 1] + self.0[mid]) / 2.0)
        } else {
            Some(self.0[mid])
        }
    }
}

impl ChunkState for ValuesState {
    fn merge(states: Vec<Self>) -> Self {
        ValuesState(states.into_iter().flat_map(|s| s.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments_merge_matches_single_pass() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        let mut whole = MomentsState::default();
        values.iter().for_each(|v| whole.observe(*v));

        let mut left = MomentsState::default();
        let mut right = MomentsState::default();
        values[..3].iter().for_each(|v| left.observe(*v));
        values[3..].iter().for_each(|v| right.observe(*v));
        let merged = MomentsState::merge(vec![left, MomentsState::default(), right]);

        assert_eq!(merged.count, 8);
        assert!((merged.mean().unwrap() - 5.0).abs() < 1e-12);
        assert!((merged.stddev_pop().unwrap() - 2.0).abs() < 1e-12);
        assert!((merged.stddev_pop().unwrap() - whole.stddev_pop().unwrap()).abs() < 1e-12);
        assert_eq!(MomentsState::default().mean(), None);
    }

    #[test]
    fn test_frequency_merge_adds_counts() {
        let mut a = FrequencyState::default();
        a.observe("x".to_string());
        a.observe("y".to_string());
        let mut b = FrequencyState::default();
        b.observe("x".to_string());
        b.observe("z".to_string());

        let merged = FrequencyState::merge(vec![a, b]);
        assert_eq!(merged.singletons(), 2);
        assert_eq!(
            merged.top(2),
            vec![("x".to_string(), 2), ("y".to_string(), 1)]
        );
    }

    #[test]
    fn test_extrema_and_median() {
        let mut a = ExtremaState::default();
        a.observe(3_i64);
        a.observe(-1);
        let mut b = ExtremaState::default();
        b.observe(10_i64);
        let merged = ExtremaState::merge(vec![a, ExtremaState::default(), b]);
        assert_eq!(merged.min, Some(-1));
        assert_eq!(merged.max, Some(10));

        assert_eq!(ValuesState(vec![3.0, 1.0, 2.0]).median(), Some(2.0));
        assert_eq!(ValuesState(vec![4.0, 1.0, 2.0, 3.0]).median(), Some(2.5));
        assert_eq!(ValuesState::default().median(), None);
    }
}
