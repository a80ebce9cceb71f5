//! Streaming statistics over the result stream.
//!
//! Mean and variance use Welford's single-pass formula, so the aggregator
//! never needs to retain individual results. Results arrive as an unordered
//! multiset; any permutation of the same set lands on the same statistics
//! within floating tolerance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Incrementally maintained statistics. One writer (the aggregator's consume
/// loop); readers get a `StatsSnapshot` copy.
#[derive(Debug, Clone)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    per_worker: BTreeMap<String, u64>,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            per_worker: BTreeMap::new(),
        }
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one result value attributed to `worker_id`.
    pub fn record(&mut self, worker_id: &str, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        *self.per_worker.entry(worker_id.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance (M2 / n), matching the original dashboard's
    /// `numpy.std` convention. Zero until the first result.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    pub fn per_worker(&self) -> &BTreeMap<String, u64> {
        &self.per_worker
    }

    /// A consistent copy for readers.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            count: self.count,
            mean: self.mean,
            std_dev: self.std_dev(),
            min: self.min(),
            max: self.max(),
            per_worker: self.per_worker.clone(),
            updated_at: Utc::now(),
        }
    }
}

/// Read-only copy of the statistics at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub per_worker: BTreeMap<String, u64>,
    pub updated_at: DateTime<Utc>,
}

impl Default for StatsSnapshot {
    fn default() -> Self {
        RunningStats::new().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_mean_variance(values: &[f64]) -> (f64, f64) {
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, variance)
    }

    #[test]
    fn empty_stats() {
        let stats = RunningStats::new();
        assert_eq!(stats.count(), 0);
        assert_eq!(stats.variance(), 0.0);
        assert!(stats.min().is_none());
        assert!(stats.max().is_none());
    }

    #[test]
    fn incremental_matches_batch() {
        let values = [3.1, -2.0, 7.5, 0.0, 12.25, -8.5, 4.4, 1.0];
        let mut stats = RunningStats::new();
        for v in values {
            stats.record("w", v);
        }

        let (mean, variance) = batch_mean_variance(&values);
        assert!((stats.mean() - mean).abs() < 1e-12);
        assert!((stats.variance() - variance).abs() < 1e-12);
        assert_eq!(stats.min(), Some(-8.5));
        assert_eq!(stats.max(), Some(12.25));
    }

    #[test]
    fn order_independent_within_tolerance() {
        let values = [1.5, 99.0, -3.25, 42.0, 0.125, 7.0];
        let mut forward = RunningStats::new();
        let mut backward = RunningStats::new();
        for v in values {
            forward.record("w", v);
        }
        for v in values.iter().rev() {
            backward.record("w", *v);
        }

        assert!((forward.mean() - backward.mean()).abs() < 1e-9);
        assert!((forward.variance() - backward.variance()).abs() < 1e-9);
        assert_eq!(forward.min(), backward.min());
        assert_eq!(forward.max(), backward.max());
    }

    #[test]
    fn per_worker_counts() {
        let mut stats = RunningStats::new();
        stats.record("worker-1", 1.0);
        stats.record("worker-2", 2.0);
        stats.record("worker-1", 3.0);

        assert_eq!(stats.per_worker().get("worker-1"), Some(&2));
        assert_eq!(stats.per_worker().get("worker-2"), Some(&1));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.per_worker.len(), 2);
    }
}
