//! Instrument primitives backing the registry.
//!
//! Counters are keyed by attribute set in a `DashMap` of atomics. Labels are
//! flattened into sorted key vectors to keep deterministic ordering. The gauge
//! and the histogram buffer sit behind a `Mutex`; hold time is a single field
//! update or push.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;

use crate::data::{AttributeValue, Attributes, HistogramData, SumPoint};

/// Lock without propagating poison; a panicking holder cannot leave these
/// values half-written.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn label_key(labels: &[(&str, AttributeValue)]) -> Attributes {
    let mut key: Attributes = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    key.sort();
    key
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Attributes, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, AttributeValue)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, AttributeValue)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Value of one series (0 when never incremented).
    pub fn get(&self, labels: &[(&str, AttributeValue)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Sum across all series.
    pub fn total(&self) -> u64 {
        self.map.iter().map(|r| r.value().load(Ordering::Relaxed)).sum()
    }

    /// Snapshot of every series, sorted by attributes.
    pub fn points(&self) -> Vec<SumPoint> {
        let mut points: Vec<SumPoint> = self
            .map
            .iter()
            .map(|r| SumPoint {
                attributes: r.key().clone(),
                value: r.value().load(Ordering::Relaxed),
            })
            .collect();
        points.sort_by(|a, b| a.attributes.cmp(&b.attributes));
        points
    }
}

#[derive(Default)]
struct HistogramState {
    count: u64,
    sum: f64,
    pending: Vec<f64>,
}

/// Append-only distribution of `f64` samples.
#[derive(Default)]
pub struct Histogram {
    state: Mutex<HistogramState>,
}

impl Histogram {
    /// Record one sample. Negative and NaN values are dropped.
    pub fn record(&self, value: f64) {
        if value.is_nan() || value < 0.0 {
            tracing::debug!(value, "ignoring invalid histogram sample");
            return;
        }
        let mut st = lock(&self.state);
        st.count += 1;
        st.sum += value;
        st.pending.push(value);
    }

    pub fn count(&self) -> u64 {
        lock(&self.state).count
    }

    pub fn sum(&self) -> f64 {
        lock(&self.state).sum
    }

    /// Cumulative totals plus the samples recorded since the last drain.
    pub fn drain(&self) -> HistogramData {
        let mut st = lock(&self.state);
        HistogramData {
            count: st.count,
            sum: st.sum,
            samples: std::mem::take(&mut st.pending),
        }
    }
}

/// Signed integer gauge that never drops below zero.
#[derive(Default)]
pub struct ClampedGauge {
    value: Mutex<i64>,
}

impl ClampedGauge {
    /// Apply `delta` and clamp to zero. Returns the new value.
    pub fn add(&self, delta: i64) -> i64 {
        let mut v = lock(&self.value);
        *v = v.saturating_add(delta).max(0);
        *v
    }

    pub fn get(&self) -> i64 {
        *lock(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_labels_are_order_independent() {
        let c = CounterVec::default();
        c.inc(&[("a", "1".into()), ("b", 2.into())]);
        c.inc(&[("b", 2.into()), ("a", "1".into())]);
        assert_eq!(c.get(&[("a", "1".into()), ("b", 2.into())]), 2);
        assert_eq!(c.points().len(), 1);
    }

    #[test]
    fn integer_and_string_labels_are_distinct_series() {
        let c = CounterVec::default();
        c.inc(&[("code", 500.into())]);
        c.inc(&[("code", "500".into())]);
        assert_eq!(c.get(&[("code", 500.into())]), 1);
        assert_eq!(c.points().len(), 2);
    }

    #[test]
    fn histogram_drain_keeps_totals() {
        let h = Histogram::default();
        h.record(0.5);
        h.record(1.5);
        let first = h.drain();
        assert_eq!(first.samples, vec![0.5, 1.5]);
        assert_eq!(first.count, 2);

        h.record(1.0);
        let second = h.drain();
        assert_eq!(second.samples, vec![1.0]);
        assert_eq!(second.count, 3);
        assert!((second.sum - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn histogram_ignores_invalid_samples() {
        let h = Histogram::default();
        h.record(-1.0);
        h.record(f64::NAN);
        assert_eq!(h.count(), 0);
    }

    #[test]
    fn gauge_saturates_instead_of_overflowing() {
        let g = ClampedGauge::default();
        g.add(i64::MAX);
        assert_eq!(g.add(1), i64::MAX);
        assert_eq!(g.add(i64::MIN), 0);
    }
}
