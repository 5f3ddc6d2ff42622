//! Metrics primitives

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonic counter, shared between clones
#[derive(Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
    name: String,
}

impl Counter {
    pub fn new(name: &str) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(0)),
            name: name.to_string(),
        }
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Sample window for latency percentiles. Oldest samples are evicted first.
#[derive(Clone)]
pub struct Histogram {
    samples: Arc<parking_lot::Mutex<std::collections::VecDeque<f64>>>,
    name: String,
    max_samples: usize,
}

impl Histogram {
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, 10_000)
    }

    pub fn with_capacity(name: &str, max_samples: usize) -> Self {
        Self {
            samples: Arc::new(parking_lot::Mutex::new(std::collections::VecDeque::with_capacity(
                max_samples.min(1000),
            ))),
            name: name.to_string(),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&self, value: f64) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.max_samples {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    pub fn count(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn percentile(&self, p: f64) -> f64 {
        let mut sorted: Vec<f64> = self.samples.lock().iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((sorted.len() as f64) * p / 100.0) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn mean(&self) -> f64 {
        let samples = self.samples.lock();
        if samples.is_empty() {
            return 0.0;
        }
        samples.iter().sum::<f64>() / samples.len() as f64
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_shared_between_clones() {
        let counter = Counter::new("queries_total");
        let clone = counter.clone();
        counter.inc();
        clone.add(4);
        assert_eq!(counter.get(), 5);
        assert_eq!(clone.name(), "queries_total");
    }

    #[test]
    fn test_histogram() {
        let hist = Histogram::new("query_latency_ms");
        assert_eq!(hist.mean(), 0.0);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            hist.record(v);
        }

        assert!((hist.mean() - 3.0).abs() < 0.001);
        assert!((hist.percentile(50.0) - 3.0).abs() < 0.001);
        assert!((hist.percentile(100.0) - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_histogram_evicts_oldest() {
        let hist = Histogram::with_capacity("latency", 3);
        for v in [100.0, 1.0, 2.0, 3.0] {
            hist.record(v);
        }
        assert_eq!(hist.count(), 3);
        assert!((hist.mean() - 2.0).abs() < 0.001);
    }
}
