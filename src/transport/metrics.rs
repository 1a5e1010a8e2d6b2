use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use histogram::Histogram;

/// Counters and latency histogram for dispatched requests.
///
/// Shared behind an `Arc` between the Session and every Worker it spawns;
/// all mutation is lock-free or behind the histogram's own mutex, so
/// recording a sample never touches Session state.
#[derive(Debug, Default)]
pub struct Metrics {
    total_dispatches: AtomicU64,
    failed_dispatches: AtomicU64,
    retries: AtomicU64,
    latencies: Mutex<Histogram>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn inc_total_dispatches(&self) {
        self.total_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_dispatches(&self) {
        self.failed_dispatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_retries(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn log_dispatch_latency(&self, latency: Duration) {
        let _ = self
            .latencies
            .lock()
            .unwrap()
            .increment(latency.as_micros() as u64);
    }

    pub fn view(&self) -> MetricsView {
        let histogram = self.latencies.lock().unwrap();
        MetricsView {
            total_dispatches: self.total_dispatches.load(Ordering::Relaxed),
            failed_dispatches: self.failed_dispatches.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            mean_latency_micros: histogram.mean().unwrap_or(0),
            p99_latency_micros: histogram.percentile(99.0).unwrap_or(0),
        }
    }
}

/// A point-in-time snapshot of [`Metrics`], cheap to clone and hand out to
/// callers that want to inspect driver health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsView {
    pub total_dispatches: u64,
    pub failed_dispatches: u64,
    pub retries: u64,
    pub mean_latency_micros: u64,
    pub p99_latency_micros: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = Metrics::new();
        let view = metrics.view();
        assert_eq!(view.total_dispatches, 0);
        assert_eq!(view.failed_dispatches, 0);
    }

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new();
        metrics.inc_total_dispatches();
        metrics.inc_total_dispatches();
        metrics.inc_failed_dispatches();
        metrics.inc_retries();
        metrics.log_dispatch_latency(Duration::from_micros(500));

        let view = metrics.view();
        assert_eq!(view.total_dispatches, 2);
        assert_eq!(view.failed_dispatches, 1);
        assert_eq!(view.retries, 1);
        assert_eq!(view.mean_latency_micros, 500);
    }
}
