//! Metrics collection and reporting

use gridsense_classifiers::CycleOutcome;
use gridsense_core::Phase;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counter of processed lines, labelled by outcome
pub const LINES_TOTAL: &str = "gridsense_lines_total";

/// Histogram of phase latencies in microseconds, labelled by phase
pub const PHASE_LATENCY_US: &str = "gridsense_phase_latency_us";

/// Metrics collector for classification cycles
#[derive(Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    lines: AtomicU64,
    parse_failures: AtomicU64,
    inference_failures: AtomicU64,
    detections: AtomicU64,
    inference_runs: AtomicU64,
    parse_latency_us: AtomicU64,
    inference_latency_us: AtomicU64,
    total_latency_us: AtomicU64,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::default()),
        }
    }

    /// Describe the exported metrics to the installed recorder
    pub fn describe() {
        ::metrics::describe_counter!(LINES_TOTAL, "Total number of input lines by outcome");
        ::metrics::describe_histogram!(
            PHASE_LATENCY_US,
            ::metrics::Unit::Microseconds,
            "Cycle latency in microseconds by phase"
        );
    }

    /// Record one finished cycle, locally and to the installed recorder
    pub fn record(&self, outcome: &CycleOutcome) {
        self.inner.lines.fetch_add(1, Ordering::Relaxed);

        let label = match &outcome.result {
            Ok(c) if c.decision.is_detected() => {
                self.inner.detections.fetch_add(1, Ordering::Relaxed);
                "detected"
            }
            Ok(_) => "none",
            Err(_) if outcome.matrix.is_none() => {
                self.inner.parse_failures.fetch_add(1, Ordering::Relaxed);
                "parse_failed"
            }
            Err(_) => {
                self.inner.inference_failures.fetch_add(1, Ordering::Relaxed);
                "inference_failed"
            }
        };
        ::metrics::counter!(LINES_TOTAL, "outcome" => label).increment(1);

        for phase in Phase::ALL {
            if let Some(us) = outcome.timings.micros(phase) {
                if phase == Phase::Inference {
                    self.inner.inference_runs.fetch_add(1, Ordering::Relaxed);
                }
                self.latency_slot(phase).fetch_add(us, Ordering::Relaxed);
                ::metrics::histogram!(PHASE_LATENCY_US, "phase" => phase.as_str()).record(us as f64);
            }
        }
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            lines: self.inner.lines.load(Ordering::Relaxed),
            parse_failures: self.inner.parse_failures.load(Ordering::Relaxed),
            inference_failures: self.inner.inference_failures.load(Ordering::Relaxed),
            detections: self.inner.detections.load(Ordering::Relaxed),
            inference_runs: self.inner.inference_runs.load(Ordering::Relaxed),
            parse_latency_us: self.inner.parse_latency_us.load(Ordering::Relaxed),
            inference_latency_us: self.inner.inference_latency_us.load(Ordering::Relaxed),
            total_latency_us: self.inner.total_latency_us.load(Ordering::Relaxed),
        }
    }

    fn latency_slot(&self, phase: Phase) -> &AtomicU64 {
        match phase {
            Phase::Parse => &self.inner.parse_latency_us,
            Phase::Inference => &self.inner.inference_latency_us,
            Phase::Total => &self.inner.total_latency_us,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub lines: u64,
    pub parse_failures: u64,
    pub inference_failures: u64,
    pub detections: u64,
    /// Engine calls that were timed, failed ones included
    pub inference_runs: u64,
    pub parse_latency_us: u64,
    pub inference_latency_us: u64,
    pub total_latency_us: u64,
}

impl MetricsSnapshot {
    /// Lines that reached a decision
    pub fn classified(&self) -> u64 {
        self.lines - self.parse_failures - self.inference_failures
    }

    /// Average end-to-end latency per line
    pub fn avg_total_latency_us(&self) -> u64 {
        if self.lines == 0 {
            0
        } else {
            self.total_latency_us / self.lines
        }
    }

    /// Average inference latency per engine call
    pub fn avg_inference_latency_us(&self) -> u64 {
        match self.inference_runs {
            0 => 0,
            n => self.inference_latency_us / n,
        }
    }

    /// Fraction of lines that ended in a detection
    pub fn detection_rate(&self) -> f64 {
        if self.lines == 0 {
            0.0
        } else {
            self.detections as f64 / self.lines as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsense_classifiers::Classification;
    use gridsense_core::{CycleTimings, Decision, Error, Matrix, ProbabilityVector};
    use std::time::Duration;

    fn classified(probabilities: [f32; 3], total_us: u64) -> CycleOutcome {
        let probabilities = ProbabilityVector::new(probabilities);
        let mut timings = CycleTimings::new();
        timings.record(Phase::Parse, Duration::from_micros(10));
        timings.record(Phase::Inference, Duration::from_micros(total_us - 20));
        timings.record(Phase::Total, Duration::from_micros(total_us));
        CycleOutcome {
            line: String::new(),
            matrix: Some(Matrix::default()),
            result: Ok(Classification {
                probabilities,
                decision: Decision::from_probabilities(&probabilities, 0.85),
                repetitions: 0,
            }),
            timings,
        }
    }

    fn parse_failure() -> CycleOutcome {
        let mut timings = CycleTimings::new();
        timings.record(Phase::Parse, Duration::from_micros(4));
        timings.record(Phase::Total, Duration::from_micros(6));
        CycleOutcome {
            line: String::new(),
            matrix: None,
            result: Err(Error::MalformedToken { index: 0 }),
            timings,
        }
    }

    #[test]
    fn test_metrics_collection() {
        let metrics = MetricsCollector::new();

        metrics.record(&classified([0.1, 0.9, 0.0], 100));
        metrics.record(&classified([0.4, 0.3, 0.3], 200));
        metrics.record(&parse_failure());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.lines, 3);
        assert_eq!(snapshot.detections, 1);
        assert_eq!(snapshot.parse_failures, 1);
        assert_eq!(snapshot.inference_failures, 0);
        assert_eq!(snapshot.classified(), 2);
        assert_eq!(snapshot.total_latency_us, 306);
        assert_eq!(snapshot.avg_total_latency_us(), 102);
        assert_eq!(snapshot.avg_inference_latency_us(), 130);
    }

    #[test]
    fn test_inference_failure_counted() {
        let metrics = MetricsCollector::new();
        let mut outcome = classified([0.0; 3], 50);
        outcome.result = Err(Error::inference("boom"));

        metrics.record(&outcome);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inference_failures, 1);
        assert_eq!(snapshot.parse_failures, 0);
    }

    #[test]
    fn test_failed_inference_counts_toward_average() {
        let metrics = MetricsCollector::new();
        let mut failed = classified([0.0; 3], 50);
        failed.result = Err(Error::inference("boom"));

        metrics.record(&classified([0.1, 0.9, 0.0], 100));
        metrics.record(&failed);
        metrics.record(&parse_failure());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.inference_latency_us, 80 + 30);
        assert_eq!(snapshot.inference_runs, 2);
        assert_eq!(snapshot.avg_inference_latency_us(), 55);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = MetricsCollector::new().snapshot();
        assert_eq!(snapshot.avg_total_latency_us(), 0);
        assert_eq!(snapshot.detection_rate(), 0.0);
    }
}
