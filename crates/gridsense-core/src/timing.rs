//! Per-cycle phase timing
//!
//! One [`CycleTimings`] is created per input line and passed down the call
//! chain. Measuring never changes what the measured code returns.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Measured phase of a classification cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Sanitizing and parsing the line into a matrix
    Parse,
    /// The inference engine call
    Inference,
    /// The whole cycle, line in to decision out
    Total,
}

impl Phase {
    /// All phases in report order
    pub const ALL: [Phase; 3] = [Phase::Parse, Phase::Inference, Phase::Total];

    /// Lowercase name, used for metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Inference => "inference",
            Self::Total => "total",
        }
    }
}

/// Elapsed durations recorded for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTimings {
    parse: Option<Duration>,
    inference: Option<Duration>,
    total: Option<Duration>,
}

impl CycleTimings {
    /// Create an empty set of timings
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f`, recording its monotonic elapsed time under `phase`
    pub fn measure<T>(&mut self, phase: Phase, f: impl FnOnce(&mut Self) -> T) -> T {
        let start = Instant::now();
        let out = f(self);
        self.record(phase, start.elapsed());
        out
    }

    /// Record an externally measured duration
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        *self.slot(phase) = Some(elapsed);
    }

    /// Duration for `phase`, if it ran
    pub fn get(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Parse => self.parse,
            Phase::Inference => self.inference,
            Phase::Total => self.total,
        }
    }

    /// Elapsed microseconds for `phase`, if it ran
    pub fn micros(&self, phase: Phase) -> Option<u64> {
        self.get(phase).map(|d| d.as_micros() as u64)
    }

    fn slot(&mut self, phase: Phase) -> &mut Option<Duration> {
        match phase {
            Phase::Parse => &mut self.parse,
            Phase::Inference => &mut self.inference,
            Phase::Total => &mut self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_returns_closure_value() {
        let mut timings = CycleTimings::new();
        let value = timings.measure(Phase::Parse, |_| 42);
        assert_eq!(value, 42);
        assert!(timings.get(Phase::Parse).is_some());
        assert!(timings.get(Phase::Inference).is_none());
    }

    #[test]
    fn test_nested_measure_total_covers_inner() {
        let mut timings = CycleTimings::new();
        timings.measure(Phase::Total, |t| {
            t.measure(Phase::Inference, |_| {
                std::thread::sleep(Duration::from_millis(2));
            });
        });

        let inner = timings.get(Phase::Inference).unwrap();
        let outer = timings.get(Phase::Total).unwrap();
        assert!(inner >= Duration::from_millis(2));
        assert!(outer >= inner);
    }

    #[test]
    fn test_micros() {
        let mut timings = CycleTimings::new();
        timings.record(Phase::Inference, Duration::from_micros(1500));
        assert_eq!(timings.micros(Phase::Inference), Some(1500));
        assert_eq!(timings.micros(Phase::Total), None);
    }
}
