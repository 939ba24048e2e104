//! Signal action for positive decisions
//!
//! A positive decision pulses a binary indicator a class-dependent number of
//! times. The indicator itself is behind [`SignalSink`] so the pulse pattern
//! can drive a GPIO line, a log, or a test recorder.

use async_trait::async_trait;
use gridsense_core::{Decision, Result};
use std::time::Duration;
use tracing::info;

/// Class index → number of pulses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalTable {
    repetitions: Vec<u32>,
}

impl SignalTable {
    /// Create a table from per-class repetition counts
    pub fn new(repetitions: Vec<u32>) -> Self {
        Self { repetitions }
    }

    /// Pulses for `class`; unknown classes get none
    pub fn repetitions(&self, class: usize) -> u32 {
        self.repetitions.get(class).copied().unwrap_or(0)
    }

    /// Pulses for a decision; zero unless it is positive
    pub fn for_decision(&self, decision: &Decision) -> u32 {
        decision.class().map_or(0, |class| self.repetitions(class))
    }
}

impl Default for SignalTable {
    fn default() -> Self {
        Self::new(vec![1, 2, 3])
    }
}

/// Binary output driven by the pulse pattern
#[async_trait]
pub trait SignalSink: Send {
    /// Switch the indicator on or off
    async fn set(&mut self, on: bool) -> Result<()>;
}

/// Sink that only records indicator changes in the log
#[derive(Debug, Default)]
pub struct LogSignal {
    transitions: u64,
}

impl LogSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of on/off changes so far
    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

#[async_trait]
impl SignalSink for LogSignal {
    async fn set(&mut self, on: bool) -> Result<()> {
        self.transitions += 1;
        info!(state = if on { "on" } else { "off" }, "indicator");
        Ok(())
    }
}

/// Pulse `sink` on then off `repetitions` times, holding each state for `interval`
pub async fn pulse<S>(sink: &mut S, repetitions: u32, interval: Duration) -> Result<()>
where
    S: SignalSink + ?Sized,
{
    for _ in 0..repetitions {
        sink.set(true).await?;
        tokio::time::sleep(interval).await;
        sink.set(false).await?;
        tokio::time::sleep(interval).await;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsense_core::ProbabilityVector;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        states: Vec<(bool, Instant)>,
    }

    #[async_trait]
    impl SignalSink for Recorder {
        async fn set(&mut self, on: bool) -> Result<()> {
            self.states.push((on, Instant::now()));
            Ok(())
        }
    }

    #[test]
    fn test_default_table() {
        let table = SignalTable::default();
        assert_eq!(table.repetitions(0), 1);
        assert_eq!(table.repetitions(1), 2);
        assert_eq!(table.repetitions(2), 3);
        assert_eq!(table.repetitions(3), 0);
    }

    #[test]
    fn test_repetitions_for_decision() {
        let table = SignalTable::default();

        let positive = Decision::from_probabilities(&ProbabilityVector::new([0.10, 0.90, 0.05]), 0.85);
        assert_eq!(table.for_decision(&positive), 2);

        let none = Decision::from_probabilities(&ProbabilityVector::new([0.50, 0.50, 0.0]), 0.85);
        assert_eq!(table.for_decision(&none), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_pattern_and_timing() {
        let mut recorder = Recorder::default();
        let start = Instant::now();

        pulse(&mut recorder, 3, Duration::from_millis(500)).await.unwrap();

        let states: Vec<bool> = recorder.states.iter().map(|(on, _)| *on).collect();
        assert_eq!(states, vec![true, false, true, false, true, false]);

        for (i, (_, at)) in recorder.states.iter().enumerate() {
            assert_eq!(*at - start, Duration::from_millis(500 * i as u64));
        }
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_zero_repetitions_is_noop() {
        let mut sink = LogSignal::new();
        pulse(&mut sink, 0, Duration::from_millis(500)).await.unwrap();
        assert_eq!(sink.transitions(), 0);
    }
}
