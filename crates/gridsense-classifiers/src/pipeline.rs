//! Classification pipeline
//!
//! One cycle takes a raw line through sanitizing, parsing, inference, and the
//! threshold decision:
//! - The pipeline owns the single matrix buffer; a failed parse leaves it as it was
//! - The engine is invoked once per successfully parsed line
//! - Phase timings travel with the cycle in a [`CycleTimings`], never in globals
//! - Failures are carried in the [`CycleOutcome`] and never stop the pipeline

use crate::config::ClassifierConfig;
use crate::engine::InferenceEngine;
use crate::signal::SignalTable;
use gridsense_core::parser::parse_line_into;
use gridsense_core::{
    CycleTimings, Decision, Error, LabelSet, Matrix, Phase, ProbabilityVector, Result,
    DEFAULT_THRESHOLD, GRID_CELLS, NUM_CLASSES,
};
use tracing::{debug, info, warn};

/// Result of classifying one matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Engine output for this cycle
    pub probabilities: ProbabilityVector,

    /// Thresholded decision
    pub decision: Decision,

    /// Signal pulses to emit; zero unless the decision is positive
    pub repetitions: u32,
}

/// Everything one cycle produced, successful or not
#[derive(Debug)]
pub struct CycleOutcome {
    /// The line as received
    pub line: String,

    /// Matrix reconstructed from the line, if parsing succeeded
    pub matrix: Option<Matrix>,

    /// Classification, or the parse/inference error that stopped the cycle
    pub result: Result<Classification>,

    /// Phase durations for this cycle
    pub timings: CycleTimings,
}

impl CycleOutcome {
    /// Whether the cycle ended in a positive decision
    pub fn is_detection(&self) -> bool {
        matches!(&self.result, Ok(c) if c.decision.is_detected())
    }
}

/// Line-to-decision pipeline around an injected inference engine
pub struct ClassificationPipeline<E> {
    engine: E,
    labels: LabelSet,
    threshold: f32,
    signals: SignalTable,
    matrix: Matrix,
}

impl<E: InferenceEngine> ClassificationPipeline<E> {
    /// Create a pipeline with default labels, threshold, and signal table.
    ///
    /// Fails with [`Error::EngineInit`] if the engine's input or output
    /// shape does not match the fixed matrix and class counts.
    pub fn new(engine: E) -> Result<Self> {
        if engine.input_len() != GRID_CELLS || engine.output_len() != NUM_CLASSES {
            return Err(Error::engine_init(format!(
                "engine '{}' has shape {}→{}, expected {}→{}",
                engine.name(),
                engine.input_len(),
                engine.output_len(),
                GRID_CELLS,
                NUM_CLASSES
            )));
        }

        Ok(Self {
            engine,
            labels: LabelSet::default(),
            threshold: DEFAULT_THRESHOLD,
            signals: SignalTable::default(),
            matrix: Matrix::default(),
        })
    }

    /// Create a pipeline with labels, threshold, and signal table from config
    pub fn from_config(engine: E, config: &ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(engine)?
            .with_labels(config.label_set()?)
            .with_threshold(config.threshold)
            .with_signal_table(SignalTable::new(config.signal.repetitions.clone())))
    }

    /// Set the class names
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    /// Set the detection threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the class → pulse count table
    pub fn with_signal_table(mut self, signals: SignalTable) -> Self {
        self.signals = signals;
        self
    }

    /// Run the engine on `matrix` and apply the decision rule.
    ///
    /// Only the engine call is timed, under [`Phase::Inference`].
    pub fn classify(&mut self, matrix: &Matrix, timings: &mut CycleTimings) -> Result<Classification> {
        self.engine.set_input(&matrix.flatten())?;

        let engine = &mut self.engine;
        timings.measure(Phase::Inference, |_| engine.run_inference())?;

        let probabilities = ProbabilityVector::from_slice(self.engine.output())?;
        let decision = Decision::from_probabilities(&probabilities, self.threshold);
        let repetitions = self.signals.for_decision(&decision);

        debug!(
            probabilities = ?probabilities.as_slice(),
            top_class = decision.top_class(),
            confidence = decision.confidence(),
            "classified matrix"
        );

        if let Some(class) = decision.class() {
            info!(
                class,
                label = self.labels.name(class).unwrap_or("unknown"),
                confidence = decision.confidence(),
                "Detection above threshold"
            );
        }

        Ok(Classification {
            probabilities,
            decision,
            repetitions,
        })
    }

    /// Run one full cycle on a raw input line
    pub fn process_line(&mut self, line: &str) -> CycleOutcome {
        let mut timings = CycleTimings::new();

        let (matrix, result) = timings.measure(Phase::Total, |t| {
            let parsed = t.measure(Phase::Parse, |_| parse_line_into(line, &mut self.matrix));
            match parsed {
                Ok(()) => {
                    let matrix = self.matrix;
                    let result = self.classify(&matrix, t);
                    (Some(matrix), result)
                }
                Err(e) => (None, Err(e)),
            }
        });

        if let Err(e) = &result {
            warn!(kind = e.kind(), error = %e, "cycle failed, awaiting next line");
        }

        CycleOutcome {
            line: line.to_string(),
            matrix,
            result,
            timings,
        }
    }

    /// Matrix from the last successful parse
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Class names
    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    /// Detection threshold
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// The injected engine
    pub fn engine(&self) -> &E {
        &self.engine
    }
}
