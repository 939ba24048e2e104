//! Diagnostic report for one classification cycle

use gridsense_classifiers::CycleOutcome;
use gridsense_core::{Error, LabelSet, Phase, Result, GRID_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Multi-line human-readable text
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown report format '{}', expected text or json", other)),
        }
    }
}

/// Probability reported for one class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScore {
    pub label: String,
    pub probability: f32,
}

/// Failure reported for a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleFailure {
    /// Stable error kind, e.g. `malformed_token`
    pub kind: String,
    pub message: String,
}

/// Phase durations in microseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTimings {
    pub parse_us: Option<u64>,
    pub inference_us: Option<u64>,
    pub total_us: Option<u64>,
}

/// Everything printed about one input line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Echo of the received line
    pub line: String,

    /// Whether the line parsed into a matrix
    pub parsed: bool,

    /// Reconstructed matrix rows, when parsing succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<[f32; GRID_SIZE]>>,

    /// Per-class probabilities, when inference succeeded
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub classes: Vec<ClassScore>,

    /// Name of the detected class, if one crossed the threshold
    pub detected: Option<String>,

    /// Probability of the top class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Threshold the decision was made against
    pub threshold: f32,

    /// Parse or inference failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CycleFailure>,

    pub timings: PhaseTimings,
}

impl DiagnosticReport {
    /// Build a report from a finished cycle
    pub fn from_outcome(outcome: &CycleOutcome, labels: &LabelSet, threshold: f32) -> Self {
        let (classes, detected, confidence, error) = match &outcome.result {
            Ok(classification) => {
                let classes = labels
                    .iter()
                    .map(|(i, label)| ClassScore {
                        label: label.to_string(),
                        probability: classification.probabilities.get(i).unwrap_or(0.0),
                    })
                    .collect();
                let decision = &classification.decision;
                let detected = decision
                    .class()
                    .map(|class| labels.name(class).unwrap_or("unknown").to_string());
                (classes, detected, Some(decision.confidence()), None)
            }
            Err(e) => (Vec::new(), None, None, Some(failure(e))),
        };

        Self {
            line: outcome.line.clone(),
            parsed: outcome.matrix.is_some(),
            matrix: outcome.matrix.map(|m| m.rows().to_vec()),
            classes,
            detected,
            confidence,
            threshold,
            error,
            timings: PhaseTimings {
                parse_us: outcome.timings.micros(Phase::Parse),
                inference_us: outcome.timings.micros(Phase::Inference),
                total_us: outcome.timings.micros(Phase::Total),
            },
        }
    }

    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => Ok(serde_json::to_string(self)?),
        }
    }
}

fn failure(e: &Error) -> CycleFailure {
    CycleFailure {
        kind: e.kind().to_string(),
        message: e.to_string(),
    }
}

impl fmt::Display for DiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Received: {}", self.line)?;

        if self.parsed {
            writeln!(f, "Parse: OK")?;
        } else if let Some(error) = &self.error {
            writeln!(f, "Parse: FAILED ({})", error.message)?;
        }

        if let Some(rows) = &self.matrix {
            writeln!(f, "Matrix:")?;
            for row in rows {
                let cells: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
                writeln!(f, "  [{}]", cells.join(", "))?;
            }
        }

        if self.parsed {
            if let Some(error) = &self.error {
                writeln!(f, "Inference: FAILED ({})", error.message)?;
            }
        }

        if !self.classes.is_empty() {
            writeln!(f, "Class probabilities:")?;
            for score in &self.classes {
                writeln!(f, "  {}: {:.2}%", score.label, score.probability * 100.0)?;
            }

            match (&self.detected, self.confidence) {
                (Some(label), Some(confidence)) => {
                    writeln!(f, "Detected: {} ({:.2}%)", label, confidence * 100.0)?
                }
                _ => writeln!(
                    f,
                    "No class above {:.2}% threshold",
                    self.threshold * 100.0
                )?,
            }
        }

        writeln!(f, "Timing:")?;
        for (name, value) in [
            ("Parse", self.timings.parse_us),
            ("Inference", self.timings.inference_us),
            ("Total", self.timings.total_us),
        ] {
            match value {
                Some(us) => writeln!(f, "  {}: {} us", name, us)?,
                None => writeln!(f, "  {}: -", name)?,
            }
        }

        Ok(())
    }
}
