//! Core types for gridsense

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Side length of the square input matrix
pub const GRID_SIZE: usize = 8;

/// Number of values in a fully populated matrix
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Number of classes the classifier distinguishes
pub const NUM_CLASSES: usize = 3;

/// Confidence cutoff for declaring a positive detection
pub const DEFAULT_THRESHOLD: f32 = 0.85;

/// Fixed 8×8 input matrix, row-major.
///
/// A matrix is only ever replaced wholesale; see [`Matrix::from_row_major`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Matrix {
    rows: [[f32; GRID_SIZE]; GRID_SIZE],
}

impl Matrix {
    /// Build a matrix from `GRID_CELLS` values laid out row-major.
    ///
    /// Value `i * GRID_SIZE + j` lands at row `i`, column `j`.
    pub fn from_row_major(values: &[f32; GRID_CELLS]) -> Self {
        let mut rows = [[0.0; GRID_SIZE]; GRID_SIZE];
        for (i, row) in rows.iter_mut().enumerate() {
            row.copy_from_slice(&values[i * GRID_SIZE..(i + 1) * GRID_SIZE]);
        }
        Self { rows }
    }

    /// Value at row `row`, column `col`
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.rows[row][col]
    }

    /// All rows, top to bottom
    pub fn rows(&self) -> &[[f32; GRID_SIZE]; GRID_SIZE] {
        &self.rows
    }

    /// Flatten into the engine input ordering (`r * GRID_SIZE + c`)
    pub fn flatten(&self) -> [f32; GRID_CELLS] {
        let mut flat = [0.0; GRID_CELLS];
        for (r, row) in self.rows.iter().enumerate() {
            flat[r * GRID_SIZE..(r + 1) * GRID_SIZE].copy_from_slice(row);
        }
        flat
    }
}

/// Per-class confidence output of one inference call.
///
/// Values are expected in `[0, 1]` and to sum to roughly 1, but neither is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityVector([f32; NUM_CLASSES]);

impl ProbabilityVector {
    /// Wrap a fixed-size probability array
    pub fn new(values: [f32; NUM_CLASSES]) -> Self {
        Self(values)
    }

    /// Read probabilities from an engine output buffer.
    ///
    /// The buffer must hold exactly `NUM_CLASSES` entries.
    pub fn from_slice(values: &[f32]) -> Result<Self> {
        let values: [f32; NUM_CLASSES] = values.try_into().map_err(|_| {
            Error::inference(format!(
                "expected {} output values, engine produced {}",
                NUM_CLASSES,
                values.len()
            ))
        })?;
        Ok(Self(values))
    }

    /// Probability of class `index`
    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }

    /// All probabilities in class order
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the largest probability.
    ///
    /// Scans in index order with a strict `>`, so ties go to the lowest index.
    /// NaN entries never win.
    pub fn argmax(&self) -> (usize, f32) {
        let mut best = 0;
        let mut best_value = self.0[0];
        for (index, &value) in self.0.iter().enumerate().skip(1) {
            if value > best_value || (best_value.is_nan() && !value.is_nan()) {
                best = index;
                best_value = value;
            }
        }
        (best, best_value)
    }
}

/// Ordered mapping from class index to a human-readable name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    names: Vec<String>,
}

impl LabelSet {
    /// Create a label set; exactly `NUM_CLASSES` names are required
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != NUM_CLASSES {
            return Err(Error::config(format!(
                "expected {} class labels, got {}",
                NUM_CLASSES,
                names.len()
            )));
        }
        Ok(Self { names })
    }

    /// Name for class `index`
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterate over `(index, name)` pairs in class order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().map(String::as_str).enumerate()
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a validated set
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            names: vec![
                "square".to_string(),
                "triangle".to_string(),
                "circle".to_string(),
            ],
        }
    }
}

/// Thresholded interpretation of a [`ProbabilityVector`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    top_class: usize,
    confidence: f32,
    detected: bool,
}

impl Decision {
    /// Apply the decision rule: top class by argmax, positive when its
    /// probability reaches `threshold`.
    pub fn from_probabilities(probabilities: &ProbabilityVector, threshold: f32) -> Self {
        let (top_class, confidence) = probabilities.argmax();
        Self {
            top_class,
            confidence,
            detected: confidence >= threshold,
        }
    }

    /// Detected class, or `None` if no class crossed the threshold
    pub fn class(&self) -> Option<usize> {
        self.detected.then_some(self.top_class)
    }

    /// Argmax class regardless of the threshold
    pub fn top_class(&self) -> usize {
        self.top_class
    }

    /// Probability of the top class
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Whether the decision is positive
    pub fn is_detected(&self) -> bool {
        self.detected
    }
}
