//! gridsense Core
//!
//! Core types, stream handling, and parsing shared across gridsense components.
//!
//! This crate provides:
//! - Fixed-shape types for the input matrix, class probabilities, and decisions
//! - Error types and result handling
//! - Line assembly over an asynchronous byte stream
//! - Sanitizing and parsing of the textual matrix encoding
//! - Per-cycle timing instrumentation

pub mod error;
pub mod parser;
pub mod sanitize;
pub mod stream;
pub mod timing;
pub mod types;

pub use error::{Error, Result};
pub use parser::{lenient_float, parse_matrix};
pub use sanitize::sanitize;
pub use stream::LineAssembler;
pub use timing::{CycleTimings, Phase};
pub use types::{
    Decision, LabelSet, Matrix, ProbabilityVector, DEFAULT_THRESHOLD, GRID_CELLS, GRID_SIZE,
    NUM_CLASSES,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::stream::LineAssembler;
    pub use crate::timing::{CycleTimings, Phase};
    pub use crate::types::{Decision, LabelSet, Matrix, ProbabilityVector};
}
