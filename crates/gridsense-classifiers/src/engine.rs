//! Inference engine capability
//!
//! The classification pipeline treats model execution as a black box: it
//! writes a flattened input vector, runs the engine once, and reads back a
//! fixed-size output vector. Any backend (Candle, a hardware accelerator, a
//! test double) plugs in by implementing [`InferenceEngine`].

use gridsense_core::Result;

/// Fixed-topology model executor
pub trait InferenceEngine: Send {
    /// Number of input values the engine expects
    fn input_len(&self) -> usize;

    /// Number of output values the engine produces
    fn output_len(&self) -> usize;

    /// Copy `input` into the engine's input buffer.
    ///
    /// Fails with [`gridsense_core::Error::InferenceFailed`] if the length
    /// does not match [`input_len`](Self::input_len).
    fn set_input(&mut self, input: &[f32]) -> Result<()>;

    /// Execute the model on the current input
    fn run_inference(&mut self) -> Result<()>;

    /// Output of the last successful run.
    ///
    /// Empty before the first run and after a failed one.
    fn output(&self) -> &[f32];

    /// Backend name, for logs and reports
    fn name(&self) -> &str;
}

/// Check an input slice against the length an engine expects
pub fn check_input_len(expected: usize, input: &[f32]) -> Result<()> {
    if input.len() != expected {
        return Err(gridsense_core::Error::inference(format!(
            "input has {} values, engine expects {}",
            input.len(),
            expected
        )));
    }
    Ok(())
}
