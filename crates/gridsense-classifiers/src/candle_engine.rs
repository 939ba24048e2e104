//! Candle-backed fixed-topology classifier
//!
//! A small multi-layer perceptron: `GRID_CELLS` inputs, the configured hidden
//! layers with ReLU, and `NUM_CLASSES` softmax outputs. Layer weights are read
//! from SafeTensors under the prefixes `fc0`, `fc1`, ...

use crate::config::{DeviceSpec, ModelSpec};
use crate::engine::{check_input_len, InferenceEngine};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use gridsense_core::{Error, Result, GRID_CELLS, NUM_CLASSES};
use tracing::{debug, info};

/// Multi-layer perceptron running on a Candle device
pub struct CandleEngine {
    layers: Vec<Linear>,
    device: Device,
    input: Vec<f32>,
    output: Vec<f32>,
}

impl CandleEngine {
    /// Load weights from the file named in `spec`.
    ///
    /// Any failure here means no classification can ever succeed, so it is
    /// reported as [`Error::EngineInit`].
    pub fn load(spec: &ModelSpec) -> Result<Self> {
        if !spec.path.exists() {
            return Err(Error::engine_init(format!(
                "model weights not found: {}",
                spec.path.display()
            )));
        }

        let device = create_device(spec.device)?;

        // SAFETY: the weights file is memory-mapped read-only and must not be
        // modified while the engine is alive.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&spec.path], DType::F32, &device)
        }
        .map_err(|e| Error::engine_init(format!("failed to load SafeTensors: {}", e)))?;

        let engine = Self::from_var_builder(vb, &spec.hidden, device)?;
        info!(
            path = %spec.path.display(),
            hidden = ?spec.hidden,
            "Loaded classifier weights"
        );
        Ok(engine)
    }

    /// Build the network from an already constructed `VarBuilder`
    pub fn from_var_builder(vb: VarBuilder<'_>, hidden: &[usize], device: Device) -> Result<Self> {
        let widths: Vec<usize> = std::iter::once(GRID_CELLS)
            .chain(hidden.iter().copied())
            .chain(std::iter::once(NUM_CLASSES))
            .collect();

        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, w)| candle_nn::linear(w[0], w[1], vb.pp(format!("fc{i}"))))
            .collect::<candle_core::Result<Vec<_>>>()
            .map_err(|e| Error::engine_init(format!("failed to build layers: {}", e)))?;

        Ok(Self {
            layers,
            device,
            input: vec![0.0; GRID_CELLS],
            output: Vec::with_capacity(NUM_CLASSES),
        })
    }

    fn forward(&self) -> candle_core::Result<Vec<f32>> {
        let mut xs = Tensor::from_slice(&self.input, (1, GRID_CELLS), &self.device)?;
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i < last {
                xs = xs.relu()?;
            }
        }
        candle_nn::ops::softmax(&xs, D::Minus1)?
            .squeeze(0)?
            .to_vec1::<f32>()
    }
}

impl InferenceEngine for CandleEngine {
    fn input_len(&self) -> usize {
        GRID_CELLS
    }

    fn output_len(&self) -> usize {
        NUM_CLASSES
    }

    fn set_input(&mut self, input: &[f32]) -> Result<()> {
        check_input_len(GRID_CELLS, input)?;
        self.input.copy_from_slice(input);
        Ok(())
    }

    fn run_inference(&mut self) -> Result<()> {
        self.output.clear();
        let output = self.forward().map_err(|e| Error::inference(e.to_string()))?;
        debug!(?output, "forward pass complete");
        self.output = output;
        Ok(())
    }

    fn output(&self) -> &[f32] {
        &self.output
    }

    fn name(&self) -> &str {
        "candle-mlp"
    }
}

fn create_device(spec: DeviceSpec) -> Result<Device> {
    let device = match spec {
        DeviceSpec::Cpu => Ok(Device::Cpu),
        DeviceSpec::Cuda { index } => Device::new_cuda(index),
        DeviceSpec::Metal { index } => Device::new_metal(index),
    };
    device.map_err(|e| Error::engine_init(format!("device {:?} unavailable: {}", spec, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Single linear layer with zero weights and the given bias
    fn biased_tensors(bias: [f32; NUM_CLASSES]) -> HashMap<String, Tensor> {
        let weight = Tensor::zeros((NUM_CLASSES, GRID_CELLS), DType::F32, &Device::Cpu).unwrap();
        let bias = Tensor::from_slice(&bias, NUM_CLASSES, &Device::Cpu).unwrap();
        HashMap::from([
            ("fc0.weight".to_string(), weight),
            ("fc0.bias".to_string(), bias),
        ])
    }

    #[test]
    fn test_zero_weights_give_uniform_output() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let mut engine = CandleEngine::from_var_builder(vb, &[8], Device::Cpu).unwrap();

        assert!(engine.output().is_empty());
        engine.set_input(&[0.5; GRID_CELLS]).unwrap();
        engine.run_inference().unwrap();

        let output = engine.output();
        assert_eq!(output.len(), NUM_CLASSES);
        for p in output {
            assert!((p - 1.0 / 3.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_bias_selects_class() {
        let vb = VarBuilder::from_tensors(biased_tensors([0.0, 10.0, 0.0]), DType::F32, &Device::Cpu);
        let mut engine = CandleEngine::from_var_builder(vb, &[], Device::Cpu).unwrap();

        engine.set_input(&[1.0; GRID_CELLS]).unwrap();
        engine.run_inference().unwrap();

        let output = engine.output();
        assert!(output[1] > 0.99);
        assert!((output.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_rejects_wrong_input_len() {
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let mut engine = CandleEngine::from_var_builder(vb, &[], Device::Cpu).unwrap();
        let err = engine.set_input(&[0.0; 10]).unwrap_err();
        assert!(matches!(err, Error::InferenceFailed(_)));
    }

    #[test]
    fn test_load_missing_weights_is_init_error() {
        let spec = ModelSpec {
            path: "/nonexistent/weights.safetensors".into(),
            ..Default::default()
        };
        let err = CandleEngine::load(&spec).err().unwrap();
        assert!(matches!(err, Error::EngineInit(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_load_from_safetensors_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");
        candle_core::safetensors::save(&biased_tensors([5.0, 0.0, 0.0]), &path).unwrap();

        let spec = ModelSpec {
            path,
            hidden: vec![],
            device: DeviceSpec::Cpu,
        };
        let mut engine = CandleEngine::load(&spec).unwrap();
        engine.set_input(&[0.0; GRID_CELLS]).unwrap();
        engine.run_inference().unwrap();
        assert!(engine.output()[0] > 0.98);
    }

    #[test]
    fn test_load_with_mismatched_topology_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.safetensors");
        candle_core::safetensors::save(&biased_tensors([0.0; NUM_CLASSES]), &path).unwrap();

        let spec = ModelSpec {
            path,
            hidden: vec![16],
            device: DeviceSpec::Cpu,
        };
        assert!(matches!(CandleEngine::load(&spec), Err(Error::EngineInit(_))));
    }
}
